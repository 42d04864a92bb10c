use std::time::Duration;

use serde::Deserialize;

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub keys: KeyConfig,
    #[serde(default)]
    pub audit: AuditConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Key id and secret generation settings
#[derive(Debug, Clone, Deserialize)]
pub struct KeyConfig {
    /// Fixed prefix of every public key id
    #[serde(default = "default_id_prefix")]
    pub id_prefix: String,
    /// Random bytes in the id suffix
    #[serde(default = "default_id_bytes")]
    pub id_bytes: usize,
    /// Random bytes in each secret
    #[serde(default = "default_secret_bytes")]
    pub secret_bytes: usize,
    /// Attempts at finding an unused id before giving up
    #[serde(default = "default_max_id_attempts")]
    pub max_id_attempts: usize,
}

/// Audit hand-off settings
#[derive(Debug, Clone, Deserialize)]
pub struct AuditConfig {
    /// Bounded queue capacity between emitters and the audit writer
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

/// Decision cache settings
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// Measurement window for `invalidations_per_window`, in seconds
    #[serde(default = "default_invalidation_window_secs")]
    pub invalidation_window_secs: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_id_prefix() -> String {
    "sk_live_".to_string()
}

fn default_id_bytes() -> usize {
    8
}

fn default_secret_bytes() -> usize {
    16
}

fn default_max_id_attempts() -> usize {
    5
}

fn default_queue_capacity() -> usize {
    1024
}

fn default_invalidation_window_secs() -> f64 {
    1.0
}

fn default_true() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

impl Default for KeyConfig {
    fn default() -> Self {
        Self {
            id_prefix: default_id_prefix(),
            id_bytes: default_id_bytes(),
            secret_bytes: default_secret_bytes(),
            max_id_attempts: default_max_id_attempts(),
        }
    }
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            invalidation_window_secs: default_invalidation_window_secs(),
        }
    }
}

impl CacheConfig {
    /// The invalidation window; negative or non-finite values collapse to zero
    pub fn invalidation_window(&self) -> Duration {
        Duration::try_from_secs_f64(self.invalidation_window_secs).unwrap_or(Duration::ZERO)
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("IAM")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();

        assert_eq!(config.logging.level, "info");
        assert_eq!(config.keys.id_prefix, "sk_live_");
        assert_eq!(config.keys.secret_bytes, 16);
        assert_eq!(config.audit.queue_capacity, 1024);
        assert_eq!(config.cache.invalidation_window(), Duration::from_secs(1));
        assert!(config.metrics.enabled);
    }

    #[test]
    fn test_partial_deserialization_fills_defaults() {
        let config: AppConfig = serde_json::from_str(
            r#"{"keys": {"id_prefix": "sk_test_"}, "cache": {"invalidation_window_secs": 0.5}}"#,
        )
        .unwrap();

        assert_eq!(config.keys.id_prefix, "sk_test_");
        assert_eq!(config.keys.id_bytes, 8);
        assert_eq!(config.cache.invalidation_window(), Duration::from_millis(500));
        assert_eq!(config.audit.queue_capacity, 1024);
    }

    #[test]
    fn test_negative_window_collapses_to_zero() {
        let config = CacheConfig {
            invalidation_window_secs: -3.0,
        };

        assert_eq!(config.invalidation_window(), Duration::ZERO);
    }
}
