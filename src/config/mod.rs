//! Application configuration

mod app_config;

pub use app_config::{
    AppConfig, AuditConfig, CacheConfig, KeyConfig, LogFormat, LoggingConfig, MetricsConfig,
};
