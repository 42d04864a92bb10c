//! API Key generation
//!
//! Generates public key ids and high-entropy secrets, and one-way hashes secrets.

use rand::RngCore;
use sha2::{Digest, Sha256};

use crate::config::KeyConfig;
use crate::domain::{ApiKeyId, DomainError, Secret};

const HASH_SCHEME: &str = "sha256$";

/// Freshly generated secret together with its storable hash
#[derive(Debug)]
pub struct GeneratedSecret {
    /// The plaintext secret (only shown once)
    pub secret: Secret,
    /// The hashed secret for storage
    pub hash: String,
}

/// Generator for key ids and secrets
#[derive(Debug, Clone)]
pub struct ApiKeyGenerator {
    /// Prefix for all generated key ids (e.g., "sk_live_", "sk_test_")
    prefix: String,
    /// Number of random bytes in the id suffix
    id_bytes: usize,
    /// Number of random bytes in the secret
    secret_bytes: usize,
}

impl ApiKeyGenerator {
    /// Create a new generator
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            id_bytes: 8,
            secret_bytes: 16,
        }
    }

    /// Create a generator for production keys
    pub fn production() -> Self {
        Self::new("sk_live_")
    }

    /// Create a generator for test keys
    pub fn test() -> Self {
        Self::new("sk_test_")
    }

    /// Create a generator from configuration, validating the prefix shape
    pub fn from_config(config: &KeyConfig) -> Result<Self, DomainError> {
        let generator = Self::new(&config.id_prefix)
            .with_id_bytes(config.id_bytes)
            .with_secret_bytes(config.secret_bytes);

        if config.id_bytes == 0 || config.secret_bytes == 0 {
            return Err(DomainError::validation(
                "Key id and secret must contain at least one random byte",
            ));
        }

        generator.generate_id()?;
        Ok(generator)
    }

    /// Set the number of random bytes in generated ids
    pub fn with_id_bytes(mut self, bytes: usize) -> Self {
        self.id_bytes = bytes;
        self
    }

    /// Set the number of random bytes in generated secrets
    pub fn with_secret_bytes(mut self, bytes: usize) -> Self {
        self.secret_bytes = bytes;
        self
    }

    /// Generate a new public key id: prefix + hex random suffix
    pub fn generate_id(&self) -> Result<ApiKeyId, DomainError> {
        let suffix = random_hex(self.id_bytes);
        Ok(ApiKeyId::new(format!("{}{}", self.prefix, suffix))?)
    }

    /// Generate a new hex-encoded secret and its hash
    pub fn generate_secret(&self) -> GeneratedSecret {
        let secret = random_hex(self.secret_bytes);
        let hash = hash_secret(&secret);

        GeneratedSecret {
            secret: Secret::new(secret),
            hash,
        }
    }

    /// Build a secret from a known plaintext (for deterministic tests)
    pub fn from_secret(&self, secret: &str) -> GeneratedSecret {
        GeneratedSecret {
            secret: Secret::new(secret.to_string()),
            hash: hash_secret(secret),
        }
    }
}

impl Default for ApiKeyGenerator {
    fn default() -> Self {
        Self::production()
    }
}

fn random_hex(bytes: usize) -> String {
    let mut random_bytes = vec![0u8; bytes];
    rand::thread_rng().fill_bytes(&mut random_bytes);
    hex::encode(random_bytes)
}

/// One-way hash of a secret for storage
pub fn hash_secret(secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    format!("{}{}", HASH_SCHEME, hex::encode(hasher.finalize()))
}

/// Verify a secret against a stored hash
pub fn verify_secret(secret: &str, stored_hash: &str) -> bool {
    constant_time_compare(&hash_secret(secret), stored_hash)
}

/// Constant-time string comparison to prevent timing attacks
fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    a.as_bytes()
        .iter()
        .zip(b.as_bytes())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y))
        == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_id() {
        let generator = ApiKeyGenerator::production();
        let id = generator.generate_id().unwrap();

        assert!(id.as_str().starts_with("sk_live_"));
        // 8 bytes hex-encoded
        assert_eq!(id.as_str().len(), "sk_live_".len() + 16);
    }

    #[test]
    fn test_generate_test_id() {
        let id = ApiKeyGenerator::test().generate_id().unwrap();
        assert!(id.as_str().starts_with("sk_test_"));
    }

    #[test]
    fn test_invalid_prefix_rejected() {
        let config = KeyConfig {
            id_prefix: "sk-live-".to_string(),
            ..KeyConfig::default()
        };

        assert!(ApiKeyGenerator::from_config(&config).is_err());
    }

    #[test]
    fn test_zero_bytes_rejected() {
        let config = KeyConfig {
            secret_bytes: 0,
            ..KeyConfig::default()
        };

        assert!(ApiKeyGenerator::from_config(&config).is_err());
    }

    #[test]
    fn test_generate_secret() {
        let generated = ApiKeyGenerator::production().generate_secret();

        // 16 bytes hex-encoded
        assert_eq!(generated.secret.expose().len(), 32);
        assert!(generated.secret.expose().chars().all(|c| c.is_ascii_hexdigit()));
        assert!(generated.hash.starts_with("sha256$"));
        assert_eq!(generated.hash, hash_secret(generated.secret.expose()));
    }

    #[test]
    fn test_hash_does_not_contain_secret() {
        let generated = ApiKeyGenerator::production().generate_secret();
        assert!(!generated.hash.contains(generated.secret.expose()));
    }

    #[test]
    fn test_uniqueness() {
        let generator = ApiKeyGenerator::production();

        assert_ne!(
            generator.generate_id().unwrap(),
            generator.generate_id().unwrap()
        );
        assert_ne!(generator.generate_secret().hash, generator.generate_secret().hash);
    }

    #[test]
    fn test_custom_secret_bytes() {
        let generated = ApiKeyGenerator::production()
            .with_secret_bytes(32)
            .generate_secret();

        assert_eq!(generated.secret.expose().len(), 64);
    }

    #[test]
    fn test_hash_known_vector() {
        assert_eq!(
            hash_secret("hello"),
            "sha256$2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }

    #[test]
    fn test_verify_secret() {
        let generated = ApiKeyGenerator::production().generate_secret();

        assert!(verify_secret(generated.secret.expose(), &generated.hash));
        assert!(!verify_secret("wrong", &generated.hash));
    }

    #[test]
    fn test_from_secret_is_deterministic() {
        let generator = ApiKeyGenerator::test();
        assert_eq!(
            generator.from_secret("abc").hash,
            generator.from_secret("abc").hash
        );
    }

    #[test]
    fn test_constant_time_compare() {
        assert!(constant_time_compare("hello", "hello"));
        assert!(!constant_time_compare("hello", "world"));
        assert!(!constant_time_compare("hello", "hell"));
    }
}
