//! API Key infrastructure implementations
//!
//! This module provides key id and secret generation, in-memory storage,
//! and the Key Store service that drives the key lifecycle.

mod generator;
mod repository;
mod service;

pub use generator::{ApiKeyGenerator, GeneratedSecret, hash_secret, verify_secret};
pub use repository::InMemoryApiKeyRepository;
pub use service::{CreateKeyResult, KeyStore, RevokeOutcome, RotateOutcome};
