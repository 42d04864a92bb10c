//! API Key domain
//!
//! This module provides domain types and traits for API key management:
//! identifiers, the key record, secrets, and the repository contract.

mod entity;
mod repository;

pub use entity::{ApiKey, ApiKeyId, Permission, Secret, TenantId};
pub use repository::{ApiKeyRepository, KeyHandle, KeyWriteGuard};
