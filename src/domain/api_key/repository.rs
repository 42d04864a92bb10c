//! API Key repository trait

use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{OwnedRwLockWriteGuard, RwLock};

use super::entity::{ApiKey, ApiKeyId, TenantId};
use crate::domain::DomainError;

/// Shared handle to a single key record
///
/// The lock is the key's critical section: every mutation (rotate, revoke,
/// scope change) takes the write half, readers take the read half.
pub type KeyHandle = Arc<RwLock<ApiKey>>;

/// Exclusive access to a key record, detached from the repository borrow
pub type KeyWriteGuard = OwnedRwLockWriteGuard<ApiKey>;

/// Repository trait for API key storage
///
/// Keys are never physically deleted; revocation is a state on the record.
#[async_trait]
pub trait ApiKeyRepository: Send + Sync + Debug {
    /// Get the shared handle of a key
    async fn handle(&self, id: &ApiKeyId) -> Result<Option<KeyHandle>, DomainError>;

    /// Insert a new key, failing with a conflict if the ID is taken
    ///
    /// The record is published already write-locked: no other reader or writer
    /// observes it until the returned guard is dropped.
    async fn create(&self, api_key: ApiKey) -> Result<KeyWriteGuard, DomainError>;

    /// List point-in-time snapshots of all keys, optionally for one tenant
    async fn list(&self, tenant_id: Option<&TenantId>) -> Result<Vec<ApiKey>, DomainError>;

    /// Count keys, optionally for one tenant
    async fn count(&self, tenant_id: Option<&TenantId>) -> Result<usize, DomainError> {
        Ok(self.list(tenant_id).await?.len())
    }

    /// Get a point-in-time snapshot of a key
    async fn get(&self, id: &ApiKeyId) -> Result<Option<ApiKey>, DomainError> {
        match self.handle(id).await? {
            Some(handle) => Ok(Some(handle.read().await.clone())),
            None => Ok(None),
        }
    }

    /// Check if a key ID exists
    async fn exists(&self, id: &ApiKeyId) -> Result<bool, DomainError> {
        Ok(self.handle(id).await?.is_some())
    }
}
