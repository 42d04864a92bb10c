//! In-memory API key repository implementation

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use futures::future::join_all;
use tokio::sync::RwLock;

use crate::domain::DomainError;
use crate::domain::api_key::{
    ApiKey, ApiKeyId, ApiKeyRepository, KeyHandle, KeyWriteGuard, TenantId,
};

/// In-memory implementation of ApiKeyRepository
///
/// The map is sharded, and each record sits behind its own lock, so
/// mutations of different keys never contend on a shared lock.
#[derive(Debug, Default)]
pub struct InMemoryApiKeyRepository {
    keys: DashMap<ApiKeyId, KeyHandle>,
}

impl InMemoryApiKeyRepository {
    /// Create a new in-memory repository
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a repository with initial keys
    pub fn with_keys(keys: Vec<ApiKey>) -> Self {
        let repo = Self::new();
        for key in keys {
            repo.keys
                .insert(key.public_id().clone(), Arc::new(RwLock::new(key)));
        }
        repo
    }
}

#[async_trait]
impl ApiKeyRepository for InMemoryApiKeyRepository {
    async fn handle(&self, id: &ApiKeyId) -> Result<Option<KeyHandle>, DomainError> {
        // Clone the Arc out so no shard guard is held across an await
        Ok(self.keys.get(id).map(|entry| Arc::clone(entry.value())))
    }

    async fn create(&self, api_key: ApiKey) -> Result<KeyWriteGuard, DomainError> {
        let id = api_key.public_id().clone();
        let handle = Arc::new(RwLock::new(api_key));
        // Uncontended: the handle is not shared yet
        let guard = Arc::clone(&handle).write_owned().await;

        match self.keys.entry(id) {
            Entry::Occupied(entry) => Err(DomainError::conflict(format!(
                "API key with ID '{}' already exists",
                entry.key()
            ))),
            Entry::Vacant(entry) => {
                entry.insert(handle);
                Ok(guard)
            }
        }
    }

    async fn list(&self, tenant_id: Option<&TenantId>) -> Result<Vec<ApiKey>, DomainError> {
        let handles: Vec<KeyHandle> = self
            .keys
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();

        let keys = join_all(handles.iter().map(|handle| handle.read())).await;

        Ok(keys
            .into_iter()
            .filter(|key| tenant_id.is_none_or(|tenant| key.tenant_id() == tenant))
            .map(|key| key.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::api_key::Permission;

    fn create_test_key(id: &str, tenant: &str) -> ApiKey {
        ApiKey::new(
            ApiKeyId::new(id).unwrap(),
            "sha256$hash",
            [Permission::new("payments:create").unwrap()],
            TenantId::new(tenant).unwrap(),
        )
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let repo = InMemoryApiKeyRepository::new();
        let key = create_test_key("sk_test_1", "acme");

        repo.create(key.clone()).await.unwrap();

        let retrieved = repo.get(key.public_id()).await.unwrap();
        assert!(retrieved.is_some());
        assert_eq!(retrieved.unwrap().tenant_id().as_str(), "acme");
        assert!(repo.exists(key.public_id()).await.unwrap());
    }

    #[tokio::test]
    async fn test_create_duplicate_id() {
        let repo = InMemoryApiKeyRepository::new();

        repo.create(create_test_key("sk_test_1", "acme")).await.unwrap();
        let result = repo.create(create_test_key("sk_test_1", "beta")).await;

        assert!(matches!(result, Err(DomainError::Conflict { .. })));
        // original untouched
        let kept = repo
            .get(&ApiKeyId::new("sk_test_1").unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(kept.tenant_id().as_str(), "acme");
    }

    #[tokio::test]
    async fn test_handle_shares_state() {
        let repo = InMemoryApiKeyRepository::new();
        let key = create_test_key("sk_test_1", "acme");
        let id = key.public_id().clone();

        repo.create(key).await.unwrap();

        let handle = repo.handle(&id).await.unwrap().unwrap();
        handle.write().await.revoke();

        let snapshot = repo.get(&id).await.unwrap().unwrap();
        assert!(snapshot.is_revoked());
    }

    #[tokio::test]
    async fn test_created_key_is_locked_until_guard_drops() {
        let repo = InMemoryApiKeyRepository::new();
        let key = create_test_key("sk_test_1", "acme");
        let id = key.public_id().clone();

        let mut guard = repo.create(key).await.unwrap();

        let handle = repo.handle(&id).await.unwrap().unwrap();
        assert!(handle.try_read().is_err());

        guard.revoke();
        drop(guard);

        assert!(repo.get(&id).await.unwrap().unwrap().is_revoked());
    }

    #[tokio::test]
    async fn test_get_missing() {
        let repo = InMemoryApiKeyRepository::new();
        let id = ApiKeyId::new("sk_test_missing").unwrap();

        assert!(repo.get(&id).await.unwrap().is_none());
        assert!(repo.handle(&id).await.unwrap().is_none());
        assert!(!repo.exists(&id).await.unwrap());
    }

    #[tokio::test]
    async fn test_list_and_count_by_tenant() {
        let repo = InMemoryApiKeyRepository::with_keys(vec![
            create_test_key("sk_test_1", "acme"),
            create_test_key("sk_test_2", "acme"),
            create_test_key("sk_test_3", "beta"),
        ]);
        let acme = TenantId::new("acme").unwrap();

        assert_eq!(repo.list(None).await.unwrap().len(), 3);
        assert_eq!(repo.list(Some(&acme)).await.unwrap().len(), 2);
        assert_eq!(repo.count(None).await.unwrap(), 3);
        assert_eq!(repo.count(Some(&acme)).await.unwrap(), 2);
    }
}
