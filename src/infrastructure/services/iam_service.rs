//! IAM service - the operations of the key core behind one facade
//!
//! Accepts raw strings at the boundary, validates them into domain
//! identifiers, and routes to the Key Store, Decision Engine and Cache
//! Invalidation Engine, which share one repository, cache and audit trail.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::info;

use crate::config::AppConfig;
use crate::domain::DomainError;
use crate::domain::api_key::{ApiKey, ApiKeyId, ApiKeyRepository, Permission, TenantId};
use crate::domain::audit::{AuditEvent, AuditSummary};
use crate::domain::authorization::{
    AuthorizationRequest, Decision, PermissionEvent, PermissionEventKind, ScopeEventOutcome,
};
use crate::domain::cache::{
    DecisionCacheEntries, InvalidationMetrics, PrincipalId, RoleAssignments, RoleId,
    RolePermissionRemoved,
};
use crate::infrastructure::api_key::{
    ApiKeyGenerator, CreateKeyResult, InMemoryApiKeyRepository, KeyStore, RevokeOutcome,
    RotateOutcome,
};
use crate::infrastructure::audit::AuditTrail;
use crate::infrastructure::authorization::DecisionEngine;
use crate::infrastructure::cache::{CacheInvalidationEngine, DecisionCache};

/// Facade over key lifecycle, authorization and cache invalidation
#[derive(Debug)]
pub struct IamService<R = InMemoryApiKeyRepository>
where
    R: ApiKeyRepository,
{
    keys: KeyStore<R>,
    decisions: DecisionEngine<R>,
    invalidation: CacheInvalidationEngine,
    cache: Arc<DecisionCache>,
    audit: AuditTrail,
}

impl IamService<InMemoryApiKeyRepository> {
    /// In-memory service with default settings and a synchronous audit trail
    pub fn in_memory(role_assignments: Arc<dyn RoleAssignments>) -> Self {
        Self::new(
            Arc::new(InMemoryApiKeyRepository::new()),
            role_assignments,
            Arc::new(DecisionCache::new()),
            AuditTrail::direct(),
        )
    }

    /// In-memory service built from configuration
    ///
    /// Audit events go through the configured bounded queue, so this must be
    /// called from within a Tokio runtime.
    pub fn from_config(
        config: &AppConfig,
        role_assignments: Arc<dyn RoleAssignments>,
        seed: DecisionCacheEntries,
    ) -> Result<Self, DomainError> {
        let generator = ApiKeyGenerator::from_config(&config.keys)?;

        Ok(Self::new(
            Arc::new(InMemoryApiKeyRepository::new()),
            role_assignments,
            Arc::new(DecisionCache::with_entries(seed)),
            AuditTrail::queued(config.audit.queue_capacity),
        )
        .with_generator(generator)
        .with_max_id_attempts(config.keys.max_id_attempts)
        .with_invalidation_window(config.cache.invalidation_window()))
    }
}

impl<R: ApiKeyRepository> IamService<R> {
    /// Wire the engines over shared state
    pub fn new(
        repository: Arc<R>,
        role_assignments: Arc<dyn RoleAssignments>,
        cache: Arc<DecisionCache>,
        audit: AuditTrail,
    ) -> Self {
        let keys = KeyStore::new(Arc::clone(&repository), audit.sink());
        let decisions = DecisionEngine::new(repository, Arc::clone(&cache), audit.sink());
        let invalidation = CacheInvalidationEngine::new(Arc::clone(&cache), role_assignments);

        Self {
            keys,
            decisions,
            invalidation,
            cache,
            audit,
        }
    }

    /// Use a custom key generator
    pub fn with_generator(mut self, generator: ApiKeyGenerator) -> Self {
        self.keys = self.keys.with_generator(generator);
        self
    }

    pub fn with_max_id_attempts(mut self, attempts: usize) -> Self {
        self.keys = self.keys.with_max_id_attempts(attempts);
        self
    }

    /// Set the window invalidation rates are measured over
    pub fn with_invalidation_window(mut self, window: Duration) -> Self {
        self.invalidation = self.invalidation.with_window(window);
        self
    }

    // Key lifecycle

    /// Create a key whose scopes must be covered by the granted permissions
    pub async fn create_key<S, G>(
        &self,
        scopes: &[S],
        granted_permissions: &[G],
        tenant_id: &str,
    ) -> Result<CreateKeyResult, DomainError>
    where
        S: AsRef<str>,
        G: AsRef<str>,
    {
        let requested = parse_permissions(scopes)?;
        let granted = parse_permissions(granted_permissions)?;
        let tenant_id = TenantId::new(tenant_id)?;

        self.keys.create_key(requested, granted, tenant_id).await
    }

    pub async fn rotate_key(&self, public_id: &str) -> Result<RotateOutcome, DomainError> {
        let id = ApiKeyId::new(public_id)?;
        self.keys.rotate_key(&id).await
    }

    /// Revoke a key and drop every cached decision of it
    pub async fn revoke_key(&self, public_id: &str) -> Result<RevokeOutcome, DomainError> {
        let id = ApiKeyId::new(public_id)?;
        let outcome = self.keys.revoke_key(&id).await?;

        if outcome.is_revoked() {
            let purged = self.cache.remove_principal(&PrincipalId::from(&id));
            info!(key_id = %id, purged, "Purged cached decisions of revoked key");
        }

        Ok(outcome)
    }

    pub async fn get_key(&self, public_id: &str) -> Result<Option<ApiKey>, DomainError> {
        let id = ApiKeyId::new(public_id)?;
        self.keys.get(&id).await
    }

    pub async fn list_keys(&self, tenant_id: Option<&str>) -> Result<Vec<ApiKey>, DomainError> {
        let tenant_id = tenant_id.map(TenantId::new).transpose()?;
        self.keys.list(tenant_id.as_ref()).await
    }

    pub async fn count_keys(&self, tenant_id: Option<&str>) -> Result<usize, DomainError> {
        let tenant_id = tenant_id.map(TenantId::new).transpose()?;
        self.keys.count(tenant_id.as_ref()).await
    }

    /// Check a presented secret; malformed, unknown and revoked keys never verify
    pub async fn verify_secret(&self, public_id: &str, secret: &str) -> Result<bool, DomainError> {
        match ApiKeyId::new(public_id) {
            Ok(id) => self.keys.verify_secret(&id, secret).await,
            Err(_) => Ok(false),
        }
    }

    // Authorization

    pub async fn authorize(
        &self,
        key_id: &str,
        action: &str,
        tenant_id: &str,
    ) -> Result<Decision, DomainError> {
        let request = AuthorizationRequest::new(key_id, action, tenant_id);
        self.decisions.authorize(&request).await
    }

    /// Apply a GRANT or REVOKE; the permission must be a valid identifier
    pub async fn apply_permission_event(
        &self,
        key_id: &str,
        kind: PermissionEventKind,
        permission: &str,
    ) -> Result<ScopeEventOutcome, DomainError> {
        let event = PermissionEvent {
            key_id: key_id.to_string(),
            kind,
            permission: Permission::new(permission)?,
        };
        self.decisions.apply_permission_event(&event).await
    }

    // Cache

    pub fn invalidate_cache(
        &self,
        role_id: &str,
        permission: &str,
        timestamp: Option<DateTime<Utc>>,
    ) -> Result<InvalidationMetrics, DomainError> {
        let mut event =
            RolePermissionRemoved::new(RoleId::new(role_id)?, Permission::new(permission)?);
        if let Some(timestamp) = timestamp {
            event = event.with_timestamp(timestamp);
        }

        Ok(self.invalidation.invalidate(&event))
    }

    pub fn cache(&self) -> &Arc<DecisionCache> {
        &self.cache
    }

    // Audit

    pub fn audit_events(&self) -> Vec<AuditEvent> {
        self.audit.events()
    }

    pub fn audit_summary(&self) -> AuditSummary {
        self.audit.summary()
    }

    pub fn audit_dropped(&self) -> u64 {
        self.audit.dropped()
    }

    /// Flush queued audit events; later events are dropped
    pub async fn shutdown(&self) {
        self.audit.shutdown().await;
    }
}

fn parse_permissions<S: AsRef<str>>(values: &[S]) -> Result<Vec<Permission>, DomainError> {
    values
        .iter()
        .map(|value| Permission::new(value.as_ref()).map_err(DomainError::from))
        .collect()
}
