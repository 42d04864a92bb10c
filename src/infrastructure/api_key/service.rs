//! Key Store service
//!
//! Owns API key lifecycle: creation, rotation and revocation. Every mutation
//! happens under the key's write lock and emits its audit event before the
//! lock is released.

use std::collections::BTreeSet;
use std::sync::Arc;

use metrics::counter;
use serde::Serialize;
use tracing::{info, warn};

use crate::domain::DomainError;
use crate::domain::api_key::{
    ApiKey, ApiKeyId, ApiKeyRepository, KeyHandle, Permission, Secret, TenantId,
};
use crate::domain::audit::{AuditEvent, AuditEventKind, AuditSink};

use super::generator::{ApiKeyGenerator, verify_secret};

const DEFAULT_MAX_ID_ATTEMPTS: usize = 5;

/// Result of creating a new API key
#[derive(Debug, Serialize)]
pub struct CreateKeyResult {
    pub public_id: ApiKeyId,
    /// The plaintext secret (only returned once)
    pub secret: Secret,
    pub scopes: Vec<Permission>,
}

/// Result of rotating an API key's secret
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RotateOutcome {
    Rotated {
        public_id: ApiKeyId,
        /// The new plaintext secret (only returned once)
        secret: Secret,
        scopes: Vec<Permission>,
    },
    AlreadyRevoked { public_id: ApiKeyId },
}

impl RotateOutcome {
    pub fn is_rotated(&self) -> bool {
        matches!(self, Self::Rotated { .. })
    }
}

/// Result of revoking an API key
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RevokeOutcome {
    Revoked { public_id: ApiKeyId, revoked: bool },
    AlreadyRevoked { public_id: ApiKeyId },
}

impl RevokeOutcome {
    fn revoked(public_id: ApiKeyId) -> Self {
        Self::Revoked {
            public_id,
            revoked: true,
        }
    }

    /// Whether this call performed the revocation
    pub fn is_revoked(&self) -> bool {
        matches!(self, Self::Revoked { .. })
    }

    pub fn public_id(&self) -> &ApiKeyId {
        match self {
            Self::Revoked { public_id, .. } | Self::AlreadyRevoked { public_id } => public_id,
        }
    }
}

/// Key Store for managing API keys
pub struct KeyStore<R>
where
    R: ApiKeyRepository,
{
    repository: Arc<R>,
    generator: ApiKeyGenerator,
    audit: Arc<dyn AuditSink>,
    max_id_attempts: usize,
}

impl<R: ApiKeyRepository> std::fmt::Debug for KeyStore<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyStore")
            .field("repository", &self.repository)
            .field("generator", &self.generator)
            .field("max_id_attempts", &self.max_id_attempts)
            .finish_non_exhaustive()
    }
}

impl<R: ApiKeyRepository> KeyStore<R> {
    /// Create a new key store
    pub fn new(repository: Arc<R>, audit: Arc<dyn AuditSink>) -> Self {
        Self {
            repository,
            generator: ApiKeyGenerator::production(),
            audit,
            max_id_attempts: DEFAULT_MAX_ID_ATTEMPTS,
        }
    }

    /// Create with a custom generator
    pub fn with_generator(mut self, generator: ApiKeyGenerator) -> Self {
        self.generator = generator;
        self
    }

    /// Set how many fresh ids are tried when a generated id collides
    pub fn with_max_id_attempts(mut self, attempts: usize) -> Self {
        self.max_id_attempts = attempts.max(1);
        self
    }

    /// Create a new API key
    ///
    /// Every requested scope must be covered by `granted`; otherwise the call
    /// fails with `ScopeExceedsGrant` listing the offending scopes.
    pub async fn create_key(
        &self,
        requested: impl IntoIterator<Item = Permission>,
        granted: impl IntoIterator<Item = Permission>,
        tenant_id: TenantId,
    ) -> Result<CreateKeyResult, DomainError> {
        let requested: BTreeSet<Permission> = requested.into_iter().collect();
        let granted: BTreeSet<Permission> = granted.into_iter().collect();

        let exceeding: Vec<String> = requested
            .difference(&granted)
            .map(|scope| scope.to_string())
            .collect();
        if !exceeding.is_empty() {
            warn!(
                tenant_id = %tenant_id,
                scopes = ?exceeding,
                "Rejected key creation: scopes exceed grant"
            );
            return Err(DomainError::scope_exceeds_grant(exceeding));
        }

        let generated = self.generator.generate_secret();

        for attempt in 1..=self.max_id_attempts {
            let public_id = self.generator.generate_id()?;
            let api_key = ApiKey::new(
                public_id.clone(),
                generated.hash.clone(),
                requested.iter().cloned(),
                tenant_id.clone(),
            );

            // Write-locked until CREATED is emitted
            let key = match self.repository.create(api_key).await {
                Ok(guard) => guard,
                Err(DomainError::Conflict { .. }) => {
                    warn!(attempt, "Generated key id collided, retrying");
                    continue;
                }
                Err(e) => return Err(e),
            };

            self.emit(AuditEventKind::Created, &public_id);
            counter!("iam_key_operations_total", "operation" => "create").increment(1);
            info!(
                key_id = %public_id,
                tenant_id = %tenant_id,
                scopes = key.scopes().len(),
                "API key created"
            );

            return Ok(CreateKeyResult {
                public_id,
                secret: generated.secret,
                scopes: key.scopes().iter().cloned().collect(),
            });
        }

        Err(DomainError::conflict(format!(
            "Could not allocate a unique key id after {} attempts",
            self.max_id_attempts
        )))
    }

    /// Rotate the secret of an API key
    pub async fn rotate_key(&self, id: &ApiKeyId) -> Result<RotateOutcome, DomainError> {
        info!(key_id = %id, "Rotating API key");

        let handle = self.require_handle(id).await?;
        let mut key = handle.write().await;

        if key.is_revoked() {
            info!(key_id = %id, "Rotation skipped: key already revoked");
            return Ok(RotateOutcome::AlreadyRevoked {
                public_id: id.clone(),
            });
        }

        let generated = self.generator.generate_secret();
        key.rotate_secret(generated.hash);
        self.emit(AuditEventKind::Rotated, id);
        counter!("iam_key_operations_total", "operation" => "rotate").increment(1);

        Ok(RotateOutcome::Rotated {
            public_id: id.clone(),
            secret: generated.secret,
            scopes: key.scopes().iter().cloned().collect(),
        })
    }

    /// Revoke an API key. Revocation is terminal.
    pub async fn revoke_key(&self, id: &ApiKeyId) -> Result<RevokeOutcome, DomainError> {
        info!(key_id = %id, "Revoking API key");

        let handle = self.require_handle(id).await?;
        let mut key = handle.write().await;

        if !key.revoke() {
            info!(key_id = %id, "Revocation skipped: key already revoked");
            return Ok(RevokeOutcome::AlreadyRevoked {
                public_id: id.clone(),
            });
        }

        self.emit(AuditEventKind::Revoked, id);
        counter!("iam_key_operations_total", "operation" => "revoke").increment(1);

        Ok(RevokeOutcome::revoked(id.clone()))
    }

    /// Get a point-in-time snapshot of an API key
    pub async fn get(&self, id: &ApiKeyId) -> Result<Option<ApiKey>, DomainError> {
        self.repository.get(id).await
    }

    /// List API keys, optionally restricted to one tenant
    pub async fn list(&self, tenant_id: Option<&TenantId>) -> Result<Vec<ApiKey>, DomainError> {
        self.repository.list(tenant_id).await
    }

    /// Count API keys, optionally restricted to one tenant
    pub async fn count(&self, tenant_id: Option<&TenantId>) -> Result<usize, DomainError> {
        self.repository.count(tenant_id).await
    }

    /// Check a plaintext secret against the stored hash
    ///
    /// Unknown and revoked keys never verify.
    pub async fn verify_secret(&self, id: &ApiKeyId, secret: &str) -> Result<bool, DomainError> {
        let Some(handle) = self.repository.handle(id).await? else {
            return Ok(false);
        };

        let key = handle.read().await;
        Ok(!key.is_revoked() && verify_secret(secret, key.secret_hash()))
    }

    async fn require_handle(&self, id: &ApiKeyId) -> Result<KeyHandle, DomainError> {
        self.repository
            .handle(id)
            .await?
            .ok_or_else(|| DomainError::key_not_found(id.as_str()))
    }

    fn emit(&self, kind: AuditEventKind, id: &ApiKeyId) {
        self.audit.append(AuditEvent::now(kind, id.clone()));
    }
}
