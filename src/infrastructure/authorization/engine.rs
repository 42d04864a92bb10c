//! Decision Engine
//!
//! Answers authorization requests against live key state and applies
//! real-time scope events to it.

use std::sync::Arc;

use metrics::counter;
use tracing::{debug, info};

use crate::domain::DomainError;
use crate::domain::api_key::{ApiKeyId, ApiKeyRepository, KeyHandle, Permission};
use crate::domain::audit::{AuditEvent, AuditSink};
use crate::domain::authorization::{
    AuthorizationRequest, Decision, PermissionEvent, ScopeEventOutcome, ScopeEventReason,
    apply_scope_event, evaluate,
};
use crate::domain::cache::{CacheKey, PrincipalId};
use crate::infrastructure::cache::DecisionCache;

/// Decision Engine over the keys of a repository
///
/// Decisions are always evaluated against the key record. The decision cache
/// is only filled here, never read, because its entries are not tenant-bound.
pub struct DecisionEngine<R>
where
    R: ApiKeyRepository,
{
    repository: Arc<R>,
    cache: Arc<DecisionCache>,
    audit: Arc<dyn AuditSink>,
}

impl<R: ApiKeyRepository> std::fmt::Debug for DecisionEngine<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecisionEngine")
            .field("repository", &self.repository)
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

impl<R: ApiKeyRepository> DecisionEngine<R> {
    pub fn new(repository: Arc<R>, cache: Arc<DecisionCache>, audit: Arc<dyn AuditSink>) -> Self {
        Self {
            repository,
            cache,
            audit,
        }
    }

    /// Decide whether the request's key may perform its action in its tenant
    pub async fn authorize(&self, request: &AuthorizationRequest) -> Result<Decision, DomainError> {
        // Taken before reading key state so a concurrent purge voids the fill
        let token = self.cache.begin_fill();

        let key_id = request.parsed_key_id();
        let handle = self.lookup(key_id.as_ref()).await?;

        let decision = match &handle {
            Some(handle) => {
                let key = handle.read().await;
                evaluate(request, Some(&*key))
            }
            None => evaluate(request, None),
        };

        counter!(
            "iam_authorization_decisions_total",
            "decision" => decision.decision.as_str(),
            "reason" => decision.reason.as_str()
        )
        .increment(1);

        if decision.is_scope_level() {
            if let (Some(key_id), Ok(permission)) = (&key_id, Permission::new(&request.action)) {
                let cache_key = CacheKey::new(PrincipalId::from(key_id), permission);
                self.cache.fill(token, cache_key, decision.decision);
            }
        }

        debug!(
            key_id = %request.key_id,
            action = %request.action,
            tenant_id = %request.tenant_id,
            decision = %decision.decision,
            reason = %decision.reason,
            "Authorization decided"
        );

        Ok(decision)
    }

    /// Apply a GRANT or REVOKE to a key's scopes
    ///
    /// Serialized with revocation on the key's write lock. An update emits its
    /// audit event and purges the cached decision for `(key, permission)`.
    pub async fn apply_permission_event(
        &self,
        event: &PermissionEvent,
    ) -> Result<ScopeEventOutcome, DomainError> {
        let key_id = ApiKeyId::new(event.key_id.as_str()).ok();
        let Some(handle) = self.lookup(key_id.as_ref()).await? else {
            let outcome = ScopeEventOutcome::ignored(ScopeEventReason::KeyNotFound);
            self.record_scope_event(event, &outcome);
            return Ok(outcome);
        };

        let mut key = handle.write().await;
        let outcome = apply_scope_event(Some(&mut *key), event.kind, &event.permission);

        if outcome.is_updated() {
            self.audit
                .append(AuditEvent::now(event.kind.audit_kind(), key.public_id().clone()));
            self.cache.remove(&CacheKey::new(
                PrincipalId::from(key.public_id()),
                event.permission.clone(),
            ));
        }
        drop(key);

        self.record_scope_event(event, &outcome);
        Ok(outcome)
    }

    async fn lookup(&self, key_id: Option<&ApiKeyId>) -> Result<Option<KeyHandle>, DomainError> {
        match key_id {
            Some(id) => self.repository.handle(id).await,
            None => Ok(None),
        }
    }

    fn record_scope_event(&self, event: &PermissionEvent, outcome: &ScopeEventOutcome) {
        counter!(
            "iam_scope_events_total",
            "status" => if outcome.is_updated() { "updated" } else { "ignored" },
            "reason" => outcome.reason.as_str()
        )
        .increment(1);

        info!(
            key_id = %event.key_id,
            kind = ?event.kind,
            permission = %event.permission,
            reason = %outcome.reason,
            updated = outcome.is_updated(),
            "Scope event applied"
        );
    }
}
