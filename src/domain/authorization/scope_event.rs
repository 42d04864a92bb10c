//! Real-time scope changes (GRANT / REVOKE) applied to a key

use serde::{Deserialize, Serialize};

use crate::domain::api_key::{ApiKey, Permission};
use crate::domain::audit::AuditEventKind;

/// GRANT adds a permission to a key's scopes, REVOKE removes it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PermissionEventKind {
    Grant,
    Revoke,
}

impl PermissionEventKind {
    /// Audit kind emitted when an event of this kind is applied
    pub fn audit_kind(&self) -> AuditEventKind {
        match self {
            Self::Grant => AuditEventKind::ScopeGranted,
            Self::Revoke => AuditEventKind::ScopeRevoked,
        }
    }
}

/// A scope change for one key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionEvent {
    pub key_id: String,
    pub kind: PermissionEventKind,
    pub permission: Permission,
}

impl PermissionEvent {
    pub fn grant(key_id: impl Into<String>, permission: Permission) -> Self {
        Self {
            key_id: key_id.into(),
            kind: PermissionEventKind::Grant,
            permission,
        }
    }

    pub fn revoke(key_id: impl Into<String>, permission: Permission) -> Self {
        Self {
            key_id: key_id.into(),
            kind: PermissionEventKind::Revoke,
            permission,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeEventStatus {
    Updated,
    Ignored,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScopeEventReason {
    #[serde(rename = "granted")]
    Granted,
    #[serde(rename = "revoked")]
    Revoked,
    #[serde(rename = "key not found")]
    KeyNotFound,
    #[serde(rename = "key revoked")]
    KeyRevoked,
    #[serde(rename = "already present")]
    AlreadyPresent,
    #[serde(rename = "not present")]
    NotPresent,
}

impl ScopeEventReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Granted => "granted",
            Self::Revoked => "revoked",
            Self::KeyNotFound => "key not found",
            Self::KeyRevoked => "key revoked",
            Self::AlreadyPresent => "already present",
            Self::NotPresent => "not present",
        }
    }
}

impl std::fmt::Display for ScopeEventReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of applying a scope event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeEventOutcome {
    pub status: ScopeEventStatus,
    pub reason: ScopeEventReason,
}

impl ScopeEventOutcome {
    pub fn updated(reason: ScopeEventReason) -> Self {
        Self {
            status: ScopeEventStatus::Updated,
            reason,
        }
    }

    pub fn ignored(reason: ScopeEventReason) -> Self {
        Self {
            status: ScopeEventStatus::Ignored,
            reason,
        }
    }

    pub fn is_updated(&self) -> bool {
        self.status == ScopeEventStatus::Updated
    }
}

/// Apply a scope event to the key's state
///
/// Revoked keys absorb every event. Both kinds are idempotent: replaying an
/// applied event yields `ignored`.
pub fn apply_scope_event(
    key: Option<&mut ApiKey>,
    kind: PermissionEventKind,
    permission: &Permission,
) -> ScopeEventOutcome {
    let Some(key) = key else {
        return ScopeEventOutcome::ignored(ScopeEventReason::KeyNotFound);
    };

    if key.is_revoked() {
        return ScopeEventOutcome::ignored(ScopeEventReason::KeyRevoked);
    }

    match kind {
        PermissionEventKind::Revoke => {
            if key.remove_scope(permission) {
                ScopeEventOutcome::updated(ScopeEventReason::Revoked)
            } else {
                ScopeEventOutcome::ignored(ScopeEventReason::NotPresent)
            }
        }
        PermissionEventKind::Grant => {
            if key.add_scope(permission.clone()) {
                ScopeEventOutcome::updated(ScopeEventReason::Granted)
            } else {
                ScopeEventOutcome::ignored(ScopeEventReason::AlreadyPresent)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::api_key::{ApiKeyId, TenantId};

    fn perm(value: &str) -> Permission {
        Permission::new(value).unwrap()
    }

    fn test_key() -> ApiKey {
        ApiKey::new(
            ApiKeyId::new("sk_live_abc").unwrap(),
            "sha256$abc",
            [perm("payments:create"), perm("invoices:read")],
            TenantId::new("acme_corp").unwrap(),
        )
    }

    #[test]
    fn test_revoke_then_replay() {
        let mut key = test_key();
        let permission = perm("payments:create");

        let first = apply_scope_event(Some(&mut key), PermissionEventKind::Revoke, &permission);
        assert_eq!(first, ScopeEventOutcome::updated(ScopeEventReason::Revoked));
        assert!(!key.has_scope("payments:create"));

        let second = apply_scope_event(Some(&mut key), PermissionEventKind::Revoke, &permission);
        assert_eq!(second, ScopeEventOutcome::ignored(ScopeEventReason::NotPresent));
    }

    #[test]
    fn test_grant_then_replay() {
        let mut key = test_key();
        let permission = perm("customers:write");

        let first = apply_scope_event(Some(&mut key), PermissionEventKind::Grant, &permission);
        assert_eq!(first, ScopeEventOutcome::updated(ScopeEventReason::Granted));
        assert!(key.has_scope("customers:write"));

        let second = apply_scope_event(Some(&mut key), PermissionEventKind::Grant, &permission);
        assert_eq!(
            second,
            ScopeEventOutcome::ignored(ScopeEventReason::AlreadyPresent)
        );
        assert_eq!(key.scopes().len(), 3);
    }

    #[test]
    fn test_missing_key_is_ignored() {
        let outcome = apply_scope_event(None, PermissionEventKind::Grant, &perm("a"));
        assert_eq!(outcome, ScopeEventOutcome::ignored(ScopeEventReason::KeyNotFound));
    }

    #[test]
    fn test_revoked_key_absorbs_events() {
        let mut key = test_key();
        key.revoke();

        for _ in 0..3 {
            for kind in [PermissionEventKind::Grant, PermissionEventKind::Revoke] {
                let outcome = apply_scope_event(Some(&mut key), kind, &perm("payments:create"));
                assert_eq!(outcome, ScopeEventOutcome::ignored(ScopeEventReason::KeyRevoked));
            }
        }
        assert_eq!(key.scopes().len(), 2);
    }

    #[test]
    fn test_event_deserialization() {
        let event: PermissionEvent = serde_json::from_str(
            r#"{"key_id": "sk_live_abc", "kind": "GRANT", "permission": "customers:write"}"#,
        )
        .unwrap();

        assert_eq!(event.kind, PermissionEventKind::Grant);
        assert_eq!(event.permission.as_str(), "customers:write");
    }

    #[test]
    fn test_outcome_serialization() {
        let json =
            serde_json::to_value(ScopeEventOutcome::ignored(ScopeEventReason::KeyRevoked)).unwrap();

        assert_eq!(json["status"], "ignored");
        assert_eq!(json["reason"], "key revoked");
    }
}
