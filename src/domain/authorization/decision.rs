//! Request-time authorization decisions

use serde::{Deserialize, Serialize};

use crate::domain::api_key::{ApiKey, ApiKeyId};

/// Inbound authorization question: can `key_id` perform `action` in `tenant_id`?
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationRequest {
    pub key_id: String,
    pub action: String,
    pub tenant_id: String,
}

impl AuthorizationRequest {
    pub fn new(
        key_id: impl Into<String>,
        action: impl Into<String>,
        tenant_id: impl Into<String>,
    ) -> Self {
        Self {
            key_id: key_id.into(),
            action: action.into(),
            tenant_id: tenant_id.into(),
        }
    }

    /// The key id, if it is well-formed
    pub fn parsed_key_id(&self) -> Option<ApiKeyId> {
        ApiKeyId::new(self.key_id.as_str()).ok()
    }
}

/// ALLOW or DENY
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DecisionKind {
    Allow,
    Deny,
}

impl DecisionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Allow => "ALLOW",
            Self::Deny => "DENY",
        }
    }
}

impl std::fmt::Display for DecisionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a decision was reached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DecisionReason {
    #[serde(rename = "action granted")]
    ActionGranted,
    #[serde(rename = "key not found")]
    KeyNotFound,
    #[serde(rename = "tenant mismatch")]
    TenantMismatch,
    #[serde(rename = "key revoked")]
    KeyRevoked,
    #[serde(rename = "action not granted")]
    ActionNotGranted,
}

impl DecisionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ActionGranted => "action granted",
            Self::KeyNotFound => "key not found",
            Self::TenantMismatch => "tenant mismatch",
            Self::KeyRevoked => "key revoked",
            Self::ActionNotGranted => "action not granted",
        }
    }
}

impl std::fmt::Display for DecisionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of an authorization check. DENY is a normal result, never an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    pub decision: DecisionKind,
    pub reason: DecisionReason,
}

impl Decision {
    pub fn allow() -> Self {
        Self {
            decision: DecisionKind::Allow,
            reason: DecisionReason::ActionGranted,
        }
    }

    pub fn deny(reason: DecisionReason) -> Self {
        Self {
            decision: DecisionKind::Deny,
            reason,
        }
    }

    pub fn is_allowed(&self) -> bool {
        self.decision == DecisionKind::Allow
    }

    /// Whether the decision was reached by the scope check, i.e. tenant and
    /// revocation checks already passed
    pub fn is_scope_level(&self) -> bool {
        matches!(
            self.reason,
            DecisionReason::ActionGranted | DecisionReason::ActionNotGranted
        )
    }
}

/// Evaluate a request against the key's current state
///
/// The order is fixed and short-circuits: existence, tenant binding,
/// revocation, scope membership. Tenant is checked before scope so a
/// wrong-tenant request never learns anything about the key's scopes.
pub fn evaluate(request: &AuthorizationRequest, key: Option<&ApiKey>) -> Decision {
    let Some(key) = key else {
        return Decision::deny(DecisionReason::KeyNotFound);
    };

    if key.tenant_id().as_str() != request.tenant_id {
        return Decision::deny(DecisionReason::TenantMismatch);
    }

    if key.is_revoked() {
        return Decision::deny(DecisionReason::KeyRevoked);
    }

    if !key.has_scope(&request.action) {
        return Decision::deny(DecisionReason::ActionNotGranted);
    }

    Decision::allow()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::api_key::{Permission, TenantId};

    fn test_key() -> ApiKey {
        ApiKey::new(
            ApiKeyId::new("sk_live_abc").unwrap(),
            "sha256$abc",
            [
                Permission::new("payments:create").unwrap(),
                Permission::new("invoices:read").unwrap(),
            ],
            TenantId::new("acme_corp").unwrap(),
        )
    }

    #[test]
    fn test_allow_when_in_scope() {
        let key = test_key();
        let request = AuthorizationRequest::new("sk_live_abc", "payments:create", "acme_corp");

        let decision = evaluate(&request, Some(&key));
        assert_eq!(decision, Decision::allow());
        assert!(decision.is_allowed());
    }

    #[test]
    fn test_deny_key_not_found() {
        let request = AuthorizationRequest::new("sk_live_xyz", "payments:create", "acme_corp");

        let decision = evaluate(&request, None);
        assert_eq!(decision, Decision::deny(DecisionReason::KeyNotFound));
    }

    #[test]
    fn test_deny_action_not_granted() {
        let key = test_key();
        let request = AuthorizationRequest::new("sk_live_abc", "customers:write", "acme_corp");

        let decision = evaluate(&request, Some(&key));
        assert_eq!(decision.decision, DecisionKind::Deny);
        assert_eq!(decision.reason, DecisionReason::ActionNotGranted);
    }

    #[test]
    fn test_tenant_checked_before_scope() {
        let key = test_key();
        let request = AuthorizationRequest::new("sk_live_abc", "customers:write", "beta_inc");

        let decision = evaluate(&request, Some(&key));
        assert_eq!(decision.reason, DecisionReason::TenantMismatch);
    }

    #[test]
    fn test_tenant_checked_before_revocation() {
        let mut key = test_key();
        key.revoke();
        let request = AuthorizationRequest::new("sk_live_abc", "payments:create", "beta_inc");

        let decision = evaluate(&request, Some(&key));
        assert_eq!(decision.reason, DecisionReason::TenantMismatch);
    }

    #[test]
    fn test_deny_revoked_before_scope() {
        let mut key = test_key();
        key.revoke();

        let in_scope = AuthorizationRequest::new("sk_live_abc", "payments:create", "acme_corp");
        let out_of_scope = AuthorizationRequest::new("sk_live_abc", "customers:write", "acme_corp");

        assert_eq!(
            evaluate(&in_scope, Some(&key)).reason,
            DecisionReason::KeyRevoked
        );
        assert_eq!(
            evaluate(&out_of_scope, Some(&key)).reason,
            DecisionReason::KeyRevoked
        );
    }

    #[test]
    fn test_decision_serialization() {
        let json = serde_json::to_value(Decision::deny(DecisionReason::TenantMismatch)).unwrap();

        assert_eq!(json["decision"], "DENY");
        assert_eq!(json["reason"], "tenant mismatch");
    }

    #[test]
    fn test_scope_level() {
        assert!(Decision::allow().is_scope_level());
        assert!(Decision::deny(DecisionReason::ActionNotGranted).is_scope_level());
        assert!(!Decision::deny(DecisionReason::TenantMismatch).is_scope_level());
        assert!(!Decision::deny(DecisionReason::KeyRevoked).is_scope_level());
    }
}
