//! API Key entity and related types

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::identifier::{define_identifier, validate_identifier, validate_key_id};

const MAX_KEY_ID_LENGTH: usize = 64;
const MAX_TENANT_ID_LENGTH: usize = 64;
const MAX_PERMISSION_LENGTH: usize = 128;

define_identifier!(
    /// Public API key identifier - prefix plus random suffix (e.g. `sk_live_4f1c09aa...`)
    ApiKeyId,
    |value| validate_key_id(value, MAX_KEY_ID_LENGTH)
);

define_identifier!(
    /// Tenant isolation boundary a key is bound to
    TenantId,
    |value| validate_identifier("Tenant ID", value, MAX_TENANT_ID_LENGTH)
);

define_identifier!(
    /// A single allowed action, e.g. `payments:create`
    Permission,
    |value| validate_identifier("Permission", value, MAX_PERMISSION_LENGTH)
);

/// Plaintext API key secret
///
/// Handed to the caller exactly once. Not `Clone`, and redacted in `Debug` output.
#[derive(Serialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    pub(crate) fn new(value: String) -> Self {
        Self(value)
    }

    /// Access the plaintext value
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Secret(***)")
    }
}

/// API Key entity
///
/// Revocation is terminal: once revoked, the secret hash and scopes are frozen.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiKey {
    /// Public identifier
    public_id: ApiKeyId,
    /// One-way hash of the current secret, `sha256$<hex>`
    secret_hash: String,
    /// Granted scopes
    scopes: BTreeSet<Permission>,
    /// Tenant the key is bound to
    tenant_id: TenantId,
    /// Whether the key has been revoked
    revoked: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    rotated_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    revoked_at: Option<DateTime<Utc>>,
}

impl ApiKey {
    /// Create a new, active API key
    pub fn new(
        public_id: ApiKeyId,
        secret_hash: impl Into<String>,
        scopes: impl IntoIterator<Item = Permission>,
        tenant_id: TenantId,
    ) -> Self {
        let now = Utc::now();

        Self {
            public_id,
            secret_hash: secret_hash.into(),
            scopes: scopes.into_iter().collect(),
            tenant_id,
            revoked: false,
            created_at: now,
            updated_at: now,
            rotated_at: None,
            revoked_at: None,
        }
    }

    // Getters

    pub fn public_id(&self) -> &ApiKeyId {
        &self.public_id
    }

    pub fn secret_hash(&self) -> &str {
        &self.secret_hash
    }

    pub fn scopes(&self) -> &BTreeSet<Permission> {
        &self.scopes
    }

    pub fn tenant_id(&self) -> &TenantId {
        &self.tenant_id
    }

    pub fn is_revoked(&self) -> bool {
        self.revoked
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn rotated_at(&self) -> Option<DateTime<Utc>> {
        self.rotated_at
    }

    pub fn revoked_at(&self) -> Option<DateTime<Utc>> {
        self.revoked_at
    }

    /// Check whether an action is covered by the key's scopes
    pub fn has_scope(&self, action: &str) -> bool {
        self.scopes.contains(action)
    }

    // Mutators

    /// Revoke the key. Returns `false` if it was already revoked.
    pub fn revoke(&mut self) -> bool {
        if self.revoked {
            return false;
        }

        let now = Utc::now();
        self.revoked = true;
        self.revoked_at = Some(now);
        self.updated_at = now;
        true
    }

    /// Replace the secret hash. Returns `false` (and changes nothing) on a revoked key.
    pub fn rotate_secret(&mut self, secret_hash: impl Into<String>) -> bool {
        if self.revoked {
            return false;
        }

        let now = Utc::now();
        self.secret_hash = secret_hash.into();
        self.rotated_at = Some(now);
        self.updated_at = now;
        true
    }

    /// Add a scope. Returns `false` if revoked or already present.
    pub fn add_scope(&mut self, permission: Permission) -> bool {
        if self.revoked || !self.scopes.insert(permission) {
            return false;
        }

        self.touch();
        true
    }

    /// Remove a scope. Returns `false` if revoked or not present.
    pub fn remove_scope(&mut self, permission: &Permission) -> bool {
        if self.revoked || !self.scopes.remove(permission) {
            return false;
        }

        self.touch();
        true
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn perm(value: &str) -> Permission {
        Permission::new(value).unwrap()
    }

    fn create_test_api_key(id: &str) -> ApiKey {
        ApiKey::new(
            ApiKeyId::new(id).unwrap(),
            "sha256$abc",
            [perm("payments:create"), perm("invoices:read")],
            TenantId::new("acme_corp").unwrap(),
        )
    }

    #[test]
    fn test_api_key_id_valid() {
        let id = ApiKeyId::new("sk_live_1a2b3c4d").unwrap();
        assert_eq!(id.as_str(), "sk_live_1a2b3c4d");
    }

    #[test]
    fn test_api_key_id_invalid() {
        assert!(ApiKeyId::new("").is_err());
        assert!(ApiKeyId::new("sk live").is_err());
        assert!(ApiKeyId::new("_key").is_err());
    }

    #[test]
    fn test_identifier_serde_validates() {
        let ok: TenantId = serde_json::from_str("\"acme_corp\"").unwrap();
        assert_eq!(ok.as_str(), "acme_corp");

        let err = serde_json::from_str::<Permission>("\"\"");
        assert!(err.is_err());
    }

    #[test]
    fn test_api_key_creation() {
        let key = create_test_api_key("sk_test_1");

        assert_eq!(key.public_id().as_str(), "sk_test_1");
        assert_eq!(key.tenant_id().as_str(), "acme_corp");
        assert_eq!(key.scopes().len(), 2);
        assert!(key.has_scope("payments:create"));
        assert!(!key.has_scope("customers:write"));
        assert!(!key.is_revoked());
        assert!(key.rotated_at().is_none());
    }

    #[test]
    fn test_duplicate_scopes_collapse() {
        let key = ApiKey::new(
            ApiKeyId::new("sk_test_1").unwrap(),
            "sha256$abc",
            [perm("a"), perm("a"), perm("b")],
            TenantId::new("t").unwrap(),
        );

        assert_eq!(key.scopes().len(), 2);
    }

    #[test]
    fn test_scope_mutation() {
        let mut key = create_test_api_key("sk_test_1");

        assert!(key.add_scope(perm("customers:write")));
        assert!(!key.add_scope(perm("customers:write")));
        assert!(key.remove_scope(&perm("customers:write")));
        assert!(!key.remove_scope(&perm("customers:write")));
    }

    #[test]
    fn test_revoke_is_terminal() {
        let mut key = create_test_api_key("sk_test_1");

        assert!(key.revoke());
        assert!(key.is_revoked());
        assert!(key.revoked_at().is_some());
        assert!(!key.revoke());
    }

    #[test]
    fn test_revoked_key_is_frozen() {
        let mut key = create_test_api_key("sk_test_1");
        key.revoke();

        assert!(!key.rotate_secret("sha256$new"));
        assert_eq!(key.secret_hash(), "sha256$abc");

        assert!(!key.add_scope(perm("customers:write")));
        assert!(!key.remove_scope(&perm("payments:create")));
        assert_eq!(key.scopes().len(), 2);
    }

    #[test]
    fn test_rotate_secret() {
        let mut key = create_test_api_key("sk_test_1");

        assert!(key.rotate_secret("sha256$new"));
        assert_eq!(key.secret_hash(), "sha256$new");
        assert!(key.rotated_at().is_some());
    }

    #[test]
    fn test_secret_debug_is_redacted() {
        let secret = Secret::new("deadbeef".to_string());
        assert_eq!(format!("{:?}", secret), "Secret(***)");
        assert_eq!(secret.expose(), "deadbeef");
        assert_eq!(serde_json::to_string(&secret).unwrap(), "\"deadbeef\"");
    }
}
