//! Decision cache keys

use serde::{Deserialize, Serialize};

use crate::domain::api_key::{ApiKeyId, Permission};
use crate::domain::identifier::{define_identifier, validate_identifier};

const MAX_PRINCIPAL_ID_LENGTH: usize = 128;
const MAX_ROLE_ID_LENGTH: usize = 128;

define_identifier!(
    /// The entity (API key or user) a request acts on behalf of
    PrincipalId,
    |value| validate_identifier("Principal ID", value, MAX_PRINCIPAL_ID_LENGTH)
);

define_identifier!(
    /// Role identifier, e.g. `role_dev`
    RoleId,
    |value| validate_identifier("Role ID", value, MAX_ROLE_ID_LENGTH)
);

impl From<&ApiKeyId> for PrincipalId {
    fn from(id: &ApiKeyId) -> Self {
        // Key ids are a strict subset of principal ids
        Self(id.as_str().to_string())
    }
}

/// Composite cache key
///
/// Kept structured so identifiers containing ':' can never collide.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CacheKey {
    pub principal_id: PrincipalId,
    pub permission: Permission,
}

impl CacheKey {
    pub fn new(principal_id: PrincipalId, permission: Permission) -> Self {
        Self {
            principal_id,
            permission,
        }
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.principal_id, self.permission)
    }
}
