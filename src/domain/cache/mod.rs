//! Cache domain - decision cache keys, role membership and exact invalidation

mod invalidation;
mod key;
mod role_assignments;

pub use invalidation::{
    DEFAULT_INVALIDATION_WINDOW, DecisionCacheEntries, InvalidationMetrics, InvalidationResult,
    RolePermissionRemoved, invalidate,
};
pub use key::{CacheKey, PrincipalId, RoleId};
pub use role_assignments::RoleAssignments;

#[cfg(test)]
pub use role_assignments::MockRoleAssignments;
