//! Role assignment lookup collaborator

use std::collections::HashSet;

#[cfg(test)]
use mockall::automock;

use super::key::{PrincipalId, RoleId};

/// Read-only view of principal -> roles assignments
#[cfg_attr(test, automock)]
pub trait RoleAssignments: Send + Sync {
    /// Every principal whose role set contains `role_id`
    fn members_of(&self, role_id: &RoleId) -> HashSet<PrincipalId>;
}
