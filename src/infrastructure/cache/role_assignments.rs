//! In-memory role assignments

use std::collections::{HashMap, HashSet};

use serde::Deserialize;

use crate::domain::cache::{PrincipalId, RoleAssignments, RoleId};

/// Principal -> roles mapping held in memory
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct InMemoryRoleAssignments {
    roles_by_principal: HashMap<PrincipalId, HashSet<RoleId>>,
}

impl InMemoryRoleAssignments {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a role to a principal
    pub fn assign(mut self, principal_id: PrincipalId, role_id: RoleId) -> Self {
        self.roles_by_principal
            .entry(principal_id)
            .or_default()
            .insert(role_id);
        self
    }

    /// Roles held by a principal
    pub fn roles_of(&self, principal_id: &PrincipalId) -> Option<&HashSet<RoleId>> {
        self.roles_by_principal.get(principal_id)
    }

    pub fn principal_count(&self) -> usize {
        self.roles_by_principal.len()
    }
}

impl From<HashMap<PrincipalId, HashSet<RoleId>>> for InMemoryRoleAssignments {
    fn from(roles_by_principal: HashMap<PrincipalId, HashSet<RoleId>>) -> Self {
        Self { roles_by_principal }
    }
}

impl RoleAssignments for InMemoryRoleAssignments {
    fn members_of(&self, role_id: &RoleId) -> HashSet<PrincipalId> {
        self.roles_by_principal
            .iter()
            .filter(|(_, roles)| roles.contains(role_id))
            .map(|(principal, _)| principal.clone())
            .collect()
    }
}
