//! Cache infrastructure - decision cache, role membership and invalidation

mod decision_cache;
mod invalidation;
mod role_assignments;

pub use decision_cache::{DecisionCache, FillToken};
pub use invalidation::CacheInvalidationEngine;
pub use role_assignments::InMemoryRoleAssignments;
