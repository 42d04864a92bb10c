//! Exact purge of decision cache entries after a role loses a permission

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::key::{CacheKey, RoleId};
use super::role_assignments::RoleAssignments;
use crate::domain::api_key::Permission;
use crate::domain::authorization::DecisionKind;

/// Cached decisions keyed by (principal, permission)
pub type DecisionCacheEntries = HashMap<CacheKey, DecisionKind>;

/// Default measurement window for `invalidations_per_window`
pub const DEFAULT_INVALIDATION_WINDOW: Duration = Duration::from_secs(1);

/// A role stopped granting a permission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RolePermissionRemoved {
    pub role_id: RoleId,
    pub permission: Permission,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl RolePermissionRemoved {
    pub fn new(role_id: RoleId, permission: Permission) -> Self {
        Self {
            role_id,
            permission,
            timestamp: None,
        }
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }
}

/// Derived metrics for one invalidation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InvalidationMetrics {
    pub invalidations: usize,
    pub cache_size_after: usize,
    pub invalidations_per_window: f64,
}

impl InvalidationMetrics {
    pub fn new(invalidations: usize, cache_size_after: usize, window: Duration) -> Self {
        let window_secs = window.as_secs_f64();
        let invalidations_per_window = if window_secs > 0.0 {
            invalidations as f64 / window_secs
        } else {
            0.0
        };

        Self {
            invalidations,
            cache_size_after,
            invalidations_per_window,
        }
    }
}

/// New cache state plus metrics
#[derive(Debug, Clone)]
pub struct InvalidationResult {
    pub cache: DecisionCacheEntries,
    pub metrics: InvalidationMetrics,
}

/// Compute the cache that results from `event`
///
/// Removes `(p, perm)` iff `p` holds `event.role_id` (among any other roles)
/// and `perm == event.permission`. Everything else is carried over untouched.
/// Pure: the input cache is not modified. Revocation state of the principals
/// is not consulted.
pub fn invalidate(
    cache: &DecisionCacheEntries,
    event: &RolePermissionRemoved,
    role_assignments: &dyn RoleAssignments,
    window: Duration,
) -> InvalidationResult {
    let affected = role_assignments.members_of(&event.role_id);

    let retained: DecisionCacheEntries = if affected.is_empty() {
        cache.clone()
    } else {
        cache
            .iter()
            .filter(|(key, _)| {
                !(key.permission == event.permission && affected.contains(&key.principal_id))
            })
            .map(|(key, decision)| (key.clone(), *decision))
            .collect()
    };

    let invalidations = cache.len() - retained.len();
    let metrics = InvalidationMetrics::new(invalidations, retained.len(), window);

    InvalidationResult {
        cache: retained,
        metrics,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::cache::{MockRoleAssignments, PrincipalId};
    use mockall::predicate::eq;
    use std::collections::HashSet;

    fn key(principal: &str, permission: &str) -> CacheKey {
        CacheKey::new(
            PrincipalId::new(principal).unwrap(),
            Permission::new(permission).unwrap(),
        )
    }

    fn members(ids: &[&str]) -> HashSet<PrincipalId> {
        ids.iter().map(|id| PrincipalId::new(*id).unwrap()).collect()
    }

    fn event(role: &str, permission: &str) -> RolePermissionRemoved {
        RolePermissionRemoved::new(RoleId::new(role).unwrap(), Permission::new(permission).unwrap())
    }

    fn role_dev_assignments(principals: &[&str]) -> MockRoleAssignments {
        let principals = members(principals);
        let mut mock = MockRoleAssignments::new();
        mock.expect_members_of()
            .with(eq(RoleId::new("role_dev").unwrap()))
            .times(1)
            .returning(move |_| principals.clone());
        mock
    }

    #[test]
    fn test_exact_purge() {
        let cache: DecisionCacheEntries = [
            (key("a", "pay"), DecisionKind::Allow),
            (key("a", "inv"), DecisionKind::Allow),
            (key("b", "pay"), DecisionKind::Allow),
            (key("c", "pay"), DecisionKind::Allow),
        ]
        .into_iter()
        .collect();

        let result = invalidate(
            &cache,
            &event("role_dev", "pay"),
            &role_dev_assignments(&["a", "b"]),
            DEFAULT_INVALIDATION_WINDOW,
        );

        let expected: DecisionCacheEntries = [
            (key("a", "inv"), DecisionKind::Allow),
            (key("c", "pay"), DecisionKind::Allow),
        ]
        .into_iter()
        .collect();

        assert_eq!(result.cache, expected);
        assert_eq!(result.metrics.invalidations, 2);
        assert_eq!(result.metrics.cache_size_after, 2);
        assert_eq!(result.metrics.invalidations_per_window, 2.0);
        // input untouched
        assert_eq!(cache.len(), 4);
    }

    #[test]
    fn test_deny_entries_are_purged_too() {
        let cache: DecisionCacheEntries = [(key("a", "pay"), DecisionKind::Deny)]
            .into_iter()
            .collect();

        let result = invalidate(
            &cache,
            &event("role_dev", "pay"),
            &role_dev_assignments(&["a"]),
            DEFAULT_INVALIDATION_WINDOW,
        );

        assert!(result.cache.is_empty());
        assert_eq!(result.metrics.invalidations, 1);
    }

    #[test]
    fn test_role_without_members() {
        let cache: DecisionCacheEntries = [(key("a", "pay"), DecisionKind::Allow)]
            .into_iter()
            .collect();

        let result = invalidate(
            &cache,
            &event("role_dev", "pay"),
            &role_dev_assignments(&[]),
            DEFAULT_INVALIDATION_WINDOW,
        );

        assert_eq!(result.cache, cache);
        assert_eq!(result.metrics.invalidations, 0);
        assert_eq!(result.metrics.cache_size_after, 1);
    }

    #[test]
    fn test_permission_not_cached() {
        let cache: DecisionCacheEntries = [(key("a", "inv"), DecisionKind::Allow)]
            .into_iter()
            .collect();

        let result = invalidate(
            &cache,
            &event("role_dev", "pay"),
            &role_dev_assignments(&["a"]),
            DEFAULT_INVALIDATION_WINDOW,
        );

        assert_eq!(result.cache, cache);
        assert_eq!(result.metrics.invalidations, 0);
    }

    #[test]
    fn test_empty_cache() {
        let result = invalidate(
            &DecisionCacheEntries::new(),
            &event("role_dev", "pay"),
            &role_dev_assignments(&["a"]),
            DEFAULT_INVALIDATION_WINDOW,
        );

        assert!(result.cache.is_empty());
        assert_eq!(result.metrics.invalidations, 0);
        assert_eq!(result.metrics.cache_size_after, 0);
    }

    #[test]
    fn test_permission_match_is_exact() {
        let cache: DecisionCacheEntries = [
            (key("a", "payments:create"), DecisionKind::Allow),
            (key("a", "create"), DecisionKind::Allow),
        ]
        .into_iter()
        .collect();

        let result = invalidate(
            &cache,
            &event("role_dev", "create"),
            &role_dev_assignments(&["a"]),
            DEFAULT_INVALIDATION_WINDOW,
        );

        assert_eq!(result.metrics.invalidations, 1);
        assert!(result.cache.contains_key(&key("a", "payments:create")));
    }

    #[test]
    fn test_metrics_window() {
        let metrics = InvalidationMetrics::new(10, 5, Duration::from_secs(4));
        assert_eq!(metrics.invalidations_per_window, 2.5);

        let zero = InvalidationMetrics::new(10, 5, Duration::ZERO);
        assert_eq!(zero.invalidations_per_window, 0.0);
    }
}
