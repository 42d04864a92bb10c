//! Cache Invalidation Engine

use std::sync::Arc;
use std::time::Duration;

use metrics::{counter, gauge};
use tracing::info;

use crate::domain::cache::{
    DEFAULT_INVALIDATION_WINDOW, InvalidationMetrics, RoleAssignments, RolePermissionRemoved,
    invalidate,
};

use super::decision_cache::DecisionCache;

/// Purges cached decisions invalidated by a role losing a permission
pub struct CacheInvalidationEngine {
    cache: Arc<DecisionCache>,
    role_assignments: Arc<dyn RoleAssignments>,
    window: Duration,
}

impl std::fmt::Debug for CacheInvalidationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheInvalidationEngine")
            .field("cache_entries", &self.cache.len())
            .field("window", &self.window)
            .finish_non_exhaustive()
    }
}

impl CacheInvalidationEngine {
    pub fn new(cache: Arc<DecisionCache>, role_assignments: Arc<dyn RoleAssignments>) -> Self {
        Self {
            cache,
            role_assignments,
            window: DEFAULT_INVALIDATION_WINDOW,
        }
    }

    /// Set the window `invalidations_per_window` is measured over
    pub fn with_window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }

    pub fn cache(&self) -> &Arc<DecisionCache> {
        &self.cache
    }

    /// Remove every `(principal, permission)` entry whose principal holds the role
    pub fn invalidate(&self, event: &RolePermissionRemoved) -> InvalidationMetrics {
        let metrics = self.cache.replace_with(|entries| {
            let result = invalidate(entries, event, self.role_assignments.as_ref(), self.window);
            let next = (result.metrics.invalidations > 0).then_some(result.cache);
            (next, result.metrics)
        });

        counter!("iam_cache_invalidations_total").increment(metrics.invalidations as u64);
        gauge!("iam_decision_cache_entries").set(metrics.cache_size_after as f64);

        info!(
            role_id = %event.role_id,
            permission = %event.permission,
            invalidations = metrics.invalidations,
            cache_size_after = metrics.cache_size_after,
            "Decision cache invalidated"
        );

        metrics
    }
}
