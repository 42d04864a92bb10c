//! Prometheus metrics infrastructure
//!
//! Components record through the `metrics` facade; without an installed
//! recorder those calls are no-ops.

use std::sync::Arc;

use metrics::{describe_counter, describe_gauge, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::config::MetricsConfig;

/// Handle for rendering recorded metrics in the Prometheus text format
#[derive(Clone)]
pub struct PrometheusMetrics {
    handle: Arc<PrometheusHandle>,
}

impl PrometheusMetrics {
    pub fn render(&self) -> String {
        self.handle.render()
    }
}

/// Install the global Prometheus recorder
pub fn init_metrics(config: &MetricsConfig) -> Option<PrometheusMetrics> {
    if !config.enabled {
        tracing::info!("Prometheus metrics disabled");
        return None;
    }

    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            register_default_metrics();
            tracing::info!("Prometheus metrics initialized");

            Some(PrometheusMetrics {
                handle: Arc::new(handle),
            })
        }
        Err(e) => {
            tracing::error!("Failed to initialize Prometheus metrics: {}", e);
            None
        }
    }
}

fn register_default_metrics() {
    describe_counter!(
        "iam_authorization_decisions_total",
        "Authorization decisions by decision and reason"
    );
    describe_counter!(
        "iam_scope_events_total",
        "Scope events by status and reason"
    );
    describe_counter!(
        "iam_key_operations_total",
        "Completed key lifecycle operations"
    );
    describe_counter!(
        "iam_cache_invalidations_total",
        "Decision cache entries removed by role invalidation"
    );
    describe_counter!(
        "iam_audit_events_dropped_total",
        "Audit events lost to a full or closed queue"
    );
    describe_gauge!(
        "iam_decision_cache_entries",
        "Decision cache size after the last invalidation"
    );

    gauge!("iam_key_core_info", "version" => env!("CARGO_PKG_VERSION")).set(1.0);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_metrics_install_nothing() {
        let config = MetricsConfig { enabled: false };

        assert!(init_metrics(&config).is_none());
    }
}
