//! Observability infrastructure - Prometheus metrics

mod metrics;

pub use metrics::{PrometheusMetrics, init_metrics};
