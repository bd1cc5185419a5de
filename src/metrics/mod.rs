pub mod prometheus_metrics;

pub use prometheus_metrics::{
    METRICS_REGISTRY, MetricsRegistry, metrics_handler, record_request, record_startup_check,
    record_startup_ready,
};
