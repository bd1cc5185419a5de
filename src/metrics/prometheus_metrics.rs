use crate::health::HealthStatus;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use lazy_static::lazy_static;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};
use std::sync::Arc;
use tracing::error;

lazy_static! {
    /// Global metrics registry
    pub static ref METRICS_REGISTRY: Arc<MetricsRegistry> = Arc::new(MetricsRegistry::new());
}

pub struct MetricsRegistry {
    pub registry: Registry,

    // HTTP metrics
    pub http_requests_total: IntCounterVec,
    pub http_request_duration_seconds: HistogramVec,

    // Startup check metrics
    pub startup_checks_total: IntCounterVec,
    pub startup_check_duration_seconds: HistogramVec,
    pub startup_ready: IntGauge,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        let registry = Registry::new();

        let http_requests_total = IntCounterVec::new(
            Opts::new("http_requests_total", "Total number of HTTP requests"),
            &["method", "path", "status"],
        )
        .unwrap();

        let http_request_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "http_request_duration_seconds",
                "HTTP request duration in seconds",
            )
            .buckets(vec![
                0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
            ]),
            &["method", "path"],
        )
        .unwrap();

        let startup_checks_total = IntCounterVec::new(
            Opts::new(
                "startup_checks_total",
                "Startup dependency checks by outcome",
            ),
            &["category", "type", "result"],
        )
        .unwrap();

        let startup_check_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "startup_check_duration_seconds",
                "Startup dependency check duration in seconds",
            )
            .buckets(vec![0.005, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
            &["type"],
        )
        .unwrap();

        let startup_ready = IntGauge::new(
            "startup_ready",
            "1 when every critical startup check passed",
        )
        .unwrap();

        registry
            .register(Box::new(http_requests_total.clone()))
            .unwrap();
        registry
            .register(Box::new(http_request_duration_seconds.clone()))
            .unwrap();
        registry
            .register(Box::new(startup_checks_total.clone()))
            .unwrap();
        registry
            .register(Box::new(startup_check_duration_seconds.clone()))
            .unwrap();
        registry.register(Box::new(startup_ready.clone())).unwrap();

        Self {
            registry,
            http_requests_total,
            http_request_duration_seconds,
            startup_checks_total,
            startup_check_duration_seconds,
            startup_ready,
        }
    }

    /// Render metrics in Prometheus text format
    pub fn render(&self) -> Result<String, Box<dyn std::error::Error>> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = vec![];
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

pub fn record_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    METRICS_REGISTRY
        .http_requests_total
        .with_label_values(&[method, path, &status.to_string()])
        .inc();
    METRICS_REGISTRY
        .http_request_duration_seconds
        .with_label_values(&[method, path])
        .observe(duration_secs);
}

pub fn record_startup_check(
    category: &str,
    check_type: &str,
    status: HealthStatus,
    duration_ms: u64,
) {
    let result = status.to_string();
    METRICS_REGISTRY
        .startup_checks_total
        .with_label_values(&[category, check_type, &result])
        .inc();

    if status != HealthStatus::Skipped {
        METRICS_REGISTRY
            .startup_check_duration_seconds
            .with_label_values(&[check_type])
            .observe(duration_ms as f64 / 1000.0);
    }
}

pub fn record_startup_ready(ready: bool) {
    METRICS_REGISTRY.startup_ready.set(i64::from(ready));
}

/// `GET /metrics`
pub async fn metrics_handler() -> Response {
    match METRICS_REGISTRY.render() {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(e) => {
            error!("Failed to render metrics: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
