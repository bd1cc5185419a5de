use crate::health::StartupReport;
use crate::health::probes::{liveness_handler, readiness_handler, startup_report_handler};
use crate::metrics::metrics_handler;
use crate::middleware::track_requests;
use axum::{Router, routing::get};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub const READINESS_PATH: &str = "/readiness-health";
pub const LIVENESS_PATH: &str = "/liveness-health";
pub const STARTUP_REPORT_PATH: &str = "/startup-report";
pub const METRICS_PATH: &str = "/metrics";

/// Build the service router around a finished startup report
pub fn router(report: Arc<StartupReport>) -> Router {
    Router::new()
        .route(READINESS_PATH, get(readiness_handler))
        .route(LIVENESS_PATH, get(liveness_handler))
        .route(STARTUP_REPORT_PATH, get(startup_report_handler))
        .route(METRICS_PATH, get(metrics_handler))
        .route_layer(axum::middleware::from_fn(track_requests))
        .with_state(report)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
