use super::checks::HealthStatus;
use super::startup::StartupReport;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use std::sync::Arc;

pub const READY_BODY: &str = "OK";
pub const NOT_READY_BODY: &str = "Startup checks failed";

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ProbeSummary {
    pub total_checks: usize,
    pub healthy: usize,
    pub unhealthy: usize,
    pub skipped: usize,
}

impl ProbeSummary {
    fn from_report(report: &StartupReport) -> Self {
        let count = |status: HealthStatus| {
            report
                .checks
                .iter()
                .filter(|c| c.result.status == status)
                .count()
        };

        Self {
            total_checks: report.checks.len(),
            healthy: count(HealthStatus::Healthy),
            unhealthy: count(HealthStatus::Unhealthy),
            skipped: count(HealthStatus::Skipped),
        }
    }
}

/// Detailed view of the startup report
#[derive(Debug, Clone, Serialize)]
pub struct ProbeResponse {
    pub summary: ProbeSummary,
    #[serde(flatten)]
    pub report: StartupReport,
}

impl ProbeResponse {
    pub fn new(report: &StartupReport) -> Self {
        Self {
            summary: ProbeSummary::from_report(report),
            report: report.clone(),
        }
    }

    pub fn http_status_code(&self) -> StatusCode {
        readiness_status(&self.report)
    }
}

impl IntoResponse for ProbeResponse {
    fn into_response(self) -> Response {
        let status = self.http_status_code();
        (status, Json(self)).into_response()
    }
}

fn readiness_status(report: &StartupReport) -> StatusCode {
    if report.is_ready() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

/// Liveness probe - the process is up and serving
pub async fn liveness_handler() -> (StatusCode, &'static str) {
    (StatusCode::OK, READY_BODY)
}

/// Readiness probe - the startup verdict, fixed for the process lifetime
pub async fn readiness_handler(
    State(report): State<Arc<StartupReport>>,
) -> (StatusCode, &'static str) {
    let status = readiness_status(&report);
    if report.is_ready() {
        (status, READY_BODY)
    } else {
        (status, NOT_READY_BODY)
    }
}

pub async fn startup_report_handler(State(report): State<Arc<StartupReport>>) -> ProbeResponse {
    ProbeResponse::new(&report)
}
