pub mod checks;
pub mod probes;
pub mod sigv4;
pub mod startup;

pub use checks::{HealthCheck, HealthCheckResult, HealthStatus, ProbeError, build_health_check};
pub use probes::{ProbeResponse, ProbeSummary, liveness_handler, readiness_handler};
pub use startup::{CheckRunner, LiveCheckRunner, StartupCheckRecord, StartupChecker, StartupReport};
