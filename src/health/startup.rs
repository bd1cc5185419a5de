use super::checks::{HealthCheckResult, HealthStatus, build_health_check};
use crate::config::ConfigError;
use crate::metrics;
use crate::models::{CheckDescriptor, CheckSpec, HealthCheckConfig};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info, warn};

/// Executes one parsed check
#[async_trait]
pub trait CheckRunner: Send + Sync {
    async fn run(&self, spec: &CheckSpec) -> HealthCheckResult;
}

/// Runs checks against the real dependencies
#[derive(Debug, Default, Clone, Copy)]
pub struct LiveCheckRunner;

#[async_trait]
impl CheckRunner for LiveCheckRunner {
    async fn run(&self, spec: &CheckSpec) -> HealthCheckResult {
        build_health_check(spec).check().await
    }
}

/// Outcome of one descriptor during startup
#[derive(Debug, Clone, Serialize)]
pub struct StartupCheckRecord {
    pub category: String,
    pub critical: bool,
    #[serde(rename = "type")]
    pub check_type: Option<String>,
    #[serde(flatten)]
    pub result: HealthCheckResult,
}

/// The readiness verdict, computed once and never mutated afterwards
#[derive(Debug, Clone, Serialize)]
pub struct StartupReport {
    pub ready: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub checks: Vec<StartupCheckRecord>,
    pub config_error: Option<String>,
}

impl StartupReport {
    /// Not ready, nothing attempted
    pub fn config_failure(error: &ConfigError) -> Self {
        let now = Utc::now();
        Self {
            ready: false,
            started_at: now,
            finished_at: now,
            checks: Vec::new(),
            config_error: Some(error.to_string()),
        }
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn failed_checks(&self) -> impl Iterator<Item = &StartupCheckRecord> {
        self.checks
            .iter()
            .filter(|c| c.result.status == HealthStatus::Unhealthy)
    }
}

/// Runs every configured check once, in order, and aggregates the verdict
pub struct StartupChecker<R = LiveCheckRunner> {
    runner: R,
}

impl StartupChecker<LiveCheckRunner> {
    pub fn new() -> Self {
        Self {
            runner: LiveCheckRunner,
        }
    }
}

impl Default for StartupChecker<LiveCheckRunner> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: CheckRunner> StartupChecker<R> {
    pub fn with_runner(runner: R) -> Self {
        Self { runner }
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Produce the startup report. A configuration error short-circuits to
    /// not ready without attempting any probe.
    pub async fn perform(&self, config: Result<HealthCheckConfig, ConfigError>) -> StartupReport {
        let report = match config {
            Ok(config) => self.run_checks(&config).await,
            Err(e) => {
                error!("Startup checks not run: {}", e);
                StartupReport::config_failure(&e)
            }
        };

        metrics::record_startup_ready(report.ready);
        report
    }

    async fn run_checks(&self, config: &HealthCheckConfig) -> StartupReport {
        let started_at = Utc::now();
        let mut all_critical_checks_passed = true;
        let mut records = Vec::with_capacity(config.total_checks());

        info!("--- Starting Pre-Server Health Checks ---");

        for category in &config.categories {
            let critical = category.is_critical();

            for descriptor in &category.checks {
                let result = match descriptor {
                    CheckDescriptor::Probe(spec) => self.runner.run(spec).await,
                    CheckDescriptor::Invalid { kind, name, reason } => {
                        error!(
                            "Check '{}' of type '{}' is misconfigured: {}",
                            name, kind, reason
                        );
                        HealthCheckResult::unhealthy(
                            name.clone(),
                            format!("Invalid check configuration: {}", reason),
                            0,
                        )
                    }
                    CheckDescriptor::Unknown { type_name, name } => {
                        warn!(
                            "Unknown check type '{}' for {}. Skipping.",
                            type_name.as_deref().unwrap_or("<none>"),
                            name
                        );
                        HealthCheckResult::skipped(
                            name.clone(),
                            "Unknown check type".to_string(),
                        )
                    }
                };

                let check_type = descriptor.type_name().unwrap_or("unknown");
                metrics::record_startup_check(
                    &category.name,
                    check_type,
                    result.status,
                    result.duration_ms,
                );

                if result.status == HealthStatus::Unhealthy {
                    error!(
                        "Check FAILED: Type={}, Name={}",
                        check_type,
                        descriptor.name()
                    );
                    if critical {
                        all_critical_checks_passed = false;
                        error!("  -> This is a CRITICAL dependency. Startup will fail.");
                    } else {
                        warn!("  -> This is a non-critical dependency. Startup will continue.");
                    }
                }

                records.push(StartupCheckRecord {
                    category: category.name.clone(),
                    critical,
                    check_type: descriptor.type_name().map(str::to_string),
                    result,
                });
            }
        }

        info!("--- Finished Pre-Server Health Checks ---");
        if all_critical_checks_passed {
            info!("All critical startup checks passed; service is ready");
        } else {
            error!("Critical startup checks failed; service will report not ready");
        }

        StartupReport {
            ready: all_critical_checks_passed,
            started_at,
            finished_at: Utc::now(),
            checks: records,
            config_error: None,
        }
    }
}
