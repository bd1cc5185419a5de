//! Command line and environment settings for the probe service

use clap::Parser;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

/// Probe App - toy HTTP service for readiness and liveness probing
#[derive(Parser, Debug, Clone)]
#[command(name = "probe-app")]
#[command(version, about, long_about = None)]
#[command(after_help = r#"ENVIRONMENT VARIABLES:
    HEALTH_CHECK_CONFIG          JSON document of startup checks by category
    HEALTH_CHECK_CONFIG_PATH     JSON or YAML file used when HEALTH_CHECK_CONFIG is unset
    RUST_LOG                     Log filter (default: probe_app=debug,tower_http=debug)
"#)]
pub struct Cli {
    /// Bind address
    #[arg(long, default_value = "0.0.0.0")]
    pub host: IpAddr,

    /// Listen port
    #[arg(long, env = "PORT", default_value_t = 5000)]
    pub port: u16,

    /// Seconds to wait before running startup checks
    #[arg(long, env = "STARTUP_DELAY", default_value_t = 0)]
    pub startup_delay: u64,
}

impl Cli {
    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    pub fn startup_delay(&self) -> Option<Duration> {
        (self.startup_delay > 0).then(|| Duration::from_secs(self.startup_delay))
    }
}
