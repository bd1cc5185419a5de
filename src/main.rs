use clap::Parser;
use probe_app::{cli::Cli, config, health::StartupChecker, routes};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "probe_app=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    if let Some(delay) = cli.startup_delay() {
        tracing::info!(
            "⏳ Waiting {} seconds before running startup checks...",
            delay.as_secs()
        );
        tokio::time::sleep(delay).await;
    }

    // Runs once; the verdict is fixed for the lifetime of the process
    let report = StartupChecker::new()
        .perform(config::load_config_from_env())
        .await;

    if report.is_ready() {
        tracing::info!("✓ Startup checks passed");
    } else {
        tracing::warn!("⚠ Startup checks failed; readiness probe will report 503");
    }

    let app = routes::router(Arc::new(report));

    let addr = cli.bind_addr();
    tracing::info!("🚀 Starting probe app on {}", addr);

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Failed to bind {}: {}", addr, e);
            std::process::exit(1);
        }
    };

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
