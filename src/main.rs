//! promconf server
//!
//! Run with: cargo run
//!
//! Environment variables (see `promconf::config` for the full list):
//! - PROMCONF_HOST / PROMCONF_PORT: Bind address (default: 0.0.0.0:8080)
//! - PROMETHEUS_URL: Monitoring server base URL (default: http://localhost:9090)
//! - PROMETHEUS_USERNAME / PROMETHEUS_PASSWORD: Optional basic auth
//! - PROMCONF_CONFIG_DIR: Output directory (default: ./configs)
//! - RUST_LOG: Log level (default: info)

use promconf::api::run_server;
use promconf::AppConfig;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "promconf=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env();

    tracing::info!("promconf configuration:");
    tracing::info!("  Listen: {}:{}", config.server.host, config.server.port);
    tracing::info!("  Prometheus: {}", config.client.base_url);
    tracing::info!(
        "  Basic auth: {}",
        if config.client.basic_auth.is_some() {
            "enabled"
        } else {
            "disabled"
        }
    );
    tracing::info!("  Output directory: {}", config.layout.base_dir.display());
    tracing::info!(
        "  Files: {} / {}",
        config.layout.scrape_file,
        config.layout.rules_file
    );
    tracing::info!(
        "  Per-tenant output: {}",
        if config.layout.per_tenant { "yes" } else { "no" }
    );
    if config.render.alertmanagers.is_empty() {
        tracing::info!("  Alertmanagers: none (alerting section disabled)");
    } else {
        tracing::info!("  Alertmanagers: {}", config.render.alertmanagers.join(", "));
    }

    run_server(config).await
}
