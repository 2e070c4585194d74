use axum::{
    routing::{get, post, put},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::handlers::{
    delete_tenant_records, get_alerts, get_config, health_check, list_tenants, put_config,
    put_tenant_records, query, query_range, reload, render_preview, sync, sync_tenant, AppState,
};
use crate::config::AppConfig;
use crate::prometheus::PrometheusClient;
use crate::source::MemorySource;
use crate::sync::Synchronizer;

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

/// Build the application router
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health_check))
        // Render and synchronize
        .route("/render", post(render_preview))
        .route("/sync", post(sync))
        .route("/tenants", get(list_tenants))
        .route(
            "/tenants/:tenant/records",
            put(put_tenant_records).delete(delete_tenant_records),
        )
        .route("/tenants/:tenant/sync", post(sync_tenant))
        // Prometheus
        .route("/reload", post(reload))
        .route("/config", get(get_config).put(put_config))
        .route("/alerts", get(get_alerts))
        .route("/query", get(query))
        .route("/query_range", get(query_range))
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Run the HTTP server
pub async fn run_server(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let client = PrometheusClient::new(config.client.clone())?;
    let synchronizer = Synchronizer::new(config.render.clone(), config.layout.clone(), client);

    let state = Arc::new(AppState {
        synchronizer,
        source: Arc::new(MemorySource::new()),
    });

    let app = build_router(state);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    tracing::info!("Starting promconf server on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("promconf server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
