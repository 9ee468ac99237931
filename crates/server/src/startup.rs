use std::net::SocketAddr;

use axum::Router;
use configs::AppConfig;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use crate::errors::StartupError;
use crate::routes;
use crate::state::ServerState;
use service::ResponseStore;

pub fn build_cors() -> CorsLayer {
    CorsLayer::very_permissive()
}

fn log_config(cfg: &AppConfig) {
    info!(port = cfg.server.port, host = %cfg.server.host, data_file = %cfg.storage.data_file, "server configuration");
    if cfg.admin.uses_default_password() {
        warn!("admin password: using default (CHANGE THIS!)");
    } else {
        info!("admin password: custom password set");
    }
}

/// Initialize storage and build the router for `cfg`.
pub async fn build_app(cfg: &AppConfig) -> Result<Router, StartupError> {
    let store = ResponseStore::new(&cfg.storage.data_file).await?;
    let state = ServerState::new(store, cfg.admin.clone());
    Ok(routes::build_router(state, build_cors()))
}

/// Public entry: build the app and run the HTTP server
pub async fn run(cfg: AppConfig) -> anyhow::Result<()> {
    log_config(&cfg);
    let app = build_app(&cfg).await?;

    let addr: SocketAddr = cfg
        .server
        .bind_addr()
        .parse()
        .map_err(|e| StartupError::InvalidConfig(format!("bind address {}: {e}", cfg.server.bind_addr())))?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "survey server running");
    info!("survey API at http://localhost:{}/api/responses", cfg.server.port);
    axum::serve(listener, app).await?;
    Ok(())
}
