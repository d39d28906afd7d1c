use anyhow::Context;
use db::DBService;
use server::{AppState, config::ServerConfig, routes};
use tokio::net::TcpListener;
use tracing::info;
use utils::logging::init_tracing;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env is fine; the process environment still applies.
    dotenvy::dotenv().ok();
    init_tracing();

    let config = ServerConfig::from_env().context("invalid server configuration")?;
    let db = DBService::new(&config.database_url, config.db_max_connections)
        .await
        .with_context(|| format!("failed to open database at {}", config.database_url))?;

    let addr = config.bind_addr();
    let app = routes::router(AppState::new(db, config));

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("Review server listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Review server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
    info!("Shutdown signal received");
}
