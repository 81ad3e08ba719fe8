use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use typing_duel::{
    build_router, AppState, ConnectionManager, InMemoryConnectionManager, JsonFileUserStore,
    ServerConfig, SessionHandle, StatsAggregator,
};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "typing_duel=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = run().await {
        error!(error = %e, "Server failed");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = ServerConfig::from_env()?;
    info!(
        bind_addr = %config.bind_addr,
        data_dir = %config.data_dir.display(),
        match_seconds = config.session.match_seconds(),
        "Starting typing duel server"
    );

    let user_store = Arc::new(JsonFileUserStore::open(&config.data_dir).await?);
    let stats = StatsAggregator::new(user_store);
    let connection_manager: Arc<dyn ConnectionManager> = Arc::new(InMemoryConnectionManager::new());
    let session = SessionHandle::spawn(config.session.clone(), connection_manager.clone(), stats.clone());

    let app = build_router(AppState::new(session, stats, connection_manager));

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    info!("Server running on http://{}", config.bind_addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
    }
    info!("Shutdown signal received");
}
