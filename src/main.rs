//! Identity broker daemon.

use std::sync::Arc;

use identity_broker::adapters::{websocket_router, FileProfileStorage, InMemoryProfileStorage, WebSocketState};
use identity_broker::application::{Broker, ProfileStore};
use identity_broker::config::{AppConfig, LogFormat, ServerConfig, StorageBackend, StorageConfig};
use identity_broker::ports::ProfileStorage;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received SIGTERM signal");
        },
    }
}

fn init_tracing(server: &ServerConfig, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&server.log_level));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.init(),
    }
}

fn storage_for(config: &StorageConfig) -> Arc<dyn ProfileStorage> {
    match config.backend {
        StorageBackend::File => Arc::new(FileProfileStorage::new(&config.path)),
        StorageBackend::Memory => Arc::new(InMemoryProfileStorage::new()),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    config.validate()?;
    init_tracing(&config.server, config.server.log_format()?);

    info!(
        storage = ?config.storage.backend,
        activate_on_create = config.broker.activate_on_create,
        "Starting identity broker..."
    );

    let store = ProfileStore::load(storage_for(&config.storage)).await?;
    info!(profiles = store.list().len(), "Profile store loaded");

    let (broker, handle) = Broker::new(store, config.broker.clone());
    let broker_task = broker.spawn();

    let app = websocket_router(WebSocketState::new(handle.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr = config.server.socket_addr();
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Initiating graceful shutdown...");
    handle.shutdown();
    if let Err(e) = broker_task.await {
        error!("Broker task failed: {}", e);
    }

    info!("Identity broker stopped");
    Ok(())
}
