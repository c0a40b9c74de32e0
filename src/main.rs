//! KBHub Server: knowledge-base folder organization API
//!
//! Main entry point that wires the crates together and starts the server.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing_subscriber::{EnvFilter, fmt};

use kbhub_cache::CacheManager;
use kbhub_core::config::{AppConfig, LogFormat};
use kbhub_core::error::AppError;
use kbhub_database::Stores;

#[tokio::main]
async fn main() {
    let config = match load_configuration() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}

/// Load configuration from file, environment overlay and `KBHUB__*` variables
fn load_configuration() -> Result<AppConfig, AppError> {
    let config_path =
        std::env::var("KBHUB_CONFIG").unwrap_or_else(|_| "config/default.toml".to_string());
    let env = std::env::var("KBHUB_ENV").unwrap_or_else(|_| "development".to_string());

    AppConfig::load(&config_path, &env)
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format {
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        LogFormat::Pretty => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

/// Main server run function
async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting KBHub v{}", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        backend = config.database.backend.as_str(),
        "Connecting folder store..."
    );
    let stores = Stores::connect(&config.database).await?;

    tracing::info!(
        provider = config.cache.provider.as_str(),
        "Initializing cache..."
    );
    let cache = Arc::new(CacheManager::new(&config.cache).await?);

    let addr = config.server.bind_addr();
    let grace = Duration::from_secs(config.server.shutdown_grace_seconds);
    let cors = config.server.cors.clone();

    let state = kbhub_api::build_state(config, stores.clone(), cache);
    let app = kbhub_api::build_app(state, &cors);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::internal(format!("Failed to bind {addr}: {e}")))?;
    tracing::info!("KBHub server listening on {}", addr);

    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
    let server = axum::serve(listener, app).with_graceful_shutdown(async move {
        shutdown_signal().await;
        tracing::info!("Shutdown signal received, starting graceful shutdown...");
        let _ = shutdown_tx.send(true);
    });
    let handle = tokio::spawn(async move { server.await });

    // Resolves on the signal, or early if the server stops on its own.
    let _ = shutdown_rx.changed().await;

    let outcome = match tokio::time::timeout(grace, handle).await {
        Ok(Ok(served)) => served.map_err(|e| AppError::internal(format!("Server error: {e}"))),
        Ok(Err(e)) => Err(AppError::internal(format!("Server task failed: {e}"))),
        Err(_) => {
            tracing::warn!(
                grace_seconds = grace.as_secs(),
                "In-flight requests did not finish in time"
            );
            Ok(())
        }
    };

    stores.close().await;
    tracing::info!("KBHub server shut down");
    outcome
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
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
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
