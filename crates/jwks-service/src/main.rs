//! JWKS Server
//!
//! Issues RS256 tokens signed by per-request keys and publishes the
//! currently valid public keys at `/.well-known/jwks.json`.

use jwks_service::config::Config;
use jwks_service::observability::init_metrics_recorder;
use jwks_service::repositories::{InMemoryKeyStore, KeyStore, SqliteKeyStore};
use jwks_service::routes::{self, AppState};
use jwks_service::tasks::{start_expiry_reaper, ExpiryReaperConfig};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "jwks_service=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting JWKS Server");

    let config = Config::from_env().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    info!(
        bind_address = %config.bind_address,
        key_validity_seconds = config.key_validity_seconds,
        reaper_interval_seconds = config.reaper_interval_seconds,
        durable_store = config.database_url.is_some(),
        "Configuration loaded successfully"
    );

    let metrics_handle = init_metrics_recorder().map_err(|e| {
        error!("Failed to initialize metrics: {}", e);
        e
    })?;

    let store: Arc<dyn KeyStore> = match &config.database_url {
        Some(url) => {
            info!("Opening SQLite key store...");
            let store = SqliteKeyStore::connect(url).await.map_err(|e| {
                error!("Failed to open key store: {}", e);
                e
            })?;
            info!("SQLite key store ready");
            Arc::new(store)
        }
        None => {
            info!("Using in-memory key store");
            Arc::new(InMemoryKeyStore::new())
        }
    };

    let addr: SocketAddr = config.bind_address.parse().map_err(|e| {
        error!("Invalid bind address: {}", e);
        e
    })?;
    let drain_seconds = config.drain_seconds;

    let reaper_token = CancellationToken::new();
    let reaper_handle = tokio::spawn(start_expiry_reaper(
        store.clone(),
        ExpiryReaperConfig::from(&config),
        reaper_token.clone(),
    ));

    let state = Arc::new(AppState::new(store, config));
    let app = routes::build_routes(state, metrics_handle);

    info!("JWKS Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let serve_result = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(drain_seconds))
        .await;

    reaper_token.cancel();
    if let Err(e) = reaper_handle.await {
        error!("Expiry reaper task failed: {}", e);
    }

    serve_result?;

    info!("JWKS Server shutdown complete");

    Ok(())
}

/// Listens for shutdown signals (SIGTERM, SIGINT).
/// Returns when a shutdown signal is received and the drain period is complete.
async fn shutdown_signal(drain_seconds: u64) {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received SIGINT, starting graceful shutdown..."),
            Err(e) => error!("Failed to listen for SIGINT: {}", e),
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received SIGTERM, starting graceful shutdown...");
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    if drain_seconds > 0 {
        warn!("Draining connections for {} seconds...", drain_seconds);
        tokio::time::sleep(Duration::from_secs(drain_seconds)).await;
        info!("Drain period complete");
    }
}
