//! HTTP routes for the JWKS service.
//!
//! Defines the Axum router and application state.

use crate::config::Config;
use crate::handlers;
use crate::repositories::KeyStore;
use crate::services::key_generator::KeyGenerator;
use crate::services::token_issuer::TokenIssuer;
use axum::{
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

/// Request timeout. Covers RSA generation on a loaded blocking pool.
const REQUEST_TIMEOUT_SECONDS: u64 = 30;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Key store shared with the expiry reaper.
    pub store: Arc<dyn KeyStore>,

    /// Token issuer over the same store.
    pub issuer: TokenIssuer,

    /// Service configuration.
    pub config: Config,
}

impl AppState {
    /// Wire the issuer to `store` using the validity window and subject from `config`.
    pub fn new(store: Arc<dyn KeyStore>, config: Config) -> Self {
        let issuer = TokenIssuer::new(
            KeyGenerator::new(config.key_validity_seconds),
            store.clone(),
            config.token_subject.clone(),
        );

        Self {
            store,
            issuer,
            config,
        }
    }
}

/// Build the application routes.
///
/// - `POST /auth` - Issue a token signed by a freshly generated key
/// - `GET /.well-known/jwks.json` - Currently valid public keys
/// - `GET /health` - Liveness probe
/// - `GET /metrics` - Prometheus metrics
///
/// Other methods on these paths get 405 from method routing.
pub fn build_routes(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let api_routes = Router::new()
        .route("/auth", post(handlers::handle_auth))
        .route("/.well-known/jwks.json", get(handlers::handle_get_jwks))
        .route("/health", get(handlers::health_check))
        .with_state(state);

    let metrics_routes = Router::new()
        .route("/metrics", get(handlers::metrics_handler))
        .with_state(metrics_handle);

    api_routes
        .merge(metrics_routes)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(REQUEST_TIMEOUT_SECONDS)))
}
