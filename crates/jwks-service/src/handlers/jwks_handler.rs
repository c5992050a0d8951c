use crate::errors::JwksError;
use crate::models::{unix_now, Jwks};
use crate::observability::metrics::record_jwks_request;
use crate::routes::AppState;
use crate::services::jwks_publisher;
use axum::{
    extract::State,
    http::header::{HeaderMap, HeaderValue, CACHE_CONTROL},
    Json,
};
use std::sync::Arc;
use tracing::instrument;

/// Handle JWKS request
///
/// GET /.well-known/jwks.json
///
/// Returns the currently valid public keys in JWKS format (RFC 7517).
/// Keys live for one validity window and a new one appears on every token
/// issuance, so responses are marked `no-store`.
#[instrument(name = "jwks.jwks.get", skip_all, fields(status))]
pub async fn handle_get_jwks(
    State(state): State<Arc<AppState>>,
) -> Result<(HeaderMap, Json<Jwks>), JwksError> {
    let result = jwks_publisher::get_jwks(state.store.as_ref(), unix_now()).await;

    let status = if result.is_ok() { "success" } else { "error" };
    tracing::Span::current().record("status", status);
    record_jwks_request(status);

    let jwks = result?;

    let mut headers = HeaderMap::new();
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-store"));

    Ok((headers, Json(jwks)))
}
