use crate::errors::JwksError;
use crate::models::{AuthQuery, AuthResponse};
use crate::routes::AppState;
use axum::{
    extract::{Query, State},
    Json,
};
use std::sync::Arc;
use tracing::instrument;

/// Handle token request
///
/// POST /auth[?expired=true]
///
/// Every call generates and stores a fresh key, then signs a token with it.
/// A query string that fails to parse is treated as a normal request.
#[instrument(name = "jwks.auth.issue", skip_all, fields(force_expired))]
pub async fn handle_auth(
    State(state): State<Arc<AppState>>,
    query: Option<Query<AuthQuery>>,
) -> Result<Json<AuthResponse>, JwksError> {
    let force_expired = query.map(|Query(q)| q.force_expired()).unwrap_or(false);
    tracing::Span::current().record("force_expired", force_expired);

    let issued = state.issuer.issue(force_expired).await?;

    Ok(Json(AuthResponse {
        token: issued.token,
    }))
}
