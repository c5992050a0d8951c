use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum JwksError {
    /// The RSA primitive or the CSPRNG could not produce key material.
    #[error("Key generation failed: {0}")]
    KeyGeneration(String),

    /// A record with this kid is already in the store.
    #[error("Duplicate key id: {0}")]
    DuplicateKey(String),

    /// The key store backend could not complete the operation.
    #[error("Key store unavailable: {0}")]
    StoreUnavailable(String),

    /// Stored public key material could not be decomposed into JWK form.
    #[error("Malformed key material for kid {kid}: {reason}")]
    KeyParse { kid: String, reason: String },

    #[error("Token signing failed: {0}")]
    Signing(String),

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Internal server error")]
    Internal,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

impl JwksError {
    fn code(&self) -> &'static str {
        match self {
            JwksError::KeyGeneration(_) => "KEY_GENERATION_ERROR",
            JwksError::DuplicateKey(_) => "DUPLICATE_KEY_ERROR",
            JwksError::StoreUnavailable(_) => "STORE_UNAVAILABLE",
            JwksError::KeyParse { .. } => "KEY_PARSE_ERROR",
            JwksError::Signing(_) => "SIGNING_ERROR",
            JwksError::InvalidToken(_) => "INVALID_TOKEN",
            JwksError::Internal => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for JwksError {
    fn into_response(self) -> Response {
        // Details stay in the logs; clients only ever see a generic message.
        let (status, message) = match &self {
            JwksError::InvalidToken(_) => (
                StatusCode::UNAUTHORIZED,
                "The token is invalid or expired",
            ),
            _ => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "An internal error occurred",
            ),
        };

        if status.is_server_error() {
            tracing::error!(target: "jwks.errors", error = %self, "Request failed");
        }

        let error_response = ErrorResponse {
            error: ErrorDetail {
                code: self.code().to_string(),
                message: message.to_string(),
            },
        };

        (status, Json(error_response)).into_response()
    }
}
