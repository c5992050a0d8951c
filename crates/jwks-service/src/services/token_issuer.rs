use crate::crypto::{sign_jwt, Claims};
use crate::errors::JwksError;
use crate::models::{unix_now, KeyRecord};
use crate::observability::metrics::record_token_issuance;
use crate::repositories::KeyStore;
use crate::services::key_generator::KeyGenerator;
use std::sync::Arc;
use std::time::Instant;
use tracing::instrument;

/// A signed token and the key it was signed with.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub kid: String,
    pub expires_at: i64,
}

/// Issues RS256 tokens, each signed by a key generated for that request.
///
/// The key is stored before the token is signed, so any token handed out
/// carries a kid that was resolvable in the store at issuance time.
#[derive(Clone)]
pub struct TokenIssuer {
    generator: KeyGenerator,
    store: Arc<dyn KeyStore>,
    subject: String,
}

impl TokenIssuer {
    pub fn new(generator: KeyGenerator, store: Arc<dyn KeyStore>, subject: impl Into<String>) -> Self {
        Self {
            generator,
            store,
            subject: subject.into(),
        }
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Generate a key, store it, and sign a token with it.
    ///
    /// With `force_expired` the key and the token share an expiration
    /// instant already in the past. No partial result is returned on error.
    #[instrument(skip_all, fields(force_expired = force_expired, kid = tracing::field::Empty, status))]
    pub async fn issue(&self, force_expired: bool) -> Result<IssuedToken, JwksError> {
        let start = Instant::now();
        let result = self.issue_inner(force_expired).await;

        let status = if result.is_ok() { "success" } else { "error" };
        tracing::Span::current().record("status", status);
        record_token_issuance(status, force_expired, start.elapsed());

        result
    }

    async fn issue_inner(&self, force_expired: bool) -> Result<IssuedToken, JwksError> {
        let record = self.generator.generate_blocking(force_expired).await?;
        tracing::Span::current().record("kid", record.kid());

        let issued_at = unix_now();
        self.store.insert(record.clone()).await?;
        let signing_key = self.confirm_stored(record, issued_at).await?;

        let claims = Claims {
            sub: self.subject.clone(),
            iat: issued_at,
            exp: signing_key.expires_at(),
        };
        let token = sign_jwt(&claims, signing_key.private_key(), signing_key.kid())?;

        tracing::debug!(
            target: "jwks.service.token_issuer",
            kid = %signing_key.kid(),
            expires_at = signing_key.expires_at(),
            "Token issued"
        );

        Ok(IssuedToken {
            token,
            kid: signing_key.kid().to_string(),
            expires_at: signing_key.expires_at(),
        })
    }

    /// Check that the record the store holds under our kid is the one we
    /// generated before signing with it.
    ///
    /// An already expired record may be reaped between insert and lookup;
    /// that is the only case where a missing record is acceptable.
    async fn confirm_stored(&self, record: KeyRecord, now: i64) -> Result<KeyRecord, JwksError> {
        match self.store.find_by_kid(record.kid()).await? {
            Some(stored) if stored.public_key() == record.public_key() => Ok(stored),
            Some(_) => {
                tracing::error!(
                    target: "jwks.service.token_issuer",
                    kid = %record.kid(),
                    "Stored key does not match generated key"
                );
                Err(JwksError::Internal)
            }
            None if !record.is_valid_at(now) => Ok(record),
            None => {
                tracing::error!(
                    target: "jwks.service.token_issuer",
                    kid = %record.kid(),
                    "Valid key missing from store immediately after insert"
                );
                Err(JwksError::Internal)
            }
        }
    }
}
