use crate::crypto;
use crate::errors::JwksError;
use crate::models::{unix_now, KeyRecord, SIGNING_ALGORITHM};
use crate::observability::metrics::record_key_generation;
use std::time::Instant;
use tracing::instrument;

/// Produces fresh RSA signing keys wrapped in [`KeyRecord`]s.
///
/// Normal keys expire one validity window after creation. Keys requested
/// with `force_expired` are backdated by the same window, so they are
/// already outside the published set when they reach the store.
#[derive(Debug, Clone, Copy)]
pub struct KeyGenerator {
    validity_seconds: i64,
    key_bits: usize,
}

impl KeyGenerator {
    pub fn new(validity_seconds: i64) -> Self {
        Self {
            validity_seconds,
            key_bits: crypto::RSA_KEY_BITS,
        }
    }

    pub fn validity_seconds(&self) -> i64 {
        self.validity_seconds
    }

    /// Smaller moduli make bulk generation cheap in tests.
    #[cfg(test)]
    fn with_key_bits(mut self, key_bits: usize) -> Self {
        self.key_bits = key_bits;
        self
    }

    /// Expiration instant for a key created at `now`.
    pub fn expires_at(&self, now: i64, force_expired: bool) -> Result<i64, JwksError> {
        let expires_at = if force_expired {
            now.checked_sub(self.validity_seconds)
        } else {
            now.checked_add(self.validity_seconds)
        };

        expires_at.ok_or_else(|| {
            JwksError::KeyGeneration(format!(
                "Expiration overflows: now={} validity_seconds={}",
                now, self.validity_seconds
            ))
        })
    }

    /// Generate a key relative to the current time.
    pub fn generate(&self, force_expired: bool) -> Result<KeyRecord, JwksError> {
        self.generate_at(unix_now(), force_expired)
    }

    /// Generate a key as if created at `now`.
    ///
    /// Not retried on failure: an entropy or primitive failure is returned
    /// to the caller as [`JwksError::KeyGeneration`].
    #[instrument(skip_all, fields(force_expired = force_expired, kid = tracing::field::Empty))]
    pub fn generate_at(&self, now: i64, force_expired: bool) -> Result<KeyRecord, JwksError> {
        let start = Instant::now();
        let expires_at = self.expires_at(now, force_expired)?;

        let kid = crypto::generate_kid()?;
        tracing::Span::current().record("kid", kid.as_str());

        let key_pair = crypto::generate_rsa_key_pair(self.key_bits)?;
        record_key_generation(start.elapsed());

        Ok(KeyRecord::new(
            kid,
            key_pair.public_key_pem,
            key_pair.private_key_pem,
            SIGNING_ALGORITHM.to_string(),
            expires_at,
        ))
    }

    /// [`generate`](Self::generate) on the blocking pool, keeping RSA prime
    /// search off the async workers.
    pub async fn generate_blocking(&self, force_expired: bool) -> Result<KeyRecord, JwksError> {
        let generator = *self;
        tokio::task::spawn_blocking(move || generator.generate(force_expired))
            .await
            .map_err(|e| JwksError::KeyGeneration(format!("Key generation task failed: {}", e)))?
    }
}
