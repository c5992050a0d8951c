//! Key storage.
//!
//! [`KeyStore`] is the only owner of [`KeyRecord`]s once they are inserted.
//! Callers never see the backing collection; they go through the four
//! operations below, each of which is atomic with respect to the others.

pub mod memory;
pub mod sqlite;

pub use memory::InMemoryKeyStore;
pub use sqlite::SqliteKeyStore;

use crate::errors::JwksError;
use crate::models::KeyRecord;
use async_trait::async_trait;

#[async_trait]
pub trait KeyStore: Send + Sync {
    /// Add a record.
    ///
    /// Fails with [`JwksError::DuplicateKey`] when a record with the same kid
    /// is already present.
    async fn insert(&self, record: KeyRecord) -> Result<(), JwksError>;

    /// All records with `expires_at > now`, in insertion order.
    async fn list_valid(&self, now: i64) -> Result<Vec<KeyRecord>, JwksError>;

    /// Delete every record with `expires_at <= now`. Returns the number removed.
    async fn remove_expired(&self, now: i64) -> Result<u64, JwksError>;

    /// Look up a record by kid, valid or not.
    async fn find_by_kid(&self, kid: &str) -> Result<Option<KeyRecord>, JwksError>;
}
