use super::KeyStore;
use crate::errors::JwksError;
use crate::models::KeyRecord;
use async_trait::async_trait;
use std::collections::HashSet;
use tokio::sync::RwLock;

#[derive(Default)]
struct Inner {
    // Insertion order.
    records: Vec<KeyRecord>,
    kids: HashSet<String>,
}

/// Process-local key store.
///
/// Writers take the write lock, readers the read lock, so `list_valid` never
/// observes a half-applied insert or removal.
///
/// Duplicate kids are rejected only among records currently held. A kid is
/// forgotten once its record is reaped; uniqueness across the process
/// lifetime rests on the 128 random bits of each generated kid.
#[derive(Default)]
pub struct InMemoryKeyStore {
    inner: RwLock<Inner>,
}

impl InMemoryKeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records held, valid or expired.
    pub async fn len(&self) -> usize {
        self.inner.read().await.records.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl KeyStore for InMemoryKeyStore {
    async fn insert(&self, record: KeyRecord) -> Result<(), JwksError> {
        let mut inner = self.inner.write().await;

        if !inner.kids.insert(record.kid().to_string()) {
            return Err(JwksError::DuplicateKey(record.kid().to_string()));
        }
        inner.records.push(record);

        Ok(())
    }

    async fn list_valid(&self, now: i64) -> Result<Vec<KeyRecord>, JwksError> {
        let inner = self.inner.read().await;

        Ok(inner
            .records
            .iter()
            .filter(|record| record.is_valid_at(now))
            .cloned()
            .collect())
    }

    async fn remove_expired(&self, now: i64) -> Result<u64, JwksError> {
        let mut inner = self.inner.write().await;
        let Inner { records, kids } = &mut *inner;

        let before = records.len();
        records.retain(|record| {
            let keep = record.is_valid_at(now);
            if !keep {
                kids.remove(record.kid());
            }
            keep
        });

        Ok((before - records.len()) as u64)
    }

    async fn find_by_kid(&self, kid: &str) -> Result<Option<KeyRecord>, JwksError> {
        let inner = self.inner.read().await;

        Ok(inner
            .records
            .iter()
            .find(|record| record.kid() == kid)
            .cloned())
    }
}
