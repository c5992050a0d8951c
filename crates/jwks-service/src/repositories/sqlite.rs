use super::KeyStore;
use crate::errors::JwksError;
use crate::models::KeyRecord;
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use sqlx::error::DatabaseError;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::FromRow;
use std::str::FromStr;
use std::time::Duration;

/// SQLite extended result codes for PRIMARY KEY / UNIQUE constraint failures.
const SQLITE_CONSTRAINT_PRIMARYKEY: &str = "1555";
const SQLITE_CONSTRAINT_UNIQUE: &str = "2067";

/// Row of the `keys` table.
#[derive(Debug, FromRow)]
struct KeyRow {
    kid: String,
    public_key: String,
    private_key: String,
    algorithm: String,
    expires_at: i64,
}

impl From<KeyRow> for KeyRecord {
    fn from(row: KeyRow) -> Self {
        KeyRecord::new(
            row.kid,
            row.public_key,
            SecretString::from(row.private_key),
            row.algorithm,
            row.expires_at,
        )
    }
}

/// Durable key store over a single SQLite table keyed by kid.
#[derive(Debug, Clone)]
pub struct SqliteKeyStore {
    pool: SqlitePool,
}

impl SqliteKeyStore {
    /// Wrap an existing pool. The schema must already be migrated.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open (creating if needed) the database at `database_url` and migrate it.
    pub async fn connect(database_url: &str) -> Result<Self, JwksError> {
        if database_url.contains(":memory:") {
            return Self::in_memory().await;
        }

        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| JwksError::StoreUnavailable(format!("Invalid database URL: {}", e)))?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(5))
            .connect_with(options)
            .await
            .map_err(|e| JwksError::StoreUnavailable(format!("Failed to connect: {}", e)))?;

        let store = Self::new(pool);
        store.migrate().await?;
        Ok(store)
    }

    /// A private in-memory database, migrated and ready.
    ///
    /// Every SQLite `:memory:` connection is its own database, so the pool is
    /// pinned to one connection that is never recycled.
    pub async fn in_memory() -> Result<Self, JwksError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(|e| JwksError::StoreUnavailable(format!("Invalid database URL: {}", e)))?;

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(|e| JwksError::StoreUnavailable(format!("Failed to connect: {}", e)))?;

        let store = Self::new(pool);
        store.migrate().await?;
        Ok(store)
    }

    /// Apply the schema migrations.
    pub async fn migrate(&self) -> Result<(), JwksError> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(|e| JwksError::StoreUnavailable(format!("Migration failed: {}", e)))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn is_duplicate_kid(error: &dyn DatabaseError) -> bool {
    error.is_unique_violation()
        || matches!(
            error.code().as_deref(),
            Some(SQLITE_CONSTRAINT_PRIMARYKEY) | Some(SQLITE_CONSTRAINT_UNIQUE)
        )
}

#[async_trait]
impl KeyStore for SqliteKeyStore {
    async fn insert(&self, record: KeyRecord) -> Result<(), JwksError> {
        sqlx::query(
            r#"
            INSERT INTO keys (kid, public_key, private_key, algorithm, expires_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(record.kid())
        .bind(record.public_key())
        .bind(record.private_key().expose_secret())
        .bind(record.algorithm())
        .bind(record.expires_at())
        .execute(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if is_duplicate_kid(db.as_ref()) => {
                JwksError::DuplicateKey(record.kid().to_string())
            }
            _ => JwksError::StoreUnavailable(format!("Failed to insert key: {}", e)),
        })?;

        Ok(())
    }

    async fn list_valid(&self, now: i64) -> Result<Vec<KeyRecord>, JwksError> {
        let rows = sqlx::query_as::<_, KeyRow>(
            r#"
            SELECT kid, public_key, private_key, algorithm, expires_at
            FROM keys
            WHERE expires_at > ?1
            ORDER BY rowid ASC
            "#,
        )
        .bind(now)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| JwksError::StoreUnavailable(format!("Failed to list valid keys: {}", e)))?;

        Ok(rows.into_iter().map(KeyRecord::from).collect())
    }

    async fn remove_expired(&self, now: i64) -> Result<u64, JwksError> {
        let result = sqlx::query(
            r#"
            DELETE FROM keys
            WHERE expires_at <= ?1
            "#,
        )
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| JwksError::StoreUnavailable(format!("Failed to remove expired keys: {}", e)))?;

        Ok(result.rows_affected())
    }

    async fn find_by_kid(&self, kid: &str) -> Result<Option<KeyRecord>, JwksError> {
        let row = sqlx::query_as::<_, KeyRow>(
            r#"
            SELECT kid, public_key, private_key, algorithm, expires_at
            FROM keys
            WHERE kid = ?1
            "#,
        )
        .bind(kid)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| JwksError::StoreUnavailable(format!("Failed to fetch key by id: {}", e)))?;

        Ok(row.map(KeyRecord::from))
    }
}
