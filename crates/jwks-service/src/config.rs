//! Service configuration.
//!
//! Configuration is loaded from environment variables. The database URL is
//! redacted in Debug output.

use std::collections::HashMap;
use std::env;
use std::fmt;
use thiserror::Error;

/// Default HTTP bind address.
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8080";

/// Default validity window for signing keys and tokens (1 hour).
pub const DEFAULT_KEY_VALIDITY_SECONDS: i64 = 3600;

/// Upper bound on the validity window (10 years).
pub const MAX_KEY_VALIDITY_SECONDS: i64 = 10 * 365 * 24 * 3600;

/// Default interval between expired key reaps (1 hour).
pub const DEFAULT_REAPER_INTERVAL_SECONDS: u64 = 3600;

/// Default `sub` claim for issued tokens.
pub const DEFAULT_TOKEN_SUBJECT: &str = "user123";

/// Default graceful shutdown drain period.
pub const DEFAULT_DRAIN_SECONDS: u64 = 0;

#[derive(Clone)]
pub struct Config {
    /// Server bind address (default: "0.0.0.0:8080").
    pub bind_address: String,

    /// SQLite URL for the durable key store. `None` selects the in-memory store.
    pub database_url: Option<String>,

    /// Lifetime of a freshly generated key, and of the token signed with it.
    pub key_validity_seconds: i64,

    /// Period of the expired key reaper.
    pub reaper_interval_seconds: u64,

    /// Subject claim placed in issued tokens.
    pub token_subject: String,

    /// Seconds to wait for in-flight requests after a shutdown signal.
    pub drain_seconds: u64,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("bind_address", &self.bind_address)
            .field(
                "database_url",
                &self.database_url.as_ref().map(|_| "[REDACTED]"),
            )
            .field("key_validity_seconds", &self.key_validity_seconds)
            .field("reaper_interval_seconds", &self.reaper_interval_seconds)
            .field("token_subject", &self.token_subject)
            .field("drain_seconds", &self.drain_seconds)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: DEFAULT_BIND_ADDRESS.to_string(),
            database_url: None,
            key_validity_seconds: DEFAULT_KEY_VALIDITY_SECONDS,
            reaper_interval_seconds: DEFAULT_REAPER_INTERVAL_SECONDS,
            token_subject: DEFAULT_TOKEN_SUBJECT.to_string(),
            drain_seconds: DEFAULT_DRAIN_SECONDS,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {name}: {reason}")]
    InvalidValue { name: String, reason: String },
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing)
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let bind_address = vars
            .get("BIND_ADDRESS")
            .cloned()
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());

        let database_url = vars
            .get("DATABASE_URL")
            .filter(|url| !url.trim().is_empty())
            .cloned();

        let key_validity_seconds =
            parse_positive(vars, "KEY_VALIDITY_SECONDS", DEFAULT_KEY_VALIDITY_SECONDS)?;
        if key_validity_seconds > MAX_KEY_VALIDITY_SECONDS {
            return Err(ConfigError::InvalidValue {
                name: "KEY_VALIDITY_SECONDS".to_string(),
                reason: format!(
                    "must be at most {}, got {}",
                    MAX_KEY_VALIDITY_SECONDS, key_validity_seconds
                ),
            });
        }

        let reaper_interval_seconds =
            parse_positive(vars, "REAPER_INTERVAL_SECONDS", DEFAULT_REAPER_INTERVAL_SECONDS)?;

        let token_subject = vars
            .get("TOKEN_SUBJECT")
            .cloned()
            .unwrap_or_else(|| DEFAULT_TOKEN_SUBJECT.to_string());

        let drain_seconds = match vars.get("DRAIN_SECONDS") {
            Some(value) => value.parse().map_err(|e| ConfigError::InvalidValue {
                name: "DRAIN_SECONDS".to_string(),
                reason: format!("{}", e),
            })?,
            None => DEFAULT_DRAIN_SECONDS,
        };

        Ok(Config {
            bind_address,
            database_url,
            key_validity_seconds,
            reaper_interval_seconds,
            token_subject,
            drain_seconds,
        })
    }
}

/// Parse an optional, strictly positive integer variable.
fn parse_positive<T>(
    vars: &HashMap<String, String>,
    name: &str,
    default: T,
) -> Result<T, ConfigError>
where
    T: std::str::FromStr + PartialOrd + Default,
    T::Err: fmt::Display,
{
    let Some(raw) = vars.get(name) else {
        return Ok(default);
    };

    let value: T = raw.parse().map_err(|e: T::Err| ConfigError::InvalidValue {
        name: name.to_string(),
        reason: e.to_string(),
    })?;

    if value <= T::default() {
        return Err(ConfigError::InvalidValue {
            name: name.to_string(),
            reason: format!("must be greater than zero, got {}", raw),
        });
    }

    Ok(value)
}
