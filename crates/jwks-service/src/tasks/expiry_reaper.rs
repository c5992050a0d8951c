//! Expired key reaper.
//!
//! Deletes every key whose expiration instant has passed, once per interval.
//! The first pass runs immediately on start. A failed pass is logged and the
//! loop keeps going; it never takes the process down.
//!
//! # Graceful Shutdown
//!
//! The task exits when its cancellation token is triggered. A pass already in
//! progress completes first.

use crate::config::{Config, DEFAULT_REAPER_INTERVAL_SECONDS};
use crate::models::unix_now;
use crate::observability::metrics::record_reaper_run;
use crate::repositories::KeyStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

/// Configuration for the expiry reaper task.
#[derive(Debug, Clone)]
pub struct ExpiryReaperConfig {
    /// Seconds between passes. Zero is treated as one.
    pub interval_seconds: u64,
}

impl ExpiryReaperConfig {
    /// Period between passes, never shorter than one second.
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_seconds.max(1))
    }
}

impl Default for ExpiryReaperConfig {
    fn default() -> Self {
        Self {
            interval_seconds: DEFAULT_REAPER_INTERVAL_SECONDS,
        }
    }
}

impl From<&Config> for ExpiryReaperConfig {
    fn from(config: &Config) -> Self {
        Self {
            interval_seconds: config.reaper_interval_seconds,
        }
    }
}

/// Run the reaper until `cancel_token` is cancelled.
#[instrument(skip_all, name = "jwks.task.expiry_reaper")]
pub async fn start_expiry_reaper(
    store: Arc<dyn KeyStore>,
    config: ExpiryReaperConfig,
    cancel_token: CancellationToken,
) {
    info!(
        target: "jwks.task.expiry_reaper",
        interval_seconds = config.interval_seconds,
        "Starting expiry reaper task"
    );

    let mut interval = tokio::time::interval(config.interval());
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                run_reap(store.as_ref(), unix_now()).await;
            }
            _ = cancel_token.cancelled() => {
                info!(
                    target: "jwks.task.expiry_reaper",
                    "Expiry reaper received shutdown signal, exiting"
                );
                break;
            }
        }
    }

    info!(target: "jwks.task.expiry_reaper", "Expiry reaper task stopped");
}

/// One reaper pass. Returns the number of keys removed, or `None` if the
/// store failed.
pub(crate) async fn run_reap(store: &dyn KeyStore, now: i64) -> Option<u64> {
    match store.remove_expired(now).await {
        Ok(removed) => {
            record_reaper_run("success", removed);
            if removed > 0 {
                info!(
                    target: "jwks.task.expiry_reaper",
                    removed_count = removed,
                    "Removed expired signing keys"
                );
            }
            Some(removed)
        }
        Err(e) => {
            record_reaper_run("error", 0);
            tracing::error!(
                target: "jwks.task.expiry_reaper",
                error = %e,
                "Failed to remove expired keys"
            );
            None
        }
    }
}
