//! Metrics definitions for the JWKS service
//!
//! All metrics follow Prometheus naming conventions:
//! - `jwks_` prefix
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Cardinality
//!
//! Labels are bounded: `status` is `success` or `error`, `expired` is
//! `true` or `false`. Key ids never appear as labels.

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Initialize the global Prometheus recorder and return the handle used by
/// the `/metrics` route.
///
/// # Errors
///
/// Returns an error if a recorder is already installed in this process.
pub fn init_metrics_recorder() -> Result<PrometheusHandle, String> {
    PrometheusBuilder::new()
        // RSA-2048 generation dominates issuance latency
        .set_buckets_for_metric(
            Matcher::Prefix("jwks_token_issuance".to_string()),
            &[0.050, 0.100, 0.250, 0.500, 1.000, 2.000, 5.000, 10.000],
        )
        .map_err(|e| format!("Failed to set token issuance buckets: {e}"))?
        .set_buckets_for_metric(
            Matcher::Full("jwks_key_generation_duration_seconds".to_string()),
            &[0.050, 0.100, 0.250, 0.500, 1.000, 2.000, 5.000, 10.000],
        )
        .map_err(|e| format!("Failed to set key generation buckets: {e}"))?
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {e}"))
}

// ============================================================================
// Token Metrics
// ============================================================================

/// Record token issuance duration and outcome
///
/// Metric: `jwks_token_issuance_duration_seconds`, `jwks_token_issuance_total`
/// Labels: `status`, `expired`
pub fn record_token_issuance(status: &str, expired: bool, duration: Duration) {
    histogram!("jwks_token_issuance_duration_seconds", "status" => status.to_string())
        .record(duration.as_secs_f64());

    counter!("jwks_token_issuance_total", "status" => status.to_string(), "expired" => expired.to_string())
        .increment(1);
}

// ============================================================================
// Key Management Metrics
// ============================================================================

/// Record RSA key pair generation time
///
/// Metric: `jwks_key_generation_duration_seconds`
pub fn record_key_generation(duration: Duration) {
    histogram!("jwks_key_generation_duration_seconds").record(duration.as_secs_f64());
}

/// Record one reaper pass
///
/// Metric: `jwks_reaper_runs_total`, `jwks_keys_reaped_total`
/// Labels: `status`
pub fn record_reaper_run(status: &str, removed: u64) {
    counter!("jwks_reaper_runs_total", "status" => status.to_string()).increment(1);
    counter!("jwks_keys_reaped_total").increment(removed);
}

// ============================================================================
// JWKS Metrics
// ============================================================================

/// Record a key set request
///
/// Metric: `jwks_requests_total`
/// Labels: `status`
pub fn record_jwks_request(status: &str) {
    counter!("jwks_requests_total", "status" => status.to_string()).increment(1);
}

/// Number of keys in the most recently published set
///
/// Metric: `jwks_published_keys`
pub fn set_published_keys(count: usize) {
    gauge!("jwks_published_keys").set(count as f64);
}

/// Record a stored key that could not be projected to JWK form
///
/// Metric: `jwks_key_parse_failures_total`
pub fn record_key_parse_failure() {
    counter!("jwks_key_parse_failures_total").increment(1);
}
