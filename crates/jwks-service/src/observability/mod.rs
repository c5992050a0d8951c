//! Observability for the JWKS service
//!
//! Handlers and services use `#[instrument(skip_all)]` so key material never
//! lands in span fields; kid values are recorded explicitly where useful.

pub mod metrics;

pub use metrics::{
    init_metrics_recorder, record_jwks_request, record_key_generation, record_key_parse_failure,
    record_reaper_run, record_token_issuance, set_published_keys,
};
