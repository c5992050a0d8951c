//! Background tasks for the JWKS service.
//!
//! # Tasks
//!
//! - `expiry_reaper` - Periodically deletes expired signing keys from the store

pub mod expiry_reaper;

pub use expiry_reaper::{start_expiry_reaper, ExpiryReaperConfig};
