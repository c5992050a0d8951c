//! # JWKS Test Utilities
//!
//! Shared test utilities for the JWKS service.
//!
//! This crate provides:
//! - Server test harness (`TestJwksServer` for E2E tests)
//! - Token assertions and unverified header/claims decoding
//! - Verification of a token against a published JWK
//! - Key record fixtures (real RSA material, corrupt material)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use jwks_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() -> Result<(), anyhow::Error> {
//!     let server = TestJwksServer::spawn().await?;
//!     let token = server.issue_token(false).await?;
//!
//!     token.assert_valid_jwt().assert_for_subject("user123");
//!     Ok(())
//! }
//! ```

pub mod assertions;
pub mod fixtures;
pub mod server_harness;

pub use assertions::*;
pub use fixtures::*;
pub use server_harness::*;
