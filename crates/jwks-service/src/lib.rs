//! JWKS Service Library
//!
//! Issues RS256-signed tokens backed by short-lived RSA signing keys and
//! publishes the matching public keys as a JSON Web Key Set.
//!
//! # Modules
//!
//! - `config` - Service configuration
//! - `crypto` - Cryptographic operations (RSA key pairs, JWT signing, base64url)
//! - `errors` - Error types
//! - `handlers` - HTTP request handlers
//! - `models` - Data models (key records, JWKS wire types)
//! - `repositories` - Key store trait and its in-memory / SQLite backends
//! - `routes` - Router construction
//! - `services` - Key generation, JWKS publication, token issuance
//! - `tasks` - Background tasks (expired key reaping)

pub mod config;
pub mod crypto;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod observability;
pub mod repositories;
pub mod routes;
pub mod services;
pub mod tasks;
