pub mod jwks_publisher;
pub mod key_generator;
pub mod token_issuer;
