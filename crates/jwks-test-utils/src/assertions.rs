//! Custom test assertions for expressive tests
//!
//! Provides trait-based assertions for issued tokens, plus helpers that
//! decode tokens without verification or verify them against a published JWK.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use jwks_service::models::JsonWebKey;
use serde::Deserialize;

/// JWT header structure
#[derive(Debug, Clone, Deserialize)]
pub struct TokenHeader {
    pub alg: String,
    pub typ: String,
    #[serde(default)]
    pub kid: Option<String>,
}

/// JWT claims structure
#[derive(Debug, Clone, Deserialize)]
pub struct TokenClaims {
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}

fn segment(token: &str, index: usize) -> Vec<u8> {
    let part = token
        .split('.')
        .nth(index)
        .unwrap_or_else(|| panic!("JWT has no segment {}", index));
    URL_SAFE_NO_PAD
        .decode(part)
        .unwrap_or_else(|e| panic!("Failed to base64 decode JWT segment {}: {}", index, e))
}

/// Decode the header without checking the signature.
pub fn decode_header_unverified(token: &str) -> TokenHeader {
    serde_json::from_slice(&segment(token, 0)).expect("Failed to parse JWT header")
}

/// Decode the claims without checking the signature.
pub fn decode_claims_unverified(token: &str) -> TokenClaims {
    serde_json::from_slice(&segment(token, 1)).expect("Failed to parse JWT claims")
}

/// Verify an RS256 token against a JWK's modulus and exponent.
///
/// With `validate_exp` false the signature is checked but expiry is not,
/// which is how expired tokens are tied back to their key.
pub fn verify_with_jwk(
    token: &str,
    jwk: &JsonWebKey,
    validate_exp: bool,
) -> Result<TokenClaims, jsonwebtoken::errors::Error> {
    let key = DecodingKey::from_rsa_components(&jwk.n, &jwk.e)?;
    let mut validation = Validation::new(Algorithm::RS256);
    validation.validate_exp = validate_exp;
    if !validate_exp {
        validation.required_spec_claims.remove("exp");
    }
    decode::<TokenClaims>(token, &key, &validation).map(|data| data.claims)
}

/// Custom assertions for issued tokens
///
/// # Example
/// ```rust,ignore
/// token
///     .assert_valid_jwt()
///     .assert_for_subject("user123")
///     .assert_signed_by(&kid);
/// ```
pub trait TokenAssertions {
    /// Assert RS256 JWT structure with a kid and the three expected claims
    fn assert_valid_jwt(&self) -> &Self;

    /// Assert that the token header carries the specified kid
    fn assert_signed_by(&self, kid: &str) -> &Self;

    /// Assert that the token expires within the specified seconds
    fn assert_expires_in(&self, seconds: u64) -> &Self;

    /// Assert that the token's `exp` is already in the past
    fn assert_expired(&self) -> &Self;

    /// Assert that the token is for the specified subject
    fn assert_for_subject(&self, subject: &str) -> &Self;
}

impl TokenAssertions for String {
    fn assert_valid_jwt(&self) -> &Self {
        let parts = self.split('.').count();
        assert_eq!(
            parts, 3,
            "JWT must have 3 parts (header.payload.signature), got {}",
            parts
        );

        let header = decode_header_unverified(self);
        assert_eq!(header.alg, "RS256", "Expected RS256 algorithm");
        assert_eq!(header.typ, "JWT", "Expected JWT type");
        assert!(header.kid.is_some(), "Expected a kid in the JWT header");

        let claims = decode_claims_unverified(self);
        assert!(claims.iat > 0, "Expected a positive iat");

        self
    }

    fn assert_signed_by(&self, kid: &str) -> &Self {
        let header = decode_header_unverified(self);
        assert_eq!(
            header.kid.as_deref(),
            Some(kid),
            "Expected kid '{}', got {:?}",
            kid,
            header.kid
        );

        self
    }

    fn assert_expires_in(&self, seconds: u64) -> &Self {
        let claims = decode_claims_unverified(self);
        let now = chrono::Utc::now().timestamp();
        let expires_in = claims.exp - now;

        // Allow 5-second tolerance for slow key generation
        assert!(
            (expires_in - seconds as i64).abs() <= 5,
            "Expected token to expire in {} seconds, but expires in {} seconds",
            seconds,
            expires_in
        );

        self
    }

    fn assert_expired(&self) -> &Self {
        let claims = decode_claims_unverified(self);
        let now = chrono::Utc::now().timestamp();
        assert!(
            claims.exp < now,
            "Expected an expired token, but exp {} is not before now {}",
            claims.exp,
            now
        );

        self
    }

    fn assert_for_subject(&self, subject: &str) -> &Self {
        let claims = decode_claims_unverified(self);
        assert_eq!(
            claims.sub, subject,
            "Expected subject '{}', got '{}'",
            subject, claims.sub
        );

        self
    }
}
