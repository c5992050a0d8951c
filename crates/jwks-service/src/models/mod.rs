use chrono::Utc;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Signing algorithm of every key this service generates.
pub const SIGNING_ALGORITHM: &str = "RS256";

/// Current time as whole seconds since the Unix epoch.
pub fn unix_now() -> i64 {
    Utc::now().timestamp()
}

/// One asymmetric signing key and its metadata (maps to the `keys` table).
///
/// Fields are private: once constructed, a record is never mutated. Validity
/// is derived from `expires_at` on every query rather than stored.
pub struct KeyRecord {
    kid: String,
    public_key: String,
    private_key: SecretString,
    algorithm: String,
    expires_at: i64,
}

impl KeyRecord {
    /// Assemble a record from its parts.
    ///
    /// `public_key` is an SPKI PEM document and `private_key` a PKCS#8 PEM
    /// document. `expires_at` is seconds since the Unix epoch.
    pub fn new(
        kid: String,
        public_key: String,
        private_key: SecretString,
        algorithm: String,
        expires_at: i64,
    ) -> Self {
        Self {
            kid,
            public_key,
            private_key,
            algorithm,
            expires_at,
        }
    }

    pub fn kid(&self) -> &str {
        &self.kid
    }

    pub fn public_key(&self) -> &str {
        &self.public_key
    }

    pub fn private_key(&self) -> &SecretString {
        &self.private_key
    }

    pub fn algorithm(&self) -> &str {
        &self.algorithm
    }

    pub fn expires_at(&self) -> i64 {
        self.expires_at
    }

    /// A record is valid strictly before its expiration instant.
    pub fn is_valid_at(&self, now: i64) -> bool {
        now < self.expires_at
    }
}

impl Clone for KeyRecord {
    fn clone(&self) -> Self {
        Self {
            kid: self.kid.clone(),
            public_key: self.public_key.clone(),
            private_key: SecretString::from(self.private_key.expose_secret().to_string()),
            algorithm: self.algorithm.clone(),
            expires_at: self.expires_at,
        }
    }
}

impl fmt::Debug for KeyRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyRecord")
            .field("kid", &self.kid)
            .field("algorithm", &self.algorithm)
            .field("expires_at", &self.expires_at)
            .field("private_key", &"[REDACTED]")
            .finish()
    }
}

/// JWKS response (RFC 7517)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Jwks {
    pub keys: Vec<JsonWebKey>,
}

/// JSON Web Key for an RSA signing key (RFC 7517 / RFC 7518 section 6.3)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JsonWebKey {
    pub kty: String, // Key Type ("RSA")
    pub kid: String, // Key ID
    pub alg: String, // Algorithm ("RS256")
    #[serde(rename = "use")]
    pub use_: String, // Public key use ("sig")
    pub n: String,   // Modulus (base64url, unpadded)
    pub e: String,   // Public exponent (base64url, unpadded)
}

/// Token response for `POST /auth`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub token: String,
}

/// Query string of `POST /auth`
#[derive(Debug, Default, Deserialize)]
pub struct AuthQuery {
    pub expired: Option<String>,
}

impl AuthQuery {
    /// Only the literal `true` requests an expired token.
    pub fn force_expired(&self) -> bool {
        self.expired.as_deref() == Some("true")
    }
}
