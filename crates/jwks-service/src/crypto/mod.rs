use crate::errors::JwksError;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use jsonwebtoken::{decode, decode_header, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use ring::rand::{SecureRandom, SystemRandom};
use rsa::pkcs8::{DecodePublicKey, EncodePrivateKey, EncodePublicKey, LineEnding};
use rsa::{RsaPrivateKey, RsaPublicKey};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::instrument;

/// RSA modulus size for signing keys.
pub const RSA_KEY_BITS: usize = 2048;

/// Random bytes behind each key id (128 bits).
pub const KID_BYTES: usize = 16;

/// Maximum allowed JWT size in bytes (4KB).
///
/// Tokens larger than this are rejected before any base64 decoding or
/// signature work. Our tokens are ~600 bytes (RS256 signature, three claims).
const MAX_JWT_SIZE_BYTES: usize = 4096;

/// JWT Claims structure.
///
/// A custom Debug implementation redacts `sub`.
#[derive(Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // Subject
    pub iat: i64,    // Issued at timestamp
    pub exp: i64,    // Expiration timestamp
}

impl fmt::Debug for Claims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Claims")
            .field("sub", &"[REDACTED]")
            .field("iat", &self.iat)
            .field("exp", &self.exp)
            .finish()
    }
}

/// PEM-encoded RSA key pair.
pub struct RsaKeyPair {
    /// SPKI ("BEGIN PUBLIC KEY") PEM.
    pub public_key_pem: String,
    /// PKCS#8 ("BEGIN PRIVATE KEY") PEM.
    pub private_key_pem: SecretString,
}

impl fmt::Debug for RsaKeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RsaKeyPair")
            .field("public_key_pem", &self.public_key_pem)
            .field("private_key_pem", &"[REDACTED]")
            .finish()
    }
}

/// Generate an RSA key pair of `bits` modulus size using the OS CSPRNG.
///
/// This is CPU-bound (hundreds of milliseconds for 2048 bits); async callers
/// run it on the blocking pool.
#[instrument(skip_all, fields(bits = bits))]
pub fn generate_rsa_key_pair(bits: usize) -> Result<RsaKeyPair, JwksError> {
    let mut rng = rand::rngs::OsRng;

    let private_key = RsaPrivateKey::new(&mut rng, bits)
        .map_err(|e| JwksError::KeyGeneration(format!("RSA keypair generation failed: {}", e)))?;

    let private_key_pem = private_key
        .to_pkcs8_pem(LineEnding::LF)
        .map_err(|e| JwksError::KeyGeneration(format!("PKCS#8 encoding failed: {}", e)))?;

    let public_key_pem = RsaPublicKey::from(&private_key)
        .to_public_key_pem(LineEnding::LF)
        .map_err(|e| JwksError::KeyGeneration(format!("SPKI encoding failed: {}", e)))?;

    Ok(RsaKeyPair {
        public_key_pem,
        private_key_pem: SecretString::from(private_key_pem.as_str().to_string()),
    })
}

/// Generate a key id: 128 random bits, lowercase hex.
pub fn generate_kid() -> Result<String, JwksError> {
    let rng = SystemRandom::new();
    let mut bytes = [0u8; KID_BYTES];
    rng.fill(&mut bytes)
        .map_err(|e| JwksError::KeyGeneration(format!("Key id generation failed: {}", e)))?;
    Ok(hex::encode(bytes))
}

/// Parse an SPKI PEM public key.
pub fn parse_public_key(public_key_pem: &str) -> Result<RsaPublicKey, String> {
    RsaPublicKey::from_public_key_pem(public_key_pem).map_err(|e| e.to_string())
}

/// Unpadded base64url (RFC 4648 section 5), as used for JWK members.
///
/// Identical to standard base64 with `+` -> `-`, `/` -> `_` and `=` stripped.
pub fn base64url_encode(bytes: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Decode unpadded base64url.
pub fn base64url_decode(encoded: &str) -> Result<Vec<u8>, base64::DecodeError> {
    URL_SAFE_NO_PAD.decode(encoded)
}

/// Sign claims with an RS256 private key, embedding `kid` in the header.
#[instrument(skip_all)]
pub fn sign_jwt(claims: &Claims, private_key: &SecretString, kid: &str) -> Result<String, JwksError> {
    let encoding_key = EncodingKey::from_rsa_pem(private_key.expose_secret().as_bytes())
        .map_err(|e| JwksError::Signing(format!("Invalid private key format: {}", e)))?;

    let mut header = Header::new(Algorithm::RS256);
    header.typ = Some("JWT".to_string());
    header.kid = Some(kid.to_string());

    encode(&header, claims, &encoding_key)
        .map_err(|e| JwksError::Signing(format!("JWT signing operation failed: {}", e)))
}

/// Extract the `kid` from a JWT header without verifying the signature.
///
/// Returns `None` for oversized or malformed tokens and for headers without a
/// kid. The token must still be verified against the key this selects.
#[instrument(skip_all)]
pub fn extract_jwt_kid(token: &str) -> Option<String> {
    if token.len() > MAX_JWT_SIZE_BYTES {
        return None;
    }

    decode_header(token).ok()?.kid
}

/// Verify an RS256 token against an SPKI PEM public key.
///
/// Checks size, signature, and `exp` (with jsonwebtoken's default leeway).
#[instrument(skip_all)]
pub fn verify_jwt(token: &str, public_key_pem: &str) -> Result<Claims, JwksError> {
    if token.len() > MAX_JWT_SIZE_BYTES {
        tracing::debug!(
            target: "jwks.crypto",
            token_size = token.len(),
            max_size = MAX_JWT_SIZE_BYTES,
            "Token rejected: size exceeds maximum allowed"
        );
        return Err(JwksError::InvalidToken("token too large".to_string()));
    }

    let decoding_key = DecodingKey::from_rsa_pem(public_key_pem.as_bytes()).map_err(|e| {
        tracing::debug!(target: "jwks.crypto", error = %e, "Invalid public key encoding");
        JwksError::InvalidToken("invalid verification key".to_string())
    })?;

    let validation = Validation::new(Algorithm::RS256);

    decode::<Claims>(token, &decoding_key, &validation)
        .map(|data| data.claims)
        .map_err(|e| {
            tracing::debug!(target: "jwks.crypto", error = %e, "Token verification failed");
            JwksError::InvalidToken(e.to_string())
        })
}
