use crate::crypto::{base64url_encode, parse_public_key};
use crate::errors::JwksError;
use crate::models::{Jwks, JsonWebKey, KeyRecord};
use crate::observability::metrics::{record_key_parse_failure, set_published_keys};
use crate::repositories::KeyStore;
use rsa::traits::PublicKeyParts;
use tracing::instrument;

/// JWK `kty` for RSA keys.
pub const KEY_TYPE_RSA: &str = "RSA";

/// JWK `use` for signature keys.
pub const KEY_USE_SIGNATURE: &str = "sig";

/// Result of projecting records into JWK form.
///
/// Records whose public key cannot be decomposed are kept out of `keys` and
/// reported in `rejected` instead of being dropped silently.
#[derive(Debug, Default)]
pub struct Publication {
    pub keys: Vec<JsonWebKey>,
    pub rejected: Vec<JwksError>,
}

/// Decompose one record's public key into an RSA JWK.
///
/// Modulus and exponent are big-endian unsigned integers without leading
/// zero bytes, encoded as unpadded base64url.
pub fn to_json_web_key(record: &KeyRecord) -> Result<JsonWebKey, JwksError> {
    let public_key = parse_public_key(record.public_key()).map_err(|reason| JwksError::KeyParse {
        kid: record.kid().to_string(),
        reason,
    })?;

    Ok(JsonWebKey {
        kty: KEY_TYPE_RSA.to_string(),
        kid: record.kid().to_string(),
        alg: record.algorithm().to_string(),
        use_: KEY_USE_SIGNATURE.to_string(),
        n: base64url_encode(&public_key.n().to_bytes_be()),
        e: base64url_encode(&public_key.e().to_bytes_be()),
    })
}

/// Project records into JWKs, preserving their order.
///
/// No time comparison happens here; callers pass records already filtered
/// by [`KeyStore::list_valid`].
pub fn publish(records: &[KeyRecord]) -> Publication {
    let mut publication = Publication::default();

    for record in records {
        match to_json_web_key(record) {
            Ok(jwk) => publication.keys.push(jwk),
            Err(e) => publication.rejected.push(e),
        }
    }

    publication
}

/// Build the key set served at `/.well-known/jwks.json`.
///
/// Keys that fail to parse are excluded from the set and logged at error
/// level with their kid.
#[instrument(skip_all, fields(published, rejected))]
pub async fn get_jwks(store: &dyn KeyStore, now: i64) -> Result<Jwks, JwksError> {
    let records = store.list_valid(now).await?;
    let Publication { keys, rejected } = publish(&records);

    for error in &rejected {
        record_key_parse_failure();
        tracing::error!(target: "jwks.publisher", error = %error, "Excluding malformed key from JWKS");
    }

    let span = tracing::Span::current();
    span.record("published", keys.len());
    span.record("rejected", rejected.len());
    set_published_keys(keys.len());

    Ok(Jwks { keys })
}
