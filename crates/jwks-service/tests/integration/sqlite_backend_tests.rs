//! End-to-end tests over the SQLite key store.

use jwks_service::config::Config;
use jwks_service::models::unix_now;
use jwks_service::repositories::{KeyStore, SqliteKeyStore};
use jwks_test_utils::{decode_header_unverified, verify_with_jwk, TestJwksServer, TokenAssertions};
use std::sync::Arc;

async fn sqlite_server() -> Result<TestJwksServer, anyhow::Error> {
    let store: Arc<dyn KeyStore> = Arc::new(SqliteKeyStore::in_memory().await?);
    TestJwksServer::spawn_with_store(store, Config::default()).await
}

#[tokio::test]
async fn test_sqlite_issue_and_verify_against_jwks() -> Result<(), anyhow::Error> {
    let server = sqlite_server().await?;

    let token = server.issue_token(false).await?;
    token.assert_valid_jwt().assert_for_subject("user123");

    let kid = decode_header_unverified(&token)
        .kid
        .ok_or_else(|| anyhow::anyhow!("token has no kid"))?;

    let jwks = server.fetch_jwks().await?;
    let jwk = jwks
        .keys
        .iter()
        .find(|k| k.kid == kid)
        .ok_or_else(|| anyhow::anyhow!("kid {} not published", kid))?;

    verify_with_jwk(&token, jwk, true)?;

    Ok(())
}

#[tokio::test]
async fn test_sqlite_expired_key_stored_but_not_published() -> Result<(), anyhow::Error> {
    let server = sqlite_server().await?;

    let expired = server.issue_token(true).await?;
    let normal = server.issue_token(false).await?;

    let expired_kid = decode_header_unverified(&expired)
        .kid
        .ok_or_else(|| anyhow::anyhow!("token has no kid"))?;

    let jwks = server.fetch_jwks().await?;
    assert_eq!(jwks.keys.len(), 1);
    assert_eq!(Some(jwks.keys[0].kid.clone()), decode_header_unverified(&normal).kid);

    let stored = server
        .store()
        .find_by_kid(&expired_kid)
        .await?
        .ok_or_else(|| anyhow::anyhow!("expired key should be stored"))?;
    assert!(stored.expires_at() < unix_now());

    assert_eq!(server.store().remove_expired(unix_now()).await?, 1);
    assert!(server.store().find_by_kid(&expired_kid).await?.is_none());

    Ok(())
}

#[tokio::test]
async fn test_sqlite_store_unavailable_returns_generic_500() -> Result<(), anyhow::Error> {
    let store = SqliteKeyStore::in_memory().await?;
    store.pool().close().await;
    let server = TestJwksServer::spawn_with_store(Arc::new(store), Config::default()).await?;

    let response = reqwest::get(format!("{}/.well-known/jwks.json", server.url())).await?;
    assert_eq!(response.status(), reqwest::StatusCode::INTERNAL_SERVER_ERROR);

    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["error"]["code"], "STORE_UNAVAILABLE");
    assert_eq!(body["error"]["message"], "An internal error occurred");

    Ok(())
}
