//! Integration tests for the expiry reaper running alongside the server.

use jwks_service::config::Config;
use jwks_service::repositories::{InMemoryKeyStore, KeyStore};
use jwks_test_utils::{decode_header_unverified, TestJwksServer};
use std::sync::Arc;
use std::time::Duration;

async fn wait_until_gone(store: &Arc<dyn KeyStore>, kid: &str) -> Result<bool, anyhow::Error> {
    for _ in 0..50 {
        if store.find_by_kid(kid).await?.is_none() {
            return Ok(true);
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    Ok(false)
}

#[tokio::test]
async fn test_reaper_removes_expired_key_and_keeps_valid_one() -> Result<(), anyhow::Error> {
    let config = Config {
        reaper_interval_seconds: 1,
        ..Config::default()
    };
    let server =
        TestJwksServer::spawn_with_reaper(Arc::new(InMemoryKeyStore::new()), config).await?;

    let valid = server.issue_token(false).await?;
    let expired = server.issue_token(true).await?;

    let valid_kid = decode_header_unverified(&valid)
        .kid
        .ok_or_else(|| anyhow::anyhow!("token has no kid"))?;
    let expired_kid = decode_header_unverified(&expired)
        .kid
        .ok_or_else(|| anyhow::anyhow!("token has no kid"))?;

    assert!(
        wait_until_gone(server.store(), &expired_kid).await?,
        "expired key should be reaped within a few intervals"
    );
    assert!(server.store().find_by_kid(&valid_kid).await?.is_some());

    let jwks = server.fetch_jwks().await?;
    assert_eq!(jwks.keys.len(), 1);
    assert_eq!(jwks.keys[0].kid, valid_kid);

    server.shutdown().await?;

    Ok(())
}

#[tokio::test]
async fn test_reaping_does_not_change_published_set() -> Result<(), anyhow::Error> {
    let store: Arc<dyn KeyStore> = Arc::new(InMemoryKeyStore::new());
    let server = TestJwksServer::spawn_with_store(store.clone(), Config::default()).await?;

    server.issue_token(false).await?;
    server.issue_token(true).await?;

    let before = server.fetch_jwks().await?;
    let removed = store.remove_expired(jwks_service::models::unix_now()).await?;
    let after = server.fetch_jwks().await?;

    assert_eq!(removed, 1);
    assert_eq!(before.keys, after.keys);

    Ok(())
}
