//! Integration tests for `GET /.well-known/jwks.json`.

use jwks_service::config::Config;
use jwks_service::models::unix_now;
use jwks_service::repositories::{InMemoryKeyStore, KeyStore};
use jwks_test_utils::{corrupt_key_record, decode_header_unverified, test_key_record, TestJwksServer};
use reqwest::StatusCode;
use std::sync::Arc;

#[tokio::test]
async fn test_jwks_empty_before_any_issuance() -> Result<(), anyhow::Error> {
    let server = TestJwksServer::spawn().await?;

    let response = reqwest::get(format!("{}/.well-known/jwks.json", server.url())).await?;

    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = response.json().await?;
    assert_eq!(body, serde_json::json!({ "keys": [] }));

    Ok(())
}

#[tokio::test]
async fn test_jwks_response_is_not_cacheable() -> Result<(), anyhow::Error> {
    let server = TestJwksServer::spawn().await?;

    let response = reqwest::get(format!("{}/.well-known/jwks.json", server.url())).await?;

    let cache_control = response
        .headers()
        .get(reqwest::header::CACHE_CONTROL)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    assert_eq!(cache_control.as_deref(), Some("no-store"));

    Ok(())
}

#[tokio::test]
async fn test_jwks_key_members() -> Result<(), anyhow::Error> {
    let server = TestJwksServer::spawn().await?;
    let token = server.issue_token(false).await?;

    let body: serde_json::Value =
        reqwest::get(format!("{}/.well-known/jwks.json", server.url()))
            .await?
            .json()
            .await?;

    let keys = body["keys"]
        .as_array()
        .ok_or_else(|| anyhow::anyhow!("keys is not an array"))?;
    assert_eq!(keys.len(), 1);

    let key = &keys[0];
    assert_eq!(key["kty"], "RSA");
    assert_eq!(key["alg"], "RS256");
    assert_eq!(key["use"], "sig");
    assert_eq!(key["e"], "AQAB");
    assert_eq!(
        key["kid"].as_str(),
        decode_header_unverified(&token).kid.as_deref()
    );

    let n = key["n"].as_str().unwrap_or_default();
    assert!(!n.is_empty());
    assert!(!n.contains('=') && !n.contains('+') && !n.contains('/'));

    let members: Vec<&String> = key
        .as_object()
        .map(|o| o.keys().collect())
        .unwrap_or_default();
    assert_eq!(members.len(), 6, "unexpected JWK members: {:?}", members);

    Ok(())
}

#[tokio::test]
async fn test_jwks_lists_keys_in_issuance_order() -> Result<(), anyhow::Error> {
    let server = TestJwksServer::spawn().await?;

    let mut issued = Vec::new();
    for _ in 0..3 {
        let token = server.issue_token(false).await?;
        issued.push(decode_header_unverified(&token).kid);
    }

    let published: Vec<Option<String>> = server
        .fetch_jwks()
        .await?
        .keys
        .into_iter()
        .map(|k| Some(k.kid))
        .collect();

    assert_eq!(published, issued);

    Ok(())
}

#[tokio::test]
async fn test_jwks_repeated_reads_are_identical() -> Result<(), anyhow::Error> {
    let server = TestJwksServer::spawn().await?;
    server.issue_token(false).await?;
    server.issue_token(true).await?;

    let first = server.fetch_jwks().await?;
    let second = server.fetch_jwks().await?;

    assert_eq!(first.keys, second.keys);
    assert_eq!(first.keys.len(), 1);

    Ok(())
}

#[tokio::test]
async fn test_jwks_other_methods_return_405() -> Result<(), anyhow::Error> {
    let server = TestJwksServer::spawn().await?;
    let client = reqwest::Client::new();
    let url = format!("{}/.well-known/jwks.json", server.url());

    let responses = [
        client.post(&url).send().await?,
        client.put(&url).send().await?,
        client.patch(&url).send().await?,
        client.delete(&url).send().await?,
    ];

    for response in responses {
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    Ok(())
}

#[tokio::test]
async fn test_jwks_excludes_malformed_key_but_serves_the_rest() -> Result<(), anyhow::Error> {
    let store: Arc<dyn KeyStore> = Arc::new(InMemoryKeyStore::new());
    let now = unix_now();
    store.insert(test_key_record("good-1", now + 3600)).await?;
    store.insert(corrupt_key_record("broken", now + 3600)).await?;
    store.insert(test_key_record("good-2", now + 3600)).await?;
    store.insert(test_key_record("stale", now - 10)).await?;

    let server = TestJwksServer::spawn_with_store(store, Config::default()).await?;

    let kids: Vec<String> = server
        .fetch_jwks()
        .await?
        .keys
        .into_iter()
        .map(|k| k.kid)
        .collect();

    assert_eq!(kids, vec!["good-1".to_string(), "good-2".to_string()]);

    Ok(())
}
