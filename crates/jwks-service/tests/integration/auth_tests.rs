//! Integration tests for `POST /auth`.

use jsonwebtoken::errors::ErrorKind;
use jwks_service::models::unix_now;
use jwks_service::repositories::KeyStore;
use jwks_service::services::jwks_publisher::to_json_web_key;
use jwks_test_utils::{
    decode_claims_unverified, decode_header_unverified, verify_with_jwk, TestJwksServer,
    TokenAssertions,
};
use reqwest::StatusCode;

// ============================================================================
// Normal tokens
// ============================================================================

#[tokio::test]
async fn test_auth_returns_rs256_token_for_default_subject() -> Result<(), anyhow::Error> {
    let server = TestJwksServer::spawn().await?;

    let response = reqwest::Client::new()
        .post(format!("{}/auth", server.url()))
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(content_type.starts_with("application/json"));

    let body: serde_json::Value = response.json().await?;
    let token = body["token"].as_str().unwrap_or_default().to_string();

    token
        .assert_valid_jwt()
        .assert_for_subject("user123")
        .assert_expires_in(3600);

    Ok(())
}

#[tokio::test]
async fn test_token_kid_is_published_and_signature_verifies() -> Result<(), anyhow::Error> {
    let server = TestJwksServer::spawn().await?;

    let token = server.issue_token(false).await?;
    let kid = decode_header_unverified(&token)
        .kid
        .ok_or_else(|| anyhow::anyhow!("token has no kid"))?;

    let jwks = server.fetch_jwks().await?;
    let jwk = jwks
        .keys
        .iter()
        .find(|k| k.kid == kid)
        .ok_or_else(|| anyhow::anyhow!("kid {} not published", kid))?;

    let claims = verify_with_jwk(&token, jwk, true)?;
    assert_eq!(claims.sub, "user123");

    let record = server
        .store()
        .find_by_kid(&kid)
        .await?
        .ok_or_else(|| anyhow::anyhow!("kid {} not stored", kid))?;
    assert_eq!(claims.exp, record.expires_at());

    Ok(())
}

#[tokio::test]
async fn test_unrecognized_expired_values_issue_normal_tokens() -> Result<(), anyhow::Error> {
    let server = TestJwksServer::spawn().await?;
    let client = reqwest::Client::new();

    for query in ["?expired=false", "?expired=TRUE", "?expired=1", "?expired=", "?other=x"] {
        let response = client
            .post(format!("{}/auth{}", server.url(), query))
            .send()
            .await?;
        assert_eq!(response.status(), StatusCode::OK, "query {}", query);

        let body: serde_json::Value = response.json().await?;
        let token = body["token"].as_str().unwrap_or_default().to_string();
        let claims = decode_claims_unverified(&token);
        assert!(claims.exp > unix_now(), "query {} produced an expired token", query);
    }

    Ok(())
}

#[tokio::test]
async fn test_each_request_uses_a_new_key() -> Result<(), anyhow::Error> {
    let server = TestJwksServer::spawn().await?;

    let first = server.issue_token(false).await?;
    let second = server.issue_token(false).await?;

    let first_kid = decode_header_unverified(&first).kid;
    let second_kid = decode_header_unverified(&second).kid;
    assert!(first_kid.is_some());
    assert_ne!(first_kid, second_kid);

    assert_eq!(server.fetch_jwks().await?.keys.len(), 2);

    Ok(())
}

// ============================================================================
// Forced-expired tokens
// ============================================================================

#[tokio::test]
async fn test_expired_token_kid_absent_from_jwks() -> Result<(), anyhow::Error> {
    let server = TestJwksServer::spawn().await?;

    let token = server.issue_token(true).await?;
    token.assert_valid_jwt().assert_expired();

    let kid = decode_header_unverified(&token)
        .kid
        .ok_or_else(|| anyhow::anyhow!("token has no kid"))?;

    let jwks = server.fetch_jwks().await?;
    assert!(
        jwks.keys.iter().all(|k| k.kid != kid),
        "expired kid must not be published"
    );

    Ok(())
}

#[tokio::test]
async fn test_expired_token_is_signed_by_its_stored_key() -> Result<(), anyhow::Error> {
    let server = TestJwksServer::spawn().await?;

    let token = server.issue_token(true).await?;
    let kid = decode_header_unverified(&token)
        .kid
        .ok_or_else(|| anyhow::anyhow!("token has no kid"))?;

    let record = server
        .store()
        .find_by_kid(&kid)
        .await?
        .ok_or_else(|| anyhow::anyhow!("expired key should stay stored until reaped"))?;
    assert!(record.expires_at() < unix_now());

    let jwk = to_json_web_key(&record)?;

    let claims = verify_with_jwk(&token, &jwk, false)?;
    assert_eq!(claims.exp, record.expires_at());

    let err = verify_with_jwk(&token, &jwk, true)
        .err()
        .ok_or_else(|| anyhow::anyhow!("expired token must fail expiry validation"))?;
    assert!(matches!(err.kind(), ErrorKind::ExpiredSignature));

    Ok(())
}

#[tokio::test]
async fn test_expired_then_normal_publishes_only_normal() -> Result<(), anyhow::Error> {
    let server = TestJwksServer::spawn().await?;

    let expired = server.issue_token(true).await?;
    let normal = server.issue_token(false).await?;

    let jwks = server.fetch_jwks().await?;
    let kids: Vec<Option<String>> = jwks.keys.iter().map(|k| Some(k.kid.clone())).collect();

    assert_eq!(kids, vec![decode_header_unverified(&normal).kid]);
    assert!(!kids.contains(&decode_header_unverified(&expired).kid));

    Ok(())
}

// ============================================================================
// Method routing
// ============================================================================

#[tokio::test]
async fn test_auth_other_methods_return_405() -> Result<(), anyhow::Error> {
    let server = TestJwksServer::spawn().await?;
    let client = reqwest::Client::new();
    let url = format!("{}/auth", server.url());

    let responses = [
        client.get(&url).send().await?,
        client.put(&url).send().await?,
        client.patch(&url).send().await?,
        client.delete(&url).send().await?,
        client.head(&url).send().await?,
    ];

    for response in responses {
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    assert!(server.fetch_jwks().await?.keys.is_empty());

    Ok(())
}
