//! Resolve workflow tests: fetch, create, rotate and the expiry rules,
//! against a mock vault.

mod common;

use chrono::{Duration, Utc};
use common::{bundle, client_for, secret_not_found};
use secrets_akv::secrets::{GenerationPolicy, ResolveError, ResolveOutcome};
use secrets_akv::{SecretAddress, SecretResolver};
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn address(key: &str) -> SecretAddress {
    SecretAddress::new("kv", key, None)
}

/// Value the resolver wrote with its last PUT.
async fn written_value(server: &MockServer) -> String {
    let requests = server.received_requests().await.unwrap();
    let put = requests.iter().rev().find(|request| request.method.as_str() == "PUT").expect("a PUT request");
    let body: serde_json::Value = serde_json::from_slice(&put.body).unwrap();
    body["value"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn current_secret_is_returned_without_writing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/secrets/db/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(bundle(&server, "db", "v1", "stored")))
        .mount(&server)
        .await;
    Mock::given(method("PUT")).respond_with(ResponseTemplate::new(500)).expect(0).mount(&server).await;

    let resolved = SecretResolver::new(client_for(&server))
        .resolve(&address("db"), &GenerationPolicy::default())
        .await
        .unwrap();

    assert_eq!(resolved.outcome, ResolveOutcome::Existing);
    assert_eq!(resolved.value.expose_secret(), "stored");
}

#[tokio::test]
async fn missing_secret_is_created() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/secrets/new-key/"))
        .respond_with(ResponseTemplate::new(404).set_body_json(secret_not_found("new-key")))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/secrets/new-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(bundle(&server, "new-key", "v1", "ignored")))
        .expect(1)
        .mount(&server)
        .await;

    let resolved = SecretResolver::new(client_for(&server))
        .resolve(&address("new-key"), &GenerationPolicy::nist(24))
        .await
        .unwrap();

    assert_eq!(resolved.outcome, ResolveOutcome::Created);
    assert_eq!(resolved.version.as_deref(), Some("v1"));
    assert_eq!(resolved.value.char_count(), 24);
    assert_eq!(written_value(&server).await, resolved.value.expose_secret());
}

#[tokio::test]
async fn expired_secret_tagged_for_rotation_is_replaced() {
    let server = MockServer::start().await;
    let expired = (Utc::now() - Duration::days(1)).timestamp();
    Mock::given(method("GET"))
        .and(path("/secrets/rotating/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": "old",
            "id": format!("{}/secrets/rotating/v1", server.uri()),
            "attributes": { "enabled": true, "exp": expired },
            "tags": { "auto-rotate": "true" }
        })))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/secrets/rotating"))
        .respond_with(ResponseTemplate::new(200).set_body_json(bundle(&server, "rotating", "v2", "ignored")))
        .expect(1)
        .mount(&server)
        .await;

    let resolved = SecretResolver::new(client_for(&server))
        .resolve(&address("rotating"), &GenerationPolicy::custom(12, "abc"))
        .await
        .unwrap();

    assert_eq!(resolved.outcome, ResolveOutcome::Rotated);
    assert_eq!(resolved.version.as_deref(), Some("v2"));
    assert_ne!(resolved.value.expose_secret(), "old");
    assert!(resolved.value.expose_secret().chars().all(|c| "abc".contains(c)));
    assert_eq!(written_value(&server).await, resolved.value.expose_secret());
}

#[tokio::test]
async fn expired_secret_without_rotation_tag_fails() {
    let server = MockServer::start().await;
    let expired = (Utc::now() - Duration::minutes(5)).timestamp();
    Mock::given(method("GET"))
        .and(path("/secrets/stale/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": "old",
            "id": format!("{}/secrets/stale/v1", server.uri()),
            "attributes": { "exp": expired },
            "tags": { "auto-rotate": "yes" }
        })))
        .mount(&server)
        .await;
    Mock::given(method("PUT")).respond_with(ResponseTemplate::new(500)).expect(0).mount(&server).await;

    let err = SecretResolver::new(client_for(&server))
        .resolve(&address("stale"), &GenerationPolicy::default())
        .await
        .unwrap_err();

    match err {
        ResolveError::SecretExpired { key, expired_at } => {
            assert_eq!(key, "stale");
            assert_eq!(expired_at.timestamp(), expired);
        }
        other => panic!("expected SecretExpired, got {:?}", other),
    }
}

#[tokio::test]
async fn other_fetch_errors_are_not_treated_as_missing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/secrets/db/"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": { "code": "VaultNotFound", "message": "gone" }
        })))
        .mount(&server)
        .await;
    Mock::given(method("PUT")).respond_with(ResponseTemplate::new(500)).expect(0).mount(&server).await;

    let err = SecretResolver::new(client_for(&server))
        .resolve(&address("db"), &GenerationPolicy::default())
        .await
        .unwrap_err();

    assert!(matches!(err, ResolveError::SecretFetchFailed(_)));
}

#[tokio::test]
async fn rejected_write_is_a_set_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/secrets/db/"))
        .respond_with(ResponseTemplate::new(404).set_body_json(secret_not_found("db")))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/secrets/db"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "error": { "code": "Forbidden", "message": "no set permission" }
        })))
        .mount(&server)
        .await;

    let err = SecretResolver::new(client_for(&server))
        .resolve(&address("db"), &GenerationPolicy::default())
        .await
        .unwrap_err();

    assert!(matches!(err, ResolveError::SecretSetFailed(_)));
}
