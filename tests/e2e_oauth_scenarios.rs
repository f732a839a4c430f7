// SPDX-License-Identifier: MIT OR Apache-2.0
//! End-to-end token coordinator scenarios, one per numbered case in spec §8.
//!
//! These exercise `TokenCoordinator` against a `wiremock` server exactly as
//! an external caller would — no reaching into `rtk-oauth` internals.

use std::time::Duration;

use reqwest::Client;
use rtk_error::ErrorCode;
use rtk_oauth::{GrantType, OAuth2Config, TokenCoordinator};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config_for(endpoint: &str) -> OAuth2Config {
    OAuth2Config {
        token_endpoint: endpoint.to_owned(),
        client_id: "client".into(),
        client_secret: "secret".into(),
        grant_type: GrantType::ClientCredentials,
        scope: vec![],
        refresh_threshold: Duration::from_secs(30),
        http_timeout: Duration::from_secs(5),
        username: None,
        password: None,
        authorization_code: None,
        redirect_uri: None,
        code_verifier: None,
        refresh_token: None,
        assertion: None,
    }
}

// ---------------------------------------------------------------------------
// 6. Token single-flight
// ---------------------------------------------------------------------------

#[tokio::test(flavor = "multi_thread")]
async fn token_single_flight_ten_callers_one_http_call() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "T1",
            "expires_in": 3600,
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = config_for("");
    config.token_endpoint = format!("{}/token", server.uri());
    let coordinator = TokenCoordinator::with_injected_client(config, Client::new()).unwrap();

    let handles: Vec<_> = (0..10)
        .map(|_| {
            let c = coordinator.clone();
            tokio::spawn(async move { c.get_token().await.unwrap() })
        })
        .collect();

    let mut results = Vec::new();
    for h in handles {
        results.push(h.await.unwrap());
    }
    assert!(results.iter().all(|v| v == "T1"));
    // wiremock's `.expect(1)` is verified when the server drops.
}

// ---------------------------------------------------------------------------
// 7. Token refresh on expiry
// ---------------------------------------------------------------------------

#[tokio::test(flavor = "multi_thread")]
async fn token_refresh_on_expiry_makes_exactly_two_http_calls() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "expired",
            "expires_in": 0,
        })))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "T2",
            "expires_in": 3600,
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = config_for("");
    config.token_endpoint = format!("{}/token", server.uri());
    config.refresh_threshold = Duration::from_secs(3600);
    let coordinator = TokenCoordinator::with_injected_client(config, Client::new()).unwrap();

    let first = coordinator.get_token().await.unwrap();
    assert_eq!(first, "expired");

    let handles: Vec<_> = (0..5)
        .map(|_| {
            let c = coordinator.clone();
            tokio::spawn(async move { c.get_token().await.unwrap() })
        })
        .collect();
    let mut results = Vec::new();
    for h in handles {
        results.push(h.await.unwrap());
    }
    assert!(results.iter().all(|v| v == "T2"));
}

// ---------------------------------------------------------------------------
// 8. Token timeout
// ---------------------------------------------------------------------------

#[tokio::test(flavor = "multi_thread")]
async fn token_timeout_surfaces_service_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"access_token": "T1", "expires_in": 3600}))
                .set_delay(Duration::from_secs(1)),
        )
        .mount(&server)
        .await;

    let mut config = config_for("");
    config.token_endpoint = format!("{}/token", server.uri());
    config.http_timeout = Duration::from_millis(500);
    let coordinator = TokenCoordinator::with_injected_client(config, Client::new()).unwrap();

    let err = coordinator.get_token().await.unwrap_err();
    assert_eq!(err.code, ErrorCode::ServiceUnavailable);
    assert!(err.message.contains("timed out"));
}

// ---------------------------------------------------------------------------
// T3: failure isolation — a failed refresh doesn't wedge the coordinator
// ---------------------------------------------------------------------------

#[tokio::test(flavor = "multi_thread")]
async fn failed_refresh_allows_a_later_successful_one() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({"error": "invalid_grant"})))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "T1",
            "expires_in": 3600,
        })))
        .mount(&server)
        .await;

    let mut config = config_for("");
    config.token_endpoint = format!("{}/token", server.uri());
    let coordinator = TokenCoordinator::with_injected_client(config, Client::new()).unwrap();

    let first = coordinator.get_token().await.unwrap_err();
    assert_eq!(first.code, ErrorCode::InvalidCredentials);

    let second = coordinator.get_token().await.unwrap();
    assert_eq!(second, "T1");
}
