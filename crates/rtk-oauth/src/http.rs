//! Token endpoint request/response handling (§4.C) and OAuth2 error
//! classification (§4.D).

use std::collections::BTreeSet;
use std::time::{Duration, Instant};

use reqwest::{Client, StatusCode};
use rtk_error::{ErrorCode, RtkError};
use serde::Deserialize;

use crate::config::OAuth2Config;
use crate::retry::RefreshError;
use crate::token::{OAuth2Token, TokenType};

#[derive(Debug, Deserialize)]
struct TokenSuccessBody {
    access_token: String,
    #[serde(default)]
    token_type: Option<String>,
    expires_in: i64,
    #[serde(default)]
    scope: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct TokenErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    #[allow(dead_code)]
    error_description: Option<String>,
}

/// Maps an OAuth2 `error` field (§4.D table) to a stable [`ErrorCode`].
#[must_use]
pub fn classify_oauth_error(code: &str) -> ErrorCode {
    match code {
        "invalid_client" | "invalid_grant" => ErrorCode::InvalidCredentials,
        "invalid_request" | "invalid_scope" | "unsupported_grant_type" => ErrorCode::InvalidConfiguration,
        _ => ErrorCode::ServiceUnavailable,
    }
}

/// Performs one refresh attempt: POSTs the form body, parses the
/// response, and returns either a fresh token or a classified/transport
/// error (§4.C).
pub async fn fetch_token(client: &Client, config: &OAuth2Config) -> Result<OAuth2Token, RefreshError> {
    let response = client
        .post(&config.token_endpoint)
        .header("Content-Type", "application/x-www-form-urlencoded")
        .form(&config.form_body())
        .send()
        .await
        .map_err(RefreshError::Transport)?;

    let status = response.status();
    let body_text = response.text().await.map_err(RefreshError::Transport)?;

    if status.is_success() {
        parse_success(&body_text).map_err(RefreshError::Classified)
    } else {
        Err(RefreshError::Classified(classify_failure(status, &body_text)))
    }
}

fn parse_success(body_text: &str) -> Result<OAuth2Token, RtkError> {
    let body: TokenSuccessBody = serde_json::from_str(body_text)
        .map_err(|_| RtkError::new(ErrorCode::ServiceUnavailable, "malformed token response"))?;

    if body.access_token.trim().is_empty() {
        return Err(RtkError::new(ErrorCode::ServiceUnavailable, "malformed token response: empty access_token"));
    }
    if body.expires_in < 0 {
        return Err(RtkError::new(ErrorCode::ServiceUnavailable, "malformed token response: negative expires_in"));
    }

    let issued_at = Instant::now();
    let expires_at = issued_at + Duration::from_secs(body.expires_in as u64);
    let token_type = body.token_type.as_deref().map(TokenType::parse).unwrap_or(TokenType::Bearer);
    let scopes: BTreeSet<String> = body
        .scope
        .unwrap_or_default()
        .split_whitespace()
        .map(str::to_owned)
        .collect();

    Ok(OAuth2Token::new(body.access_token, token_type, issued_at, expires_at, scopes))
}

fn classify_failure(status: StatusCode, body_text: &str) -> RtkError {
    if let Ok(error_body) = serde_json::from_str::<TokenErrorBody>(body_text) {
        if let Some(code) = error_body.error.filter(|s| !s.is_empty()) {
            let message = format!("token endpoint rejected the request: {code}");
            return RtkError::new(classify_oauth_error(&code), message);
        }
    }

    let message = format!("token endpoint returned HTTP {status}");
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        RtkError::new(ErrorCode::InvalidCredentials, message)
    } else if status.is_server_error() {
        RtkError::new(ErrorCode::ServiceUnavailable, message)
    } else {
        RtkError::new(ErrorCode::InvalidEndpoint, message)
    }
}
