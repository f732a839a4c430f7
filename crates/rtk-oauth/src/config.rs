//! Coordinator configuration (§6 "Token Coordinator configuration").

use std::time::Duration;

use rtk_error::{ErrorCode, RtkError};
use serde::{Deserialize, Serialize};

/// OAuth2 grant type driving the refresh request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantType {
    /// `client_credentials` — no user-specific fields.
    ClientCredentials,
    /// `password` — requires `username`/`password`.
    Password,
    /// `authorization_code` — requires `authorizationCode`/`redirectUri`.
    AuthorizationCode,
    /// `refresh_token` — requires `refreshToken`.
    RefreshToken,
    /// `jwt_bearer` — requires `assertion`.
    JwtBearer,
    /// `implicit` — always rejected by [`OAuth2Config::validate`].
    Implicit,
}

impl GrantType {
    fn wire_name(self) -> &'static str {
        match self {
            Self::ClientCredentials => "client_credentials",
            Self::Password => "password",
            Self::AuthorizationCode => "authorization_code",
            Self::RefreshToken => "refresh_token",
            Self::JwtBearer => "urn:ietf:params:oauth:grant-type:jwt-bearer",
            Self::Implicit => "implicit",
        }
    }
}

/// Serde helper — `Duration` as integer milliseconds, the same pattern
/// used for every `Duration` field in this workspace's retry/pool
/// configuration types.
mod duration_millis {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(val: &Duration, ser: S) -> Result<S::Ok, S::Error> {
        val.as_millis().serialize(ser)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<Duration, D::Error> {
        let ms: u64 = u64::deserialize(de)?;
        Ok(Duration::from_millis(ms))
    }
}

fn default_grant_type() -> GrantType {
    GrantType::ClientCredentials
}

fn default_refresh_threshold() -> Duration {
    Duration::from_secs(30)
}

fn default_http_timeout() -> Duration {
    Duration::from_secs(10)
}

/// Coordinator configuration (§6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuth2Config {
    /// Token endpoint URL. Must start with `https://`.
    pub token_endpoint: String,
    /// OAuth2 client identifier.
    pub client_id: String,
    /// OAuth2 client secret.
    pub client_secret: String,
    /// Grant type; defaults to `client_credentials`.
    #[serde(default = "default_grant_type")]
    pub grant_type: GrantType,
    /// Requested scopes, space-joined on the wire.
    #[serde(default)]
    pub scope: Vec<String>,
    /// How long before true expiry a token is considered due for
    /// proactive refresh.
    #[serde(default = "default_refresh_threshold", with = "duration_millis")]
    pub refresh_threshold: Duration,
    /// Deadline for a single `get_token` call awaiting a refresh.
    #[serde(default = "default_http_timeout", with = "duration_millis")]
    pub http_timeout: Duration,
    /// Required for `password` grant.
    #[serde(default)]
    pub username: Option<String>,
    /// Required for `password` grant.
    #[serde(default)]
    pub password: Option<String>,
    /// Required for `authorization_code` grant.
    #[serde(default)]
    pub authorization_code: Option<String>,
    /// Required for `authorization_code` grant.
    #[serde(default)]
    pub redirect_uri: Option<String>,
    /// Optional PKCE verifier for `authorization_code` grant.
    #[serde(default)]
    pub code_verifier: Option<String>,
    /// Required for `refresh_token` grant.
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Required for `jwt_bearer` grant.
    #[serde(default)]
    pub assertion: Option<String>,
}

impl OAuth2Config {
    /// Validates every rule in §6's configuration table, returning the
    /// first violation found as `InvalidConfiguration`.
    pub fn validate(&self) -> Result<(), RtkError> {
        let endpoint = url::Url::parse(&self.token_endpoint)
            .map_err(|_| bad_config("tokenEndpoint is not a valid URL"))?;
        if endpoint.scheme() != "https" && !is_loopback(&endpoint) {
            return Err(bad_config("tokenEndpoint must start with https://"));
        }
        if self.client_id.trim().is_empty() {
            return Err(bad_config("clientId must not be blank"));
        }
        if self.client_secret.trim().is_empty() {
            return Err(bad_config("clientSecret must not be blank"));
        }
        if self.grant_type == GrantType::Implicit {
            return Err(bad_config("the implicit grant is not supported"));
        }
        if self.refresh_threshold.is_zero() {
            return Err(bad_config("refreshThreshold must be greater than zero"));
        }
        if self.http_timeout.is_zero() {
            return Err(bad_config("httpTimeout must be greater than zero"));
        }

        match self.grant_type {
            GrantType::Password => {
                if self.username.as_deref().unwrap_or_default().is_empty()
                    || self.password.as_deref().unwrap_or_default().is_empty()
                {
                    return Err(bad_config("password grant requires both username and password"));
                }
            }
            GrantType::AuthorizationCode => {
                if self.authorization_code.as_deref().unwrap_or_default().is_empty()
                    || self.redirect_uri.as_deref().unwrap_or_default().is_empty()
                {
                    return Err(bad_config(
                        "authorization_code grant requires both authorizationCode and redirectUri",
                    ));
                }
            }
            GrantType::RefreshToken => {
                if self.refresh_token.as_deref().unwrap_or_default().is_empty() {
                    return Err(bad_config("refresh_token grant requires refreshToken"));
                }
            }
            GrantType::JwtBearer => {
                if self.assertion.as_deref().unwrap_or_default().is_empty() {
                    return Err(bad_config("jwt_bearer grant requires assertion"));
                }
            }
            GrantType::ClientCredentials | GrantType::Implicit => {}
        }

        Ok(())
    }

    /// Builds the form-urlencoded request body for a refresh (§4.C).
    #[must_use]
    pub fn form_body(&self) -> Vec<(&'static str, String)> {
        let mut body = vec![
            ("grant_type", self.grant_type.wire_name().to_owned()),
            ("client_id", self.client_id.clone()),
            ("client_secret", self.client_secret.clone()),
        ];
        if !self.scope.is_empty() {
            body.push(("scope", self.scope.join(" ")));
        }
        match self.grant_type {
            GrantType::Password => {
                body.push(("username", self.username.clone().unwrap_or_default()));
                body.push(("password", self.password.clone().unwrap_or_default()));
            }
            GrantType::AuthorizationCode => {
                body.push(("code", self.authorization_code.clone().unwrap_or_default()));
                body.push(("redirect_uri", self.redirect_uri.clone().unwrap_or_default()));
                if let Some(verifier) = &self.code_verifier {
                    body.push(("code_verifier", verifier.clone()));
                }
            }
            GrantType::RefreshToken => {
                body.push(("refresh_token", self.refresh_token.clone().unwrap_or_default()));
            }
            GrantType::JwtBearer => {
                body.push(("assertion", self.assertion.clone().unwrap_or_default()));
            }
            GrantType::ClientCredentials | GrantType::Implicit => {}
        }
        body
    }
}

fn bad_config(message: &str) -> RtkError {
    RtkError::new(ErrorCode::InvalidConfiguration, message)
}

/// Exempts `http://127.0.0.1`/`http://localhost` from the `https://`
/// requirement, so a coordinator can be pointed at a local mock token
/// endpoint in integration tests without weakening the production rule.
fn is_loopback(endpoint: &url::Url) -> bool {
    endpoint.scheme() == "http" && matches!(endpoint.host_str(), Some("127.0.0.1") | Some("localhost"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> OAuth2Config {
        OAuth2Config {
            token_endpoint: "https://auth.example.com/token".into(),
            client_id: "client".into(),
            client_secret: "secret".into(),
            grant_type: GrantType::ClientCredentials,
            scope: vec![],
            refresh_threshold: Duration::from_secs(30),
            http_timeout: Duration::from_secs(10),
            username: None,
            password: None,
            authorization_code: None,
            redirect_uri: None,
            code_verifier: None,
            refresh_token: None,
            assertion: None,
        }
    }

    #[test]
    fn client_credentials_config_validates() {
        assert!(base_config().validate().is_ok());
    }

    #[test]
    fn non_https_endpoint_is_rejected() {
        let mut config = base_config();
        config.token_endpoint = "http://auth.example.com/token".into();
        let err = config.validate().unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidConfiguration);
    }

    #[test]
    fn implicit_grant_is_rejected() {
        let mut config = base_config();
        config.grant_type = GrantType::Implicit;
        assert!(config.validate().is_err());
    }

    #[test]
    fn password_grant_requires_both_fields() {
        let mut config = base_config();
        config.grant_type = GrantType::Password;
        config.username = Some("u".into());
        assert!(config.validate().is_err());
        config.password = Some("p".into());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn form_body_includes_scope_when_present() {
        let mut config = base_config();
        config.scope = vec!["read".into(), "write".into()];
        let body = config.form_body();
        assert!(body.contains(&("scope", "read write".to_owned())));
    }

    #[test]
    fn loopback_http_endpoint_is_accepted() {
        let mut config = base_config();
        config.token_endpoint = "http://127.0.0.1:4321/token".into();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn form_body_omits_scope_when_empty() {
        let body = base_config().form_body();
        assert!(!body.iter().any(|(k, _)| *k == "scope"));
    }
}
