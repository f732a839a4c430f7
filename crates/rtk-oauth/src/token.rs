//! Token value type.

use std::collections::BTreeSet;
use std::time::{Duration, Instant};

/// The `token_type` of an [`OAuth2Token`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenType {
    /// `Bearer`, the default and overwhelmingly common case.
    Bearer,
    /// `MAC`.
    Mac,
    /// `Basic`.
    Basic,
}

impl TokenType {
    /// Parses a `token_type` string from a token response, defaulting to
    /// `Bearer` for anything unrecognised, matching the "optional
    /// `token_type`, default Bearer" convention of a token response.
    pub fn parse(raw: &str) -> Self {
        match raw.to_ascii_lowercase().as_str() {
            "mac" => Self::Mac,
            "basic" => Self::Basic,
            _ => Self::Bearer,
        }
    }
}

/// A cached OAuth2 token.
///
/// The invariant `expires_at >= issued_at` and non-empty `value` for
/// non-sentinel tokens is established at construction and never broken
/// afterward — there is no mutation method, only whole-token
/// replacement.
#[derive(Debug, Clone)]
pub struct OAuth2Token {
    /// The bearer/MAC/basic token value itself.
    pub value: String,
    /// The token's type.
    pub token_type: TokenType,
    /// When this token was issued, as a monotonic instant.
    pub issued_at: Instant,
    /// When this token expires, as a monotonic instant.
    pub expires_at: Instant,
    /// Scopes granted to the token. Immutable once constructed.
    pub scopes: BTreeSet<String>,
}

/// The sentinel value carried by a token that has never been fetched.
pub const INVALID_VALUE: &str = "INVALID";

impl OAuth2Token {
    /// Builds a token, asserting the `expires_at >= issued_at` invariant.
    ///
    /// # Panics
    /// Panics if `expires_at < issued_at`.
    #[must_use]
    pub fn new(
        value: impl Into<String>,
        token_type: TokenType,
        issued_at: Instant,
        expires_at: Instant,
        scopes: BTreeSet<String>,
    ) -> Self {
        assert!(expires_at >= issued_at, "a token cannot expire before it was issued");
        Self { value: value.into(), token_type, issued_at, expires_at, scopes }
    }

    /// The never-valid sentinel token a freshly constructed coordinator
    /// starts with.
    #[must_use]
    pub fn invalid() -> Self {
        let now = Instant::now();
        Self {
            value: INVALID_VALUE.to_owned(),
            token_type: TokenType::Bearer,
            issued_at: now,
            expires_at: now,
            scopes: BTreeSet::new(),
        }
    }

    /// `true` if this is the never-fetched sentinel.
    #[must_use]
    pub fn is_sentinel(&self) -> bool {
        self.value == INVALID_VALUE
    }

    /// `true` if this token is usable right now: not the sentinel, and
    /// still valid at least `refresh_threshold` before its real expiry.
    #[must_use]
    pub fn is_valid(&self, refresh_threshold: Duration) -> bool {
        !self.is_sentinel() && Instant::now() + refresh_threshold < self.expires_at
    }
}
