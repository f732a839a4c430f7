// SPDX-License-Identifier: MIT OR Apache-2.0
#![doc = include_str!("../README.md")]
#![deny(unsafe_code)]
#![warn(missing_docs)]

//! rtk-oauth
//!
//! A concurrent OAuth2 token refresh coordinator: single-flight refresh,
//! proactive renewal ahead of expiry, retry with exponential backoff, and
//! a circuit breaker guarding the token endpoint (§4.B–§4.D).

/// The Closed/Open/HalfOpen circuit breaker guarding the token endpoint.
pub mod circuit;
/// `OAuth2Config` and its validation (§6).
pub mod config;
/// The public single-flight `TokenCoordinator` surface (§4.B).
pub mod coordinator;
/// Token endpoint request/response handling and OAuth error classification (§4.C).
pub mod http;
/// Retry with exponential backoff (§4.D).
pub mod retry;
/// `OAuth2Token` and the invalid sentinel (§3.3).
pub mod token;

pub use circuit::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
pub use config::{GrantType, OAuth2Config};
pub use coordinator::TokenCoordinator;
pub use http::classify_oauth_error;
pub use retry::{RefreshError, RetryAttempt, RetryConfig, RetryMetadata};
pub use token::{OAuth2Token, TokenType, INVALID_VALUE};
