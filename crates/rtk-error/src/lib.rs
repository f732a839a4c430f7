// SPDX-License-Identifier: MIT OR Apache-2.0
#![doc = include_str!("../README.md")]
#![deny(unsafe_code)]
#![warn(missing_docs)]

//! Unified error taxonomy with stable error codes, shared by the rule
//! transform engine and the OAuth2 token coordinator.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// ErrorCategory
// ---------------------------------------------------------------------------

/// Broad family that an [`ErrorCode`] belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Errors produced while parsing or validating the source document or
    /// rule tree passed to `transform`.
    Transform,
    /// Errors produced while evaluating a JSONPath-subset expression.
    Path,
    /// Errors produced while resolving or invoking a built-in function.
    Function,
    /// Errors produced while evaluating a condition or comparison.
    Condition,
    /// Errors produced by the OAuth2 token coordinator or its HTTP layer.
    Token,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Transform => "transform",
            Self::Path => "path",
            Self::Function => "function",
            Self::Condition => "condition",
            Self::Token => "token",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// ErrorCode
// ---------------------------------------------------------------------------

/// Machine-readable, stable error code.
///
/// Each variant corresponds to one failure kind named in the public error
/// taxonomy. Serialises as `SCREAMING_SNAKE_CASE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Source document is empty or not valid JSON.
    BadSource,
    /// The rules document is not a JSON object.
    BadRules,
    /// A target field's rule raised while being evaluated.
    FieldFailure,
    /// A rule object is missing the required `type` discriminator.
    MissingType,
    /// A JSONPath-subset expression is syntactically invalid.
    InvalidPath,
    /// A `value` rule is missing its required `mappings` array.
    MissingMappings,
    /// A `function` rule names a function not in the registry.
    UnknownFunction,
    /// A built-in function raised while executing.
    FunctionFailure,
    /// `$formatDate` (or similar) was given input that does not parse as
    /// an ISO-8601 date or date-time.
    BadDate,
    /// A `regex` condition's pattern failed to compile.
    BadRegex,
    /// An ordering comparison (`gt`/`lt`/`gte`/`lte`) was attempted against
    /// a source value that does not coerce to a number.
    BadComparison,
    /// Token endpoint rejected the credentials (`invalid_client`,
    /// `invalid_grant`, or an HTTP 401/403).
    InvalidCredentials,
    /// The coordinator or endpoint configuration itself is invalid
    /// (`invalid_request`, `invalid_scope`, `unsupported_grant_type`, or a
    /// local validation failure).
    InvalidConfiguration,
    /// The endpoint returned a malformed response or an unclassified 4xx.
    InvalidEndpoint,
    /// The endpoint is temporarily unreachable, timed out, or the circuit
    /// breaker is open.
    ServiceUnavailable,
}

impl ErrorCode {
    /// Returns the broad [`ErrorCategory`] this code belongs to.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::BadSource | Self::BadRules | Self::FieldFailure | Self::MissingType => {
                ErrorCategory::Transform
            }
            Self::InvalidPath | Self::MissingMappings => ErrorCategory::Path,
            Self::UnknownFunction | Self::FunctionFailure | Self::BadDate => {
                ErrorCategory::Function
            }
            Self::BadRegex | Self::BadComparison => ErrorCategory::Condition,
            Self::InvalidCredentials
            | Self::InvalidConfiguration
            | Self::InvalidEndpoint
            | Self::ServiceUnavailable => ErrorCategory::Token,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

// ---------------------------------------------------------------------------
// RtkError
// ---------------------------------------------------------------------------

/// A shared cause, cheaply cloneable so the same error can be observed by
/// every waiter of a single-flight refresh (see `rtk-oauth::coordinator`).
pub type Cause = Arc<dyn std::error::Error + Send + Sync + 'static>;

/// The unified error type returned by every public operation in this
/// workspace.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{code}: {message}")]
pub struct RtkError {
    /// Stable, machine-readable code.
    pub code: ErrorCode,
    /// Human-readable message.
    pub message: String,
    /// Optional underlying cause.
    #[source]
    pub cause: Option<Cause>,
}

impl RtkError {
    /// Construct an error with no cause.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            cause: None,
        }
    }

    /// Construct an error with a boxed cause.
    pub fn with_cause(
        code: ErrorCode,
        message: impl Into<String>,
        cause: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            code,
            message: message.into(),
            cause: Some(Arc::new(cause)),
        }
    }

    /// Wraps `self` as the cause of a `FieldFailure` for `field`.
    #[must_use]
    pub fn into_field_failure(self, field: impl Into<String>) -> Self {
        let field = field.into();
        Self {
            code: ErrorCode::FieldFailure,
            message: format!("field `{field}` failed: {self}"),
            cause: Some(Arc::new(self)),
        }
    }

    /// Wraps `self` as the cause of a `FunctionFailure` for `name`.
    #[must_use]
    pub fn into_function_failure(self, name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            code: ErrorCode::FunctionFailure,
            message: format!("function `{name}` failed: {self}"),
            cause: Some(Arc::new(self)),
        }
    }

    /// Returns `true` if this error's code belongs to `category`.
    #[must_use]
    pub fn is_category(&self, category: ErrorCategory) -> bool {
        self.code.category() == category
    }
}
