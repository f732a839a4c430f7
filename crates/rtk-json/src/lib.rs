// SPDX-License-Identifier: MIT OR Apache-2.0
#![doc = include_str!("../README.md")]
#![deny(unsafe_code)]
#![warn(missing_docs)]

//! rtk-json
//!
//! The JSON value model used throughout the rule transform engine, plus
//! parsing and the numeric/textual coercions the interpreter needs.

use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;
use rtk_error::{ErrorCode, RtkError};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Maximum recursion depth permitted when walking a [`Value`] tree or a
/// rule tree built on top of it. Mapping trees are shallow in practice
/// (<20); this guards against pathological input.
pub const MAX_DEPTH: usize = 64;

/// An object's fields, in insertion order.
pub type Object = IndexMap<String, Value>;

// ── Value ───────────────────────────────────────────────────────────────

/// A polymorphic JSON value.
///
/// `Int` and `Decimal` are distinct variants: a literal with a fractional
/// part or an exponent parses as `Decimal`, otherwise as `Int`. See the
/// crate docs for why this distinction is load-bearing.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// JSON `null`.
    Null,
    /// JSON `true`/`false`.
    Bool(bool),
    /// A JSON number literal with no fractional part or exponent.
    Int(i64),
    /// A JSON number literal with a fractional part or an exponent,
    /// represented at full decimal precision.
    Decimal(Decimal),
    /// A JSON string.
    Text(String),
    /// A JSON array, order preserved.
    Array(Vec<Value>),
    /// A JSON object, key insertion order preserved.
    Object(Object),
}

impl Value {
    /// Shorthand for an empty object.
    #[must_use]
    pub fn empty_object() -> Self {
        Self::Object(Object::new())
    }

    /// Returns `true` for `Value::Null`.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Borrows the inner array, if this is `Value::Array`.
    #[must_use]
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Self::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Borrows the inner object, if this is `Value::Object`.
    #[must_use]
    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Self::Object(map) => Some(map),
            _ => None,
        }
    }

    /// Borrows the inner string, if this is `Value::Text`.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Coerces this value to a `Decimal` for ordering comparisons and
    /// numeric built-ins (§4.3/A.5). `Int` and `Decimal` convert directly;
    /// `Text` parses if it looks like a number; everything else is `None`.
    #[must_use]
    pub fn to_decimal(&self) -> Option<Decimal> {
        match self {
            Self::Int(n) => Some(Decimal::from(*n)),
            Self::Decimal(d) => Some(*d),
            Self::Text(s) => Decimal::from_str(s.trim()).ok(),
            _ => None,
        }
    }

    /// Canonical textual form used for value-mapping lookups (§4.5) and
    /// the `$string` built-in (§4.3).
    ///
    /// `null` renders as the empty string; booleans as `true`/`false`;
    /// numbers via their natural decimal rendering; arrays/objects via
    /// compact JSON.
    #[must_use]
    pub fn text_form(&self) -> String {
        match self {
            Self::Null => String::new(),
            Self::Bool(b) => b.to_string(),
            Self::Int(n) => n.to_string(),
            Self::Decimal(d) => d.to_string(),
            Self::Text(s) => s.clone(),
            Self::Array(_) | Self::Object(_) => {
                serde_json::to_string(&self.clone().into_serde_json()).unwrap_or_default()
            }
        }
    }

    /// Parses `text` as JSON into a [`Value`], preserving the int/decimal
    /// distinction and object key order.
    pub fn parse(text: &str) -> Result<Self, RtkError> {
        if text.trim().is_empty() {
            return Err(RtkError::new(ErrorCode::BadSource, "source text is empty"));
        }
        let raw: serde_json::Value = serde_json::from_str(text)
            .map_err(|e| RtkError::with_cause(ErrorCode::BadSource, "source is not valid JSON", e))?;
        Ok(Value::from_serde_json(raw))
    }

    /// Converts a `serde_json::Value` (parsed with the `arbitrary_precision`
    /// feature so that number literals keep their original text) into our
    /// `Value`, classifying each number as `Int` or `Decimal`.
    #[must_use]
    pub fn from_serde_json(raw: serde_json::Value) -> Self {
        match raw {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => classify_number(&n),
            serde_json::Value::String(s) => Value::Text(s),
            serde_json::Value::Array(items) => {
                Value::Array(items.into_iter().map(Value::from_serde_json).collect())
            }
            serde_json::Value::Object(map) => {
                let mut obj = Object::new();
                for (k, v) in map {
                    obj.insert(k, Value::from_serde_json(v));
                }
                Value::Object(obj)
            }
        }
    }

    /// Converts into a `serde_json::Value`, used at the boundary when
    /// materialising the target document (§4.9) or re-encoding for
    /// downstream consumers.
    #[must_use]
    pub fn into_serde_json(self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(b),
            Value::Int(n) => serde_json::Value::Number(n.into()),
            Value::Decimal(d) => serde_json::Number::from_str(&d.to_string())
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::Text(s) => serde_json::Value::String(s),
            Value::Array(items) => {
                serde_json::Value::Array(items.into_iter().map(Value::into_serde_json).collect())
            }
            Value::Object(map) => {
                let mut out = serde_json::Map::new();
                for (k, v) in map {
                    out.insert(k, v.into_serde_json());
                }
                serde_json::Value::Object(out)
            }
        }
    }
}

/// Classifies a `serde_json::Number` (parsed with `arbitrary_precision`)
/// as `Value::Int` or `Value::Decimal` based on its original literal
/// text: a fractional part or exponent makes it a decimal.
fn classify_number(n: &serde_json::Number) -> Value {
    let raw = n.to_string();
    let looks_decimal = raw.contains('.') || raw.contains('e') || raw.contains('E');
    if !looks_decimal {
        if let Ok(i) = raw.parse::<i64>() {
            return Value::Int(i);
        }
    }
    match Decimal::from_str(&raw) {
        Ok(d) => Value::Decimal(d),
        Err(_) => {
            // Falls outside Decimal's range (very large/small); keep the
            // best-effort integer reading rather than losing the value.
            raw.parse::<i64>().map(Value::Int).unwrap_or(Value::Null)
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.text_form())
    }
}

impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.clone().into_serde_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = serde_json::Value::deserialize(deserializer)?;
        Ok(Value::from_serde_json(raw))
    }
}
