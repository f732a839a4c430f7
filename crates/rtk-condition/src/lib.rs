// SPDX-License-Identifier: MIT OR Apache-2.0
#![doc = include_str!("../README.md")]
#![deny(unsafe_code)]
#![warn(missing_docs)]

//! rtk-condition
//!
//! Type-strict condition/comparison operators (§4.4). Callers resolve the
//! condition's `path` against the source document themselves (typically
//! via `rtk-path`) and pass the resolved [`Value`] in here.

use rtk_error::{ErrorCode, RtkError};
use rtk_json::Value;

/// A condition operator recognised by `{path, operator, value, result}`
/// condition entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    /// `eq` / `equals`.
    Eq,
    /// `ne` / `notEquals`.
    Ne,
    /// `gt`.
    Gt,
    /// `lt`.
    Lt,
    /// `gte`.
    Gte,
    /// `lte`.
    Lte,
    /// `contains`.
    Contains,
    /// `startsWith`.
    StartsWith,
    /// `endsWith`.
    EndsWith,
    /// `regex`.
    Regex,
}

impl Operator {
    /// Parses an operator name as it appears in a rule's `operator` field.
    pub fn parse(name: &str) -> Result<Self, RtkError> {
        match name {
            "eq" | "equals" => Ok(Self::Eq),
            "ne" | "notEquals" => Ok(Self::Ne),
            "gt" => Ok(Self::Gt),
            "lt" => Ok(Self::Lt),
            "gte" => Ok(Self::Gte),
            "lte" => Ok(Self::Lte),
            "contains" => Ok(Self::Contains),
            "startsWith" => Ok(Self::StartsWith),
            "endsWith" => Ok(Self::EndsWith),
            "regex" => Ok(Self::Regex),
            other => Err(RtkError::new(
                ErrorCode::BadComparison,
                format!("unknown condition operator `{other}`"),
            )),
        }
    }
}

/// Evaluates whether `operator` holds between `source` (already resolved
/// from the condition's `path`) and `literal` (the condition's `value`).
pub fn evaluate(source: &Value, operator: Operator, literal: &Value) -> Result<bool, RtkError> {
    match operator {
        Operator::Eq => Ok(values_equal(source, literal)),
        Operator::Ne => Ok(!values_equal(source, literal)),
        Operator::Gt | Operator::Lt | Operator::Gte | Operator::Lte => {
            ordering(source, operator, literal)
        }
        Operator::Contains => Ok(string_op(source, literal, |s, needle| s.contains(needle))),
        Operator::StartsWith => Ok(string_op(source, literal, |s, needle| s.starts_with(needle))),
        Operator::EndsWith => Ok(string_op(source, literal, |s, needle| s.ends_with(needle))),
        Operator::Regex => regex_match(source, literal),
    }
}

/// Type-strict equality (§4.4): `Int` and `Decimal` are never equal even
/// when numerically identical; cross-type comparisons (text vs number,
/// etc.) are never equal.
fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Null, _) | (_, Value::Null) => false,
        (Value::Int(a), Value::Int(b)) => a == b,
        (Value::Decimal(a), Value::Decimal(b)) => a == b,
        (Value::Text(a), Value::Text(b)) => a == b,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::Array(a), Value::Array(b)) => a.len() == b.len() && a.iter().zip(b).all(|(x, y)| values_equal(x, y)),
        (Value::Object(a), Value::Object(b)) => {
            a.len() == b.len()
                && a.iter()
                    .all(|(k, v)| b.get(k).is_some_and(|other| values_equal(v, other)))
        }
        _ => false,
    }
}

fn ordering(source: &Value, op: Operator, literal: &Value) -> Result<bool, RtkError> {
    if source.is_null() {
        return Ok(false);
    }
    let a = match (source, source.to_decimal()) {
        (_, Some(d)) => d,
        (Value::Text(s), None) => {
            return Err(RtkError::new(
                ErrorCode::BadComparison,
                format!("source text `{s}` does not parse as a number"),
            ));
        }
        (_, None) => return Ok(false),
    };
    let b = match (literal, literal.to_decimal()) {
        (_, Some(d)) => d,
        (Value::Text(s), None) => {
            return Err(RtkError::new(
                ErrorCode::BadComparison,
                format!("comparison literal `{s}` does not parse as a number"),
            ));
        }
        (_, None) => return Ok(false),
    };
    Ok(match op {
        Operator::Gt => a > b,
        Operator::Lt => a < b,
        Operator::Gte => a >= b,
        Operator::Lte => a <= b,
        _ => unreachable!("ordering() only called for ordering operators"),
    })
}

fn string_op(source: &Value, literal: &Value, f: impl Fn(&str, &str) -> bool) -> bool {
    if source.is_null() {
        return false;
    }
    let needle = literal.as_text().map(str::to_owned).unwrap_or_else(|| literal.text_form());
    if needle.is_empty() {
        return true;
    }
    f(&source.text_form(), &needle)
}

fn regex_match(source: &Value, literal: &Value) -> Result<bool, RtkError> {
    if source.is_null() {
        return Ok(false);
    }
    let pattern = literal.as_text().ok_or_else(|| {
        RtkError::new(ErrorCode::BadRegex, "regex condition requires a text pattern")
    })?;
    let anchored = format!("^(?:{pattern})$");
    let re = regex::Regex::new(&anchored)
        .map_err(|e| RtkError::with_cause(ErrorCode::BadRegex, format!("invalid regex `{pattern}`"), e))?;
    Ok(re.is_match(&source.text_form()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn both_null_is_equal() {
        assert!(evaluate(&Value::Null, Operator::Eq, &Value::Null).unwrap());
        assert!(!evaluate(&Value::Null, Operator::Ne, &Value::Null).unwrap());
    }

    #[test]
    fn one_null_is_not_equal() {
        assert!(!evaluate(&Value::Null, Operator::Eq, &Value::Int(1)).unwrap());
    }

    #[test]
    fn int_and_decimal_are_never_equal() {
        assert!(!values_equal(&Value::Int(123), &Value::Decimal("123.0".parse().unwrap())));
    }

    #[test]
    fn decimal_equality_ignores_trailing_zeros() {
        let a = Value::Decimal("10.100".parse().unwrap());
        let b = Value::Decimal("10.1".parse().unwrap());
        assert!(values_equal(&a, &b));
    }

    #[test]
    fn text_and_int_are_never_equal() {
        assert!(!values_equal(&Value::Text("123".into()), &Value::Int(123)));
    }

    #[test]
    fn ordering_on_non_numeric_text_raises_bad_comparison() {
        let err = evaluate(&Value::Text("not a number".into()), Operator::Gt, &Value::Int(1)).unwrap_err();
        assert_eq!(err.code, ErrorCode::BadComparison);
    }

    #[test]
    fn ordering_on_null_source_is_false_not_error() {
        assert!(!evaluate(&Value::Null, Operator::Gt, &Value::Int(1)).unwrap());
    }

    #[test]
    fn ordering_compares_numeric_strings() {
        assert!(evaluate(&Value::Text("1500".into()), Operator::Gt, &Value::Int(1000)).unwrap());
    }

    #[test]
    fn contains_with_empty_needle_always_matches() {
        assert!(evaluate(&Value::Text("abc".into()), Operator::Contains, &Value::Text(String::new())).unwrap());
    }

    #[test]
    fn contains_is_case_sensitive() {
        assert!(!evaluate(&Value::Text("ABC".into()), Operator::Contains, &Value::Text("abc".into())).unwrap());
    }

    #[test]
    fn string_op_on_null_source_is_false() {
        assert!(!evaluate(&Value::Null, Operator::StartsWith, &Value::Text("x".into())).unwrap());
    }

    #[test]
    fn regex_full_match() {
        assert!(evaluate(&Value::Text("abc123".into()), Operator::Regex, &Value::Text(r"[a-z]+\d+".into())).unwrap());
        assert!(!evaluate(&Value::Text("abc123x".into()), Operator::Regex, &Value::Text(r"[a-z]+\d+".into())).unwrap());
    }

    #[test]
    fn invalid_regex_is_bad_regex() {
        let err = evaluate(&Value::Text("x".into()), Operator::Regex, &Value::Text("(".into())).unwrap_err();
        assert_eq!(err.code, ErrorCode::BadRegex);
    }

    #[test]
    fn parse_accepts_both_eq_aliases() {
        assert_eq!(Operator::parse("eq").unwrap(), Operator::Eq);
        assert_eq!(Operator::parse("equals").unwrap(), Operator::Eq);
    }
}
