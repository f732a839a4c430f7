// SPDX-License-Identifier: MIT OR Apache-2.0
#![doc = include_str!("../README.md")]
#![deny(unsafe_code)]
#![warn(missing_docs)]

//! rtk-functions
//!
//! The fixed built-in function registry.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rtk_error::{ErrorCode, RtkError};
use rtk_json::Value;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

/// Looks up `name` in the fixed function registry and applies it to
/// `input`/`args`.
///
/// An unrecognised name raises `UnknownFunction`; every other failure
/// raises its own specific code (`BadDate`, etc.), which the caller
/// wraps as `FunctionFailure(name, cause)`.
pub fn call(name: &str, input: &Value, args: &[Value]) -> Result<Value, RtkError> {
    match name {
        "$string" => Ok(string(input)),
        "$uppercase" => Ok(text_op(input, str::to_uppercase)),
        "$lowercase" => Ok(text_op(input, str::to_lowercase)),
        "$trim" => Ok(text_op(input, |s| s.trim().to_owned())),
        "$substring" => substring(input, args),
        "$number" => Ok(number(input)),
        "$round" => round(input, args),
        "$sum" => Ok(sum(input)),
        "$now" => Ok(Value::Text(now_iso8601())),
        "$formatDate" => format_date(input, args),
        "$uuid" => Ok(Value::Text(uuid::Uuid::new_v4().to_string())),
        "$concat" => Ok(concat(args)),
        other => Err(RtkError::new(
            ErrorCode::UnknownFunction,
            format!("unknown function `{other}`"),
        )),
    }
}

fn string(input: &Value) -> Value {
    Value::Text(input.text_form())
}

fn text_op(input: &Value, f: impl Fn(&str) -> String) -> Value {
    match input {
        Value::Null => Value::Text(String::new()),
        other => Value::Text(f(&other.text_form())),
    }
}

fn substring(input: &Value, args: &[Value]) -> Result<Value, RtkError> {
    let text = input.text_form();
    let chars: Vec<char> = text.chars().collect();
    let len = chars.len() as i64;

    let arg_int = |idx: usize, default: i64| -> i64 {
        args.get(idx)
            .and_then(Value::to_decimal)
            .and_then(|d| d.to_i64())
            .unwrap_or(default)
    };
    let clip = |n: i64| -> usize { n.clamp(0, len) as usize };

    let start = clip(arg_int(0, 0));
    let end = clip(arg_int(1, len)).max(start);
    Ok(Value::Text(chars[start..end].iter().collect()))
}

fn number(input: &Value) -> Value {
    match input.to_decimal() {
        Some(d) => decimal_value(d),
        None => Value::Null,
    }
}

fn round(input: &Value, args: &[Value]) -> Result<Value, RtkError> {
    let d = input.to_decimal().ok_or_else(|| {
        RtkError::new(ErrorCode::BadComparison, "$round requires a numeric input")
    })?;
    let scale = args
        .first()
        .and_then(Value::to_decimal)
        .and_then(|d| d.to_u32())
        .unwrap_or(0);
    let rounded = d.round_dp_with_strategy(scale, RoundingStrategy::MidpointAwayFromZero);
    Ok(decimal_value(rounded))
}

fn sum(input: &Value) -> Value {
    let items = match input.as_array() {
        Some(items) => items,
        None => return Value::Int(0),
    };
    let total: Decimal = items.iter().filter_map(Value::to_decimal).sum();
    decimal_value(total)
}

fn decimal_value(d: Decimal) -> Value {
    if d.fract().is_zero() {
        if let Some(i) = d.to_i64() {
            return Value::Int(i);
        }
    }
    Value::Decimal(d)
}

fn now_iso8601() -> String {
    Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
}

fn format_date(input: &Value, args: &[Value]) -> Result<Value, RtkError> {
    let text = input.as_text().ok_or_else(|| {
        RtkError::new(ErrorCode::BadDate, "$formatDate requires a text input")
    })?;

    let parsed = parse_iso_datetime(text)
        .ok_or_else(|| RtkError::new(ErrorCode::BadDate, format!("not a valid ISO date: {text}")))?;

    match args.first().and_then(Value::as_text) {
        Some(pattern) => Ok(Value::Text(parsed.format(pattern).to_string())),
        None => Ok(Value::Text(
            parsed.to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
        )),
    }
}

/// Parses an ISO-8601 date or date-time. A date-only literal gets a time
/// of `00:00:00Z`.
fn parse_iso_datetime(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S") {
        return Some(DateTime::from_naive_utc_and_offset(naive, Utc));
    }
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return Some(DateTime::from_naive_utc_and_offset(
            date.and_hms_opt(0, 0, 0)?,
            Utc,
        ));
    }
    None
}

fn concat(args: &[Value]) -> Value {
    let joined: String = args.iter().map(Value::text_form).collect();
    Value::Text(joined)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_of_null_is_empty() {
        assert_eq!(call("$string", &Value::Null, &[]).unwrap(), Value::Text("".into()));
    }

    #[test]
    fn uppercase_and_trim() {
        assert_eq!(
            call("$uppercase", &Value::Text("ab".into()), &[]).unwrap(),
            Value::Text("AB".into())
        );
        assert_eq!(
            call("$trim", &Value::Text("  hi  ".into()), &[]).unwrap(),
            Value::Text("hi".into())
        );
    }

    #[test]
    fn substring_clips_bounds() {
        let input = Value::Text("hello".into());
        let args = vec![Value::Int(-5), Value::Int(100)];
        assert_eq!(call("$substring", &input, &args).unwrap(), Value::Text("hello".into()));
    }

    #[test]
    fn number_parses_text() {
        assert_eq!(call("$number", &Value::Text("42".into()), &[]).unwrap(), Value::Int(42));
        assert_eq!(call("$number", &Value::Null, &[]).unwrap(), Value::Null);
        assert_eq!(call("$number", &Value::Text("nope".into()), &[]).unwrap(), Value::Null);
    }

    #[test]
    fn round_half_up() {
        let input = Value::Decimal(Decimal::new(125, 2)); // 1.25
        let args = vec![Value::Int(1)];
        assert_eq!(call("$round", &input, &args).unwrap(), Value::Decimal(Decimal::new(13, 1)));
    }

    #[test]
    fn sum_ignores_non_numeric_elements() {
        let input = Value::Array(vec![Value::Int(1), Value::Text("x".into()), Value::Int(2)]);
        assert_eq!(call("$sum", &input, &[]).unwrap(), Value::Int(3));
    }

    #[test]
    fn sum_of_non_array_is_zero() {
        assert_eq!(call("$sum", &Value::Null, &[]).unwrap(), Value::Int(0));
    }

    #[test]
    fn format_date_round_trips_date_only() {
        let input = Value::Text("2024-01-15".into());
        let out = call("$formatDate", &input, &[]).unwrap();
        assert_eq!(out, Value::Text("2024-01-15T00:00:00Z".into()));
    }

    #[test]
    fn format_date_with_pattern() {
        let input = Value::Text("2024-01-15T10:30:00Z".into());
        let args = vec![Value::Text("%Y/%m/%d".into())];
        let out = call("$formatDate", &input, &args).unwrap();
        assert_eq!(out, Value::Text("2024/01/15".into()));
    }

    #[test]
    fn format_date_rejects_garbage() {
        let err = call("$formatDate", &Value::Text("not a date".into()), &[]).unwrap_err();
        assert_eq!(err.code, ErrorCode::BadDate);
    }

    #[test]
    fn uuid_produces_36_char_string() {
        let v = call("$uuid", &Value::Null, &[]).unwrap();
        assert_eq!(v.as_text().unwrap().len(), 36);
    }

    #[test]
    fn concat_joins_resolved_args() {
        let args = vec![Value::Text("a".into()), Value::Text("-".into()), Value::Text("b".into())];
        assert_eq!(call("$concat", &Value::Null, &args).unwrap(), Value::Text("a-b".into()));
    }

    #[test]
    fn unknown_function_is_an_error() {
        let err = call("$nope", &Value::Null, &[]).unwrap_err();
        assert_eq!(err.code, ErrorCode::UnknownFunction);
    }
}
