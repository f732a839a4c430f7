// SPDX-License-Identifier: MIT OR Apache-2.0
//! Evaluates a compiled path (§4.2) against a [`Value`] tree.

use rtk_json::Value;

use crate::parser::{CompareOp, FilterExpr, FilterLiteral, Segment};

/// Evaluates `segments` against `root`, implementing the contract in §4.2:
/// a missing path resolves to `Null`; a slice of a non-array is an empty
/// array; `[*]`/`.* ` on a non-array/non-object is `Null`; a filter result
/// is always an array (possibly empty).
pub fn eval(root: &Value, segments: &[Segment]) -> Value {
    let mut ctx = Ctx::One(root.clone());
    for segment in segments {
        ctx = apply(ctx, segment);
    }
    ctx.into_value()
}

/// Threading context: most segments operate on a single value, but
/// wildcard/recursive-descent/filter fan out into many.
enum Ctx {
    One(Value),
    Many(Vec<Value>),
}

impl Ctx {
    fn into_value(self) -> Value {
        match self {
            Ctx::One(v) => v,
            Ctx::Many(items) => Value::Array(items),
        }
    }
}

fn apply(ctx: Ctx, segment: &Segment) -> Ctx {
    match segment {
        Segment::Child(name) => match ctx {
            Ctx::One(v) => Ctx::One(child(&v, name)),
            Ctx::Many(items) => Ctx::Many(items.iter().map(|v| child(v, name)).collect()),
        },
        Segment::Index(i) => match ctx {
            Ctx::One(v) => Ctx::One(index(&v, *i)),
            Ctx::Many(items) => Ctx::Many(items.iter().map(|v| index(v, *i)).collect()),
        },
        Segment::Slice(start, end) => match ctx {
            Ctx::One(v) => Ctx::One(slice(&v, *start, *end)),
            Ctx::Many(items) => Ctx::Many(items.iter().map(|v| slice(v, *start, *end)).collect()),
        },
        Segment::Wildcard => match ctx {
            Ctx::One(v) => wildcard(&v),
            Ctx::Many(items) => {
                let mut out = Vec::new();
                for item in &items {
                    match wildcard(item) {
                        Ctx::One(Value::Null) => {}
                        Ctx::One(v) => out.push(v),
                        Ctx::Many(vs) => out.extend(vs),
                    }
                }
                Ctx::Many(out)
            }
        },
        Segment::RecursiveDescent(name) => {
            let mut out = Vec::new();
            match ctx {
                Ctx::One(v) => collect_recursive(&v, name, &mut out),
                Ctx::Many(items) => {
                    for item in &items {
                        collect_recursive(item, name, &mut out);
                    }
                }
            }
            Ctx::Many(out)
        }
        Segment::Filter(expr) => {
            let array = match ctx {
                Ctx::One(Value::Array(items)) => items,
                Ctx::Many(items) => items,
                _ => Vec::new(),
            };
            let matches = array
                .into_iter()
                .filter(|item| eval_filter(expr, item))
                .collect();
            Ctx::Many(matches)
        }
    }
}

fn child(v: &Value, name: &str) -> Value {
    match v {
        Value::Object(obj) => obj.get(name).cloned().unwrap_or(Value::Null),
        _ => Value::Null,
    }
}

fn index(v: &Value, i: i64) -> Value {
    match v {
        Value::Array(items) => resolve_index(items.len(), i)
            .and_then(|idx| items.get(idx).cloned())
            .unwrap_or(Value::Null),
        _ => Value::Null,
    }
}

fn resolve_index(len: usize, i: i64) -> Option<usize> {
    if i >= 0 {
        let idx = i as usize;
        (idx < len).then_some(idx)
    } else {
        let from_end = (-i) as usize;
        (from_end <= len).then(|| len - from_end)
    }
}

fn slice(v: &Value, start: Option<i64>, end: Option<i64>) -> Value {
    let items = match v {
        Value::Array(items) => items,
        _ => return Value::Array(Vec::new()),
    };
    let len = items.len() as i64;
    let resolve = |n: i64| -> i64 {
        if n < 0 {
            (len + n).max(0)
        } else {
            n.min(len)
        }
    };
    let start = resolve(start.unwrap_or(0));
    let end = resolve(end.unwrap_or(len));
    if start >= end {
        return Value::Array(Vec::new());
    }
    Value::Array(items[start as usize..end as usize].to_vec())
}

fn wildcard(v: &Value) -> Ctx {
    match v {
        Value::Array(items) => Ctx::Many(items.clone()),
        Value::Object(obj) => Ctx::Many(obj.values().cloned().collect()),
        _ => Ctx::One(Value::Null),
    }
}

fn collect_recursive(v: &Value, name: &str, out: &mut Vec<Value>) {
    match v {
        Value::Object(obj) => {
            if let Some(found) = obj.get(name) {
                out.push(found.clone());
            }
            for child in obj.values() {
                collect_recursive(child, name, out);
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_recursive(item, name, out);
            }
        }
        _ => {}
    }
}

// ── Filter evaluation ────────────────────────────────────────────────

fn eval_filter(expr: &FilterExpr, elem: &Value) -> bool {
    match expr {
        FilterExpr::And(lhs, rhs) => eval_filter(lhs, elem) && eval_filter(rhs, elem),
        FilterExpr::Or(lhs, rhs) => eval_filter(lhs, elem) || eval_filter(rhs, elem),
        FilterExpr::Compare { field, op, literal } => {
            let mut cur = elem.clone();
            for name in field {
                cur = child(&cur, name);
            }
            compare(&cur, *op, literal)
        }
    }
}

fn compare(value: &Value, op: CompareOp, literal: &FilterLiteral) -> bool {
    match (value, literal) {
        (Value::Null, FilterLiteral::Null) => matches!(op, CompareOp::Eq),
        (Value::Null, _) | (_, FilterLiteral::Null) => matches!(op, CompareOp::Ne),
        (Value::Bool(a), FilterLiteral::Bool(b)) => match op {
            CompareOp::Eq => a == b,
            CompareOp::Ne => a != b,
            _ => false,
        },
        (Value::Text(a), FilterLiteral::Text(b)) => match op {
            CompareOp::Eq => a == b,
            CompareOp::Ne => a != b,
            CompareOp::Lt => a.as_str() < b.as_str(),
            CompareOp::Le => a.as_str() <= b.as_str(),
            CompareOp::Gt => a.as_str() > b.as_str(),
            CompareOp::Ge => a.as_str() >= b.as_str(),
        },
        (Value::Int(_) | Value::Decimal(_), FilterLiteral::Number(b)) => {
            let a = value.to_decimal().and_then(|d| d.to_string().parse::<f64>().ok());
            match a {
                Some(a) => match op {
                    CompareOp::Eq => (a - b).abs() < f64::EPSILON,
                    CompareOp::Ne => (a - b).abs() >= f64::EPSILON,
                    CompareOp::Lt => a < *b,
                    CompareOp::Le => a <= *b,
                    CompareOp::Gt => a > *b,
                    CompareOp::Ge => a >= *b,
                },
                None => false,
            }
        }
        _ => matches!(op, CompareOp::Ne),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn v(json: &str) -> Value {
        Value::parse(json).unwrap()
    }

    #[test]
    fn simple_child_access() {
        let root = v(r#"{"a":{"b":42}}"#);
        let segs = parse("$.a.b").unwrap();
        assert_eq!(eval(&root, &segs), Value::Int(42));
    }

    #[test]
    fn missing_path_is_null() {
        let root = v(r#"{"a":1}"#);
        let segs = parse("$.missing").unwrap();
        assert_eq!(eval(&root, &segs), Value::Null);
    }

    #[test]
    fn negative_index_is_last_element() {
        let root = v(r#"{"items":[1,2,3]}"#);
        let segs = parse("$.items[-1]").unwrap();
        assert_eq!(eval(&root, &segs), Value::Int(3));
    }

    #[test]
    fn slice_excludes_end_bound() {
        let root = v(r#"{"items":[1,2,3,4]}"#);
        let segs = parse("$.items[1:3]").unwrap();
        assert_eq!(eval(&root, &segs), v("[2,3]"));
    }

    #[test]
    fn slice_of_non_array_is_empty_array() {
        let root = v(r#"{"a":1}"#);
        let segs = parse("$.a[1:3]").unwrap();
        assert_eq!(eval(&root, &segs), Value::Array(vec![]));
    }

    #[test]
    fn wildcard_on_non_array_is_null() {
        let root = v(r#"{"a":1}"#);
        let segs = parse("$.a[*]").unwrap();
        assert_eq!(eval(&root, &segs), Value::Null);
    }

    #[test]
    fn filter_always_returns_array() {
        let root = v(r#"{"items":[{"v":10},{"v":30}]}"#);
        let segs = parse("$.items[?(@.v > 15)]").unwrap();
        assert_eq!(eval(&root, &segs), v(r#"[{"v":30}]"#));
    }

    #[test]
    fn filter_with_no_matches_is_empty_array() {
        let root = v(r#"{"items":[{"v":1}]}"#);
        let segs = parse("$.items[?(@.v > 15)]").unwrap();
        assert_eq!(eval(&root, &segs), Value::Array(vec![]));
    }

    #[test]
    fn filter_combines_with_and_or() {
        let root = v(r#"{"items":[{"v":5},{"v":20},{"v":200}]}"#);
        let segs = parse("$.items[?(@.v > 10 && @.v < 100)]").unwrap();
        assert_eq!(eval(&root, &segs), v(r#"[{"v":20}]"#));
    }

    #[test]
    fn recursive_descent_finds_nested_keys() {
        let root = v(r#"{"a":{"name":"x"},"b":[{"name":"y"},{"c":{"name":"z"}}]}"#);
        let segs = parse("$..name").unwrap();
        let result = eval(&root, &segs);
        let items = result.as_array().unwrap();
        assert_eq!(items.len(), 3);
    }
}
