// SPDX-License-Identifier: MIT OR Apache-2.0
#![doc = include_str!("../README.md")]
#![deny(unsafe_code)]
#![warn(missing_docs)]

//! rtk-path
//!
//! JSONPath-subset evaluator (§4.2) with a concurrency-safe compiled-path
//! cache.

/// Concurrency-safe cache of compiled paths, keyed by text form.
pub mod cache;
/// Evaluates compiled path segments against a [`rtk_json::Value`].
pub mod eval;
/// Parses the JSONPath subset into compiled segments.
pub mod parser;

pub use cache::PathCache;
pub use parser::{CompareOp, FilterExpr, FilterLiteral, Segment};
use rtk_error::RtkError;
use rtk_json::Value;

/// Evaluates `path` (must start with `$`) against `root`, using `cache`
/// to avoid recompiling previously-seen path strings.
///
/// A syntactically invalid path raises `InvalidPath`; a structurally
/// absent path (e.g. a missing field) resolves to `Value::Null` rather
/// than an error.
pub fn eval_path(cache: &PathCache, root: &Value, path: &str) -> Result<Value, RtkError> {
    let segments = cache.get_or_compile(path)?;
    Ok(eval::eval(root, &segments))
}
