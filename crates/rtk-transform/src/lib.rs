// SPDX-License-Identifier: MIT OR Apache-2.0
#![doc = include_str!("../README.md")]
#![deny(unsafe_code)]
#![warn(missing_docs)]

//! rtk-transform
//!
//! The rule interpreter: parses a mapping program into a tagged
//! rule tree and evaluates it against a source document.

mod interpreter;
mod rule;

pub use interpreter::Interpreter;
pub use rule::{ArrayRule, ConditionEntry, ConditionalRule, FunctionRule, MappingEntry, Rule, ValueRule};

use rtk_error::RtkError;
use rtk_json::Value;

/// Convenience one-shot entry point: parses `source_text`/`rules_text`
/// and runs the transform with a fresh, single-use path cache.
///
/// Prefer constructing one [`Interpreter`] and calling
/// [`Interpreter::transform`] repeatedly when transforming many
/// documents against the same (or overlapping) rule sets, so that
/// compiled paths are reused.
pub fn transform(source_text: &str, rules_text: &str) -> Result<Value, RtkError> {
    Interpreter::new().transform(source_text, rules_text)
}
