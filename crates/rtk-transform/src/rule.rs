use rtk_error::{ErrorCode, RtkError};
use rtk_json::{Object, Value, MAX_DEPTH};

/// A parsed node of the mapping tree.
///
/// Dispatch on `eval` is a match over this enum, not subclassing: each
/// variant corresponds exactly to one rule kind.
#[derive(Debug, Clone)]
pub enum Rule {
    /// A scalar or array rule returned verbatim.
    Literal(Value),
    /// A bare path string, e.g. `"$.a.b"`.
    Path(String),
    /// `{type: value, sourcePath, mappings[], default?}`.
    Value(ValueRule),
    /// `{type: function, function, sourcePath?, args[]?}`.
    Function(FunctionRule),
    /// `{type: conditional, conditions[], default?}`.
    Conditional(ConditionalRule),
    /// `{type: array, sourcePath, itemMapping, wrapAsArray?}`.
    Array(ArrayRule),
    /// `{type: object, ...child rules}`.
    Object(Vec<(String, Rule)>),
}

/// A single `{source, target}` lookup entry.
#[derive(Debug, Clone)]
pub struct MappingEntry {
    /// Textual form of the value being matched against.
    pub source: String,
    /// Value substituted in when `source` matches.
    pub target: Value,
}

/// `value`-rule fields.
#[derive(Debug, Clone)]
pub struct ValueRule {
    /// Path resolved against the current source to obtain the value being mapped.
    pub source_path: String,
    /// Lookup table, tried in declaration order.
    pub mappings: Vec<MappingEntry>,
    /// Fallback rule evaluated when no mapping entry matches.
    pub default: Option<Box<Rule>>,
}

/// `function`-rule fields.
#[derive(Debug, Clone)]
pub struct FunctionRule {
    /// Registered function name, e.g. `"$uppercase"`.
    pub function: String,
    /// Optional path providing the function's input; absent means "the
    /// current source document itself".
    pub source_path: Option<String>,
    /// Raw argument values. Only `$concat` re-resolves path-shaped
    /// arguments against the source; every other function receives them
    /// verbatim.
    pub args: Vec<Value>,
}

/// A single `{path, operator, value, result}` condition entry.
#[derive(Debug, Clone)]
pub struct ConditionEntry {
    /// Path resolved against the current source for comparison.
    pub path: String,
    /// Operator name, parsed lazily by `rtk_condition::Operator::parse`.
    pub operator: String,
    /// Literal compared against the resolved path value.
    pub value: Value,
    /// Rule evaluated when this condition is satisfied.
    pub result: Box<Rule>,
}

/// `conditional`-rule fields.
#[derive(Debug, Clone)]
pub struct ConditionalRule {
    /// Conditions tried in declaration order; first match wins.
    pub conditions: Vec<ConditionEntry>,
    /// Fallback rule evaluated when no condition matches.
    pub default: Option<Box<Rule>>,
}

/// `array`-rule fields.
#[derive(Debug, Clone)]
pub struct ArrayRule {
    /// Path resolved against the current source to obtain the collection
    /// being iterated.
    pub source_path: String,
    /// Per-element sub-rules, keyed by output field name.
    pub item_mapping: Vec<(String, Rule)>,
    /// When true, a resolved non-null object (rather than an array) is
    /// treated as a one-element list instead of yielding an empty array.
    pub wrap_as_array: bool,
}

impl Rule {
    /// Parses a raw JSON value as a rule node, enforcing the recursion
    /// depth guard.
    pub fn parse(raw: &Value) -> Result<Rule, RtkError> {
        Self::parse_at_depth(raw, 0)
    }

    fn parse_at_depth(raw: &Value, depth: usize) -> Result<Rule, RtkError> {
        if depth > MAX_DEPTH {
            return Err(RtkError::new(
                ErrorCode::BadRules,
                format!("rule tree exceeds maximum nesting depth of {MAX_DEPTH}"),
            ));
        }
        match raw {
            Value::Text(s) if s.starts_with('$') => Ok(Rule::Path(s.clone())),
            Value::Object(obj) => Self::parse_object(obj, depth),
            other => Ok(Rule::Literal(other.clone())),
        }
    }

    fn parse_object(obj: &Object, depth: usize) -> Result<Rule, RtkError> {
        let type_value = obj
            .get("type")
            .ok_or_else(|| RtkError::new(ErrorCode::MissingType, "rule object is missing `type`"))?;
        let type_name = type_value.as_text().ok_or_else(|| {
            RtkError::new(ErrorCode::MissingType, "rule `type` must be a string")
        })?;

        match type_name {
            "value" => Self::parse_value(obj, depth).map(Rule::Value),
            "function" => Self::parse_function(obj).map(Rule::Function),
            "conditional" => Self::parse_conditional(obj, depth).map(Rule::Conditional),
            "array" => Self::parse_array(obj, depth).map(Rule::Array),
            "object" => Self::parse_object_rule(obj, depth).map(Rule::Object),
            other => Err(RtkError::new(
                ErrorCode::BadRules,
                format!("unrecognised rule type `{other}`"),
            )),
        }
    }

    fn parse_value(obj: &Object, depth: usize) -> Result<ValueRule, RtkError> {
        let source_path = require_path(obj, "sourcePath")?;
        let mappings_raw = obj
            .get("mappings")
            .and_then(Value::as_array)
            .ok_or_else(|| RtkError::new(ErrorCode::MissingMappings, "`value` rule requires a `mappings` array"))?;

        let mut mappings = Vec::with_capacity(mappings_raw.len());
        for entry in mappings_raw {
            let entry_obj = entry.as_object().ok_or_else(|| {
                RtkError::new(ErrorCode::BadRules, "each `mappings` entry must be an object")
            })?;
            let source = entry_obj
                .get("source")
                .ok_or_else(|| RtkError::new(ErrorCode::BadRules, "mapping entry is missing `source`"))?
                .text_form();
            let target = entry_obj
                .get("target")
                .ok_or_else(|| RtkError::new(ErrorCode::BadRules, "mapping entry is missing `target`"))?
                .clone();
            mappings.push(MappingEntry { source, target });
        }

        let default = parse_optional_child(obj, "default", depth)?;
        Ok(ValueRule { source_path, mappings, default })
    }

    fn parse_function(obj: &Object) -> Result<FunctionRule, RtkError> {
        let function = obj
            .get("function")
            .and_then(Value::as_text)
            .ok_or_else(|| RtkError::new(ErrorCode::BadRules, "`function` rule requires a `function` name"))?
            .to_owned();
        let source_path = match obj.get("sourcePath") {
            Some(v) => Some(expect_path_text(v)?),
            None => None,
        };
        let args = obj
            .get("args")
            .and_then(Value::as_array)
            .map(<[Value]>::to_vec)
            .unwrap_or_default();
        Ok(FunctionRule { function, source_path, args })
    }

    fn parse_conditional(obj: &Object, depth: usize) -> Result<ConditionalRule, RtkError> {
        let conditions_raw = obj
            .get("conditions")
            .and_then(Value::as_array)
            .ok_or_else(|| RtkError::new(ErrorCode::BadRules, "`conditional` rule requires a `conditions` array"))?;

        let mut conditions = Vec::with_capacity(conditions_raw.len());
        for entry in conditions_raw {
            let entry_obj = entry.as_object().ok_or_else(|| {
                RtkError::new(ErrorCode::BadRules, "each `conditions` entry must be an object")
            })?;
            let path = require_path(entry_obj, "path")?;
            let operator = entry_obj
                .get("operator")
                .and_then(Value::as_text)
                .ok_or_else(|| RtkError::new(ErrorCode::BadRules, "condition entry is missing `operator`"))?
                .to_owned();
            let value = entry_obj
                .get("value")
                .ok_or_else(|| RtkError::new(ErrorCode::BadRules, "condition entry is missing `value`"))?
                .clone();
            let result_raw = entry_obj
                .get("result")
                .ok_or_else(|| RtkError::new(ErrorCode::BadRules, "condition entry is missing `result`"))?;
            let result = Box::new(Rule::parse_at_depth(result_raw, depth + 1)?);
            conditions.push(ConditionEntry { path, operator, value, result });
        }

        let default = parse_optional_child(obj, "default", depth)?;
        Ok(ConditionalRule { conditions, default })
    }

    fn parse_array(obj: &Object, depth: usize) -> Result<ArrayRule, RtkError> {
        let source_path = require_path(obj, "sourcePath")?;
        let item_mapping_raw = obj
            .get("itemMapping")
            .and_then(Value::as_object)
            .ok_or_else(|| RtkError::new(ErrorCode::BadRules, "`array` rule requires an `itemMapping` object"))?;

        let mut item_mapping = Vec::with_capacity(item_mapping_raw.len());
        for (key, raw) in item_mapping_raw {
            item_mapping.push((key.clone(), Rule::parse_at_depth(raw, depth + 1)?));
        }

        let wrap_as_array = obj
            .get("wrapAsArray")
            .map(|v| matches!(v, Value::Bool(true)))
            .unwrap_or(false);

        Ok(ArrayRule { source_path, item_mapping, wrap_as_array })
    }

    fn parse_object_rule(obj: &Object, depth: usize) -> Result<Vec<(String, Rule)>, RtkError> {
        let mut fields = Vec::with_capacity(obj.len());
        for (key, raw) in obj {
            if key == "type" {
                continue;
            }
            fields.push((key.clone(), Rule::parse_at_depth(raw, depth + 1)?));
        }
        Ok(fields)
    }
}

fn require_path(obj: &Object, field: &str) -> Result<String, RtkError> {
    let raw = obj
        .get(field)
        .ok_or_else(|| RtkError::new(ErrorCode::BadRules, format!("rule is missing required field `{field}`")))?;
    expect_path_text(raw)
}

fn expect_path_text(raw: &Value) -> Result<String, RtkError> {
    raw.as_text()
        .filter(|s| s.starts_with('$'))
        .map(str::to_owned)
        .ok_or_else(|| RtkError::new(ErrorCode::InvalidPath, "expected a path string starting with `$`"))
}

fn parse_optional_child(obj: &Object, field: &str, depth: usize) -> Result<Option<Box<Rule>>, RtkError> {
    match obj.get(field) {
        Some(raw) => Ok(Some(Box::new(Rule::parse_at_depth(raw, depth + 1)?))),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_dollar_string_is_a_path_rule() {
        let raw = Value::Text("$.a.b".into());
        assert!(matches!(Rule::parse(&raw).unwrap(), Rule::Path(p) if p == "$.a.b"));
    }

    #[test]
    fn scalar_rule_is_literal() {
        assert!(matches!(Rule::parse(&Value::Int(5)).unwrap(), Rule::Literal(Value::Int(5))));
    }

    #[test]
    fn object_without_type_is_missing_type() {
        let raw = Value::parse(r#"{"sourcePath": "$.a"}"#).unwrap();
        let err = Rule::parse(&raw).unwrap_err();
        assert_eq!(err.code, ErrorCode::MissingType);
    }

    #[test]
    fn value_rule_without_mappings_is_missing_mappings() {
        let raw = Value::parse(r#"{"type":"value","sourcePath":"$.a"}"#).unwrap();
        let err = Rule::parse(&raw).unwrap_err();
        assert_eq!(err.code, ErrorCode::MissingMappings);
    }

    #[test]
    fn array_rule_parses_item_mapping() {
        let raw = Value::parse(
            r#"{"type":"array","sourcePath":"$.items","itemMapping":{"x":"$.v"}}"#,
        )
        .unwrap();
        let rule = Rule::parse(&raw).unwrap();
        match rule {
            Rule::Array(ar) => {
                assert_eq!(ar.source_path, "$.items");
                assert_eq!(ar.item_mapping.len(), 1);
                assert!(!ar.wrap_as_array);
            }
            other => panic!("expected array rule, got {other:?}"),
        }
    }

    #[test]
    fn unrecognised_type_is_bad_rules() {
        let raw = Value::parse(r#"{"type":"bogus"}"#).unwrap();
        let err = Rule::parse(&raw).unwrap_err();
        assert_eq!(err.code, ErrorCode::BadRules);
    }
}
