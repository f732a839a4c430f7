use rtk_condition::Operator;
use rtk_error::{ErrorCode, RtkError};
use rtk_json::{Object, Value};
use rtk_path::PathCache;
use tracing::{trace, warn};

use crate::rule::{ArrayRule, ConditionalRule, FunctionRule, Rule, ValueRule};

/// Walks a parsed rule tree against a source document.
///
/// Owns a compiled-path cache: reuse one `Interpreter` across calls so
/// that a given path string is compiled at most once.
#[derive(Debug, Default)]
pub struct Interpreter {
    cache: PathCache,
}

impl Interpreter {
    /// Creates an interpreter with an empty path cache.
    #[must_use]
    pub fn new() -> Self {
        Self { cache: PathCache::new() }
    }

    /// Parses `source_text` and `rules_text` and runs the transform.
    /// Malformed source raises `BadSource`; a rules document that is not
    /// a JSON object raises `BadRules`.
    pub fn transform(&self, source_text: &str, rules_text: &str) -> Result<Value, RtkError> {
        let source = Value::parse(source_text)?;
        let rules = parse_rules_text(rules_text)?;
        self.transform_value(&source, &rules)
    }

    /// Runs the transform against already-parsed source and rules
    /// documents.
    pub fn transform_value(&self, source: &Value, rules: &Value) -> Result<Value, RtkError> {
        let fields = rules
            .as_object()
            .ok_or_else(|| RtkError::new(ErrorCode::BadRules, "rules document is not a JSON object"))?;

        let mut target = Object::new();
        for (field_name, raw_rule) in fields {
            let value = self.eval_raw(raw_rule, source).map_err(|e| {
                warn!(target: "rtk.transform.interpreter", field = field_name.as_str(), error = %e, "field evaluation failed");
                e.into_field_failure(field_name)
            })?;
            trace!(target: "rtk.transform.interpreter", field = field_name.as_str(), "field evaluated");
            target.insert(field_name.clone(), value);
        }
        Ok(Value::Object(target))
    }

    fn eval_raw(&self, raw_rule: &Value, source: &Value) -> Result<Value, RtkError> {
        let rule = Rule::parse(raw_rule)?;
        self.eval(&rule, source)
    }

    /// Evaluates a single parsed rule node against `source`.
    pub fn eval(&self, rule: &Rule, source: &Value) -> Result<Value, RtkError> {
        match rule {
            Rule::Literal(v) => Ok(v.clone()),
            Rule::Path(path) => self.eval_path(source, path),
            Rule::Value(vr) => self.eval_value_mapping(vr, source),
            Rule::Function(fr) => self.eval_function_mapping(fr, source),
            Rule::Conditional(cr) => self.eval_conditional(cr, source),
            Rule::Array(ar) => self.eval_array_mapping(ar, source),
            Rule::Object(fields) => self.eval_object_mapping(fields, source),
        }
    }

    fn eval_path(&self, source: &Value, path: &str) -> Result<Value, RtkError> {
        rtk_path::eval_path(&self.cache, source, path)
    }

    fn eval_value_mapping(&self, vr: &ValueRule, source: &Value) -> Result<Value, RtkError> {
        let resolved = self.eval_path(source, &vr.source_path)?;
        match &resolved {
            Value::Null => self.default_or(vr.default.as_deref(), source, Value::Null),
            Value::Array(items) => {
                let mut mapped = Vec::with_capacity(items.len());
                for item in items {
                    // No mapping and no default means the element passes through unchanged.
                    mapped.push(self.map_one(vr, item, source, item.clone())?);
                }
                Ok(Value::Array(mapped))
            }
            // No mapping and no default on a scalar yields Null, not pass-through.
            scalar => self.map_one(vr, scalar, source, Value::Null),
        }
    }

    fn map_one(
        &self,
        vr: &ValueRule,
        element: &Value,
        source: &Value,
        no_match_fallback: Value,
    ) -> Result<Value, RtkError> {
        let key = element.text_form();
        if let Some(entry) = vr.mappings.iter().find(|m| m.source == key) {
            return Ok(entry.target.clone());
        }
        match &vr.default {
            Some(default) => self.eval(default, source),
            None => Ok(no_match_fallback),
        }
    }

    fn default_or(&self, default: Option<&Rule>, source: &Value, fallback: Value) -> Result<Value, RtkError> {
        match default {
            Some(rule) => self.eval(rule, source),
            None => Ok(fallback),
        }
    }

    fn eval_function_mapping(&self, fr: &FunctionRule, source: &Value) -> Result<Value, RtkError> {
        let input = match &fr.source_path {
            Some(path) => self.eval_path(source, path)?,
            None => source.clone(),
        };

        let args = if fr.function == "$concat" {
            fr.args
                .iter()
                .map(|arg| match arg {
                    Value::Text(s) if s.starts_with('$') => self.eval_path(source, s),
                    other => Ok(other.clone()),
                })
                .collect::<Result<Vec<_>, _>>()?
        } else {
            fr.args.clone()
        };

        rtk_functions::call(&fr.function, &input, &args).map_err(|e| e.into_function_failure(&fr.function))
    }

    fn eval_conditional(&self, cr: &ConditionalRule, source: &Value) -> Result<Value, RtkError> {
        for entry in &cr.conditions {
            let resolved = self.eval_path(source, &entry.path)?;
            let operator = Operator::parse(&entry.operator)?;
            if rtk_condition::evaluate(&resolved, operator, &entry.value)? {
                return self.eval(&entry.result, source);
            }
        }
        self.default_or(cr.default.as_deref(), source, Value::Null)
    }

    fn eval_array_mapping(&self, ar: &ArrayRule, source: &Value) -> Result<Value, RtkError> {
        let resolved = self.eval_path(source, &ar.source_path)?;
        let elements: Vec<Value> = match &resolved {
            Value::Array(items) => items.clone(),
            Value::Object(_) if ar.wrap_as_array && !resolved.is_null() => vec![resolved.clone()],
            _ => Vec::new(),
        };

        let mut out = Vec::with_capacity(elements.len());
        for element in &elements {
            let mut obj = Object::new();
            for (key, rule) in &ar.item_mapping {
                let value = self.eval(rule, element).map_err(|e| e.into_field_failure(key))?;
                obj.insert(key.clone(), value);
            }
            out.push(Value::Object(obj));
        }
        Ok(Value::Array(out))
    }

    fn eval_object_mapping(&self, fields: &[(String, Rule)], source: &Value) -> Result<Value, RtkError> {
        let mut obj = Object::new();
        for (key, rule) in fields {
            let value = self.eval(rule, source).map_err(|e| e.into_field_failure(key))?;
            obj.insert(key.clone(), value);
        }
        Ok(Value::Object(obj))
    }
}

fn parse_rules_text(text: &str) -> Result<Value, RtkError> {
    Value::parse(text).map_err(|e| RtkError::with_cause(ErrorCode::BadRules, "rules document is not valid JSON", e))
}
