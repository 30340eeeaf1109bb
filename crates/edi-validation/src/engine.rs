//! Validation engine
//!
//! [`SchemaValidator`] interprets the JSON-Schema subset used by EDI schemas
//! over a value tree. It expects a resolved schema (no `$ref`/`allOf`).

use crate::reporter::Violation;
use crate::rules::{
    RuleResult, invalid_pattern, validate_code_list, validate_length, validate_match,
    validate_occurrences, validate_pattern, validate_range, validate_type,
};
use edi_ir::Value;
use edi_schema::{Items, SchemaFragment};
use regex::Regex;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::{debug, trace};

/// Structural validator contract
///
/// Returns every violation found; an empty list means the value is valid.
pub trait Validator: Send + Sync {
    fn validate(&self, value: &Value, schema: &SchemaFragment) -> Vec<Violation>;
}

/// Validation configuration
#[derive(Debug, Clone, Default)]
pub struct ValidationConfig {
    /// Maximum violations before stopping (0 = unlimited)
    pub max_violations: usize,
}

type PatternCache = HashMap<String, Result<Regex, regex::Error>>;

/// JSON-Schema subset validator
///
/// Compiled `pattern` keywords are cached for the lifetime of the validator;
/// clones share the cache.
#[derive(Debug, Clone, Default)]
pub struct SchemaValidator {
    config: ValidationConfig,
    patterns: Arc<Mutex<PatternCache>>,
}

struct Walk<'a> {
    config: &'a ValidationConfig,
    violations: Vec<Violation>,
}

impl Walk<'_> {
    fn full(&self) -> bool {
        self.config.max_violations > 0 && self.violations.len() >= self.config.max_violations
    }

    fn report(&mut self, path: &str, keyword: &str, result: RuleResult) {
        if !result.is_valid && !self.full() {
            self.violations.push(Violation::new(
                path,
                keyword,
                result.message.unwrap_or_default(),
            ));
        }
    }
}

fn child_path(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{parent}/{name}")
    }
}

fn keyword_usize(schema: &SchemaFragment, keyword: &str) -> Option<usize> {
    schema
        .extra
        .get(keyword)
        .and_then(serde_json::Value::as_u64)
        .and_then(|n| usize::try_from(n).ok())
}

fn keyword_f64(schema: &SchemaFragment, keyword: &str) -> Option<f64> {
    schema.extra.get(keyword).and_then(serde_json::Value::as_f64)
}

impl SchemaValidator {
    /// Create a new validator
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with specific configuration
    #[must_use]
    pub fn with_config(config: ValidationConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Match `text` against `pattern`, compiling it once per validator
    fn check_pattern(&self, text: &str, pattern: &str) -> RuleResult {
        let Ok(mut patterns) = self.patterns.lock() else {
            return validate_pattern(text, pattern);
        };

        if !patterns.contains_key(pattern) {
            trace!("Compiling pattern '{}'", pattern);
            patterns.insert(pattern.to_string(), Regex::new(pattern));
        }

        match patterns.get(pattern) {
            Some(Ok(re)) => validate_match(text, re),
            Some(Err(e)) => invalid_pattern(pattern, e),
            None => RuleResult::valid(),
        }
    }

    #[cfg(test)]
    fn cached_patterns(&self) -> usize {
        self.patterns.lock().map(|patterns| patterns.len()).unwrap_or(0)
    }

    fn walk(&self, value: &Value, schema: &SchemaFragment, path: &str, walk: &mut Walk<'_>) {
        if walk.full() {
            return;
        }

        if let Some(kind) = schema.kind.as_deref() {
            let result = validate_type(value, kind);
            if !result.is_valid {
                walk.report(path, "type", result);
                return;
            }
        }

        if let Some(codes) = schema.extra.get("enum").and_then(serde_json::Value::as_array) {
            walk.report(path, "enum", validate_code_list(value, codes));
        }

        match value {
            Value::Record(record) => {
                for name in schema.required_names() {
                    if !record.contains_key(name) {
                        walk.report(
                            &child_path(path, name),
                            "required",
                            RuleResult::invalid(format!("Property '{name}' is required")),
                        );
                    }
                }

                if let Some(properties) = &schema.properties {
                    for (name, property) in properties {
                        let property_path = child_path(path, name);
                        match record.get(name) {
                            Some(child) => self.walk(child, property, &property_path, walk),
                            None if property.is_required_flag() => walk.report(
                                &property_path,
                                "required",
                                RuleResult::invalid(format!("Property '{name}' is required")),
                            ),
                            None => {}
                        }
                    }
                }

                if schema.extra.get("additionalProperties") == Some(&serde_json::Value::Bool(false))
                {
                    for name in record.keys() {
                        let known = schema
                            .properties
                            .as_ref()
                            .is_some_and(|properties| properties.contains_key(name));
                        if !known {
                            walk.report(
                                &child_path(path, name),
                                "additionalProperties",
                                RuleResult::invalid(format!("Property '{name}' is not allowed")),
                            );
                        }
                    }
                }
            }
            Value::Array(items) => {
                walk.report(
                    path,
                    "items",
                    validate_occurrences(
                        items.len(),
                        keyword_usize(schema, "minItems"),
                        keyword_usize(schema, "maxItems"),
                    ),
                );

                match &schema.items {
                    Some(Items::One(item_schema)) => {
                        for (index, item) in items.iter().enumerate() {
                            self.walk(item, item_schema, &format!("{path}[{index}]"), walk);
                        }
                    }
                    Some(Items::Many(item_schemas)) => {
                        for (index, (item, item_schema)) in
                            items.iter().zip(item_schemas).enumerate()
                        {
                            self.walk(item, item_schema, &format!("{path}[{index}]"), walk);
                        }
                    }
                    None => {}
                }
            }
            Value::String(text) => {
                walk.report(
                    path,
                    "length",
                    validate_length(
                        text,
                        keyword_usize(schema, "minLength"),
                        keyword_usize(schema, "maxLength"),
                    ),
                );
                if let Some(pattern) = schema.extra.get("pattern").and_then(|p| p.as_str()) {
                    walk.report(path, "pattern", self.check_pattern(text, pattern));
                }
            }
            Value::Integer(_) | Value::Decimal(_) => {
                if let Some(number) = value.as_f64() {
                    walk.report(
                        path,
                        "range",
                        validate_range(
                            number,
                            keyword_f64(schema, "minimum"),
                            keyword_f64(schema, "maximum"),
                        ),
                    );
                }
            }
            Value::Null | Value::Boolean(_) | Value::DateTime(_) => {}
        }
    }
}

impl Validator for SchemaValidator {
    fn validate(&self, value: &Value, schema: &SchemaFragment) -> Vec<Violation> {
        let mut walk = Walk {
            config: &self.config,
            violations: Vec::new(),
        };
        self.walk(value, schema, "", &mut walk);
        debug!("Validation finished with {} violation(s)", walk.violations.len());
        walk.violations
    }
}
