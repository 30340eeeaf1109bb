//! Validation rules
//!
//! Keyword checks applied by the schema validator. Each rule inspects one
//! value against one constraint and reports a [`RuleResult`].

use edi_ir::Value;
use regex::Regex;

/// Validation rule result
#[derive(Debug, Clone)]
pub struct RuleResult {
    pub is_valid: bool,
    pub message: Option<String>,
}

impl RuleResult {
    #[must_use]
    pub fn valid() -> Self {
        Self {
            is_valid: true,
            message: None,
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            message: Some(message.into()),
        }
    }
}

/// Validate the declared `type` of a value
///
/// Unknown type names are accepted. `decimal` behaves like `number`;
/// `datetime` accepts parsed timestamps as well as their textual form.
#[must_use]
pub fn validate_type(value: &Value, kind: &str) -> RuleResult {
    let matches = match kind {
        "object" => matches!(value, Value::Record(_)),
        "array" => matches!(value, Value::Array(_)),
        "string" => matches!(value, Value::String(_)),
        "integer" => matches!(value, Value::Integer(_)),
        "number" | "decimal" => matches!(value, Value::Integer(_) | Value::Decimal(_)),
        "datetime" => matches!(value, Value::DateTime(_) | Value::String(_)),
        "boolean" => matches!(value, Value::Boolean(_)),
        "null" => value.is_null(),
        _ => true,
    };

    if matches {
        RuleResult::valid()
    } else {
        RuleResult::invalid(format!("Expected {kind}, found {}", value.kind()))
    }
}

/// Validate length constraints
#[must_use]
pub fn validate_length(value: &str, min: Option<usize>, max: Option<usize>) -> RuleResult {
    let len = value.chars().count();

    if let Some(min) = min {
        if len < min {
            return RuleResult::invalid(format!("Value length {len} is less than minimum {min}"));
        }
    }

    if let Some(max) = max {
        if len > max {
            return RuleResult::invalid(format!("Value length {len} exceeds maximum {max}"));
        }
    }

    RuleResult::valid()
}

/// Validate pattern matching using regex
#[must_use]
pub fn validate_pattern(value: &str, pattern: &str) -> RuleResult {
    match Regex::new(pattern) {
        Ok(re) => validate_match(value, &re),
        Err(e) => invalid_pattern(pattern, &e),
    }
}

/// Validate against an already compiled pattern
#[must_use]
pub fn validate_match(value: &str, re: &Regex) -> RuleResult {
    if re.is_match(value) {
        RuleResult::valid()
    } else {
        RuleResult::invalid(format!(
            "Value '{value}' does not match pattern '{}'",
            re.as_str()
        ))
    }
}

pub(crate) fn invalid_pattern(pattern: &str, error: &regex::Error) -> RuleResult {
    RuleResult::invalid(format!("Invalid regex pattern '{pattern}': {error}"))
}

/// Validate numeric range (inclusive)
#[must_use]
pub fn validate_range(value: f64, min: Option<f64>, max: Option<f64>) -> RuleResult {
    if let Some(min) = min {
        if value < min {
            return RuleResult::invalid(format!("Value {value} is less than minimum {min}"));
        }
    }

    if let Some(max) = max {
        if value > max {
            return RuleResult::invalid(format!("Value {value} exceeds maximum {max}"));
        }
    }

    RuleResult::valid()
}

/// Validate the number of occurrences of a repeated value
#[must_use]
pub fn validate_occurrences(count: usize, min: Option<usize>, max: Option<usize>) -> RuleResult {
    if let Some(min) = min {
        if count < min {
            return RuleResult::invalid(format!(
                "Found {count} occurrences, minimum required is {min}"
            ));
        }
    }

    if let Some(max) = max {
        if count > max {
            return RuleResult::invalid(format!(
                "Found {count} occurrences, maximum allowed is {max}"
            ));
        }
    }

    RuleResult::valid()
}

/// Validate a value against an `enum` code list
#[must_use]
pub fn validate_code_list(value: &Value, codes: &[serde_json::Value]) -> RuleResult {
    let json = value.to_json();
    if codes.contains(&json) {
        RuleResult::valid()
    } else {
        let allowed = codes
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        RuleResult::invalid(format!("Value {json} is not one of [{allowed}]"))
    }
}
