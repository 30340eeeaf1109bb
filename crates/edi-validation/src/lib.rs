#![deny(warnings)]
#![deny(rust_2018_idioms)]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

//! # edi-validation
//!
//! Structural validation of value trees against their EDI schema.
//!
//! The EDIFACT serializer checks its input through the [`Validator`] contract
//! before rendering. [`SchemaValidator`] is the default implementation: it
//! interprets the JSON-Schema keywords carried by the resolved schema.
//!
//! ## Example Usage
//!
//! ```rust
//! use edi_validation::{SchemaValidator, Validator};
//! use edi_ir::Value;
//! use edi_schema::SchemaFragment;
//!
//! let schema: SchemaFragment = serde_json::from_str(
//!     r#"{"type": "object", "required": ["header"],
//!         "properties": {"header": {"type": "object", "edi_tag": "UNH"}}}"#,
//! ).unwrap();
//!
//! let violations = SchemaValidator::new().validate(&Value::record(), &schema);
//! assert_eq!(violations.len(), 1);
//! assert_eq!(violations[0].path, "header");
//! ```

pub mod engine;
pub mod reporter;
pub mod rules;

// Re-export main types
pub use engine::{SchemaValidator, ValidationConfig, Validator};
pub use reporter::{Violation, format_violations};
pub use rules::RuleResult;

/// Convenience function to validate a value with default settings
#[must_use]
pub fn validate(value: &edi_ir::Value, schema: &edi_schema::SchemaFragment) -> Vec<Violation> {
    SchemaValidator::new().validate(value, schema)
}
