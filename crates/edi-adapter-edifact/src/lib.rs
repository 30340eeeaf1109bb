//! # edi-adapter-edifact
//!
//! Schema-driven EDIFACT parser and serializer.
//!
//! A resolved schema is compiled once into a tree of [`EdiNode`]s (segments,
//! segment groups, composite data elements and data components). The same tree
//! then turns EDIFACT text into a [`Value`](edi_ir::Value) record and a value
//! back into EDIFACT text, maintaining the UNT/UNZ control counters.

pub mod datetime;
pub mod document;
pub mod node;
pub mod parser;
pub mod reader;
pub mod serializer;
pub mod syntax;

pub use datetime::{DateTimeFormatter, FormatError, ZonedFormatter};
pub use document::EdiDocument;
pub use node::{EdiNode, NodeConfig, NodeKind};
pub use reader::{SegmentReader, SegmentRecord};
pub use serializer::{Counters, SerializeContext};
pub use syntax::{EdiConfig, TrailerConfig};

use edi_ir::Value;
use edi_validation::{Violation, format_violations};
use thiserror::Error;

/// Errors that can occur when compiling, parsing or serializing EDIFACT
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Schema(#[from] edi_schema::Error),

    #[error("Root schema must be of type 'object', found {found:?}")]
    InvalidRoot { found: Option<String> },

    #[error("Unknown EDI type for property '{name}': {fragment}")]
    UnknownEdiType { name: String, fragment: String },

    #[error("Invalid segment group '{name}': {reason}")]
    InvalidSegmentGroup { name: String, reason: String },

    #[error("Json schema validation failed:\n{}", format_violations(.violations))]
    Validation { violations: Vec<Violation> },

    #[error("Required property is missing: \"{property}\"")]
    RequiredField {
        property: String,
        node: Box<NodeConfig>,
        input: Box<Value>,
    },

    #[error("Invalid separator configuration: {0}")]
    Config(String),
}

impl Error {
    /// True for errors raised while compiling a schema into a node tree
    #[must_use]
    pub fn is_schema_error(&self) -> bool {
        matches!(
            self,
            Error::Schema(_)
                | Error::InvalidRoot { .. }
                | Error::UnknownEdiType { .. }
                | Error::InvalidSegmentGroup { .. }
        )
    }

    pub(crate) fn invalid_group(name: &str, reason: impl Into<String>) -> Self {
        Error::InvalidSegmentGroup {
            name: name.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn required_field(node: &EdiNode, input: &Value) -> Self {
        Error::RequiredField {
            property: node.name().to_string(),
            node: Box::new(node.config().clone()),
            input: Box::new(input.clone()),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
