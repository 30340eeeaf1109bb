//! Compiled EDIFACT document type
//!
//! [`EdiDocument`] owns a resolved schema together with its compiled node
//! tree, and is the entry point for parsing and serializing one message type.

use crate::datetime::{DateTimeFormatter, ZonedFormatter};
use crate::node::{EdiNode, build_root};
use crate::parser::parse_children;
use crate::reader::SegmentReader;
use crate::serializer::{SerializeContext, render_positional};
use crate::syntax::EdiConfig;
use crate::{Error, Result};
use edi_ir::Value;
use edi_schema::{SchemaFragment, SchemaLoader, resolve_schema};
use edi_validation::{SchemaValidator, Validator, Violation};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A schema compiled for parsing and serializing
///
/// Immutable after construction; a document can be shared between threads
/// and used for any number of parse/serialize calls.
#[derive(Clone)]
pub struct EdiDocument {
    schema: SchemaFragment,
    nodes: Vec<EdiNode>,
    formatter: Arc<dyn DateTimeFormatter>,
    validator: Option<Arc<dyn Validator>>,
}

impl fmt::Debug for EdiDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EdiDocument")
            .field("nodes", &self.nodes.len())
            .field("validates", &self.validator.is_some())
            .finish_non_exhaustive()
    }
}

impl EdiDocument {
    /// Resolve `$ref`/`allOf` in `schema` and compile it
    ///
    /// # Errors
    ///
    /// Returns a schema error when references cannot be resolved or the
    /// schema does not describe a valid node tree.
    pub fn from_schema(schema: &SchemaFragment) -> Result<Self> {
        if !schema.is_type("object") {
            return Err(Error::InvalidRoot {
                found: schema.kind.clone(),
            });
        }

        let schema = resolve_schema(schema)?;
        let nodes = build_root(&schema)?;
        info!("Compiled schema with {} top-level node(s)", nodes.len());

        Ok(Self {
            schema,
            nodes,
            formatter: Arc::new(ZonedFormatter::default()),
            validator: Some(Arc::new(SchemaValidator::new())),
        })
    }

    /// Compile a schema given as JSON text
    ///
    /// # Errors
    ///
    /// Returns a schema error for malformed JSON or an invalid schema.
    pub fn from_json(json: &str) -> Result<Self> {
        let schema = SchemaLoader::default().load_from_json(json)?;
        Self::from_schema(&schema)
    }

    /// Compile a schema file (JSON, or YAML by extension)
    ///
    /// # Errors
    ///
    /// Returns a schema error when the file cannot be read or is invalid.
    pub fn from_file(path: &Path) -> Result<Self> {
        let schema = SchemaLoader::default().load_from_file(path)?;
        Self::from_schema(&schema)
    }

    /// Replace the date/time formatter
    #[must_use]
    pub fn with_formatter(mut self, formatter: Arc<dyn DateTimeFormatter>) -> Self {
        self.formatter = formatter;
        self
    }

    /// Replace the validator run before serializing
    #[must_use]
    pub fn with_validator(mut self, validator: Arc<dyn Validator>) -> Self {
        self.validator = Some(validator);
        self
    }

    /// Serialize without validating the input first
    #[must_use]
    pub fn without_validation(mut self) -> Self {
        self.validator = None;
        self
    }

    /// The resolved schema
    #[must_use]
    pub fn schema(&self) -> &SchemaFragment {
        &self.schema
    }

    /// Top-level nodes in `edi_order`
    #[must_use]
    pub fn nodes(&self) -> &[EdiNode] {
        &self.nodes
    }

    /// Validate a value tree against the resolved schema
    ///
    /// Without a validator every value is accepted.
    #[must_use]
    pub fn validate(&self, value: &Value) -> Vec<Violation> {
        self.validator
            .as_ref()
            .map(|validator| validator.validate(value, &self.schema))
            .unwrap_or_default()
    }

    /// Parse EDIFACT text into a value tree
    ///
    /// Segments that match no schema node are left unconsumed; parsing itself
    /// never fails on content.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when `config` is inconsistent.
    pub fn parse(&self, text: &str, config: &EdiConfig) -> Result<Value> {
        config.validate()?;
        let mut reader = SegmentReader::new(text, config);
        Ok(self.parse_reader(&mut reader))
    }

    /// Parse from an existing reader
    pub fn parse_reader(&self, reader: &mut SegmentReader) -> Value {
        let record = parse_children(&self.nodes, reader, self.formatter.as_ref());

        if !reader.is_exhausted() {
            warn!(
                "{} segment(s) left unparsed, starting with '{}'",
                reader.remaining(),
                reader.current().map_or("", |segment| segment.raw.as_str())
            );
        }
        debug!("Parsed {} segment(s)", reader.consumed());

        Value::Record(record)
    }

    /// Serialize a value tree to EDIFACT text
    ///
    /// The value is validated first (unless validation is disabled). The
    /// message and interchange trailers receive the computed counts.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for an inconsistent configuration,
    /// [`Error::Validation`] when the value does not match the schema, and
    /// [`Error::RequiredField`] when a required node renders nothing.
    pub fn serialize(&self, value: &Value, config: &EdiConfig) -> Result<String> {
        config.validate()?;

        let violations = self.validate(value);
        if !violations.is_empty() {
            return Err(Error::Validation { violations });
        }

        let mut ctx = SerializeContext::new(config, self.formatter.as_ref());
        let mut text = String::new();
        if config.service_string_advice {
            text.push_str(&config.to_una());
        }
        for item in render_positional(&self.nodes, value, &mut ctx)? {
            text.push_str(&item);
        }

        debug!(
            "Serialized {} message(s), {} byte(s)",
            ctx.counters.messages,
            text.len()
        );
        Ok(text)
    }
}
