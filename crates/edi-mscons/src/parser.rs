//! MSCONS interchange parser

use crate::postprocess::{check_control_count, enrich};
use crate::Result;
use edi_adapter_edifact::{EdiConfig, EdiDocument};
use edi_ir::Value;
use serde::Serialize;
use std::fs;
use std::path::Path;
use tracing::info;

/// Bundled MSCONS D.99A schema (JSON)
pub const MSCONS_SCHEMA: &str = include_str!("../schemas/mscons_d99a.schema.json");

/// A parsed and post-processed consumption report interchange
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MsconsDocument {
    /// The interchange with dates attached to locations and quantities
    pub interchange: Value,
    /// Metering point identifiers in document order
    pub metering_point_ids: Vec<String>,
}

impl MsconsDocument {
    #[must_use]
    pub fn message_count(&self) -> usize {
        self.interchange
            .get("messages")
            .and_then(Value::as_array)
            .map_or(0, <[Value]>::len)
    }
}

/// Parser for MSCONS interchanges
#[derive(Debug, Clone)]
pub struct MsconsParser {
    document: EdiDocument,
    config: EdiConfig,
}

impl MsconsParser {
    /// Compile the bundled schema
    ///
    /// Segments are terminated by `'`; a UNA header in the input overrides
    /// the separators.
    ///
    /// # Errors
    ///
    /// Returns a schema error if the bundled schema fails to compile.
    pub fn new() -> Result<Self> {
        let document = EdiDocument::from_json(MSCONS_SCHEMA)?;
        let config = EdiConfig {
            segment_separator: "'".to_string(),
            ..EdiConfig::default()
        };
        Ok(Self { document, config })
    }

    #[must_use]
    pub fn with_config(mut self, config: EdiConfig) -> Self {
        self.config = config;
        self
    }

    /// The compiled MSCONS document, for serializing
    #[must_use]
    pub fn document(&self) -> &EdiDocument {
        &self.document
    }

    #[must_use]
    pub fn config(&self) -> &EdiConfig {
        &self.config
    }

    /// Parse and post-process one interchange
    ///
    /// # Errors
    ///
    /// Fails when the configuration is inconsistent, a mandatory segment
    /// group is missing, or the interchange control count does not match the
    /// number of messages.
    pub fn parse_document(&self, text: &str) -> Result<MsconsDocument> {
        let mut interchange = self.document.parse(text, &self.config)?;
        let metering_point_ids = enrich(&mut interchange)?;
        let messages = check_control_count(&interchange)?;

        info!(
            "Parsed MSCONS interchange with {} message(s) and {} metering point(s)",
            messages,
            metering_point_ids.len()
        );

        Ok(MsconsDocument {
            interchange,
            metering_point_ids,
        })
    }

    /// Read and parse an interchange file
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Io`] when the file cannot be read, otherwise as
    /// [`MsconsParser::parse_document`].
    pub fn parse_file(&self, path: &Path) -> Result<MsconsDocument> {
        let text = fs::read_to_string(path)?;
        self.parse_document(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    const INTERCHANGE: &str = "UNB+UNOC:3+S:500+R:500+170102:0815+REF'\
        UNH+1+MSCONS:D:99A:UN'\
        UNS+D'\
        NAD+DP'\
        LOC+172+AT001'\
        DTM+163:201701010000?+01:303'\
        UNT+6+1'\
        UNZ+1+REF'";

    #[test]
    fn test_bundled_schema_compiles() {
        let parser = MsconsParser::new().unwrap();
        let names: Vec<&str> = parser.document().nodes().iter().map(|n| n.name()).collect();
        assert_eq!(
            names,
            vec!["interchangeHeader", "messages", "interchangeTrailer"]
        );
    }

    #[test]
    fn test_parse_document() {
        let parser = MsconsParser::new().unwrap();
        let document = parser.parse_document(INTERCHANGE).unwrap();

        assert_eq!(document.metering_point_ids, vec!["AT001"]);
        assert_eq!(document.message_count(), 1);
        let start = document
            .interchange
            .pointer("messages[0]/segmentGroup5[0]/segmentGroup6[0]/placeLocationIdentifications/startDate")
            .and_then(Value::as_datetime)
            .map(chrono::DateTime::to_rfc3339);
        assert_eq!(start.as_deref(), Some("2017-01-01T00:00:00+01:00"));
    }

    #[test]
    fn test_control_count_mismatch() {
        let parser = MsconsParser::new().unwrap();
        let text = INTERCHANGE.replace("UNZ+1", "UNZ+2");
        assert!(matches!(
            parser.parse_document(&text),
            Err(Error::ControlCountMismatch { declared: 2, parsed: 1 })
        ));
    }

    #[test]
    fn test_serializes_camel_case() {
        let parser = MsconsParser::new().unwrap();
        let document = parser.parse_document(INTERCHANGE).unwrap();
        let json = serde_json::to_value(&document).unwrap();
        assert_eq!(json["meteringPointIds"], serde_json::json!(["AT001"]));
        assert_eq!(
            json["interchange"]["interchangeTrailer"]["interchangeControlCount"],
            1
        );
    }
}
