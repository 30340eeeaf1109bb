//! Schema-driven parsing
//!
//! Each node consumes what it owns from a [`SegmentReader`] and produces a
//! value, or `None` when nothing matched. Parsing never fails: conversion
//! problems leave the raw text in place and are logged.

use crate::datetime::DateTimeFormatter;
use crate::node::{DataComponent, DataElement, EdiNode, ScalarType, Segment, SegmentGroup};
use crate::reader::SegmentReader;
use edi_ir::{Record, Value};
use tracing::{debug, trace, warn};

impl EdiNode {
    /// Parse this node at the reader's current position
    pub fn parse(
        &self,
        reader: &mut SegmentReader,
        formatter: &dyn DateTimeFormatter,
    ) -> Option<Value> {
        match self {
            EdiNode::Segment(node) => node.parse(reader, formatter),
            EdiNode::SegmentGroup(node) => node.parse(reader, formatter),
            EdiNode::DataElement(node) => node.parse(reader, formatter),
            EdiNode::DataComponent(node) => node.parse(reader, formatter),
        }
    }
}

/// Parse siblings in order, keeping every value produced
pub(crate) fn parse_children(
    children: &[EdiNode],
    reader: &mut SegmentReader,
    formatter: &dyn DateTimeFormatter,
) -> Record {
    let mut record = Record::new();
    for child in children {
        if let Some(value) = child.parse(reader, formatter) {
            record.insert(child.name().to_string(), value);
        }
    }
    record
}

impl Segment {
    /// Consume one segment with this tag
    ///
    /// A matching segment always yields a record, even an empty one.
    pub fn parse(
        &self,
        reader: &mut SegmentReader,
        formatter: &dyn DateTimeFormatter,
    ) -> Option<Value> {
        if !reader.at_tag(&self.tag) {
            return None;
        }

        trace!("Parsing segment '{}' ({})", self.name, self.tag);
        let record = parse_children(&self.children, reader, formatter);
        reader.next();
        Some(Value::Record(record))
    }
}

impl SegmentGroup {
    /// Consume consecutive occurrences while the current tag matches
    pub fn parse(
        &self,
        reader: &mut SegmentReader,
        formatter: &dyn DateTimeFormatter,
    ) -> Option<Value> {
        let mut occurrences = Vec::new();

        while reader.at_tag(&self.group_tag) {
            let before = reader.consumed();
            let record = parse_children(&self.children, reader, formatter);

            // Synthetic occurrences live inside the current segment; any
            // occurrence must move the cursor or the loop would never end.
            if self.is_synthetic() || reader.consumed() == before {
                reader.next();
            }

            if record.is_empty() {
                warn!(
                    "Dropping empty occurrence of segment group '{}' ({})",
                    self.name, self.group_tag
                );
                continue;
            }
            occurrences.push(Value::Record(record));
        }

        if occurrences.is_empty() {
            None
        } else {
            debug!(
                "Parsed {} occurrence(s) of segment group '{}'",
                occurrences.len(),
                self.name
            );
            Some(Value::Array(occurrences))
        }
    }
}

impl DataElement {
    /// Read the components of the current data element, then advance past it
    pub fn parse(
        &self,
        reader: &mut SegmentReader,
        formatter: &dyn DateTimeFormatter,
    ) -> Option<Value> {
        let record = parse_children(&self.children, reader, formatter);
        reader.next_data_element();

        if record.is_empty() {
            None
        } else {
            Some(Value::Record(record))
        }
    }
}

impl DataComponent {
    /// Read the next component and convert it by the declared type
    ///
    /// A component that is not part of a composite takes the whole data
    /// element, so the element cursor advances as well.
    pub fn parse(
        &self,
        reader: &mut SegmentReader,
        formatter: &dyn DateTimeFormatter,
    ) -> Option<Value> {
        let raw = reader.next_data_component();
        if self.parent.advances_element() {
            reader.next_data_element();
        }

        let raw = raw.filter(|raw| !raw.is_empty())?;
        Some(self.convert(raw, reader.config().decimal_notation, formatter))
    }

    /// Convert raw component text, falling back to the text itself
    pub fn convert(
        &self,
        raw: String,
        decimal_notation: char,
        formatter: &dyn DateTimeFormatter,
    ) -> Value {
        match self.data_type {
            ScalarType::Text => Value::String(raw),
            ScalarType::Integer => match raw.parse::<i64>() {
                Ok(number) => Value::Integer(number),
                Err(e) => {
                    warn!("Keeping '{}' as text, not an integer: {}", self.name, e);
                    Value::String(raw)
                }
            },
            ScalarType::Decimal => match raw.replace(decimal_notation, ".").parse::<f64>() {
                Ok(number) => Value::Decimal(number),
                Err(e) => {
                    warn!("Keeping '{}' as text, not a decimal: {}", self.name, e);
                    Value::String(raw)
                }
            },
            ScalarType::DateTime => match self.format {
                Some(code) => match formatter.parse(&raw, code) {
                    Ok(datetime) => Value::DateTime(datetime),
                    Err(e) => {
                        debug!("Keeping '{}' as text: {}", self.name, e);
                        Value::String(raw)
                    }
                },
                None => Value::String(raw),
            },
        }
    }
}
