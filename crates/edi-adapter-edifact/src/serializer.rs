//! Schema-driven serialization
//!
//! Each node renders its slice of a value tree to EDIFACT text. Segment and
//! message totals are carried in [`Counters`] on the [`SerializeContext`] and
//! written into the UNT/UNZ trailers as those segments are rendered.

use crate::datetime::DateTimeFormatter;
use crate::node::{DataComponent, DataElement, EdiNode, ScalarType, Segment, SegmentGroup};
use crate::syntax::EdiConfig;
use crate::{Error, Result};
use chrono::{DateTime, FixedOffset};
use edi_ir::Value;
use std::borrow::Cow;
use tracing::{trace, warn};

/// Running totals of one serialization
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Counters {
    /// Segments rendered in the current message, UNH included
    pub segments: usize,
    /// Messages rendered so far
    pub messages: usize,
}

/// State threaded through one serialization
pub struct SerializeContext<'a> {
    pub config: &'a EdiConfig,
    pub formatter: &'a dyn DateTimeFormatter,
    pub counters: Counters,
}

impl<'a> SerializeContext<'a> {
    #[must_use]
    pub fn new(config: &'a EdiConfig, formatter: &'a dyn DateTimeFormatter) -> Self {
        Self {
            config,
            formatter,
            counters: Counters::default(),
        }
    }

    /// Count one rendered segment
    fn count_segment(&mut self, tag: &str) {
        if tag == self.config.trailers.message_header_tag {
            self.counters.segments = 1;
            self.counters.messages += 1;
        } else {
            self.counters.segments += 1;
        }
    }

    /// Render one segment from its already rendered items
    fn segment_text(&self, tag: &str, items: &[String], composite: bool) -> String {
        let joiner = if composite {
            self.config.data_component_separator
        } else {
            self.config.data_element_separator
        };

        let mut text = String::from(tag);
        text.push(self.config.data_element_separator);
        text.push_str(&items.join(joiner.to_string().as_str()));
        text.push_str(&self.config.segment_separator);
        text
    }
}

/// Render the child of `parent` named like `node`
///
/// # Errors
///
/// Returns [`Error::RequiredField`] when a required child is absent or null.
/// A required child that is present but renders nothing keeps its empty
/// position.
fn render_child(
    node: &EdiNode,
    parent: &Value,
    ctx: &mut SerializeContext<'_>,
) -> Result<Option<String>> {
    let value = parent.get(node.name()).filter(|value| !value.is_null());
    if value.is_none() && node.config().required {
        return Err(Error::required_field(node, parent));
    }
    node.to_edi(value, ctx)
}

/// Render siblings positionally
///
/// Siblings are rendered in order. The result is then scanned from the right:
/// an empty sibling keeps its (empty) position once anything to its right was
/// kept or when it cannot be omitted, so trailing omittable gaps vanish while
/// positions before a present value are preserved.
///
/// # Errors
///
/// Propagates the first rendering error of any sibling.
pub fn render_positional(
    children: &[EdiNode],
    parent: &Value,
    ctx: &mut SerializeContext<'_>,
) -> Result<Vec<String>> {
    let mut rendered = Vec::with_capacity(children.len());
    for child in children {
        rendered.push(render_child(child, parent, ctx)?);
    }

    let mut items = Vec::with_capacity(children.len());
    let mut keep = false;
    for (child, text) in children.iter().zip(rendered).rev() {
        match text {
            Some(text) => {
                keep = true;
                items.push(text);
            }
            None if keep || !child.config().can_omit => {
                keep = true;
                items.push(String::new());
            }
            None => {}
        }
    }

    items.reverse();
    Ok(items)
}

impl EdiNode {
    /// Render this node; `None` when there is nothing to emit
    ///
    /// # Errors
    ///
    /// Returns [`Error::RequiredField`] when a required descendant is missing.
    pub fn to_edi(
        &self,
        value: Option<&Value>,
        ctx: &mut SerializeContext<'_>,
    ) -> Result<Option<String>> {
        match self {
            EdiNode::Segment(node) => node.to_edi(value, ctx),
            EdiNode::SegmentGroup(node) => node.to_edi(value, ctx),
            EdiNode::DataElement(node) => node.to_edi(value, ctx),
            EdiNode::DataComponent(node) => Ok(node.to_edi(value, ctx)),
        }
    }
}

impl Segment {
    fn is_trailer(&self, config: &EdiConfig) -> bool {
        self.tag == config.trailers.message_trailer_tag
            || self.tag == config.trailers.interchange_trailer_tag
    }

    /// Write the running totals into a copy of a trailer record
    fn with_totals<'v>(&self, value: Cow<'v, Value>, ctx: &SerializeContext<'_>) -> Cow<'v, Value> {
        let trailers = &ctx.config.trailers;
        let (field, total) = if self.tag == trailers.message_trailer_tag {
            (&trailers.segment_count_field, ctx.counters.segments)
        } else if self.tag == trailers.interchange_trailer_tag {
            (&trailers.message_count_field, ctx.counters.messages)
        } else {
            return value;
        };

        if value.as_record().is_none() {
            return value;
        }

        let mut value = value.into_owned();
        let total = i64::try_from(total).unwrap_or(i64::MAX);
        value.insert(field.clone(), Value::Integer(total));
        Cow::Owned(value)
    }

    /// Render `TAG<items>` followed by the segment separator
    ///
    /// An absent trailer is still rendered so that its count is emitted.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RequiredField`] when a required child is missing.
    pub fn to_edi(
        &self,
        value: Option<&Value>,
        ctx: &mut SerializeContext<'_>,
    ) -> Result<Option<String>> {
        let value = match value {
            Some(value) if !value.is_null() => Cow::Borrowed(value),
            _ if self.is_trailer(ctx.config) => Cow::Owned(Value::record()),
            _ => return Ok(None),
        };

        ctx.count_segment(&self.tag);
        let value = self.with_totals(value, ctx);

        let items = render_positional(&self.children, &value, ctx)?;
        trace!("Rendered segment {} with {} item(s)", self.tag, items.len());
        Ok(Some(ctx.segment_text(
            &self.tag,
            &items,
            self.config.edi_ref.is_some(),
        )))
    }
}

impl SegmentGroup {
    /// Render every occurrence in order
    ///
    /// # Errors
    ///
    /// Returns [`Error::RequiredField`] when a required child of an occurrence
    /// is missing.
    pub fn to_edi(
        &self,
        value: Option<&Value>,
        ctx: &mut SerializeContext<'_>,
    ) -> Result<Option<String>> {
        let Some(occurrences) = value.and_then(Value::as_array) else {
            return Ok(None);
        };

        let mut text = String::new();
        for occurrence in occurrences {
            if self.is_synthetic() {
                // One occurrence is one repetition of the group segment
                ctx.count_segment(&self.group_tag);
                let items = render_positional(&self.children, occurrence, ctx)?;
                text.push_str(&ctx.segment_text(
                    &self.group_tag,
                    &items,
                    self.config.edi_ref.is_some(),
                ));
            } else {
                for child in &self.children {
                    if let Some(rendered) = render_child(child, occurrence, ctx)? {
                        text.push_str(&rendered);
                    }
                }
            }
        }

        Ok((!text.is_empty()).then_some(text))
    }
}

impl DataElement {
    /// Render the components joined by the component separator
    ///
    /// # Errors
    ///
    /// Returns [`Error::RequiredField`] when a required component is missing.
    pub fn to_edi(
        &self,
        value: Option<&Value>,
        ctx: &mut SerializeContext<'_>,
    ) -> Result<Option<String>> {
        let Some(value) = value.filter(|value| !value.is_null()) else {
            return Ok(None);
        };

        let items = render_positional(&self.children, value, ctx)?;
        let separator = ctx.config.data_component_separator.to_string();
        let text = items.join(separator.as_str());
        Ok((!text.is_empty()).then_some(text))
    }
}

impl DataComponent {
    /// Render a scalar, escaping text
    ///
    /// Empty text renders nothing. Records and arrays are not scalars and are
    /// skipped with a warning.
    pub fn to_edi(&self, value: Option<&Value>, ctx: &SerializeContext<'_>) -> Option<String> {
        let config = ctx.config;
        let text = match value? {
            Value::Null => return None,
            Value::String(text) => self.render_text(text, ctx),
            Value::Integer(number) => number.to_string(),
            Value::Decimal(number) => render_decimal(*number, config.decimal_notation),
            Value::Boolean(flag) => flag.to_string(),
            Value::DateTime(datetime) => config.escape(&self.render_datetime(datetime, ctx)),
            other => {
                warn!(
                    "Skipping data component '{}': expected a scalar, found {}",
                    self.name,
                    other.kind()
                );
                return None;
            }
        };

        (!text.is_empty()).then_some(text)
    }

    /// Escape text; RFC 3339 text in a datetime component is reformatted
    fn render_text(&self, text: &str, ctx: &SerializeContext<'_>) -> String {
        if self.data_type == ScalarType::DateTime && self.format.is_some() {
            if let Ok(datetime) = DateTime::parse_from_rfc3339(text) {
                return ctx.config.escape(&self.render_datetime(&datetime, ctx));
            }
        }
        ctx.config.escape(text)
    }

    fn render_datetime(&self, datetime: &DateTime<FixedOffset>, ctx: &SerializeContext<'_>) -> String {
        let Some(code) = self.format else {
            return datetime.to_rfc3339();
        };

        match ctx.formatter.format(datetime, code) {
            Ok(text) => text,
            Err(e) => {
                warn!("Writing '{}' as RFC 3339: {}", self.name, e);
                datetime.to_rfc3339()
            }
        }
    }
}

fn render_decimal(number: f64, notation: char) -> String {
    let text = number.to_string();
    if notation == '.' {
        text
    } else {
        text.replace('.', &notation.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datetime::ZonedFormatter;
    use crate::node::build_root;
    use edi_schema::SchemaFragment;
    use serde_json::json;

    fn render(schema: serde_json::Value, value: serde_json::Value) -> Result<String> {
        render_with(schema, value, &EdiConfig {
            segment_separator: "'".to_string(),
            ..EdiConfig::default()
        })
    }

    fn render_with(
        schema: serde_json::Value,
        value: serde_json::Value,
        config: &EdiConfig,
    ) -> Result<String> {
        let schema: SchemaFragment = serde_json::from_value(schema).unwrap();
        let nodes = build_root(&schema).unwrap();
        let formatter = ZonedFormatter::default();
        let mut ctx = SerializeContext::new(config, &formatter);
        let value = Value::from(value);
        Ok(render_positional(&nodes, &value, &mut ctx)?.concat())
    }

    fn abc_schema() -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "segment": {
                    "type": "object",
                    "edi_tag": "TST",
                    "properties": {
                        "a": {"type": "string", "edi_ref": "1", "edi_order": 1},
                        "b": {"type": "string", "edi_ref": "2", "edi_order": 2},
                        "c": {"type": "string", "edi_ref": "3", "edi_order": 3}
                    }
                }
            }
        })
    }

    #[test]
    fn test_trailing_optional_items_omitted() {
        let text = render(abc_schema(), json!({"segment": {"a": "x"}})).unwrap();
        assert_eq!(text, "TST+x'");
    }

    #[test]
    fn test_gap_before_present_item_kept() {
        let text = render(abc_schema(), json!({"segment": {"a": "x", "c": "z"}})).unwrap();
        assert_eq!(text, "TST+x++z'");
    }

    #[test]
    fn test_empty_segment() {
        let text = render(abc_schema(), json!({"segment": {}})).unwrap();
        assert_eq!(text, "TST+'");

        let text = render(abc_schema(), json!({})).unwrap();
        assert_eq!(text, "");
    }

    #[test]
    fn test_non_omittable_gap_kept() {
        let schema = json!({
            "type": "object",
            "properties": {
                "segment": {
                    "type": "object",
                    "edi_tag": "TST",
                    "properties": {
                        "a": {"type": "string", "edi_ref": "1", "edi_order": 1},
                        "b": {"type": "string", "edi_ref": "2", "edi_order": 2},
                        "c": {"type": "string", "edi_ref": "3", "edi_order": 3,
                              "required": true}
                    }
                }
            }
        });
        let text = render(schema, json!({"segment": {"c": "z"}})).unwrap();
        assert_eq!(text, "TST+++z'");
    }

    #[test]
    fn test_required_field_missing() {
        let schema = json!({
            "type": "object",
            "properties": {
                "segment": {
                    "type": "object",
                    "edi_tag": "TST",
                    "required": ["b"],
                    "properties": {
                        "a": {"type": "string", "edi_ref": "1", "edi_order": 1},
                        "b": {"type": "string", "edi_ref": "2", "edi_order": 2}
                    }
                }
            }
        });

        match render(schema, json!({"segment": {"a": "x"}})) {
            Err(Error::RequiredField { property, node, input }) => {
                assert_eq!(property, "b");
                assert_eq!(node.edi_ref.as_deref(), Some("2"));
                assert_eq!(input.to_json(), json!({"a": "x"}));
            }
            other => panic!("Expected RequiredField error, got {other:?}"),
        }
    }

    #[test]
    fn test_required_field_present_but_empty() {
        let schema = json!({
            "type": "object",
            "properties": {
                "segment": {
                    "type": "object",
                    "edi_tag": "TST",
                    "required": ["a"],
                    "properties": {
                        "a": {"type": "string", "edi_ref": "1", "edi_order": 1},
                        "b": {"type": "string", "edi_ref": "2", "edi_order": 2}
                    }
                }
            }
        });

        let text = render(schema.clone(), json!({"segment": {"a": "", "b": "y"}})).unwrap();
        assert_eq!(text, "TST++y'");

        let text = render(schema.clone(), json!({"segment": {"a": ""}})).unwrap();
        assert_eq!(text, "TST+'");

        assert!(matches!(
            render(schema, json!({"segment": {"a": null, "b": "y"}})),
            Err(Error::RequiredField { ref property, .. }) if property == "a"
        ));
    }

    #[test]
    fn test_composite_and_escaping() {
        let schema = json!({
            "type": "object",
            "properties": {
                "party": {
                    "type": "object",
                    "edi_tag": "NAD",
                    "properties": {
                        "qualifier": {"type": "string", "edi_ref": "3035", "edi_order": 1},
                        "id": {
                            "type": "object",
                            "edi_ref": "C082",
                            "edi_order": 2,
                            "properties": {
                                "party": {"type": "string", "edi_ref": "3039", "edi_order": 1},
                                "list": {"type": "string", "edi_ref": "1131", "edi_order": 2},
                                "agency": {"type": "string", "edi_ref": "3055", "edi_order": 3}
                            }
                        },
                        "name": {"type": "string", "edi_ref": "3036", "edi_order": 3}
                    }
                }
            }
        });

        let text = render(
            schema,
            json!({"party": {"qualifier": "MS", "id": {"party": "9900", "agency": "293"},
                             "name": "O'Brien+Sons"}}),
        )
        .unwrap();
        assert_eq!(text, "NAD+MS+9900::293+O?'Brien?+Sons'");
    }

    #[test]
    fn test_segment_with_edi_ref_joins_components() {
        let schema = json!({
            "type": "object",
            "properties": {
                "quantity": {
                    "type": "object",
                    "edi_tag": "QTY",
                    "edi_ref": "C186",
                    "properties": {
                        "qualifier": {"type": "string", "edi_ref": "6063", "edi_order": 1},
                        "amount": {"type": "decimal", "edi_ref": "6060", "edi_order": 2},
                        "unit": {"type": "string", "edi_ref": "6411", "edi_order": 3}
                    }
                }
            }
        });
        let value = json!({"quantity": {"qualifier": "220", "amount": 12.75, "unit": "KWH"}});

        assert_eq!(render(schema.clone(), value.clone()).unwrap(), "QTY+220:12.75:KWH'");

        let config = EdiConfig {
            segment_separator: "'".to_string(),
            decimal_notation: ',',
            ..EdiConfig::default()
        };
        assert_eq!(render_with(schema, value, &config).unwrap(), "QTY+220:12,75:KWH'");
    }

    #[test]
    fn test_group_renders_one_segment_per_occurrence() {
        let schema = json!({
            "type": "object",
            "properties": {
                "lines": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "line": {
                                "type": "object",
                                "edi_tag": "LIN",
                                "properties": {"id": {"type": "string", "edi_ref": "1082"}}
                            }
                        }
                    }
                }
            }
        });

        let text = render(
            schema.clone(),
            json!({"lines": [{"line": {"id": "A"}}, {"line": {"id": "B"}}]}),
        )
        .unwrap();
        assert_eq!(text, "LIN+A'LIN+B'");

        assert_eq!(render(schema.clone(), json!({"lines": []})).unwrap(), "");
        assert_eq!(render(schema, json!({"lines": "LIN"})).unwrap(), "");
    }

    #[test]
    fn test_synthetic_group_and_datetime() {
        let schema = json!({
            "type": "object",
            "properties": {
                "datetimes": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "edi_tag": "DTM",
                        "edi_ref": "C507",
                        "properties": {
                            "qualifier": {"type": "string", "edi_ref": "2005", "edi_order": 1},
                            "value": {"type": "datetime", "edi_ref": "2380", "edi_order": 2,
                                      "format": 303},
                            "formatCode": {"type": "string", "edi_ref": "2379", "edi_order": 3}
                        }
                    }
                }
            }
        });

        let text = render(
            schema,
            json!({"datetimes": [
                {"qualifier": "163", "value": "2017-01-01T00:00:00+00:00", "formatCode": "303"},
                {"qualifier": "164", "value": "201702010000?"}
            ]}),
        )
        .unwrap();
        assert_eq!(text, "DTM+163:201701010000?+00:303'DTM+164:201702010000??'");
    }

    #[test]
    fn test_control_counters() {
        let schema = json!({
            "type": "object",
            "properties": {
                "header": {
                    "type": "object",
                    "edi_tag": "UNB",
                    "edi_order": 1,
                    "properties": {"sender": {"type": "string", "edi_ref": "0004"}}
                },
                "messages": {
                    "type": "array",
                    "edi_order": 2,
                    "items": {
                        "type": "object",
                        "properties": {
                            "messageHeader": {
                                "type": "object",
                                "edi_tag": "UNH",
                                "edi_order": 1,
                                "properties": {"reference": {"type": "string", "edi_ref": "0062"}}
                            },
                            "document": {
                                "type": "object",
                                "edi_tag": "BGM",
                                "edi_order": 2,
                                "properties": {"number": {"type": "string", "edi_ref": "1004"}}
                            },
                            "messageTrailer": {
                                "type": "object",
                                "edi_tag": "UNT",
                                "edi_order": 3,
                                "properties": {
                                    "numberOfSegmentsInMessage": {"type": "integer",
                                        "edi_ref": "0074", "edi_order": 1},
                                    "reference": {"type": "string", "edi_ref": "0062",
                                        "edi_order": 2}
                                }
                            }
                        }
                    }
                },
                "interchangeTrailer": {
                    "type": "object",
                    "edi_tag": "UNZ",
                    "edi_order": 3,
                    "properties": {
                        "interchangeControlCount": {"type": "integer", "edi_ref": "0036",
                            "edi_order": 1},
                        "reference": {"type": "string", "edi_ref": "0020", "edi_order": 2}
                    }
                }
            }
        });

        let text = render(
            schema,
            json!({
                "header": {"sender": "S"},
                "messages": [
                    {"messageHeader": {"reference": "1"}, "document": {"number": "A"},
                     "messageTrailer": {"numberOfSegmentsInMessage": 99, "reference": "1"}},
                    {"messageHeader": {"reference": "2"}}
                ],
                "interchangeTrailer": {"reference": "REF"}
            }),
        )
        .unwrap();

        assert_eq!(
            text,
            "UNB+S'UNH+1'BGM+A'UNT+3+1'UNH+2'UNT+2'UNZ+2+REF'"
        );
    }

    #[test]
    fn test_counter_state() {
        let config = EdiConfig::default();
        let formatter = ZonedFormatter::default();
        let mut ctx = SerializeContext::new(&config, &formatter);

        ctx.count_segment("UNB");
        ctx.count_segment("UNH");
        ctx.count_segment("BGM");
        assert_eq!(ctx.counters, Counters { segments: 2, messages: 1 });

        ctx.count_segment("UNH");
        assert_eq!(ctx.counters, Counters { segments: 1, messages: 2 });
    }

    #[test]
    fn test_render_decimal() {
        assert_eq!(render_decimal(4250.0, '.'), "4250");
        assert_eq!(render_decimal(0.125, ','), "0,125");
    }
}
