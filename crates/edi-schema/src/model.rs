//! Schema model definitions
//!
//! A schema is a JSON-Schema-shaped tree of [`SchemaFragment`]s carrying the
//! EDI annotations (`edi_tag`, `edi_ref`, `edi_order`, ...) that the EDIFACT
//! engine compiles into its node tree. Keywords the engine does not interpret
//! are kept verbatim in [`SchemaFragment::extra`] for the validator.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Named fragments (`properties`, `definitions`)
pub type Properties = BTreeMap<String, SchemaFragment>;

/// A single declarative schema node
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaFragment {
    /// JSON type name (`object`, `array`) or scalar type (`string`, `integer`,
    /// `number`, `decimal`, `datetime`)
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<Properties>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Items>,

    #[serde(rename = "$ref", default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,

    #[serde(rename = "allOf", default, skip_serializing_if = "Option::is_none")]
    pub all_of: Option<Vec<SchemaFragment>>,

    /// Segment tag (e.g. `UNH`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edi_tag: Option<String>,

    /// Directory reference of the element/component (e.g. `C507`, `2005`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edi_ref: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<Required>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<Format>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edi_order: Option<OrderKey>,

    /// Reusable fragments addressed by `#/definitions/<name>`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub definitions: Option<Properties>,

    /// Every other keyword (`enum`, `pattern`, `minLength`, ...)
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// `items` may be a single fragment or a tuple of fragments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Items {
    One(Box<SchemaFragment>),
    Many(Vec<SchemaFragment>),
}

/// `required` in either the per-property boolean form or the JSON-Schema
/// list-of-names form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Required {
    Flag(bool),
    Names(Vec<String>),
}

/// `format`: numeric EDIFACT date/time format code or a named format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Format {
    Code(u32),
    Named(String),
}

impl Format {
    /// Numeric format code; named formats holding digits count as codes
    #[must_use]
    pub fn code(&self) -> Option<u32> {
        match self {
            Format::Code(code) => Some(*code),
            Format::Named(name) => name.parse().ok(),
        }
    }
}

/// Sort key for `edi_order`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OrderKey {
    Number(f64),
    Text(String),
}

impl OrderKey {
    /// Total order: numbers (numeric strings included) before other text
    #[must_use]
    pub fn compare(&self, other: &OrderKey) -> Ordering {
        match (self.as_number(), other.as_number()) {
            (Some(a), Some(b)) => a.total_cmp(&b),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => self.as_text().cmp(other.as_text()),
        }
    }

    fn as_number(&self) -> Option<f64> {
        match self {
            OrderKey::Number(n) => Some(*n),
            OrderKey::Text(text) => text.trim().parse().ok(),
        }
    }

    fn as_text(&self) -> &str {
        match self {
            OrderKey::Number(_) => "",
            OrderKey::Text(text) => text,
        }
    }
}

impl SchemaFragment {
    /// Create an empty fragment
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fragment of the given `type`
    #[must_use]
    pub fn of_type(kind: impl Into<String>) -> Self {
        Self {
            kind: Some(kind.into()),
            ..Self::default()
        }
    }

    /// Check the declared `type`
    #[must_use]
    pub fn is_type(&self, kind: &str) -> bool {
        self.kind.as_deref() == Some(kind)
    }

    /// True when the fragment itself is flagged `required: true`
    #[must_use]
    pub fn is_required_flag(&self) -> bool {
        matches!(self.required, Some(Required::Flag(true)))
    }

    /// Names listed in a JSON-Schema style `required: [...]`
    #[must_use]
    pub fn required_names(&self) -> &[String] {
        match &self.required {
            Some(Required::Names(names)) => names,
            _ => &[],
        }
    }

    /// Item fragments, whether declared as a single fragment or a tuple
    #[must_use]
    pub fn item_fragments(&self) -> Vec<&SchemaFragment> {
        match &self.items {
            Some(Items::One(item)) => vec![item.as_ref()],
            Some(Items::Many(items)) => items.iter().collect(),
            None => Vec::new(),
        }
    }

    /// First (or only) item fragment
    #[must_use]
    pub fn first_item(&self) -> Option<&SchemaFragment> {
        match &self.items {
            Some(Items::One(item)) => Some(item.as_ref()),
            Some(Items::Many(items)) => items.first(),
            None => None,
        }
    }

    /// Builder: add a named property
    #[must_use]
    pub fn with_property(mut self, name: impl Into<String>, fragment: SchemaFragment) -> Self {
        self.properties
            .get_or_insert_with(Properties::new)
            .insert(name.into(), fragment);
        self
    }

    /// Builder: set a single `items` fragment
    #[must_use]
    pub fn with_items(mut self, item: SchemaFragment) -> Self {
        self.items = Some(Items::One(Box::new(item)));
        self
    }

    /// Builder: set `edi_tag`
    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.edi_tag = Some(tag.into());
        self
    }

    /// Builder: set `edi_ref`
    #[must_use]
    pub fn with_ref(mut self, edi_ref: impl Into<String>) -> Self {
        self.edi_ref = Some(edi_ref.into());
        self
    }

    /// Builder: set numeric `edi_order`
    #[must_use]
    pub fn with_order(mut self, order: f64) -> Self {
        self.edi_order = Some(OrderKey::Number(order));
        self
    }

    /// Builder: set `required: true|false`
    #[must_use]
    pub fn with_required(mut self, required: bool) -> Self {
        self.required = Some(Required::Flag(required));
        self
    }

    /// Builder: set a numeric `format` code
    #[must_use]
    pub fn with_format(mut self, code: u32) -> Self {
        self.format = Some(Format::Code(code));
        self
    }
}
