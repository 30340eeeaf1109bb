//! Compiled schema node tree
//!
//! A resolved [`SchemaFragment`] is compiled into a tree of [`EdiNode`]s. The
//! kind of each node is decided by its EDI annotations:
//!
//! | annotation                              | node            |
//! |-----------------------------------------|-----------------|
//! | `edi_tag`                               | Segment         |
//! | `type: array`                           | Segment group   |
//! | `edi_ref` starting with `C` or `S`      | Data element    |
//! | any other `edi_ref`                     | Data component  |
//!
//! Siblings are ordered by `edi_order`. A trailing run of optional siblings
//! may be left out entirely when serializing (`can_omit`).

use crate::{Error, Result};
use edi_schema::{OrderKey, Properties, SchemaFragment};
use std::cmp::Ordering;
use tracing::trace;

/// Kind of a compiled node (or of the root)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Root,
    Segment,
    SegmentGroup,
    DataElement,
    DataComponent,
}

/// Settings shared by every node kind
#[derive(Debug, Clone, PartialEq)]
pub struct NodeConfig {
    pub kind: NodeKind,
    pub edi_order: Option<OrderKey>,
    pub edi_ref: Option<String>,
    pub required: bool,
    /// Part of the trailing run of optional siblings
    pub can_omit: bool,
    /// Depth in the tree; root children are at level 0
    pub level: usize,
}

impl NodeConfig {
    fn new(kind: NodeKind, fragment: &SchemaFragment, required: bool, level: usize) -> Self {
        Self {
            kind,
            edi_order: fragment.edi_order.clone(),
            edi_ref: fragment.edi_ref.clone(),
            required,
            can_omit: false,
            level,
        }
    }
}

/// Shape of the node a data component hangs off
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParentShape {
    pub kind: NodeKind,
    /// The parent declares its own `edi_ref` (composite)
    pub declares_element: bool,
}

impl ParentShape {
    /// A component directly inside a segment (or synthetic group) that is not
    /// itself a composite occupies a whole data element
    #[must_use]
    pub fn advances_element(&self) -> bool {
        matches!(self.kind, NodeKind::Segment | NodeKind::SegmentGroup) && !self.declares_element
    }
}

/// Value conversion applied to a data component
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarType {
    Text,
    Integer,
    Decimal,
    DateTime,
}

impl ScalarType {
    fn from_kind(kind: Option<&str>) -> Self {
        match kind {
            Some("integer" | "number") => ScalarType::Integer,
            Some("decimal") => ScalarType::Decimal,
            Some("datetime") => ScalarType::DateTime,
            _ => ScalarType::Text,
        }
    }
}

/// A segment (`edi_tag`)
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub name: String,
    pub config: NodeConfig,
    pub tag: String,
    pub children: Vec<EdiNode>,
}

/// A repeated group (`type: array`)
///
/// A group whose first child is a segment is a *real* group: each occurrence
/// spans several segments. Otherwise the group is *synthetic*: every
/// occurrence is one repetition of the segment named by `group_tag`.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentGroup {
    pub name: String,
    pub config: NodeConfig,
    pub group_tag: String,
    pub children: Vec<EdiNode>,
}

impl SegmentGroup {
    #[must_use]
    pub fn is_synthetic(&self) -> bool {
        !matches!(self.children.first(), Some(EdiNode::Segment(_)))
    }
}

/// A composite data element (`edi_ref` `C...`/`S...`)
#[derive(Debug, Clone, PartialEq)]
pub struct DataElement {
    pub name: String,
    pub config: NodeConfig,
    pub children: Vec<EdiNode>,
}

/// A scalar leaf
#[derive(Debug, Clone, PartialEq)]
pub struct DataComponent {
    pub name: String,
    pub config: NodeConfig,
    pub data_type: ScalarType,
    /// Date/time format code
    pub format: Option<u32>,
    pub parent: ParentShape,
}

/// A compiled schema node
#[derive(Debug, Clone, PartialEq)]
pub enum EdiNode {
    Segment(Segment),
    SegmentGroup(SegmentGroup),
    DataElement(DataElement),
    DataComponent(DataComponent),
}

impl EdiNode {
    /// Property name of the node in its parent record
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            EdiNode::Segment(node) => &node.name,
            EdiNode::SegmentGroup(node) => &node.name,
            EdiNode::DataElement(node) => &node.name,
            EdiNode::DataComponent(node) => &node.name,
        }
    }

    #[must_use]
    pub fn config(&self) -> &NodeConfig {
        match self {
            EdiNode::Segment(node) => &node.config,
            EdiNode::SegmentGroup(node) => &node.config,
            EdiNode::DataElement(node) => &node.config,
            EdiNode::DataComponent(node) => &node.config,
        }
    }

    fn config_mut(&mut self) -> &mut NodeConfig {
        match self {
            EdiNode::Segment(node) => &mut node.config,
            EdiNode::SegmentGroup(node) => &mut node.config,
            EdiNode::DataElement(node) => &mut node.config,
            EdiNode::DataComponent(node) => &mut node.config,
        }
    }

    /// Child nodes in `edi_order`; empty for data components
    #[must_use]
    pub fn children(&self) -> &[EdiNode] {
        match self {
            EdiNode::Segment(node) => &node.children,
            EdiNode::SegmentGroup(node) => &node.children,
            EdiNode::DataElement(node) => &node.children,
            EdiNode::DataComponent(_) => &[],
        }
    }

    /// Compile one named fragment
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownEdiType`] when the fragment carries none of the
    /// EDI annotations, or a segment group error from a nested group.
    pub fn build(
        name: &str,
        fragment: &SchemaFragment,
        required: bool,
        level: usize,
        parent: ParentShape,
    ) -> Result<EdiNode> {
        if let Some(tag) = &fragment.edi_tag {
            return build_segment(name, tag, fragment, required, level);
        }

        if fragment.is_type("array") {
            return build_group(name, fragment, required, level);
        }

        match fragment.edi_ref.as_deref() {
            Some(edi_ref) if edi_ref.starts_with(['C', 'S']) => {
                let shape = ParentShape {
                    kind: NodeKind::DataElement,
                    declares_element: true,
                };
                Ok(EdiNode::DataElement(DataElement {
                    name: name.to_string(),
                    config: NodeConfig::new(NodeKind::DataElement, fragment, required, level),
                    children: build_children(
                        fragment.properties.as_ref(),
                        fragment.required_names(),
                        level + 1,
                        shape,
                    )?,
                }))
            }
            Some(_) => Ok(EdiNode::DataComponent(DataComponent {
                name: name.to_string(),
                config: NodeConfig::new(NodeKind::DataComponent, fragment, required, level),
                data_type: ScalarType::from_kind(fragment.kind.as_deref()),
                format: fragment.format.as_ref().and_then(edi_schema::Format::code),
                parent,
            })),
            None => Err(Error::UnknownEdiType {
                name: name.to_string(),
                fragment: serde_json::to_string(fragment).unwrap_or_default(),
            }),
        }
    }
}

fn build_segment(
    name: &str,
    tag: &str,
    fragment: &SchemaFragment,
    required: bool,
    level: usize,
) -> Result<EdiNode> {
    let shape = ParentShape {
        kind: NodeKind::Segment,
        declares_element: fragment.edi_ref.is_some(),
    };
    let children = build_children(
        fragment.properties.as_ref(),
        fragment.required_names(),
        level + 1,
        shape,
    )?;
    trace!("Compiled segment '{}' ({tag}) with {} child(ren)", name, children.len());

    Ok(EdiNode::Segment(Segment {
        name: name.to_string(),
        config: NodeConfig::new(NodeKind::Segment, fragment, required, level),
        tag: tag.to_string(),
        children,
    }))
}

fn build_group(
    name: &str,
    fragment: &SchemaFragment,
    required: bool,
    level: usize,
) -> Result<EdiNode> {
    let item = fragment
        .first_item()
        .ok_or_else(|| Error::invalid_group(name, "array has no items"))?;

    let shape = ParentShape {
        kind: NodeKind::SegmentGroup,
        declares_element: item.edi_ref.is_some(),
    };
    let children = build_children(
        item.properties.as_ref(),
        item.required_names(),
        level + 1,
        shape,
    )?;
    if children.is_empty() {
        return Err(Error::invalid_group(name, "items declare no properties"));
    }

    let group_tag = match (children.first(), &item.edi_tag) {
        (Some(EdiNode::Segment(first)), _) => first.tag.clone(),
        (_, Some(tag)) => tag.clone(),
        _ => {
            return Err(Error::invalid_group(
                name,
                "first item property is not a segment and items have no edi_tag",
            ));
        }
    };

    let mut config = NodeConfig::new(NodeKind::SegmentGroup, fragment, required, level);
    config.edi_ref = item.edi_ref.clone();
    trace!("Compiled segment group '{}' ({group_tag})", name);

    Ok(EdiNode::SegmentGroup(SegmentGroup {
        name: name.to_string(),
        config,
        group_tag,
        children,
    }))
}

/// Nodes without `edi_order` sort after ordered ones; ties keep name order
fn compare_order(a: &EdiNode, b: &EdiNode) -> Ordering {
    match (&a.config().edi_order, &b.config().edi_order) {
        (Some(a), Some(b)) => a.compare(b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Compile, order and mark the omittable tail of a sibling list
///
/// A property is required when it is flagged `required: true` itself or is
/// listed in the parent's `required` names.
///
/// # Errors
///
/// Propagates the first build error of any sibling.
pub fn build_children(
    properties: Option<&Properties>,
    required_names: &[String],
    level: usize,
    parent: ParentShape,
) -> Result<Vec<EdiNode>> {
    let mut nodes = Vec::new();
    for (name, fragment) in properties.into_iter().flatten() {
        let required = fragment.is_required_flag() || required_names.contains(name);
        nodes.push(EdiNode::build(name, fragment, required, level, parent)?);
    }

    nodes.sort_by(compare_order);

    for node in nodes.iter_mut().rev() {
        if node.config().required {
            break;
        }
        node.config_mut().can_omit = true;
    }

    Ok(nodes)
}

/// Compile the top level of a resolved schema
///
/// # Errors
///
/// Returns [`Error::InvalidRoot`] unless the schema is of type `object`.
pub fn build_root(schema: &SchemaFragment) -> Result<Vec<EdiNode>> {
    if !schema.is_type("object") {
        return Err(Error::InvalidRoot {
            found: schema.kind.clone(),
        });
    }

    build_children(
        schema.properties.as_ref(),
        schema.required_names(),
        0,
        ParentShape {
            kind: NodeKind::Root,
            declares_element: false,
        },
    )
}
