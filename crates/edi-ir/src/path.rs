//! Path navigation over value trees
//!
//! Paths use `/` between record keys and `[n]` for array positions, e.g.
//! `messages[0]/segmentGroup5[1]/nameAndAddress`. Empty path segments are
//! skipped.

use crate::value::Value;
use crate::{Error, Result};

/// One step of a parsed path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathStep {
    /// Named child of a record
    Key(String),
    /// Position within an array
    Index(usize),
}

/// Parse a path string into navigation steps
///
/// # Errors
///
/// Returns [`Error::InvalidPath`] for unclosed brackets or non-numeric indices.
pub fn parse_path(path: &str) -> Result<Vec<PathStep>> {
    let mut steps = Vec::new();

    for segment in path.split('/') {
        if segment.is_empty() {
            continue;
        }

        let Some(open_bracket) = segment.find('[') else {
            steps.push(PathStep::Key(segment.to_string()));
            continue;
        };

        let name = &segment[..open_bracket];
        if !name.is_empty() {
            steps.push(PathStep::Key(name.to_string()));
        }

        // Handle chained indexing like "rows[0][1]"
        let mut rest = &segment[open_bracket..];
        while !rest.is_empty() {
            if !rest.starts_with('[') {
                return Err(Error::invalid_path(
                    path,
                    format!("Unexpected text after index in: {segment}"),
                ));
            }
            let close_bracket = rest.find(']').ok_or_else(|| {
                Error::invalid_path(path, format!("Unclosed bracket in: {segment}"))
            })?;
            let index: usize = rest[1..close_bracket].parse().map_err(|_| {
                Error::invalid_path(path, format!("Invalid index in: {segment}"))
            })?;
            steps.push(PathStep::Index(index));
            rest = &rest[close_bracket + 1..];
        }
    }

    Ok(steps)
}

fn describe(steps: &[PathStep]) -> String {
    let mut out = String::new();
    for step in steps {
        match step {
            PathStep::Key(key) => {
                if !out.is_empty() {
                    out.push('/');
                }
                out.push_str(key);
            }
            PathStep::Index(index) => out.push_str(&format!("[{index}]")),
        }
    }
    out
}

impl Value {
    /// Navigate to a descendant, reporting where the walk failed
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPath`] for malformed paths, [`Error::TypeMismatch`]
    /// when a key is applied to a non-record (or an index to a non-array) and
    /// [`Error::NodeNotFound`] for missing keys or out-of-range indices.
    pub fn navigate(&self, path: &str) -> Result<&Value> {
        let steps = parse_path(path)?;
        let mut current = self;

        for (depth, step) in steps.iter().enumerate() {
            let walked = &steps[..=depth];
            current = match step {
                PathStep::Key(key) => match current {
                    Value::Record(record) => record
                        .get(key)
                        .ok_or_else(|| Error::node_not_found(describe(walked)))?,
                    other => {
                        return Err(Error::type_mismatch(
                            describe(walked),
                            "record",
                            other.kind(),
                        ));
                    }
                },
                PathStep::Index(index) => match current {
                    Value::Array(items) => items
                        .get(*index)
                        .ok_or_else(|| Error::node_not_found(describe(walked)))?,
                    other => {
                        return Err(Error::type_mismatch(
                            describe(walked),
                            "array",
                            other.kind(),
                        ));
                    }
                },
            };
        }

        Ok(current)
    }

    /// Navigate to a descendant, `None` when any step is missing
    #[must_use]
    pub fn pointer(&self, path: &str) -> Option<&Value> {
        self.navigate(path).ok()
    }

    /// Mutable counterpart of [`Value::pointer`]
    pub fn pointer_mut(&mut self, path: &str) -> Option<&mut Value> {
        let steps = parse_path(path).ok()?;
        let mut current = self;

        for step in &steps {
            current = match (step, current) {
                (PathStep::Key(key), Value::Record(record)) => record.get_mut(key)?,
                (PathStep::Index(index), Value::Array(items)) => items.get_mut(*index)?,
                _ => return None,
            };
        }

        Some(current)
    }
}
