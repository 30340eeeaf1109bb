//! Violation reporting

use serde::Serialize;
use std::fmt;

/// A single structural violation found in a value tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    /// Path to the offending value (`messages[0]/header`), empty for the root
    pub path: String,
    /// Schema keyword that failed (`type`, `required`, `pattern`, ...)
    pub keyword: String,
    /// Human-readable message
    pub message: String,
}

impl Violation {
    pub fn new(
        path: impl Into<String>,
        keyword: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            keyword: keyword.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let path = if self.path.is_empty() {
            "<root>"
        } else {
            &self.path
        };
        write!(f, "{path}: {} ({})", self.message, self.keyword)
    }
}

/// Render violations one per line
#[must_use]
pub fn format_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}
