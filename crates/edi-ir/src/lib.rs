#![deny(warnings)]
#![deny(rust_2018_idioms)]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

//! # edi-ir
//!
//! Structured value tree for EDI documents.
//!
//! A parsed interchange is a tree of [`Value`]s: records keyed by the names
//! used in the schema, arrays for repeated segment groups and typed scalars
//! at the leaves. The same tree drives serialization back to the wire format.

/// Path navigation helpers for value trees.
pub mod path;
/// Value tree primitives.
pub mod value;

/// Parsed navigation path.
pub use path::{PathStep, parse_path};
/// Value tree primitives and the record map type.
pub use value::{Record, Value};

use thiserror::Error;

/// Errors that can occur when working with value trees
#[derive(Error, Debug)]
pub enum Error {
    #[error("Node not found at path: {path}")]
    NodeNotFound { path: String },

    #[error("Invalid path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("Type mismatch at '{path}': expected {expected}, found {found}")]
    TypeMismatch {
        path: String,
        expected: String,
        found: String,
    },
}

impl Error {
    /// Build a node-not-found error with path context.
    pub fn node_not_found(path: impl Into<String>) -> Self {
        Self::NodeNotFound { path: path.into() }
    }

    /// Build an invalid-path error with input path and parsing reason.
    pub fn invalid_path(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPath {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Build a type-mismatch error for a step that cannot be applied.
    pub fn type_mismatch(
        path: impl Into<String>,
        expected: impl Into<String>,
        found: impl Into<String>,
    ) -> Self {
        Self::TypeMismatch {
            path: path.into(),
            expected: expected.into(),
            found: found.into(),
        }
    }
}

/// Crate-local result type for value tree operations.
pub type Result<T> = std::result::Result<T, Error>;
