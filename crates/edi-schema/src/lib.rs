//! # edi-schema
//!
//! Schema model, loader, and reference resolution for EDI.
//!
//! Schemas are JSON-Schema-shaped documents annotated with EDI metadata
//! (`edi_tag`, `edi_ref`, `edi_order`, ...). Reusable fragments live under
//! `definitions` and are pulled in through `$ref` or composed with `allOf`;
//! [`resolve_schema`] inlines all of them before the schema is compiled.

pub mod loader;
pub mod model;
pub mod resolver;

pub use loader::SchemaLoader;
pub use model::{Format, Items, OrderKey, Properties, Required, SchemaFragment};
pub use resolver::{Resolver, resolve_schema};

use thiserror::Error;

/// Errors that can occur when working with schemas
#[derive(Error, Debug)]
pub enum Error {
    #[error("Unable to resolve schema reference '{reference}'")]
    UnresolvableReference { reference: String },

    #[error("Circular schema reference: {chain}")]
    CircularReference { chain: String },

    #[error("Invalid schema format: {0}")]
    InvalidFormat(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Build an unresolvable-reference error for the given `$ref` value.
    pub fn unresolvable(reference: impl Into<String>) -> Self {
        Self::UnresolvableReference {
            reference: reference.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
