//! # edi-mscons
//!
//! MSCONS (metered services consumption report) support.
//!
//! Bundles an MSCONS D.99A schema subset. Parsed interchanges get their
//! reading dates attached to the location and quantity records they qualify,
//! and the interchange control count is checked against the parsed messages.

pub mod parser;
pub mod postprocess;

pub use parser::{MSCONS_SCHEMA, MsconsDocument, MsconsParser};
pub use postprocess::{attach_dates, check_control_count, enrich};

use thiserror::Error;

/// Errors that can occur when reading MSCONS interchanges
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Edifact(#[from] edi_adapter_edifact::Error),

    #[error(transparent)]
    Value(#[from] edi_ir::Error),

    #[error(
        "Interchange control count {declared} does not match {parsed} parsed message(s)"
    )]
    ControlCountMismatch { declared: i64, parsed: usize },

    #[error("Missing segment group '{0}'")]
    MissingGroup(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn missing_group(name: &str) -> Self {
        Error::MissingGroup(name.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
