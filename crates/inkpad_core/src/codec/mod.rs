//! Import/export codec for backup files and sync exchange.
//!
//! # Responsibility
//! - Convert a note plus its canvas document into the self-describing
//!   versioned record exchanged with backups and the sync collaborator.
//! - Decode incoming payloads defensively into typed records before any of
//!   their content is used.
//!
//! # Invariants
//! - One malformed record fails alone with a reason; a batch import always
//!   continues with the remaining records.
//! - A record carrying a note id upserts at exactly that id; records without
//!   one get a freshly assigned id.

pub mod export;
pub mod import;

use std::error::Error;
use std::fmt::{Display, Formatter};

/// Version stamp written into every export envelope and record.
pub const EXPORT_FORMAT_VERSION: &str = "1.0";

/// Decode error for one import record or envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// A required field is absent.
    MissingField(&'static str),
    /// A field is present with the wrong JSON type.
    WrongType {
        field: &'static str,
        expected: &'static str,
    },
    /// The record/envelope declares a version this build cannot read.
    UnsupportedVersion(String),
    /// `matrix` is not a JSON string holding 16 floats.
    InvalidMatrix(String),
    /// A stroke entry is not a parseable stroke JSON string.
    InvalidStroke(String),
    /// An id field is not a valid UUID string.
    InvalidId(String),
}

impl Display for CodecError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingField(field) => write!(f, "missing required field `{field}`"),
            Self::WrongType { field, expected } => {
                write!(f, "field `{field}` must be {expected}")
            }
            Self::UnsupportedVersion(version) => {
                write!(f, "unsupported record version `{version}`")
            }
            Self::InvalidMatrix(message) => write!(f, "unparseable matrix: {message}"),
            Self::InvalidStroke(message) => write!(f, "unparseable stroke: {message}"),
            Self::InvalidId(value) => write!(f, "invalid id value `{value}`"),
        }
    }
}

impl Error for CodecError {}
