//! Error types for directive parsing.

use std::io;
use std::path::PathBuf;

use crate::field::Field;

/// Result type alias for directive parsing.
pub type Result<T> = std::result::Result<T, ParseError>;

/// Directive parse error.
///
/// Every variant is terminal for the call. Parsing is deterministic, so
/// retrying with the same input yields the same error.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// The directive file could not be read.
    #[error("Cannot read directive file {}: {source}", .path.display())]
    IoUnavailable {
        /// Path that was requested.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// A header line had no terminator within the line limit.
    #[error("{field} line exceeds {max} bytes")]
    LineTooLong {
        /// Header line being read.
        field: Field,
        /// Maximum line length, terminator included.
        max: usize,
    },

    /// Input ended before a header line was terminated.
    #[error("Unexpected end of input while reading {0} line")]
    UnexpectedEof(Field),

    /// The expected label was not found at the expected position.
    #[error("Missing {label:?} field", label = .0.label())]
    MissingField(Field),

    /// The label matched but no usable content followed it.
    #[error("{0} field has no usable content")]
    EmptyMandatoryField(Field),
}

impl ParseError {
    /// Returns the header field the error relates to, if any.
    #[must_use]
    pub const fn field(&self) -> Option<Field> {
        match self {
            Self::IoUnavailable { .. } => None,
            Self::LineTooLong { field, .. } => Some(*field),
            Self::UnexpectedEof(field)
            | Self::MissingField(field)
            | Self::EmptyMandatoryField(field) => Some(*field),
        }
    }
}
