//! Error types for resolution, composition and delivery.

use std::io;
use std::path::PathBuf;

use mailit_directive::RecipientClass;

/// Result type alias for transport operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Transport error types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// TLS error.
    #[error("TLS error: {0}")]
    Tls(#[from] rustls::Error),

    /// Server rejected a command.
    #[error("SMTP error {code}: {message}")]
    Rejected {
        /// Reply code (e.g., 550).
        code: u16,
        /// Reply text from the server.
        message: String,
    },

    /// Unexpected or malformed server response.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Address syntax is not acceptable.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    /// An address could not be resolved to a mailbox.
    #[error(
        "Failed to resolve {} address {query:?}",
        .class.map_or("sender", RecipientClass::as_str)
    )]
    Unresolved {
        /// Recipient class, `None` for the sender.
        class: Option<RecipientClass>,
        /// Text that was looked up.
        query: String,
    },

    /// An attachment file could not be read.
    #[error("Cannot read attachment {}: {source}", .path.display())]
    Attachment {
        /// Attachment path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// Message exceeds the size the server accepts.
    #[error("Message of {size} bytes exceeds server limit of {limit} bytes")]
    MessageTooLarge {
        /// Rendered message size.
        size: usize,
        /// Limit advertised by the server.
        limit: usize,
    },

    /// Feature not supported by server.
    #[error("Server does not support {0}")]
    NotSupported(String),
}

impl Error {
    /// Creates a rejection error from a reply code and message.
    #[must_use]
    pub fn rejected(code: u16, message: impl Into<String>) -> Self {
        Self::Rejected {
            code,
            message: message.into(),
        }
    }

    /// Returns the server reply code carried by this error, if any.
    #[must_use]
    pub const fn code(&self) -> Option<u16> {
        match self {
            Self::Rejected { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Returns true if this is a permanent error (5xx).
    #[must_use]
    pub const fn is_permanent(&self) -> bool {
        matches!(self, Self::Rejected { code, .. } if *code >= 500 && *code < 600)
    }

    /// Returns true if this is a transient error (4xx).
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Rejected { code, .. } if *code >= 400 && *code < 500)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_rejected_code() {
        let err = Error::rejected(550, "No such user");
        assert_eq!(err.code(), Some(550));
        assert!(err.is_permanent());
        assert!(!err.is_transient());
        assert_eq!(err.to_string(), "SMTP error 550: No such user");
    }

    #[test]
    fn test_transient() {
        assert!(Error::rejected(451, "try later").is_transient());
    }

    #[test]
    fn test_unresolved_message() {
        let sender = Error::Unresolved {
            class: None,
            query: "nobody".into(),
        };
        assert_eq!(sender.to_string(), "Failed to resolve sender address \"nobody\"");

        let cc = Error::Unresolved {
            class: Some(RecipientClass::Cc),
            query: "ghost".into(),
        };
        assert_eq!(cc.to_string(), "Failed to resolve cc address \"ghost\"");
        assert_eq!(cc.code(), None);
    }
}
