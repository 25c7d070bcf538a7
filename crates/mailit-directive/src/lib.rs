//! # mailit-directive
//!
//! Parser for mail directive files: a small line-oriented text format that
//! describes one outgoing message.
//!
//! ## Format
//!
//! ```text
//! TO: alice@example.com;bob@example.com
//! CC: carol@example.com
//! BCC:
//! FROM: me@example.com
//! SUBJECT: Quarterly report
//! Hi all, the numbers are in AttachFile[/home/me/report.pdf].
//! ```
//!
//! The five header lines come first, in that order, each starting with its
//! label (matched without regard to case). Everything after the Subject line
//! is the body. `AttachFile[path]` markers in the body name files to attach;
//! they are listed in [`MailDirective::attachments`] and left in the body.
//!
//! ## Quick Start
//!
//! ```ignore
//! use mailit_directive::{parse, Parser, ParserConfig};
//!
//! let directive = parse(&std::fs::read("message.txt")?)?;
//! println!("To: {}", directive.to.join(", "));
//!
//! // Restricted dialect: bare-CR lines, no Bcc line, one attachment.
//! let directive = Parser::new(ParserConfig::restricted()).parse_file("legacy.txt")?;
//! ```
//!
//! ## Features
//!
//! - `serde`: derives `Serialize`/`Deserialize` for [`MailDirective`] and the
//!   dialect settings in [`ParserConfig`].

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod attachment;
mod config;
mod cursor;
mod directive;
mod error;
mod field;
mod parser;

pub use attachment::{ATTACHMENT_MARKER, MAX_PATH_LENGTH, scan_attachments};
pub use config::{AttachmentMode, HeaderLayout, LineEnding, ParserConfig};
pub use cursor::{LineCursor, MAX_LINE_LENGTH};
pub use directive::{MailDirective, RecipientClass};
pub use error::{ParseError, Result};
pub use field::{Field, split_addresses, strip_label};
pub use parser::{Parser, parse, parse_file};
