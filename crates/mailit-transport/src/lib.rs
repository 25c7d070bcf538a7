//! # mailit-transport
//!
//! Turns a parsed [`MailDirective`](mailit_directive::MailDirective) into a
//! delivered message.
//!
//! ## Pipeline
//!
//! 1. **Resolve**: every address text goes through an [`AddressResolver`]
//!    ([`LiteralResolver`] or an [`AddressBook`] of aliases), giving an
//!    [`OutgoingMail`].
//! 2. **Compose**: [`Composer`] renders headers, body and base64 encoded
//!    attachments. Bcc recipients stay out of the headers.
//! 3. **Send**: a [`Transport`] hands the message to a relay.
//!    [`SmtpTransport`] speaks SMTP with implicit TLS or STARTTLS and
//!    AUTH PLAIN.
//!
//! ## Quick Start
//!
//! ```ignore
//! use mailit_transport::{AddressBook, OutgoingMail, SmtpSettings, SmtpTransport, Transport};
//!
//! let directive = mailit_directive::parse_file("message.txt")?;
//! let mail = OutgoingMail::resolve(&directive, &AddressBook::new())?;
//!
//! let transport = SmtpTransport::new(SmtpSettings {
//!     host: "smtp.example.com".into(),
//!     ..SmtpSettings::default()
//! });
//! let delivery = transport.send(&mail).await?;
//! println!("{} recipients accepted", delivery.accepted);
//! ```
//!
//! ## Modules
//!
//! - [`smtp`]: type-state SMTP session, commands and replies

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod address;
mod compose;
mod envelope;
mod error;
pub mod smtp;
mod transport;

pub use address::{Address, AddressBook, AddressResolver, LiteralResolver, Mailbox};
pub use compose::{Attachment, Composer, content_type_for};
pub use envelope::{OutgoingMail, ResolvedRecipient};
pub use error::{Error, Result};
pub use mailit_directive::RecipientClass;
pub use transport::{Delivery, Security, SmtpSettings, SmtpTransport, Transport, deliver};
