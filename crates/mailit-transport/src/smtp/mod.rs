//! SMTP client used by [`SmtpTransport`](crate::SmtpTransport).
//!
//! The [`Session`] type tracks the protocol state at compile time, so a
//! message can only be written after DATA was accepted.

mod capability;
mod command;
mod reply;
mod session;
mod stream;

pub use capability::Capabilities;
pub use command::Command;
pub use reply::{Reply, ReplyCode};
pub use session::{Connected, Data, MailFrom, Ready, Recipients, Session};
pub use stream::{SmtpStream, connect, connect_tls};
