//! Parsed outgoing-message directive.

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Recipient class of an address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum RecipientClass {
    /// Primary recipient.
    To,
    /// Carbon copy.
    Cc,
    /// Blind carbon copy.
    Bcc,
}

impl RecipientClass {
    /// Returns the lowercase tag of this class.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::To => "to",
            Self::Cc => "cc",
            Self::Bcc => "bcc",
        }
    }
}

impl fmt::Display for RecipientClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fully parsed directive file.
///
/// All strings are owned copies; nothing borrows from the parsed buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MailDirective {
    /// Sender, never empty.
    pub sender: String,
    /// Primary recipients, at least one.
    pub to: Vec<String>,
    /// Carbon-copy recipients.
    pub cc: Vec<String>,
    /// Blind carbon-copy recipients.
    pub bcc: Vec<String>,
    /// Subject, possibly empty.
    pub subject: String,
    /// Body text with attachment markers left in place.
    pub body: String,
    /// Attachment paths found in the body.
    pub attachments: Vec<String>,
}

impl MailDirective {
    /// Iterates over every recipient tagged with its class, To first, then
    /// Cc, then Bcc.
    pub fn recipients(&self) -> impl Iterator<Item = (RecipientClass, &str)> {
        let to = self.to.iter().map(|a| (RecipientClass::To, a.as_str()));
        let cc = self.cc.iter().map(|a| (RecipientClass::Cc, a.as_str()));
        let bcc = self.bcc.iter().map(|a| (RecipientClass::Bcc, a.as_str()));
        to.chain(cc).chain(bcc)
    }

    /// Returns the total number of recipients across all classes.
    #[must_use]
    pub fn recipient_count(&self) -> usize {
        self.to.len() + self.cc.len() + self.bcc.len()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn sample() -> MailDirective {
        MailDirective {
            sender: "me@example.com".into(),
            to: vec!["a@example.com".into(), "b@example.com".into()],
            cc: vec!["c@example.com".into()],
            bcc: vec!["d@example.com".into()],
            subject: "Hi".into(),
            body: String::new(),
            attachments: Vec::new(),
        }
    }

    #[test]
    fn test_recipients_order() {
        let directive = sample();
        let recipients: Vec<_> = directive.recipients().collect();
        assert_eq!(
            recipients,
            vec![
                (RecipientClass::To, "a@example.com"),
                (RecipientClass::To, "b@example.com"),
                (RecipientClass::Cc, "c@example.com"),
                (RecipientClass::Bcc, "d@example.com"),
            ]
        );
        assert_eq!(directive.recipient_count(), 4);
    }

    #[test]
    fn test_recipient_class_display() {
        assert_eq!(RecipientClass::Bcc.to_string(), "bcc");
    }
}
