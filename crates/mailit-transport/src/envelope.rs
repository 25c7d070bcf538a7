//! Resolved outgoing mail.

use std::path::PathBuf;

use mailit_directive::{MailDirective, RecipientClass};
use tracing::debug;

use crate::address::{AddressResolver, Mailbox};
use crate::error::{Error, Result};

/// A recipient after resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRecipient {
    /// To, Cc or Bcc.
    pub class: RecipientClass,
    /// Resolved mailbox.
    pub mailbox: Mailbox,
}

/// A message ready to hand to a [`Transport`](crate::Transport).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    /// Originator.
    pub sender: Mailbox,
    /// Recipients in directive order: To, then Cc, then Bcc.
    pub recipients: Vec<ResolvedRecipient>,
    /// Subject line.
    pub subject: String,
    /// Plain text body.
    pub body: String,
    /// Files to attach.
    pub attachments: Vec<PathBuf>,
}

impl OutgoingMail {
    /// Resolves every address of `directive` through `resolver`.
    ///
    /// The sender is resolved first, then recipients in order. The first
    /// failure aborts resolution.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Unresolved`] naming the class and text that failed.
    pub fn resolve<R>(directive: &MailDirective, resolver: &R) -> Result<Self>
    where
        R: AddressResolver + ?Sized,
    {
        let sender = resolve_one(resolver, None, &directive.sender)?;

        let recipients = directive
            .recipients()
            .map(|(class, query)| {
                resolve_one(resolver, Some(class), query)
                    .map(|mailbox| ResolvedRecipient { class, mailbox })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            sender,
            recipients,
            subject: directive.subject.clone(),
            body: directive.body.clone(),
            attachments: directive.attachments.iter().map(PathBuf::from).collect(),
        })
    }

    /// Returns the mailboxes of one recipient class.
    pub fn recipients_of(&self, class: RecipientClass) -> impl Iterator<Item = &Mailbox> {
        self.recipients
            .iter()
            .filter(move |r| r.class == class)
            .map(|r| &r.mailbox)
    }
}

fn resolve_one<R>(resolver: &R, class: Option<RecipientClass>, query: &str) -> Result<Mailbox>
where
    R: AddressResolver + ?Sized,
{
    resolver.resolve(query).map_err(|err| {
        debug!(?class, query, error = %err, "address resolution failed");
        Error::Unresolved {
            class,
            query: query.to_string(),
        }
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::address::{AddressBook, LiteralResolver};

    fn directive() -> MailDirective {
        MailDirective {
            sender: "me@example.com".into(),
            to: vec!["a@example.com".into(), "jane".into()],
            cc: vec!["c@example.com".into()],
            bcc: vec!["d@example.com".into()],
            subject: "Hello".into(),
            body: "Body AttachFile[/tmp/x.txt]".into(),
            attachments: vec!["/tmp/x.txt".into()],
        }
    }

    #[test]
    fn test_resolve_with_address_book() {
        let book = AddressBook::from_entries([("jane", "Jane <jane@example.com>")]).unwrap();
        let mail = OutgoingMail::resolve(&directive(), &book).unwrap();

        assert_eq!(mail.sender.address.as_str(), "me@example.com");
        assert_eq!(mail.recipients.len(), 4);
        let to: Vec<_> = mail
            .recipients_of(RecipientClass::To)
            .map(|m| m.address.as_str())
            .collect();
        assert_eq!(to, vec!["a@example.com", "jane@example.com"]);
        assert_eq!(mail.recipients[3].class, RecipientClass::Bcc);
        assert_eq!(mail.attachments, vec![PathBuf::from("/tmp/x.txt")]);
    }

    #[test]
    fn test_unresolved_recipient() {
        let err = OutgoingMail::resolve(&directive(), &LiteralResolver).unwrap_err();
        assert!(matches!(
            err,
            Error::Unresolved { class: Some(RecipientClass::To), ref query } if query == "jane"
        ));
    }

    #[test]
    fn test_unresolved_sender() {
        let mut directive = directive();
        directive.sender = "Me Myself".into();
        let err = OutgoingMail::resolve(&directive, &LiteralResolver).unwrap_err();
        assert!(matches!(err, Error::Unresolved { class: None, .. }));
    }

    #[test]
    fn test_resolve_through_trait_object() {
        let book = AddressBook::from_entries([("jane", "jane@example.com")]).unwrap();
        let resolver: &dyn AddressResolver = &book;
        assert!(OutgoingMail::resolve(&directive(), resolver).is_ok());
    }
}
