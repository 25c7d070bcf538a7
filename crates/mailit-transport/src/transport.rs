//! Delivery of [`OutgoingMail`] through an SMTP relay.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::compose::{Attachment, Composer};
use crate::envelope::OutgoingMail;
use crate::error::{Error, Result};
use crate::smtp::{self, Ready, Session};

/// Something that can send resolved mail.
#[allow(async_fn_in_trait)]
pub trait Transport {
    /// Sends `mail` to all of its recipients.
    ///
    /// # Errors
    ///
    /// Returns an error if the message cannot be built or the relay refuses
    /// it.
    async fn send(&self, mail: &OutgoingMail) -> Result<Delivery>;
}

/// Outcome of a successful send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    /// Number of recipients the relay accepted.
    pub accepted: usize,
    /// Final reply code after the message data.
    pub code: u16,
    /// Final reply text, usually a queue id.
    pub reply: String,
}

/// Security/encryption mode for the relay connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Security {
    /// No encryption.
    None,
    /// Implicit TLS.
    #[default]
    Tls,
    /// STARTTLS upgrade after plaintext connect.
    StartTls,
}

impl Security {
    /// Conventional port for this mode.
    #[must_use]
    pub const fn default_port(self) -> u16 {
        match self {
            Self::None => 25,
            Self::Tls => 465,
            Self::StartTls => 587,
        }
    }
}

/// SMTP relay configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmtpSettings {
    /// Relay hostname.
    pub host: String,
    /// Relay port, derived from `security` when unset.
    pub port: Option<u16>,
    /// Security mode.
    pub security: Security,
    /// Username for AUTH PLAIN.
    pub username: Option<String>,
    /// Password for AUTH PLAIN.
    #[serde(skip_serializing)]
    pub password: Option<String>,
    /// Name announced in EHLO.
    pub hello_name: String,
}

impl Default for SmtpSettings {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: None,
            security: Security::default(),
            username: None,
            password: None,
            hello_name: "localhost".to_string(),
        }
    }
}

impl SmtpSettings {
    /// Returns the configured port or the default for the security mode.
    #[must_use]
    pub fn port(&self) -> u16 {
        self.port.unwrap_or_else(|| self.security.default_port())
    }

    fn credentials(&self) -> Option<(&str, &str)> {
        match (&self.username, &self.password) {
            (Some(user), Some(pass)) => Some((user.as_str(), pass.as_str())),
            _ => None,
        }
    }
}

/// [`Transport`] that talks to one SMTP relay.
#[derive(Debug, Clone)]
pub struct SmtpTransport {
    settings: SmtpSettings,
}

impl SmtpTransport {
    /// Creates a transport for the given relay.
    #[must_use]
    pub const fn new(settings: SmtpSettings) -> Self {
        Self { settings }
    }

    /// Returns the relay settings.
    #[must_use]
    pub const fn settings(&self) -> &SmtpSettings {
        &self.settings
    }

    async fn open(&self) -> Result<Session<Ready>> {
        let settings = &self.settings;
        let port = settings.port();

        let stream = match settings.security {
            Security::Tls => smtp::connect_tls(&settings.host, port).await?,
            Security::StartTls | Security::None => smtp::connect(&settings.host, port).await?,
        };

        let session = Session::open(stream)
            .await?
            .ehlo(&settings.hello_name)
            .await?;

        let session = if settings.security == Security::StartTls {
            session
                .starttls(&settings.host, &settings.hello_name)
                .await?
        } else {
            session
        };

        match settings.credentials() {
            Some((user, pass)) => session.auth_plain(user, pass).await,
            None => Ok(session),
        }
    }
}

impl Transport for SmtpTransport {
    async fn send(&self, mail: &OutgoingMail) -> Result<Delivery> {
        let mut attachments = Vec::with_capacity(mail.attachments.len());
        for path in &mail.attachments {
            attachments.push(Attachment::load(path).await?);
        }
        let payload = Composer::new().render(mail, &attachments);
        debug!(
            bytes = payload.len(),
            attachments = attachments.len(),
            "message composed"
        );

        let session = self.open().await?;
        let (session, delivery) = deliver(session, mail, payload.as_bytes()).await?;
        session.quit().await?;

        info!(
            host = %self.settings.host,
            recipients = delivery.accepted,
            code = delivery.code,
            "message delivered"
        );
        Ok(delivery)
    }
}

/// Runs one mail transaction on an open session.
///
/// Every recipient class goes into the envelope; Bcc recipients are only
/// hidden from the headers in `payload`.
///
/// # Errors
///
/// Returns an error if `mail` has no recipients, the message exceeds the
/// relay's SIZE limit, a non-ASCII address meets a relay without SMTPUTF8,
/// or any command is rejected.
pub async fn deliver(
    session: Session<Ready>,
    mail: &OutgoingMail,
    payload: &[u8],
) -> Result<(Session<Ready>, Delivery)> {
    let Some((first, rest)) = mail.recipients.split_first() else {
        return Err(Error::InvalidAddress("No recipients specified".into()));
    };

    let utf8 = std::iter::once(&mail.sender)
        .chain(mail.recipients.iter().map(|r| &r.mailbox))
        .any(|mailbox| !mailbox.address.as_str().is_ascii());
    let session = session
        .mail_from(&mail.sender.address, payload.len(), utf8)
        .await?;

    let mut session = session.rcpt_to(&first.mailbox.address).await?;
    for recipient in rest {
        session = session.rcpt_to(&recipient.mailbox.address).await?;
    }

    let (session, reply) = session.data().await?.send_message(payload).await?;
    let delivery = Delivery {
        accepted: mail.recipients.len(),
        code: reply.code.as_u16(),
        reply: reply.text(),
    };
    Ok((session, delivery))
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;
    use crate::address::Mailbox;
    use crate::envelope::ResolvedRecipient;
    use crate::smtp::SmtpStream;
    use mailit_directive::RecipientClass;
    use tokio::io::BufReader;
    use tokio_test::io::Builder;

    fn mail(recipients: &[(RecipientClass, &str)]) -> OutgoingMail {
        OutgoingMail {
            sender: Mailbox::new("me@example.com").unwrap(),
            recipients: recipients
                .iter()
                .map(|&(class, addr)| ResolvedRecipient {
                    class,
                    mailbox: Mailbox::new(addr).unwrap(),
                })
                .collect(),
            subject: "Hi".into(),
            body: "Hello".into(),
            attachments: Vec::new(),
        }
    }

    async fn ready(builder: &mut Builder) -> Session<Ready> {
        let stream = SmtpStream::Mock(BufReader::new(builder.build()));
        Session::open(stream).await.unwrap().ehlo("c").await.unwrap()
    }

    #[test]
    fn test_default_ports() {
        assert_eq!(Security::None.default_port(), 25);
        assert_eq!(Security::Tls.default_port(), 465);
        assert_eq!(Security::StartTls.default_port(), 587);

        let mut settings = SmtpSettings::default();
        assert_eq!(settings.port(), 465);
        settings.port = Some(2525);
        assert_eq!(settings.port(), 2525);
    }

    #[test]
    fn test_settings_from_json() {
        let settings: SmtpSettings = serde_json::from_str(
            r#"{"host": "smtp.example.com", "security": "starttls", "username": "me"}"#,
        )
        .unwrap();
        assert_eq!(settings.host, "smtp.example.com");
        assert_eq!(settings.port(), 587);
        assert_eq!(settings.hello_name, "localhost");
        assert!(settings.credentials().is_none());
    }

    #[test]
    fn test_password_not_serialized() {
        let settings = SmtpSettings {
            password: Some("secret".into()),
            ..SmtpSettings::default()
        };
        let json = serde_json::to_string(&settings).unwrap();
        assert!(!json.contains("secret"));
    }

    #[tokio::test]
    async fn test_deliver_includes_bcc_in_envelope() {
        let session = ready(
            Builder::new()
                .read(b"220 mx\r\n")
                .write(b"EHLO c\r\n")
                .read(b"250 mx\r\n")
                .write(b"MAIL FROM:<me@example.com>\r\n")
                .read(b"250 ok\r\n")
                .write(b"RCPT TO:<to@example.com>\r\n")
                .read(b"250 ok\r\n")
                .write(b"RCPT TO:<hidden@example.com>\r\n")
                .read(b"250 ok\r\n")
                .write(b"DATA\r\n")
                .read(b"354 go\r\n")
                .write(b"Subject: Hi\r\n\r\nHello\r\n.\r\n")
                .read(b"250 2.0.0 queued\r\n"),
        )
        .await;

        let mail = mail(&[
            (RecipientClass::To, "to@example.com"),
            (RecipientClass::Bcc, "hidden@example.com"),
        ]);
        let (_session, delivery) = deliver(session, &mail, b"Subject: Hi\r\n\r\nHello\r\n")
            .await
            .unwrap();

        assert_eq!(delivery.accepted, 2);
        assert_eq!(delivery.code, 250);
        assert_eq!(delivery.reply, "2.0.0 queued");
    }

    #[tokio::test]
    async fn test_deliver_without_recipients() {
        let session = ready(
            Builder::new()
                .read(b"220 mx\r\n")
                .write(b"EHLO c\r\n")
                .read(b"250 mx\r\n"),
        )
        .await;

        let err = deliver(session, &mail(&[]), b"x").await.unwrap_err();
        assert!(matches!(err, Error::InvalidAddress(_)));
    }

    #[tokio::test]
    async fn test_deliver_non_ascii_recipient_needs_smtputf8() {
        let session = ready(
            Builder::new()
                .read(b"220 mx\r\n")
                .write(b"EHLO c\r\n")
                .read(b"250 mx\r\n"),
        )
        .await;

        let mail = mail(&[(RecipientClass::Cc, "j\u{f6}rg@example.com")]);
        let err = deliver(session, &mail, b"x").await.unwrap_err();
        assert!(matches!(err, Error::NotSupported(_)));
    }

    #[tokio::test]
    async fn test_deliver_rejected_data() {
        let session = ready(
            Builder::new()
                .read(b"220 mx\r\n")
                .write(b"EHLO c\r\n")
                .read(b"250 mx\r\n")
                .write(b"MAIL FROM:<me@example.com>\r\n")
                .read(b"250 ok\r\n")
                .write(b"RCPT TO:<to@example.com>\r\n")
                .read(b"250 ok\r\n")
                .write(b"DATA\r\n")
                .read(b"451 try later\r\n"),
        )
        .await;

        let mail = mail(&[(RecipientClass::To, "to@example.com")]);
        let err = deliver(session, &mail, b"x").await.unwrap_err();
        assert_eq!(err.code(), Some(451));
        assert!(err.is_transient());
    }
}
