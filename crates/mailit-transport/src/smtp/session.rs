//! Type-state SMTP session.
//!
//! ```text
//! Connected ── ehlo() ──→ Ready ── mail_from() ──→ MailFrom ── rcpt_to() ──→ Recipients
//!                          ↑ │ starttls(), auth_plain()                          │ data()
//!                          │ ↓                                                   ↓
//!                          └──────────────── send_message() ────────────────── Data
//! ```

use std::marker::PhantomData;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use tracing::{debug, trace};

use super::capability::Capabilities;
use super::command::Command;
use super::reply::{Reply, ReplyCode, is_last_line};
use super::stream::SmtpStream;
use crate::address::Address;
use crate::error::{Error, Result};

/// Type-state marker: greeting received.
#[derive(Debug)]
pub struct Connected;

/// Type-state marker: EHLO accepted, no transaction open.
#[derive(Debug)]
pub struct Ready;

/// Type-state marker: MAIL FROM accepted.
#[derive(Debug)]
pub struct MailFrom;

/// Type-state marker: at least one RCPT TO accepted.
#[derive(Debug)]
pub struct Recipients;

/// Type-state marker: DATA accepted, message expected.
#[derive(Debug)]
pub struct Data;

/// SMTP session with type-state pattern.
#[derive(Debug)]
pub struct Session<State> {
    stream: SmtpStream,
    capabilities: Capabilities,
    _state: PhantomData<State>,
}

impl<S> Session<S> {
    fn into_state<T>(self) -> Session<T> {
        Session {
            stream: self.stream,
            capabilities: self.capabilities,
            _state: PhantomData,
        }
    }

    /// Returns the capabilities from the last EHLO.
    #[must_use]
    pub const fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    async fn send_command(&mut self, cmd: Command) -> Result<Reply> {
        debug!(verb = cmd.verb(), "sending command");
        self.stream.write_all(&cmd.serialize()).await?;
        let reply = read_reply(&mut self.stream).await?;
        debug!(code = reply.code.as_u16(), "reply received");
        Ok(reply)
    }

    /// Sends QUIT and closes the session (available in any state).
    ///
    /// # Errors
    ///
    /// Returns an error if the QUIT command fails.
    pub async fn quit(mut self) -> Result<()> {
        self.send_command(Command::Quit)
            .await?
            .expect(ReplyCode::is_success)?;
        Ok(())
    }
}

impl Session<Connected> {
    /// Reads the server greeting.
    ///
    /// # Errors
    ///
    /// Returns an error if the greeting cannot be read or is not 220.
    pub async fn open(mut stream: SmtpStream) -> Result<Self> {
        let greeting = read_reply(&mut stream).await?;
        trace!(greeting = %greeting.text(), "server greeting");
        greeting.expect(|code| code == ReplyCode::SERVICE_READY)?;

        Ok(Self {
            stream,
            capabilities: Capabilities::default(),
            _state: PhantomData,
        })
    }

    /// Sends EHLO and records the server capabilities.
    ///
    /// # Errors
    ///
    /// Returns an error if the EHLO command fails.
    pub async fn ehlo(mut self, client_hostname: &str) -> Result<Session<Ready>> {
        self.ehlo_inner(client_hostname).await?;
        Ok(self.into_state())
    }
}

impl<S> Session<S> {
    async fn ehlo_inner(&mut self, client_hostname: &str) -> Result<()> {
        let reply = self
            .send_command(Command::Ehlo {
                hostname: client_hostname.to_string(),
            })
            .await?
            .expect(ReplyCode::is_success)?;
        self.capabilities = Capabilities::from_ehlo(&reply.lines);
        debug!(
            server = %self.capabilities.hostname,
            tls = self.stream.is_tls(),
            "EHLO accepted"
        );
        Ok(())
    }
}

impl Session<Ready> {
    /// Upgrades to TLS and repeats EHLO over the encrypted channel.
    ///
    /// # Errors
    ///
    /// Returns an error if STARTTLS is not offered or the upgrade fails.
    pub async fn starttls(mut self, server_hostname: &str, client_hostname: &str) -> Result<Self> {
        if !self.capabilities.starttls {
            return Err(Error::NotSupported("STARTTLS".into()));
        }

        self.send_command(Command::StartTls)
            .await?
            .expect(ReplyCode::is_success)?;

        self.stream = self.stream.upgrade_to_tls(server_hostname).await?;
        self.ehlo_inner(client_hostname).await?;
        Ok(self)
    }

    /// Authenticates with AUTH PLAIN.
    ///
    /// # Errors
    ///
    /// Returns an error if the server rejects the credentials.
    pub async fn auth_plain(mut self, username: &str, password: &str) -> Result<Self> {
        let credentials = format!("\0{username}\0{password}");
        let cmd = Command::AuthPlain {
            initial_response: STANDARD.encode(credentials.as_bytes()),
        };

        self.send_command(cmd)
            .await?
            .expect(|code| code == ReplyCode::AUTH_OK)?;
        Ok(self)
    }

    /// Starts a mail transaction.
    ///
    /// `size` is announced only if the server supports SIZE. `utf8` marks a
    /// transaction with non-ASCII addresses and requires SMTPUTF8.
    ///
    /// # Errors
    ///
    /// Returns an error if the message is larger than the server accepts,
    /// SMTPUTF8 is needed but not offered, or MAIL FROM is rejected.
    pub async fn mail_from(
        mut self,
        from: &Address,
        size: usize,
        utf8: bool,
    ) -> Result<Session<MailFrom>> {
        let limit = self.capabilities.max_size;
        if let Some(limit) = limit.filter(|&limit| size > limit) {
            return Err(Error::MessageTooLarge { size, limit });
        }
        if utf8 && !self.capabilities.smtp_utf8 {
            return Err(Error::NotSupported("SMTPUTF8".into()));
        }

        let cmd = Command::MailFrom {
            from: from.clone(),
            size: limit.map(|_| size),
            eight_bit: self.capabilities.eight_bit_mime,
            smtp_utf8: utf8,
        };
        self.send_command(cmd).await?.expect(ReplyCode::is_success)?;
        Ok(self.into_state())
    }
}

impl Session<MailFrom> {
    /// Adds the first recipient.
    ///
    /// # Errors
    ///
    /// Returns an error if RCPT TO is rejected.
    pub async fn rcpt_to(mut self, to: &Address) -> Result<Session<Recipients>> {
        self.rcpt_inner(to).await?;
        Ok(self.into_state())
    }
}

impl Session<Recipients> {
    /// Adds another recipient.
    ///
    /// # Errors
    ///
    /// Returns an error if RCPT TO is rejected.
    pub async fn rcpt_to(mut self, to: &Address) -> Result<Self> {
        self.rcpt_inner(to).await?;
        Ok(self)
    }

    /// Begins sending message data.
    ///
    /// # Errors
    ///
    /// Returns an error if the DATA command is not answered with 354.
    pub async fn data(mut self) -> Result<Session<Data>> {
        self.send_command(Command::Data)
            .await?
            .expect(|code| code == ReplyCode::START_DATA)?;
        Ok(self.into_state())
    }
}

impl<S> Session<S> {
    async fn rcpt_inner(&mut self, to: &Address) -> Result<()> {
        self.send_command(Command::RcptTo { to: to.clone() })
            .await?
            .expect(ReplyCode::is_success)?;
        Ok(())
    }
}

impl Session<Data> {
    /// Sends the message and completes the transaction.
    ///
    /// Line endings are normalized to CRLF, lines starting with `.` are
    /// dot-stuffed and the terminating `.` line is appended.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails or the server rejects the message.
    pub async fn send_message(mut self, message: &[u8]) -> Result<(Session<Ready>, Reply)> {
        self.stream.write_all(&encode_data(message)).await?;

        let reply = read_reply(&mut self.stream)
            .await?
            .expect(ReplyCode::is_success)?;
        Ok((self.into_state(), reply))
    }
}

/// Prepares a message for the DATA phase.
///
/// `\r\n`, a lone `\r` and a lone `\n` each end a line.
fn encode_data(message: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(message.len() + 64);
    let mut rest = message;

    while !rest.is_empty() {
        let (line, tail) = match rest.iter().position(|&b| b == b'\r' || b == b'\n') {
            Some(pos) => {
                let width = if rest[pos..].starts_with(b"\r\n") { 2 } else { 1 };
                (&rest[..pos], &rest[pos + width..])
            }
            None => (rest, &[][..]),
        };

        if line.first() == Some(&b'.') {
            out.push(b'.');
        }
        out.extend_from_slice(line);
        out.extend_from_slice(b"\r\n");
        rest = tail;
    }

    out.extend_from_slice(b".\r\n");
    out
}

async fn read_reply(stream: &mut SmtpStream) -> Result<Reply> {
    let mut lines = Vec::new();
    loop {
        let line = stream.read_line().await?;
        if line.is_empty() {
            continue;
        }

        let is_last = is_last_line(&line);
        lines.push(line);
        if is_last {
            break;
        }
    }
    Reply::parse(&lines)
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
    use tokio::io::BufReader;
    use tokio_test::io::Builder;

    fn scripted(builder: &mut Builder) -> SmtpStream {
        SmtpStream::Mock(BufReader::new(builder.build()))
    }

    fn addr(s: &str) -> Address {
        Address::new(s).unwrap()
    }

    #[test]
    fn test_encode_data() {
        assert_eq!(encode_data(b"a\nb\r\n.c\r\n"), b"a\r\nb\r\n..c\r\n.\r\n");
        assert_eq!(encode_data(b"no newline"), b"no newline\r\n.\r\n");
        assert_eq!(encode_data(b""), b".\r\n");
    }

    #[test]
    fn test_encode_data_bare_cr() {
        assert_eq!(
            encode_data(b"Subject: hi\r\rline one\r.line two\r"),
            b"Subject: hi\r\n\r\nline one\r\n..line two\r\n.\r\n"
        );
        assert_eq!(encode_data(b"a\r\r\nb"), b"a\r\n\r\nb\r\n.\r\n");
    }

    #[tokio::test]
    async fn test_full_transaction() {
        let stream = scripted(
            Builder::new()
                .read(b"220 mx.example.com ESMTP\r\n")
                .write(b"EHLO client.local\r\n")
                .read(b"250-mx.example.com\r\n250-SIZE 1000\r\n250 AUTH PLAIN\r\n")
                .write(b"AUTH PLAIN AHVzZXIAcGFzcw==\r\n")
                .read(b"235 ok\r\n")
                .write(b"MAIL FROM:<me@example.com> SIZE=20\r\n")
                .read(b"250 ok\r\n")
                .write(b"RCPT TO:<a@example.com>\r\n")
                .read(b"250 ok\r\n")
                .write(b"RCPT TO:<b@example.com>\r\n")
                .read(b"250 ok\r\n")
                .write(b"DATA\r\n")
                .read(b"354 go ahead\r\n")
                .write(b"Subject: hi\r\n\r\nHello\r\n.\r\n")
                .read(b"250 queued as 42\r\n")
                .write(b"QUIT\r\n")
                .read(b"221 bye\r\n"),
        );

        let session = Session::open(stream).await.unwrap();
        let session = session.ehlo("client.local").await.unwrap();
        assert!(session.capabilities().auth_plain);

        let session = session.auth_plain("user", "pass").await.unwrap();
        let session = session
            .mail_from(&addr("me@example.com"), 20, false)
            .await
            .unwrap();
        let session = session.rcpt_to(&addr("a@example.com")).await.unwrap();
        let session = session.rcpt_to(&addr("b@example.com")).await.unwrap();
        let session = session.data().await.unwrap();
        let (session, reply) = session
            .send_message(b"Subject: hi\n\nHello\n")
            .await
            .unwrap();
        assert_eq!(reply.text(), "queued as 42");
        session.quit().await.unwrap();
    }

    #[tokio::test]
    async fn test_rejected_greeting() {
        let stream = scripted(Builder::new().read(b"554 go away\r\n"));
        let err = Session::open(stream).await.unwrap_err();
        assert_eq!(err.code(), Some(554));
    }

    #[tokio::test]
    async fn test_rejected_recipient() {
        let stream = scripted(
            Builder::new()
                .read(b"220 mx\r\n")
                .write(b"EHLO c\r\n")
                .read(b"250 mx\r\n")
                .write(b"MAIL FROM:<me@example.com>\r\n")
                .read(b"250 ok\r\n")
                .write(b"RCPT TO:<ghost@example.com>\r\n")
                .read(b"550 5.1.1 no such user\r\n"),
        );

        let session = Session::open(stream).await.unwrap().ehlo("c").await.unwrap();
        let session = session
            .mail_from(&addr("me@example.com"), 10, false)
            .await
            .unwrap();
        let err = session.rcpt_to(&addr("ghost@example.com")).await.unwrap_err();
        assert_eq!(err.code(), Some(550));
        assert!(err.is_permanent());
    }

    #[tokio::test]
    async fn test_message_too_large() {
        let stream = scripted(
            Builder::new()
                .read(b"220 mx\r\n")
                .write(b"EHLO c\r\n")
                .read(b"250-mx\r\n250 SIZE 100\r\n"),
        );

        let session = Session::open(stream).await.unwrap().ehlo("c").await.unwrap();
        let err = session
            .mail_from(&addr("me@example.com"), 500, false)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::MessageTooLarge {
                size: 500,
                limit: 100
            }
        ));
    }

    #[tokio::test]
    async fn test_smtputf8_required() {
        let stream = scripted(
            Builder::new()
                .read(b"220 mx\r\n")
                .write(b"EHLO c\r\n")
                .read(b"250 mx\r\n"),
        );

        let session = Session::open(stream).await.unwrap().ehlo("c").await.unwrap();
        let err = session
            .mail_from(&addr("j\u{f6}rg@example.com"), 10, true)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotSupported(ref ext) if ext == "SMTPUTF8"));
    }

    #[tokio::test]
    async fn test_smtputf8_announced() {
        let stream = scripted(
            Builder::new()
                .read(b"220 mx\r\n")
                .write(b"EHLO c\r\n")
                .read(b"250-mx\r\n250 SMTPUTF8\r\n")
                .write("MAIL FROM:<j\u{f6}rg@example.com> SMTPUTF8\r\n".as_bytes())
                .read(b"250 ok\r\n"),
        );

        let session = Session::open(stream).await.unwrap().ehlo("c").await.unwrap();
        assert!(session.capabilities().smtp_utf8);
        assert_eq!(session.capabilities().hostname, "mx");
        session
            .mail_from(&addr("j\u{f6}rg@example.com"), 10, true)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_starttls_not_offered() {
        let stream = scripted(
            Builder::new()
                .read(b"220 mx\r\n")
                .write(b"EHLO c\r\n")
                .read(b"250 mx\r\n"),
        );

        let session = Session::open(stream).await.unwrap().ehlo("c").await.unwrap();
        let err = session.starttls("mx", "c").await.unwrap_err();
        assert!(matches!(err, Error::NotSupported(_)));
    }

    #[tokio::test]
    async fn test_connection_closed() {
        let stream = scripted(&mut Builder::new());
        let err = Session::open(stream).await.unwrap_err();
        assert!(matches!(err, Error::Protocol(_)));
    }
}
