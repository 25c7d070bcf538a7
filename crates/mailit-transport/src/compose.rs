//! RFC 5322 / MIME rendering of outgoing mail.

use std::fmt::Write as _;
use std::path::Path;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use mailit_directive::RecipientClass;

use crate::address::Mailbox;
use crate::envelope::OutgoingMail;
use crate::error::{Error, Result};

/// Maximum encoded line length for base64 attachment bodies.
const BASE64_LINE_LENGTH: usize = 76;

/// Maximum encoded line length for quoted-printable bodies.
const QP_LINE_LENGTH: usize = 76;

/// Longest line RFC 5322 allows, CRLF excluded.
const MAX_WIRE_LINE: usize = 998;

/// A file attachment with its contents in memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    /// File name announced to the recipient.
    pub filename: String,
    /// MIME type.
    pub content_type: &'static str,
    /// Raw contents.
    pub data: Vec<u8>,
}

impl Attachment {
    /// Creates an attachment, guessing the content type from the file name.
    #[must_use]
    pub fn new(filename: impl Into<String>, data: Vec<u8>) -> Self {
        let filename = filename.into();
        Self {
            content_type: content_type_for(&filename),
            filename,
            data,
        }
    }

    /// Reads an attachment from disk.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Attachment`] if the file cannot be read.
    pub async fn load(path: &Path) -> Result<Self> {
        let data = tokio::fs::read(path)
            .await
            .map_err(|source| Error::Attachment {
                path: path.to_path_buf(),
                source,
            })?;

        let filename = path
            .file_name()
            .map_or_else(|| "attachment".to_string(), |n| n.to_string_lossy().into_owned());

        Ok(Self::new(filename, data))
    }
}

/// Guesses a MIME type from a file extension.
#[must_use]
pub fn content_type_for(filename: &str) -> &'static str {
    let ext = Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    match ext.as_str() {
        "txt" | "log" => "text/plain",
        "htm" | "html" => "text/html",
        "csv" => "text/csv",
        "pdf" => "application/pdf",
        "zip" => "application/zip",
        "json" => "application/json",
        "xml" => "application/xml",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        _ => "application/octet-stream",
    }
}

/// Renders [`OutgoingMail`] into wire format.
#[derive(Debug, Clone)]
pub struct Composer {
    date: DateTime<Utc>,
    boundary: String,
}

impl Default for Composer {
    fn default() -> Self {
        Self::new()
    }
}

impl Composer {
    /// Creates a composer stamped with the current time.
    #[must_use]
    pub fn new() -> Self {
        let date = Utc::now();
        let seed = date.timestamp_nanos_opt().unwrap_or_default().unsigned_abs();
        Self {
            date,
            boundary: format!("mailit-{seed:016x}-{:08x}", std::process::id()),
        }
    }

    /// Creates a composer with a fixed date and multipart boundary.
    #[must_use]
    pub fn with(date: DateTime<Utc>, boundary: impl Into<String>) -> Self {
        Self {
            date,
            boundary: boundary.into(),
        }
    }

    /// Renders headers and body. Bcc recipients never appear in headers.
    ///
    /// All line endings in the output are CRLF.
    #[must_use]
    pub fn render(&self, mail: &OutgoingMail, attachments: &[Attachment]) -> String {
        let mut out = String::new();

        header(&mut out, "From", &mail.sender.to_string());
        let to = join(mail.recipients_of(RecipientClass::To));
        if !to.is_empty() {
            header(&mut out, "To", &to);
        }
        let cc = join(mail.recipients_of(RecipientClass::Cc));
        if !cc.is_empty() {
            header(&mut out, "Cc", &cc);
        }
        header(&mut out, "Subject", &encode_word(&unfold(&mail.subject)));
        header(&mut out, "Date", &self.date.to_rfc2822());
        header(&mut out, "MIME-Version", "1.0");

        if attachments.is_empty() {
            push_text_part(&mut out, &mail.body);
            return out;
        }

        header(
            &mut out,
            "Content-Type",
            &format!("multipart/mixed; boundary=\"{}\"", self.boundary),
        );
        out.push_str("\r\nThis is a multi-part message in MIME format.\r\n");

        let _ = write!(out, "\r\n--{}\r\n", self.boundary);
        push_text_part(&mut out, &mail.body);

        for attachment in attachments {
            let _ = write!(out, "\r\n--{}\r\n", self.boundary);
            let name = quote(&encode_word(&unfold(&attachment.filename)));
            header(
                &mut out,
                "Content-Type",
                &format!("{}; name={name}", attachment.content_type),
            );
            header(&mut out, "Content-Transfer-Encoding", "base64");
            header(
                &mut out,
                "Content-Disposition",
                &format!("attachment; filename={name}"),
            );
            out.push_str("\r\n");
            push_base64(&mut out, &attachment.data);
        }

        let _ = write!(out, "\r\n--{}--\r\n", self.boundary);
        out
    }
}

/// Writes one header line. Line breaks inside `value` become spaces so a
/// value can never start a header of its own.
fn header(out: &mut String, name: &str, value: &str) {
    let _ = write!(out, "{name}: {}\r\n", unfold(value));
}

/// Writes the text part headers, a blank line and the body.
///
/// Bodies with a line longer than the wire limit go out quoted-printable.
fn push_text_part(out: &mut String, body: &str) {
    let lines = split_lines(body);
    let long = lines.iter().any(|line| line.len() > MAX_WIRE_LINE);

    header(out, "Content-Type", "text/plain; charset=utf-8");
    header(
        out,
        "Content-Transfer-Encoding",
        if long { "quoted-printable" } else { "8bit" },
    );
    out.push_str("\r\n");

    for (i, line) in lines.iter().enumerate() {
        if i > 0 {
            out.push_str("\r\n");
        }
        if long {
            push_quoted_printable(out, line);
        } else {
            out.push_str(line);
        }
    }
}

fn join<'a>(mailboxes: impl Iterator<Item = &'a Mailbox>) -> String {
    mailboxes
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

/// RFC 2047 encoded-word for non-ASCII header text.
fn encode_word(text: &str) -> String {
    if text.is_ascii() {
        text.to_string()
    } else {
        format!("=?utf-8?B?{}?=", STANDARD.encode(text.as_bytes()))
    }
}

/// Splits on `\r\n`, a lone `\r` or a lone `\n`.
fn split_lines(text: &str) -> Vec<&str> {
    let mut lines = Vec::new();
    let mut rest = text;
    while let Some(pos) = rest.find(['\r', '\n']) {
        lines.push(&rest[..pos]);
        let width = if rest[pos..].starts_with("\r\n") { 2 } else { 1 };
        rest = &rest[pos + width..];
    }
    lines.push(rest);
    lines
}

fn unfold(value: &str) -> String {
    split_lines(value).join(" ")
}

/// Quoted-printable encoding of one line (RFC 2045), soft breaks included.
fn push_quoted_printable(out: &mut String, line: &str) {
    let bytes = line.as_bytes();
    let mut width = 0;

    for (i, &byte) in bytes.iter().enumerate() {
        let last = i + 1 == bytes.len();
        let literal = matches!(byte, b'!'..=b'<' | b'>'..=b'~')
            || (matches!(byte, b' ' | b'\t') && !last);
        let needed = if literal { 1 } else { 3 };

        if width + needed > QP_LINE_LENGTH - 1 {
            out.push_str("=\r\n");
            width = 0;
        }

        if literal {
            out.push(char::from(byte));
        } else {
            let _ = write!(out, "={byte:02X}");
        }
        width += needed;
    }
}

fn push_base64(out: &mut String, data: &[u8]) {
    let encoded = STANDARD.encode(data);
    for chunk in encoded.as_bytes().chunks(BASE64_LINE_LENGTH) {
        out.push_str(&String::from_utf8_lossy(chunk));
        out.push_str("\r\n");
    }
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
    use crate::address::LiteralResolver;
    use crate::envelope::ResolvedRecipient;
    use chrono::TimeZone;

    fn mail() -> OutgoingMail {
        let recipient = |class, addr: &str| ResolvedRecipient {
            class,
            mailbox: Mailbox::new(addr).unwrap(),
        };
        OutgoingMail {
            sender: Mailbox::with_name("Me", "me@example.com").unwrap(),
            recipients: vec![
                recipient(RecipientClass::To, "a@example.com"),
                recipient(RecipientClass::To, "b@example.com"),
                recipient(RecipientClass::Cc, "c@example.com"),
                recipient(RecipientClass::Bcc, "secret@example.com"),
            ],
            subject: "Report".into(),
            body: "Line one\nLine two AttachFile[/tmp/r.txt]".into(),
            attachments: vec!["/tmp/r.txt".into()],
        }
    }

    fn composer() -> Composer {
        Composer::with(
            Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
            "BOUNDARY",
        )
    }

    #[test]
    fn test_render_plain() {
        let out = composer().render(&mail(), &[]);
        assert!(out.starts_with("From: \"Me\" <me@example.com>\r\n"));
        assert!(out.contains("To: a@example.com, b@example.com\r\n"));
        assert!(out.contains("Cc: c@example.com\r\n"));
        assert!(out.contains("Subject: Report\r\n"));
        assert!(out.contains("Date: Fri, 1 Mar 2024 12:00:00 +0000\r\n"));
        assert!(out.contains("Content-Type: text/plain; charset=utf-8\r\n"));
        assert!(out.ends_with("\r\n\r\nLine one\r\nLine two AttachFile[/tmp/r.txt]"));
    }

    #[test]
    fn test_bcc_hidden() {
        let out = composer().render(&mail(), &[]);
        assert!(!out.contains("secret@example.com"));
        assert!(!out.contains("Bcc"));
    }

    #[test]
    fn test_render_with_attachment() {
        let attachment = Attachment::new("r.txt", b"hello".to_vec());
        let out = composer().render(&mail(), &[attachment]);

        assert!(out.contains("Content-Type: multipart/mixed; boundary=\"BOUNDARY\"\r\n"));
        assert!(out.contains("\r\n--BOUNDARY\r\nContent-Type: text/plain; charset=utf-8\r\n"));
        assert!(out.contains("Content-Type: text/plain; name=\"r.txt\"\r\n"));
        assert!(out.contains("Content-Disposition: attachment; filename=\"r.txt\"\r\n"));
        assert!(out.contains("\r\n\r\naGVsbG8=\r\n"));
        assert!(out.ends_with("\r\n--BOUNDARY--\r\n"));
    }

    #[test]
    fn test_base64_lines_wrapped() {
        let attachment = Attachment::new("blob.bin", vec![0u8; 300]);
        let out = composer().render(&mail(), &[attachment]);
        assert!(out.contains("Content-Type: application/octet-stream; name=\"blob.bin\""));
        assert!(out.lines().all(|line| line.len() <= 998));
        let longest_b64 = out
            .split("\r\n")
            .filter(|l| l.chars().all(|c| c == 'A' || c == '='))
            .map(str::len)
            .max()
            .unwrap();
        assert_eq!(longest_b64, BASE64_LINE_LENGTH);
    }

    #[test]
    fn test_non_ascii_subject_encoded() {
        let mut mail = mail();
        mail.subject = "Grüße".into();
        let out = composer().render(&mail, &[]);
        assert!(out.contains("Subject: =?utf-8?B?R3LDvMOfZQ==?=\r\n"));
    }

    #[test]
    fn test_split_lines() {
        assert_eq!(split_lines("a\r\nb\nc\rd"), vec!["a", "b", "c", "d"]);
        assert_eq!(split_lines("a\r\r\n"), vec!["a", "", ""]);
        assert_eq!(split_lines(""), vec![""]);
    }

    fn assert_crlf_only(out: &str) {
        assert_eq!(out.matches('\r').count(), out.matches("\r\n").count());
        assert_eq!(out.matches('\n').count(), out.matches("\r\n").count());
    }

    #[test]
    fn test_crlf_normalisation() {
        let mut mail = mail();
        mail.body = "a\r\nb\nc\rd\r".into();
        let out = composer().render(&mail, &[]);
        assert_crlf_only(&out);
        assert!(out.ends_with("\r\n\r\na\r\nb\r\nc\r\nd\r\n"));
    }

    #[test]
    fn test_restricted_directive_renders_clean() {
        let parser = mailit_directive::Parser::new(mailit_directive::ParserConfig::restricted());
        let directive = parser
            .parse(
                b"TO: a@example.com\rCC: \rFROM: me@example.com\r\
                  SUBJECT: hi\nBcc: leak@evil.example\rline one\rline two\r",
            )
            .unwrap();
        let mail = OutgoingMail::resolve(&directive, &LiteralResolver).unwrap();
        let out = composer().render(&mail, &[]);

        assert_crlf_only(&out);
        assert!(out.contains("Subject: hi Bcc: leak@evil.example\r\n"));
        assert!(!out.split("\r\n").any(|line| line.starts_with("Bcc")));
        assert!(out.ends_with("\r\n\r\nline one\r\nline two\r\n"));
    }

    #[test]
    fn test_header_values_unfolded() {
        let mut mail = mail();
        mail.sender = Mailbox::with_name("Me\r\nBcc: x@example.com", "me@example.com").unwrap();
        let out = composer().render(&mail, &[]);
        assert!(out.starts_with("From: \"Me Bcc: x@example.com\" <me@example.com>\r\n"));
        assert!(!out.split("\r\n").any(|line| line.starts_with("Bcc")));
    }

    #[test]
    fn test_long_body_line_quoted_printable() {
        let mut mail = mail();
        mail.body = format!("short\n{}= end ", "x".repeat(1200));
        let out = composer().render(&mail, &[]);

        assert!(out.contains("Content-Transfer-Encoding: quoted-printable\r\n"));
        assert!(out.split("\r\n").all(|line| line.len() <= QP_LINE_LENGTH));
        assert!(out.contains("=3D end=20"));
        assert_crlf_only(&out);
    }

    #[test]
    fn test_short_body_stays_8bit() {
        let out = composer().render(&mail(), &[]);
        assert!(out.contains("Content-Transfer-Encoding: 8bit\r\n"));
    }

    #[test]
    fn test_content_type_for() {
        assert_eq!(content_type_for("report.PDF"), "application/pdf");
        assert_eq!(content_type_for("photo.jpeg"), "image/jpeg");
        assert_eq!(content_type_for("noext"), "application/octet-stream");
    }

    #[tokio::test]
    async fn test_load_missing_attachment() {
        let err = Attachment::load(Path::new("/nonexistent/mailit/file.txt"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Attachment { .. }));
    }

    #[tokio::test]
    async fn test_load_attachment() {
        let dir = std::env::temp_dir().join(format!("mailit-compose-{}", std::process::id()));
        tokio::fs::create_dir_all(&dir).await.unwrap();
        let path = dir.join("notes.txt");
        tokio::fs::write(&path, b"notes").await.unwrap();

        let attachment = Attachment::load(&path).await.unwrap();
        assert_eq!(attachment.filename, "notes.txt");
        assert_eq!(attachment.content_type, "text/plain");
        assert_eq!(attachment.data, b"notes");

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }
}
