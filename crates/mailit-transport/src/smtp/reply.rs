//! SMTP replies.

use crate::error::{Error, Result};

/// SMTP reply code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ReplyCode(u16);

impl ReplyCode {
    /// 220 Service ready
    pub const SERVICE_READY: Self = Self(220);
    /// 235 Authentication succeeded
    pub const AUTH_OK: Self = Self(235);
    /// 354 Start mail input
    pub const START_DATA: Self = Self(354);

    /// Creates a new reply code.
    #[must_use]
    pub const fn new(code: u16) -> Self {
        Self(code)
    }

    /// Returns the numeric code.
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self.0
    }

    /// Returns true if this is a success code (2xx).
    #[must_use]
    pub const fn is_success(self) -> bool {
        self.0 >= 200 && self.0 < 300
    }
}

impl std::fmt::Display for ReplyCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// SMTP reply from server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// Reply code.
    pub code: ReplyCode,
    /// Text of each reply line, code and separator removed.
    pub lines: Vec<String>,
}

impl Reply {
    /// Returns the reply text as a single string.
    #[must_use]
    pub fn text(&self) -> String {
        self.lines.join("\n")
    }

    /// Converts a reply that is not `expected` into [`Error::Rejected`].
    ///
    /// # Errors
    ///
    /// Returns an error when the code does not satisfy `expected`.
    pub fn expect(self, expected: impl FnOnce(ReplyCode) -> bool) -> Result<Self> {
        if expected(self.code) {
            Ok(self)
        } else {
            Err(Error::rejected(self.code.as_u16(), self.text()))
        }
    }

    /// Parses a reply from its raw lines.
    ///
    /// Replies are single-line (`250 OK`) or multi-line, where every line but
    /// the last uses `-` after the code (`250-First`, `250 Last`).
    ///
    /// # Errors
    ///
    /// Returns an error if the reply is malformed.
    pub fn parse(raw: &[String]) -> Result<Self> {
        let first = raw
            .first()
            .ok_or_else(|| Error::Protocol("Empty reply".into()))?;

        let code = first
            .get(..3)
            .and_then(|digits| digits.parse::<u16>().ok())
            .filter(|code| (100..600).contains(code))
            .ok_or_else(|| Error::Protocol(format!("Invalid reply code in {first:?}")))?;

        let mut lines = Vec::with_capacity(raw.len());
        for line in raw {
            if !line.starts_with(&first[..3]) {
                return Err(Error::Protocol(format!("Reply code changed mid-reply: {line:?}")));
            }
            let text = if line.len() == 3 {
                ""
            } else {
                line.get(4..)
                    .ok_or_else(|| Error::Protocol(format!("Malformed reply line: {line:?}")))?
            };
            lines.push(text.to_string());
        }

        Ok(Self {
            code: ReplyCode::new(code),
            lines,
        })
    }
}

/// Returns true if `line` ends a (possibly multi-line) reply.
#[must_use]
pub fn is_last_line(line: &str) -> bool {
    line.len() == 3 || line.as_bytes().get(3) == Some(&b' ')
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

    fn lines(raw: &[&str]) -> Vec<String> {
        raw.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_parse_single_line() {
        let reply = Reply::parse(&lines(&["250 OK"])).unwrap();
        assert_eq!(reply.code, ReplyCode::new(250));
        assert_eq!(reply.lines, vec!["OK"]);
        assert!(reply.code.is_success());
    }

    #[test]
    fn test_parse_multi_line() {
        let reply =
            Reply::parse(&lines(&["250-mx.example.com", "250-SIZE 1000", "250 STARTTLS"]))
                .unwrap();
        assert_eq!(reply.lines, vec!["mx.example.com", "SIZE 1000", "STARTTLS"]);
        assert_eq!(reply.text(), "mx.example.com\nSIZE 1000\nSTARTTLS");
    }

    #[test]
    fn test_parse_bare_code() {
        let reply = Reply::parse(&lines(&["354"])).unwrap();
        assert_eq!(reply.code, ReplyCode::START_DATA);
        assert!(reply.lines.iter().all(String::is_empty));
    }

    #[test]
    fn test_parse_empty() {
        assert!(Reply::parse(&[]).is_err());
    }

    #[test]
    fn test_parse_invalid_code() {
        assert!(Reply::parse(&lines(&["ABC OK"])).is_err());
        assert!(Reply::parse(&lines(&["25"])).is_err());
        assert!(Reply::parse(&lines(&["999 nope"])).is_err());
    }

    #[test]
    fn test_parse_mixed_codes() {
        assert!(Reply::parse(&lines(&["250-a", "251 b"])).is_err());
    }

    #[test]
    fn test_expect() {
        let reply = Reply::parse(&lines(&["550 No such user"])).unwrap();
        let err = reply.expect(ReplyCode::is_success).unwrap_err();
        assert_eq!(err.code(), Some(550));
    }

    #[test]
    fn test_is_last_line() {
        assert!(is_last_line("250 OK"));
        assert!(is_last_line("250"));
        assert!(!is_last_line("250-Continuing"));
    }
}
