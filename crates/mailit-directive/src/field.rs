//! Header labels and field content tokenizing.

use std::fmt;

use crate::error::{ParseError, Result};

/// Header line of a directive file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    /// Primary recipients.
    To,
    /// Carbon-copy recipients.
    Cc,
    /// Blind carbon-copy recipients.
    Bcc,
    /// Sender.
    From,
    /// Subject line.
    Subject,
}

impl Field {
    /// Returns the label that must prefix the line, in canonical case.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::To => "TO: ",
            Self::Cc => "CC: ",
            Self::Bcc => "BCC: ",
            Self::From => "FROM: ",
            Self::Subject => "SUBJECT: ",
        }
    }

    /// Returns the human-readable field name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::To => "To",
            Self::Cc => "Cc",
            Self::Bcc => "Bcc",
            Self::From => "From",
            Self::Subject => "Subject",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Checks that `line` starts with the label of `field`, ignoring ASCII case,
/// and returns whatever follows the label.
///
/// # Errors
///
/// Returns [`ParseError::MissingField`] if the line is shorter than the label
/// or the prefix does not match.
pub fn strip_label(line: &[u8], field: Field) -> Result<&[u8]> {
    let label = field.label().as_bytes();
    match line.get(..label.len()) {
        Some(prefix) if prefix.eq_ignore_ascii_case(label) => Ok(&line[label.len()..]),
        _ => Err(ParseError::MissingField(field)),
    }
}

/// Splits an address field on `;`.
///
/// Collection stops at the first token without an `@`; that token and every
/// token after it are dropped. Empty tokens between adjacent separators are
/// skipped. Tokens are kept verbatim.
#[must_use]
pub fn split_addresses(rest: &[u8]) -> Vec<String> {
    rest.split(|&b| b == b';')
        .filter(|token| !token.is_empty())
        .take_while(|token| token.contains(&b'@'))
        .map(|token| String::from_utf8_lossy(token).into_owned())
        .collect()
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

    #[test]
    fn test_strip_label_exact_case() {
        assert_eq!(strip_label(b"TO: a@x", Field::To).unwrap(), b"a@x");
    }

    #[test]
    fn test_strip_label_ignores_case() {
        assert_eq!(strip_label(b"to: a@x", Field::To).unwrap(), b"a@x");
        assert_eq!(strip_label(b"To: a@x", Field::To).unwrap(), b"a@x");
        assert_eq!(strip_label(b"sUbJeCt: hi", Field::Subject).unwrap(), b"hi");
    }

    #[test]
    fn test_strip_label_bare_label() {
        assert_eq!(strip_label(b"CC: ", Field::Cc).unwrap(), b"");
    }

    #[test]
    fn test_strip_label_short_line() {
        let err = strip_label(b"CC:", Field::Cc).unwrap_err();
        assert!(matches!(err, ParseError::MissingField(Field::Cc)));
    }

    #[test]
    fn test_strip_label_wrong_label() {
        let err = strip_label(b"FROM: a@x", Field::Bcc).unwrap_err();
        assert!(matches!(err, ParseError::MissingField(Field::Bcc)));
    }

    #[test]
    fn test_strip_label_requires_space() {
        assert!(strip_label(b"TO:a@x", Field::To).is_err());
    }

    #[test]
    fn test_split_addresses() {
        assert_eq!(split_addresses(b"a@x;b@y"), vec!["a@x", "b@y"]);
    }

    #[test]
    fn test_split_addresses_stops_at_garbage() {
        assert_eq!(
            split_addresses(b"a@x;b@y;garbage;c@z"),
            vec!["a@x", "b@y"]
        );
    }

    #[test]
    fn test_split_addresses_first_token_garbage() {
        assert!(split_addresses(b"nobody;a@x").is_empty());
    }

    #[test]
    fn test_split_addresses_skips_empty_tokens() {
        assert_eq!(split_addresses(b";a@x;;b@y;"), vec!["a@x", "b@y"]);
    }

    #[test]
    fn test_split_addresses_keeps_duplicates_and_spacing() {
        assert_eq!(
            split_addresses(b"a@x; a@x"),
            vec!["a@x".to_string(), " a@x".to_string()]
        );
    }

    #[test]
    fn test_field_display() {
        assert_eq!(Field::Bcc.to_string(), "Bcc");
        assert_eq!(Field::Subject.label(), "SUBJECT: ");
    }
}
