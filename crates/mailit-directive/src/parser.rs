//! Top-level directive parsing.

use std::path::Path;

use crate::attachment::scan_attachments;
use crate::config::{HeaderLayout, ParserConfig};
use crate::cursor::LineCursor;
use crate::directive::MailDirective;
use crate::error::{ParseError, Result};
use crate::field::{Field, split_addresses, strip_label};

/// Directive parser for one dialect.
///
/// The parser holds no state between calls; a single instance may be shared
/// freely.
#[derive(Debug, Clone, Copy, Default)]
pub struct Parser {
    config: ParserConfig,
}

impl Parser {
    /// Creates a parser for the given dialect.
    #[must_use]
    pub const fn new(config: ParserConfig) -> Self {
        Self { config }
    }

    /// Returns the dialect this parser accepts.
    #[must_use]
    pub const fn config(&self) -> ParserConfig {
        self.config
    }

    /// Parses a complete directive held in memory.
    ///
    /// Header lines are read in fixed order (To, Cc, Bcc, From, Subject, with
    /// Bcc omitted for [`HeaderLayout::WithoutBcc`]). Everything after the
    /// Subject line is the body, verbatim.
    ///
    /// # Errors
    ///
    /// Returns the first header failure; no partial directive is produced.
    pub fn parse(&self, buffer: &[u8]) -> Result<MailDirective> {
        let mut cursor = LineCursor::new(buffer, self.config.line_ending);

        let to = split_addresses(read_field(&mut cursor, Field::To)?);
        if to.is_empty() {
            return Err(ParseError::EmptyMandatoryField(Field::To));
        }

        let cc = split_addresses(read_field(&mut cursor, Field::Cc)?);

        let bcc = match self.config.layout {
            HeaderLayout::WithBcc => split_addresses(read_field(&mut cursor, Field::Bcc)?),
            HeaderLayout::WithoutBcc => Vec::new(),
        };

        let sender = read_field(&mut cursor, Field::From)?;
        if sender.is_empty() {
            return Err(ParseError::EmptyMandatoryField(Field::From));
        }

        let subject = read_field(&mut cursor, Field::Subject)?;

        let body = String::from_utf8_lossy(cursor.remainder()).into_owned();
        let attachments = scan_attachments(&body, self.config.attachments);

        Ok(MailDirective {
            sender: String::from_utf8_lossy(sender).into_owned(),
            to,
            cc,
            bcc,
            subject: String::from_utf8_lossy(subject).into_owned(),
            body,
            attachments,
        })
    }

    /// Reads `path` fully and parses it.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::IoUnavailable`] if the file cannot be read, or any
    /// error [`Parser::parse`] returns.
    pub fn parse_file(&self, path: impl AsRef<Path>) -> Result<MailDirective> {
        let path = path.as_ref();
        let buffer = std::fs::read(path).map_err(|source| ParseError::IoUnavailable {
            path: path.to_path_buf(),
            source,
        })?;
        self.parse(&buffer)
    }
}

fn read_field<'a>(cursor: &mut LineCursor<'a>, field: Field) -> Result<&'a [u8]> {
    let line = cursor.next_line(field)?;
    strip_label(line, field)
}

/// Parses a directive in the canonical dialect.
///
/// # Errors
///
/// See [`Parser::parse`].
pub fn parse(buffer: &[u8]) -> Result<MailDirective> {
    Parser::default().parse(buffer)
}

/// Reads and parses a directive file in the canonical dialect.
///
/// # Errors
///
/// See [`Parser::parse_file`].
pub fn parse_file(path: impl AsRef<Path>) -> Result<MailDirective> {
    Parser::default().parse_file(path)
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
    use crate::config::{AttachmentMode, LineEnding};
    use crate::cursor::MAX_LINE_LENGTH;

    const WELL_FORMED: &[u8] = b"TO: alice@example.com;bob@example.com\r\n\
CC: carol@example.com\r\n\
BCC: \r\n\
FROM: me@example.com\r\n\
SUBJECT: Quarterly report\r\n\
Hi all,\r\nsee AttachFile[/tmp/report.pdf] for details.\r\n";

    #[test]
    fn test_parse_well_formed() {
        let directive = parse(WELL_FORMED).unwrap();
        assert_eq!(directive.to, vec!["alice@example.com", "bob@example.com"]);
        assert_eq!(directive.cc, vec!["carol@example.com"]);
        assert!(directive.bcc.is_empty());
        assert_eq!(directive.sender, "me@example.com");
        assert_eq!(directive.subject, "Quarterly report");
        assert_eq!(
            directive.body,
            "Hi all,\r\nsee AttachFile[/tmp/report.pdf] for details.\r\n"
        );
        assert_eq!(directive.attachments, vec!["/tmp/report.pdf"]);
    }

    #[test]
    fn test_parse_lf_only() {
        let input = b"TO: a@x\nCC: \nBCC: b@y\nFROM: me@x\nSUBJECT: \nbody";
        let directive = parse(input).unwrap();
        assert_eq!(directive.bcc, vec!["b@y"]);
        assert_eq!(directive.subject, "");
        assert_eq!(directive.body, "body");
    }

    #[test]
    fn test_parse_empty_body() {
        let input = b"TO: a@x\nCC: \nBCC: \nFROM: me@x\nSUBJECT: s\n";
        let directive = parse(input).unwrap();
        assert_eq!(directive.body, "");
        assert!(directive.attachments.is_empty());
    }

    #[test]
    fn test_parse_lowercase_labels() {
        let input = b"to: a@x\ncc: \nbcc: \nfrom: me@x\nsubject: s\n";
        assert!(parse(input).is_ok());
    }

    #[test]
    fn test_to_without_addresses() {
        let input = b"TO: nobody\nCC: \nBCC: \nFROM: me@x\nSUBJECT: s\n";
        assert!(matches!(
            parse(input),
            Err(ParseError::EmptyMandatoryField(Field::To))
        ));
    }

    #[test]
    fn test_to_bare_label() {
        let input = b"TO: \nCC: \nBCC: \nFROM: me@x\nSUBJECT: s\n";
        assert!(matches!(
            parse(input),
            Err(ParseError::EmptyMandatoryField(Field::To))
        ));
    }

    #[test]
    fn test_from_bare_label() {
        let input = b"TO: a@x\nCC: \nBCC: \nFROM: \nSUBJECT: s\n";
        assert!(matches!(
            parse(input),
            Err(ParseError::EmptyMandatoryField(Field::From))
        ));
    }

    #[test]
    fn test_fields_out_of_order() {
        let input = b"TO: a@x\nBCC: \nCC: \nFROM: me@x\nSUBJECT: s\n";
        assert!(matches!(
            parse(input),
            Err(ParseError::MissingField(Field::Cc))
        ));
    }

    #[test]
    fn test_missing_subject_line() {
        let input = b"TO: a@x\nCC: \nBCC: \nFROM: me@x\n";
        assert!(matches!(
            parse(input),
            Err(ParseError::UnexpectedEof(Field::Subject))
        ));
    }

    #[test]
    fn test_unterminated_subject() {
        let input = b"TO: a@x\nCC: \nBCC: \nFROM: me@x\nSUBJECT: s";
        assert!(matches!(
            parse(input),
            Err(ParseError::UnexpectedEof(Field::Subject))
        ));
    }

    #[test]
    fn test_long_header_line() {
        let mut input = b"TO: ".to_vec();
        input.extend(std::iter::repeat_n(b'a', MAX_LINE_LENGTH + 1));
        assert!(matches!(
            parse(&input),
            Err(ParseError::LineTooLong { field: Field::To, .. })
        ));
    }

    #[test]
    fn test_long_body_line_is_fine() {
        let mut input = b"TO: a@x\nCC: \nBCC: \nFROM: me@x\nSUBJECT: s\n".to_vec();
        input.extend(std::iter::repeat_n(b'z', MAX_LINE_LENGTH * 4));
        let directive = parse(&input).unwrap();
        assert_eq!(directive.body.len(), MAX_LINE_LENGTH * 4);
    }

    #[test]
    fn test_restricted_dialect() {
        let input = b"TO: a@x\rCC: c@y\rFROM: me@x\rSUBJECT: s\r\
AttachFile[/one] AttachFile[/two]";
        let directive = Parser::new(ParserConfig::restricted()).parse(input).unwrap();
        assert_eq!(directive.cc, vec!["c@y"]);
        assert!(directive.bcc.is_empty());
        assert_eq!(directive.attachments, vec!["/one"]);
    }

    #[test]
    fn test_restricted_dialect_rejects_lf_file() {
        let input = b"TO: a@x\nCC: \nFROM: me@x\nSUBJECT: s\n";
        assert!(matches!(
            Parser::new(ParserConfig::restricted()).parse(input),
            Err(ParseError::UnexpectedEof(Field::To))
        ));
    }

    #[test]
    fn test_cr_lines_keep_lf() {
        let config = ParserConfig::canonical().with_line_ending(LineEnding::Cr);
        let input = b"TO: a@x\rCC: \r\nBCC: \rFROM: me@x\rSUBJECT: s\rbody";
        // The stray LF becomes part of the Bcc line and breaks its label.
        assert!(matches!(
            Parser::new(config).parse(input),
            Err(ParseError::MissingField(Field::Bcc))
        ));
    }

    #[test]
    fn test_canonical_layout_first_only() {
        let config = ParserConfig::canonical().with_attachments(AttachmentMode::FirstOnly);
        let input = b"TO: a@x\nCC: \nBCC: \nFROM: me@x\nSUBJECT: s\nAttachFile[/a]AttachFile[/b]";
        let directive = Parser::new(config).parse(input).unwrap();
        assert_eq!(directive.attachments, vec!["/a"]);
    }

    #[test]
    fn test_parse_file_missing() {
        let err = parse_file("/nonexistent/mailit/directive.txt").unwrap_err();
        assert!(matches!(err, ParseError::IoUnavailable { .. }));
        assert!(err.field().is_none());
    }

    #[test]
    fn test_parse_is_repeatable() {
        assert_eq!(parse(WELL_FORMED).unwrap(), parse(WELL_FORMED).unwrap());
    }
}
