//! Bounded line reader over an in-memory buffer.

use crate::config::LineEnding;
use crate::error::{ParseError, Result};
use crate::field::Field;

/// Maximum header line length in bytes, terminator included.
pub const MAX_LINE_LENGTH: usize = 1024;

/// Read-only cursor handing out header lines and then the body.
#[derive(Debug, Clone)]
pub struct LineCursor<'a> {
    input: &'a [u8],
    pos: usize,
    line_ending: LineEnding,
}

impl<'a> LineCursor<'a> {
    /// Creates a cursor at the start of `input`.
    #[must_use]
    pub const fn new(input: &'a [u8], line_ending: LineEnding) -> Self {
        Self {
            input,
            pos: 0,
            line_ending,
        }
    }

    /// Reads the next terminated line for `field`.
    ///
    /// The returned slice excludes the terminator (and, for
    /// [`LineEnding::Lf`], a trailing `\r`).
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::LineTooLong`] if no terminator appears within
    /// [`MAX_LINE_LENGTH`] bytes, or [`ParseError::UnexpectedEof`] if the input
    /// ends first.
    pub fn next_line(&mut self, field: Field) -> Result<&'a [u8]> {
        let rest = &self.input[self.pos..];
        let window = &rest[..rest.len().min(MAX_LINE_LENGTH)];
        let terminator = self.line_ending.terminator();

        let Some(end) = window.iter().position(|&b| b == terminator) else {
            return Err(if rest.len() >= MAX_LINE_LENGTH {
                ParseError::LineTooLong {
                    field,
                    max: MAX_LINE_LENGTH,
                }
            } else {
                ParseError::UnexpectedEof(field)
            });
        };

        self.pos += end + 1;
        Ok(self.line_ending.trim(&rest[..end]))
    }

    /// Consumes and returns everything after the current position.
    pub fn remainder(&mut self) -> &'a [u8] {
        let rest = &self.input[self.pos..];
        self.pos = self.input.len();
        rest
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

    #[test]
    fn test_reads_lf_lines() {
        let mut cursor = LineCursor::new(b"one\ntwo\n", LineEnding::Lf);
        assert_eq!(cursor.next_line(Field::To).unwrap(), b"one");
        assert_eq!(cursor.next_line(Field::Cc).unwrap(), b"two");
        assert_eq!(cursor.remainder(), b"");
    }

    #[test]
    fn test_strips_cr_before_lf() {
        let mut cursor = LineCursor::new(b"one\r\nrest", LineEnding::Lf);
        assert_eq!(cursor.next_line(Field::To).unwrap(), b"one");
        assert_eq!(cursor.remainder(), b"rest");
    }

    #[test]
    fn test_reads_cr_lines() {
        let mut cursor = LineCursor::new(b"one\rtwo\r\nrest", LineEnding::Cr);
        assert_eq!(cursor.next_line(Field::To).unwrap(), b"one");
        assert_eq!(cursor.next_line(Field::Cc).unwrap(), b"two");
        assert_eq!(cursor.remainder(), b"\nrest");
    }

    #[test]
    fn test_empty_line() {
        let mut cursor = LineCursor::new(b"\n", LineEnding::Lf);
        assert_eq!(cursor.next_line(Field::Subject).unwrap(), b"");
    }

    #[test]
    fn test_eof_without_terminator() {
        let mut cursor = LineCursor::new(b"TO: a@x", LineEnding::Lf);
        let err = cursor.next_line(Field::To).unwrap_err();
        assert!(matches!(err, ParseError::UnexpectedEof(Field::To)));
    }

    #[test]
    fn test_eof_on_empty_input() {
        let mut cursor = LineCursor::new(b"", LineEnding::Lf);
        assert!(matches!(
            cursor.next_line(Field::From),
            Err(ParseError::UnexpectedEof(Field::From))
        ));
    }

    #[test]
    fn test_line_too_long() {
        let input = vec![b'a'; MAX_LINE_LENGTH + 1];
        let mut cursor = LineCursor::new(&input, LineEnding::Lf);
        assert!(matches!(
            cursor.next_line(Field::To),
            Err(ParseError::LineTooLong { field: Field::To, max: MAX_LINE_LENGTH })
        ));
    }

    #[test]
    fn test_longest_accepted_line() {
        let mut input = vec![b'a'; MAX_LINE_LENGTH - 1];
        input.push(b'\n');
        let mut cursor = LineCursor::new(&input, LineEnding::Lf);
        assert_eq!(cursor.next_line(Field::To).unwrap().len(), MAX_LINE_LENGTH - 1);
    }

    #[test]
    fn test_terminator_just_past_limit() {
        let mut input = vec![b'a'; MAX_LINE_LENGTH];
        input.push(b'\n');
        let mut cursor = LineCursor::new(&input, LineEnding::Lf);
        assert!(matches!(
            cursor.next_line(Field::To),
            Err(ParseError::LineTooLong { .. })
        ));
    }

    #[test]
    fn test_failed_read_does_not_advance() {
        let mut cursor = LineCursor::new(b"partial", LineEnding::Lf);
        assert!(cursor.next_line(Field::To).is_err());
        assert_eq!(cursor.remainder(), b"partial");
    }
}
