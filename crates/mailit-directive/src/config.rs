//! Parser dialects.
//!
//! Two variants of the directive format exist in the wild. The canonical one
//! uses linefeed-terminated lines, carries a Bcc line and lists any number of
//! attachments. The restricted one uses bare carriage returns, has no Bcc
//! line and honours only the first attachment marker.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Line terminator convention, fixed for a whole parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum LineEnding {
    /// Lines end at `\n`; a `\r` right before it is dropped.
    #[default]
    Lf,
    /// Lines end at `\r`, nothing else is stripped.
    Cr,
}

impl LineEnding {
    /// Returns the terminator byte.
    #[must_use]
    pub const fn terminator(self) -> u8 {
        match self {
            Self::Lf => b'\n',
            Self::Cr => b'\r',
        }
    }

    /// Removes any trailing bytes that belong to the terminator sequence.
    #[must_use]
    pub fn trim(self, line: &[u8]) -> &[u8] {
        match self {
            Self::Lf => line.strip_suffix(b"\r").unwrap_or(line),
            Self::Cr => line,
        }
    }
}

/// Header lines expected before the body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum HeaderLayout {
    /// To, Cc, Bcc, From, Subject.
    #[default]
    WithBcc,
    /// To, Cc, From, Subject.
    WithoutBcc,
}

/// How many attachment markers are honoured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum AttachmentMode {
    /// Every marker in the body.
    #[default]
    All,
    /// Only the first marker that yields a path.
    FirstOnly,
}

/// Parser configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ParserConfig {
    /// Line terminator convention.
    pub line_ending: LineEnding,
    /// Header block layout.
    pub layout: HeaderLayout,
    /// Attachment extraction mode.
    pub attachments: AttachmentMode,
}

impl ParserConfig {
    /// Canonical dialect: LF lines, Bcc line, all attachments.
    #[must_use]
    pub const fn canonical() -> Self {
        Self {
            line_ending: LineEnding::Lf,
            layout: HeaderLayout::WithBcc,
            attachments: AttachmentMode::All,
        }
    }

    /// Restricted dialect: bare-CR lines, no Bcc line, first attachment only.
    #[must_use]
    pub const fn restricted() -> Self {
        Self {
            line_ending: LineEnding::Cr,
            layout: HeaderLayout::WithoutBcc,
            attachments: AttachmentMode::FirstOnly,
        }
    }

    /// Sets the line terminator convention.
    #[must_use]
    pub const fn with_line_ending(mut self, line_ending: LineEnding) -> Self {
        self.line_ending = line_ending;
        self
    }

    /// Sets the header layout.
    #[must_use]
    pub const fn with_layout(mut self, layout: HeaderLayout) -> Self {
        self.layout = layout;
        self
    }

    /// Sets the attachment extraction mode.
    #[must_use]
    pub const fn with_attachments(mut self, attachments: AttachmentMode) -> Self {
        self.attachments = attachments;
        self
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_canonical() {
        assert_eq!(ParserConfig::default(), ParserConfig::canonical());
    }

    #[test]
    fn test_lf_trim_strips_cr() {
        assert_eq!(LineEnding::Lf.trim(b"abc\r"), b"abc");
        assert_eq!(LineEnding::Lf.trim(b"abc"), b"abc");
    }

    #[test]
    fn test_cr_trim_keeps_content() {
        assert_eq!(LineEnding::Cr.trim(b"abc\n"), b"abc\n");
    }

    #[test]
    fn test_builders() {
        let config = ParserConfig::canonical()
            .with_line_ending(LineEnding::Cr)
            .with_attachments(AttachmentMode::FirstOnly);
        assert_eq!(config.line_ending, LineEnding::Cr);
        assert_eq!(config.layout, HeaderLayout::WithBcc);
        assert_eq!(config.attachments, AttachmentMode::FirstOnly);
    }
}
