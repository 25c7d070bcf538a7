//! Attachment marker scanning.
//!
//! A body references files with `AttachFile[path]` markers placed anywhere in
//! the text. The markers stay in the body; this module only lists the paths.

use crate::config::AttachmentMode;

/// Literal prefix introducing an attachment marker.
pub const ATTACHMENT_MARKER: &str = "AttachFile[";

/// Maximum attachment path length in characters. Longer paths are cut.
pub const MAX_PATH_LENGTH: usize = 260;

/// Lists the attachment paths referenced in `body`.
///
/// Each marker contributes the text between its `[` and the next `]`.
/// Markers without a closing bracket, or with nothing inside, are skipped.
/// Scanning always resumes right after the marker's `[`, so malformed
/// markers cannot stall it.
#[must_use]
pub fn scan_attachments(body: &str, mode: AttachmentMode) -> Vec<String> {
    let mut paths = Vec::new();
    let mut rest = body;

    while let Some(start) = rest.find(ATTACHMENT_MARKER) {
        rest = &rest[start + ATTACHMENT_MARKER.len()..];

        let Some(end) = rest.find(']') else {
            continue;
        };
        if end == 0 {
            continue;
        }

        paths.push(rest[..end].chars().take(MAX_PATH_LENGTH).collect());
        if mode == AttachmentMode::FirstOnly {
            break;
        }
    }

    paths
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
    fn test_no_markers() {
        assert!(scan_attachments("plain text", AttachmentMode::All).is_empty());
    }

    #[test]
    fn test_all_markers() {
        let body = "see AttachFile[/tmp/a.txt] and AttachFile[/tmp/b.txt]";
        assert_eq!(
            scan_attachments(body, AttachmentMode::All),
            vec!["/tmp/a.txt", "/tmp/b.txt"]
        );
    }

    #[test]
    fn test_first_only() {
        let body = "see AttachFile[/tmp/a.txt] and AttachFile[/tmp/b.txt]";
        assert_eq!(
            scan_attachments(body, AttachmentMode::FirstOnly),
            vec!["/tmp/a.txt"]
        );
    }

    #[test]
    fn test_first_only_skips_empty_marker() {
        let body = "AttachFile[] AttachFile[/tmp/b.txt]";
        assert_eq!(
            scan_attachments(body, AttachmentMode::FirstOnly),
            vec!["/tmp/b.txt"]
        );
    }

    #[test]
    fn test_unterminated_marker() {
        assert!(scan_attachments("AttachFile[/tmp/no-close", AttachmentMode::All).is_empty());
    }

    #[test]
    fn test_marker_at_end_of_body() {
        assert!(scan_attachments("text AttachFile[", AttachmentMode::All).is_empty());
    }

    #[test]
    fn test_empty_marker() {
        assert!(scan_attachments("AttachFile[]", AttachmentMode::All).is_empty());
    }

    #[test]
    fn test_marker_is_case_sensitive() {
        assert!(scan_attachments("attachfile[/tmp/a]", AttachmentMode::All).is_empty());
    }

    #[test]
    fn test_path_spans_lines() {
        let body = "AttachFile[/tmp/a\nb.txt]";
        assert_eq!(
            scan_attachments(body, AttachmentMode::All),
            vec!["/tmp/a\nb.txt"]
        );
    }

    #[test]
    fn test_nested_marker_is_scanned_again() {
        let body = "AttachFile[x AttachFile[y]";
        assert_eq!(
            scan_attachments(body, AttachmentMode::All),
            vec!["x AttachFile[y", "y"]
        );
    }

    #[test]
    fn test_long_path_truncated() {
        let path = "p".repeat(MAX_PATH_LENGTH + 40);
        let body = format!("AttachFile[{path}]");
        let found = scan_attachments(&body, AttachmentMode::All);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].len(), MAX_PATH_LENGTH);
    }

    #[test]
    fn test_truncation_respects_char_boundary() {
        let path = "é".repeat(MAX_PATH_LENGTH + 1);
        let body = format!("AttachFile[{path}]");
        let found = scan_attachments(&body, AttachmentMode::All);
        assert_eq!(found[0].chars().count(), MAX_PATH_LENGTH);
    }
}
