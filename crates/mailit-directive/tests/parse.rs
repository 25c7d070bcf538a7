//! Property tests for directive parsing.

#![allow(clippy::unwrap_used)]

use mailit_directive::{Field, MAX_LINE_LENGTH, ParseError, parse};
use proptest::prelude::*;

fn address() -> impl Strategy<Value = String> {
    "[a-z0-9.]{1,10}@[a-z]{1,10}\\.(com|org|net)"
}

fn addresses(min: usize, max: usize) -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(address(), min..=max)
}

/// Lowercases the characters of `label` selected by the bits of `mask`.
fn recase(label: &str, mask: u64) -> String {
    label
        .chars()
        .enumerate()
        .map(|(i, c)| {
            if (mask >> (i % 64)) & 1 == 1 {
                c.to_ascii_lowercase()
            } else {
                c
            }
        })
        .collect()
}

fn directive_text(
    to: &[String],
    cc: &[String],
    bcc: &[String],
    from: &str,
    subject: &str,
    body: &str,
) -> String {
    format!(
        "TO: {}\r\nCC: {}\r\nBCC: {}\r\nFROM: {from}\r\nSUBJECT: {subject}\r\n{body}",
        to.join(";"),
        cc.join(";"),
        bcc.join(";"),
    )
}

proptest! {
    #[test]
    fn well_formed_input_round_trips(
        to in addresses(1, 5),
        cc in addresses(0, 4),
        bcc in addresses(0, 4),
        from in address(),
        subject in "[ -~]{0,60}",
        body in "[ -Z\\\\^-~\r\n]{0,300}",
    ) {
        let text = directive_text(&to, &cc, &bcc, &from, &subject, &body);
        let directive = parse(text.as_bytes()).unwrap();

        prop_assert_eq!(&directive.to, &to);
        prop_assert_eq!(&directive.cc, &cc);
        prop_assert_eq!(&directive.bcc, &bcc);
        prop_assert_eq!(&directive.sender, &from);
        prop_assert_eq!(&directive.subject, &subject);
        prop_assert_eq!(&directive.body, &body);
        prop_assert!(directive.attachments.is_empty());
    }

    #[test]
    fn labels_match_in_any_case(
        masks in prop::array::uniform5(any::<u64>()),
        to in address(),
    ) {
        let text = format!(
            "{}{to}\n{}\n{}\n{}me@example.com\n{}hello\n",
            recase("TO: ", masks[0]),
            recase("CC: ", masks[1]),
            recase("BCC: ", masks[2]),
            recase("FROM: ", masks[3]),
            recase("SUBJECT: ", masks[4]),
        );
        let directive = parse(text.as_bytes()).unwrap();
        prop_assert_eq!(directive.to, vec![to]);
        prop_assert_eq!(directive.subject, "hello");
    }

    #[test]
    fn address_list_stops_at_first_non_address(
        head in addresses(1, 4),
        garbage in "[a-z ]{1,12}",
        tail in addresses(0, 4),
    ) {
        let mut tokens = head.clone();
        tokens.push(garbage);
        tokens.extend(tail);
        let text = directive_text(&tokens, &[], &[], "me@example.com", "", "");
        let directive = parse(text.as_bytes()).unwrap();
        prop_assert_eq!(directive.to, head);
    }

    #[test]
    fn attachments_listed_in_order(
        parts in prop::collection::vec(("[a-z .,]{0,20}", "/[a-z0-9/._-]{1,40}"), 0..6),
    ) {
        let mut body = String::new();
        for (text, path) in &parts {
            body.push_str(text);
            body.push_str("AttachFile[");
            body.push_str(path);
            body.push(']');
        }
        let text = directive_text(&["a@x.com".to_string()], &[], &[], "me@x.com", "s", &body);
        let directive = parse(text.as_bytes()).unwrap();

        let expected: Vec<String> = parts.into_iter().map(|(_, path)| path).collect();
        prop_assert_eq!(directive.attachments, expected);
        prop_assert_eq!(directive.body, body);
    }

    #[test]
    fn parsing_is_deterministic(input in prop::collection::vec(any::<u8>(), 0..2048)) {
        let first = format!("{:?}", parse(&input));
        let second = format!("{:?}", parse(&input));
        prop_assert_eq!(first, second);
    }

    #[test]
    fn unterminated_marker_never_yields_attachment(path in "[a-z/]{0,80}") {
        let body = format!("text AttachFile[{path}");
        let text = directive_text(&["a@x.com".to_string()], &[], &[], "me@x.com", "s", &body);
        let directive = parse(text.as_bytes()).unwrap();
        prop_assert!(directive.attachments.is_empty());
    }
}

#[test]
fn long_to_line_is_too_long_not_eof() {
    let mut input = b"TO: ".to_vec();
    input.extend(std::iter::repeat_n(b'x', MAX_LINE_LENGTH + 1));
    input.extend_from_slice(b"@example.com\n");
    assert!(matches!(
        parse(&input),
        Err(ParseError::LineTooLong { field: Field::To, .. })
    ));
}

#[test]
fn empty_to_reports_field_name() {
    let err = parse(b"TO: nobody\nCC: \nBCC: \nFROM: me@x\nSUBJECT: \n").unwrap_err();
    assert_eq!(err.field(), Some(Field::To));
    assert_eq!(err.to_string(), "To field has no usable content");
}

#[test]
fn missing_field_message_names_label() {
    let err = parse(b"TO: a@x\nSUBJECT: hi\n").unwrap_err();
    assert_eq!(err.to_string(), "Missing \"CC: \" field");
}
