//! Server capabilities advertised in the EHLO reply.

/// Extensions relevant to sending a directive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct Capabilities {
    /// Server hostname from the first EHLO line.
    pub hostname: String,
    /// STARTTLS offered.
    pub starttls: bool,
    /// AUTH PLAIN offered.
    pub auth_plain: bool,
    /// 8BITMIME offered.
    pub eight_bit_mime: bool,
    /// SMTPUTF8 offered.
    pub smtp_utf8: bool,
    /// Maximum message size, if the server announced a non-zero one.
    pub max_size: Option<usize>,
}

impl Capabilities {
    /// Builds capabilities from the text lines of an EHLO reply.
    #[must_use]
    pub fn from_ehlo(lines: &[String]) -> Self {
        let mut caps = Self {
            hostname: lines
                .first()
                .and_then(|greeting| greeting.split_whitespace().next())
                .unwrap_or("unknown")
                .to_string(),
            ..Self::default()
        };

        for line in lines.iter().skip(1) {
            let mut words = line.split_whitespace();
            let Some(keyword) = words.next() else {
                continue;
            };

            match keyword.to_ascii_uppercase().as_str() {
                "STARTTLS" => caps.starttls = true,
                "8BITMIME" => caps.eight_bit_mime = true,
                "SMTPUTF8" => caps.smtp_utf8 = true,
                "AUTH" => {
                    caps.auth_plain |= words.any(|m| m.eq_ignore_ascii_case("PLAIN"));
                }
                "SIZE" => {
                    caps.max_size = words
                        .next()
                        .and_then(|s| s.parse().ok())
                        .filter(|&size| size > 0);
                }
                _ => {}
            }
        }

        caps
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn ehlo(raw: &[&str]) -> Capabilities {
        let lines: Vec<String> = raw.iter().map(ToString::to_string).collect();
        Capabilities::from_ehlo(&lines)
    }

    #[test]
    fn test_full_ehlo() {
        let caps = ehlo(&[
            "mx.example.com Hello",
            "SIZE 52428800",
            "8BITMIME",
            "starttls",
            "AUTH LOGIN PLAIN",
            "PIPELINING",
        ]);
        assert_eq!(caps.hostname, "mx.example.com");
        assert!(caps.starttls);
        assert!(caps.auth_plain);
        assert!(caps.eight_bit_mime);
        assert!(!caps.smtp_utf8);
        assert_eq!(caps.max_size, Some(52_428_800));
    }

    #[test]
    fn test_size_zero_means_unlimited() {
        assert_eq!(ehlo(&["mx", "SIZE 0"]).max_size, None);
        assert_eq!(ehlo(&["mx", "SIZE"]).max_size, None);
    }

    #[test]
    fn test_auth_without_plain() {
        assert!(!ehlo(&["mx", "AUTH XOAUTH2"]).auth_plain);
    }

    #[test]
    fn test_empty_reply() {
        assert_eq!(ehlo(&[]).hostname, "unknown");
    }
}
