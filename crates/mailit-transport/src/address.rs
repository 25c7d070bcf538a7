//! Mailbox types and address resolution.

use std::collections::HashMap;
use std::fmt;

use crate::error::{Error, Result};

/// Validated email address.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Address(String);

impl Address {
    /// Creates a new address from a string.
    ///
    /// # Errors
    ///
    /// Returns an error if the address is invalid.
    pub fn new(addr: impl Into<String>) -> Result<Self> {
        let addr = addr.into();
        Self::validate(&addr)?;
        Ok(Self(addr))
    }

    /// Returns the address as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn validate(addr: &str) -> Result<()> {
        let Some((local, domain)) = addr.split_once('@') else {
            return Err(Error::InvalidAddress(format!("{addr:?} must contain @")));
        };

        if local.is_empty() || domain.is_empty() {
            return Err(Error::InvalidAddress(format!(
                "{addr:?} has an empty local or domain part"
            )));
        }

        if domain.contains('@') {
            return Err(Error::InvalidAddress(format!(
                "{addr:?} must have exactly one @"
            )));
        }

        if addr
            .chars()
            .any(|c| c.is_whitespace() || c.is_control() || matches!(c, '<' | '>'))
        {
            return Err(Error::InvalidAddress(format!(
                "{addr:?} contains forbidden characters"
            )));
        }

        Ok(())
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Mailbox (optional display name + address).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mailbox {
    /// Display name (optional).
    pub name: Option<String>,
    /// Email address.
    pub address: Address,
}

impl Mailbox {
    /// Creates a new mailbox with just an address.
    ///
    /// # Errors
    ///
    /// Returns an error if the address is invalid.
    pub fn new(address: impl Into<String>) -> Result<Self> {
        Ok(Self {
            name: None,
            address: Address::new(address)?,
        })
    }

    /// Creates a new mailbox with a display name and address.
    ///
    /// # Errors
    ///
    /// Returns an error if the address is invalid.
    pub fn with_name(name: impl Into<String>, address: impl Into<String>) -> Result<Self> {
        Ok(Self {
            name: Some(name.into()),
            address: Address::new(address)?,
        })
    }

    /// Parses `user@host` or `Display Name <user@host>`.
    ///
    /// Surrounding whitespace and quotes around the display name are removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not a mailbox.
    pub fn parse(text: &str) -> Result<Self> {
        let text = text.trim();

        let Some(open) = text.find('<') else {
            return Self::new(text);
        };

        let Some(inner) = text[open + 1..].strip_suffix('>') else {
            return Err(Error::InvalidAddress(format!("{text:?} has an unclosed <")));
        };

        let name = text[..open].trim().trim_matches('"').trim();
        let address = Address::new(inner.trim())?;

        Ok(Self {
            name: (!name.is_empty()).then(|| name.to_string()),
            address,
        })
    }
}

impl fmt::Display for Mailbox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => {
                let escaped = name.replace('\\', "\\\\").replace('"', "\\\"");
                write!(f, "\"{escaped}\" <{}>", self.address)
            }
            None => write!(f, "{}", self.address),
        }
    }
}

/// Maps the address text found in a directive to a mailbox.
pub trait AddressResolver {
    /// Resolves `query` to a mailbox.
    ///
    /// # Errors
    ///
    /// Returns an error if the query names no known or valid mailbox.
    fn resolve(&self, query: &str) -> Result<Mailbox>;
}

/// Resolver accepting only literal mailbox syntax.
#[derive(Debug, Clone, Copy, Default)]
pub struct LiteralResolver;

impl AddressResolver for LiteralResolver {
    fn resolve(&self, query: &str) -> Result<Mailbox> {
        Mailbox::parse(query)
    }
}

/// Alias table consulted before literal mailbox syntax.
///
/// Aliases are matched without regard to case.
#[derive(Debug, Clone, Default)]
pub struct AddressBook {
    entries: HashMap<String, Mailbox>,
}

impl AddressBook {
    /// Creates an empty address book.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds an address book from `(alias, mailbox)` text pairs.
    ///
    /// # Errors
    ///
    /// Returns an error if any mailbox text is invalid.
    pub fn from_entries<I, K, V>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut book = Self::new();
        for (alias, mailbox) in entries {
            book.insert(alias.as_ref(), Mailbox::parse(mailbox.as_ref())?);
        }
        Ok(book)
    }

    /// Adds or replaces an alias.
    pub fn insert(&mut self, alias: &str, mailbox: Mailbox) {
        self.entries.insert(alias.trim().to_lowercase(), mailbox);
    }

    /// Looks up an alias.
    #[must_use]
    pub fn get(&self, alias: &str) -> Option<&Mailbox> {
        self.entries.get(&alias.trim().to_lowercase())
    }

    /// Returns the number of aliases.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if there are no aliases.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl AddressResolver for AddressBook {
    fn resolve(&self, query: &str) -> Result<Mailbox> {
        match self.get(query) {
            Some(mailbox) => Ok(mailbox.clone()),
            None => Mailbox::parse(query),
        }
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
    fn test_valid_address() {
        let addr = Address::new("user@example.com").unwrap();
        assert_eq!(addr.as_str(), "user@example.com");
        assert_eq!(addr.to_string(), "user@example.com");
    }

    #[test]
    fn test_invalid_address_no_at() {
        assert!(Address::new("userexample.com").is_err());
    }

    #[test]
    fn test_invalid_address_empty() {
        assert!(Address::new("").is_err());
    }

    #[test]
    fn test_invalid_address_empty_parts() {
        assert!(Address::new("@example.com").is_err());
        assert!(Address::new("user@").is_err());
    }

    #[test]
    fn test_invalid_address_two_ats() {
        assert!(Address::new("a@b@c").is_err());
    }

    #[test]
    fn test_invalid_address_whitespace() {
        assert!(Address::new("a b@c").is_err());
    }

    #[test]
    fn test_mailbox_parse_bare() {
        let mailbox = Mailbox::parse("  user@example.com ").unwrap();
        assert_eq!(mailbox.address.as_str(), "user@example.com");
        assert!(mailbox.name.is_none());
    }

    #[test]
    fn test_mailbox_parse_named() {
        let mailbox = Mailbox::parse("\"Jane Doe\" <jane@example.com>").unwrap();
        assert_eq!(mailbox.name.as_deref(), Some("Jane Doe"));
        assert_eq!(mailbox.address.as_str(), "jane@example.com");
    }

    #[test]
    fn test_mailbox_parse_angle_only() {
        let mailbox = Mailbox::parse("<jane@example.com>").unwrap();
        assert!(mailbox.name.is_none());
    }

    #[test]
    fn test_mailbox_parse_unclosed() {
        assert!(Mailbox::parse("Jane <jane@example.com").is_err());
    }

    #[test]
    fn test_mailbox_display() {
        let mailbox = Mailbox::with_name("Jane \"JD\" Doe", "jane@example.com").unwrap();
        assert_eq!(
            mailbox.to_string(),
            "\"Jane \\\"JD\\\" Doe\" <jane@example.com>"
        );
        let bare = Mailbox::new("a@b.c").unwrap();
        assert_eq!(bare.to_string(), "a@b.c");
    }

    #[test]
    fn test_literal_resolver() {
        assert!(LiteralResolver.resolve("a@b.c").is_ok());
        assert!(LiteralResolver.resolve("Jane").is_err());
    }

    #[test]
    fn test_address_book_alias() {
        let book = AddressBook::from_entries([("Jane", "Jane Doe <jane@example.com>")]).unwrap();
        let mailbox = book.resolve(" jane ").unwrap();
        assert_eq!(mailbox.address.as_str(), "jane@example.com");
        assert_eq!(book.len(), 1);
    }

    #[test]
    fn test_address_book_falls_back_to_literal() {
        let book = AddressBook::new();
        assert!(book.is_empty());
        assert!(book.resolve("bob@example.com").is_ok());
        assert!(book.resolve("bob").is_err());
    }

    #[test]
    fn test_address_book_rejects_bad_entry() {
        assert!(AddressBook::from_entries([("x", "not-an-address")]).is_err());
    }
}
