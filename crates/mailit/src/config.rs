//! Settings file handling.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use mailit_directive::ParserConfig;
use mailit_transport::{AddressBook, SmtpSettings};
use serde::{Deserialize, Serialize};

/// Contents of `config.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Relay used for delivery.
    pub smtp: SmtpSettings,
    /// Directive dialect.
    pub format: ParserConfig,
    /// Alias to mailbox text, e.g. `"jane": "Jane Doe <jane@example.com>"`.
    pub contacts: BTreeMap<String, String>,
}

impl Config {
    /// Builds the address book from `contacts`.
    pub fn address_book(&self) -> Result<AddressBook> {
        AddressBook::from_entries(&self.contacts).context("Invalid entry in contacts")
    }
}

/// Default location: `<config_dir>/mailit/config.json`.
pub fn default_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("mailit")
        .join("config.json")
}

/// Loads the configuration.
///
/// A missing file is only an error when the path was given explicitly.
pub async fn load(explicit: Option<&Path>) -> Result<Config> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => {
            let path = default_path();
            if !path.exists() {
                tracing::debug!(?path, "no config file, using defaults");
                return Ok(Config::default());
            }
            path
        }
    };

    let contents = tokio::fs::read_to_string(&path)
        .await
        .with_context(|| format!("Cannot read config {}", path.display()))?;

    serde_json::from_str(&contents)
        .with_context(|| format!("Invalid config {}", path.display()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use mailit_directive::LineEnding;
    use mailit_transport::Security;

    #[test]
    fn test_partial_config() {
        let config: Config = serde_json::from_str(
            r#"{
                "smtp": {"host": "smtp.example.com", "security": "starttls"},
                "format": {"line_ending": "cr"},
                "contacts": {"jane": "Jane <jane@example.com>"}
            }"#,
        )
        .unwrap();

        assert_eq!(config.smtp.security, Security::StartTls);
        assert_eq!(config.smtp.port(), 587);
        assert_eq!(config.format.line_ending, LineEnding::Cr);
        assert_eq!(config.format.layout, ParserConfig::default().layout);

        let book = config.address_book().unwrap();
        assert_eq!(book.get("JANE").unwrap().address.as_str(), "jane@example.com");
    }

    #[test]
    fn test_empty_config() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_bad_contact() {
        let mut config = Config::default();
        config.contacts.insert("x".into(), "not an address".into());
        assert!(config.address_book().is_err());
    }

    #[tokio::test]
    async fn test_missing_explicit_file() {
        let err = load(Some(Path::new("/nonexistent/mailit.json")))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("/nonexistent/mailit.json"));
    }
}
