//! Run configuration
//!
//! Built once by the CLI from flags and environment, validated, then passed
//! explicitly into the services and clients. Nothing in the core reads
//! process state ambiently, which keeps a run deterministic and testable.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::adapters::raiffeisen::DEFAULT_BASE_URL;
use crate::domain::result::{Error, Result};

/// SMTP relay settings
#[derive(Debug, Clone)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub use_tls: bool,
}

/// Immutable configuration for one export run
#[derive(Debug, Clone)]
pub struct Config {
    /// Portal username
    pub username: String,
    /// Pre-hashed portal password (the portal never sees plaintext)
    pub password_hash: String,
    /// Portal base URL; overridable for testing
    pub base_url: String,
    /// Window start offset: start = today - max_age_days
    pub max_age_days: i64,
    /// Window end offset: end = today - min_age_days
    pub min_age_days: i64,
    /// Export only transactions not yet present in the store
    pub only_new: bool,
    /// Store database file (only opened when only_new is set)
    pub db_file: PathBuf,
    /// Store table name
    pub table_name: String,
    /// Keep the per-account CSV files after the run
    pub save_to_csv: bool,
    /// Directory CSV files are written into
    pub csv_dir: PathBuf,
    /// Recipient email per account id ("number-currency")
    pub recipients: HashMap<String, String>,
    pub smtp: Option<SmtpSettings>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            username: String::new(),
            password_hash: String::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            max_age_days: 1,
            min_age_days: 0,
            only_new: false,
            db_file: PathBuf::from("turnover.duckdb"),
            table_name: "transactions".to_string(),
            save_to_csv: false,
            csv_dir: PathBuf::from("."),
            recipients: HashMap::new(),
            smtp: None,
        }
    }
}

impl Config {
    /// Check cross-field requirements; violations are fatal for the run
    pub fn validate(&self) -> Result<()> {
        if self.username.is_empty() {
            return Err(Error::config("username is required"));
        }
        if self.password_hash.is_empty() {
            return Err(Error::config("password hash is required"));
        }
        if self.max_age_days < self.min_age_days {
            return Err(Error::config(format!(
                "max age ({}) must not be below min age ({})",
                self.max_age_days, self.min_age_days
            )));
        }
        if !self.recipients.is_empty() && self.smtp.is_none() {
            return Err(Error::config(
                "email recipients are configured but SMTP settings are missing",
            ));
        }
        if self.recipients.is_empty() && !self.save_to_csv {
            return Err(Error::config(
                "nothing to do: enable save-to-CSV or configure email recipients",
            ));
        }
        Ok(())
    }
}

/// Parse one `account-id:email` recipient mapping
pub fn parse_recipient(raw: &str) -> Result<(String, String)> {
    let (account, email) = raw
        .split_once(':')
        .ok_or_else(|| Error::config(format!("recipient {raw:?} is not account:email")))?;
    let account = account.trim();
    let email = email.trim();
    if account.is_empty() || email.is_empty() {
        return Err(Error::config(format!(
            "recipient {raw:?} has an empty account or address"
        )));
    }
    Ok((account.to_string(), email.to_string()))
}

/// Load recipient mappings from a file, one `account-id:email` per line
///
/// Blank lines and `#` comments are skipped.
pub fn load_recipient_file(path: &Path) -> Result<HashMap<String, String>> {
    let content = std::fs::read_to_string(path)?;
    let mut recipients = HashMap::new();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let (account, email) = parse_recipient(line)?;
        recipients.insert(account, email);
    }
    Ok(recipients)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> Config {
        Config {
            username: "user".to_string(),
            password_hash: "deadbeef".to_string(),
            save_to_csv: true,
            ..Config::default()
        }
    }

    #[test]
    fn test_valid_config_passes() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn test_missing_credentials_rejected() {
        let mut config = valid_config();
        config.username.clear();
        assert!(config.validate().is_err());

        let mut config = valid_config();
        config.password_hash.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_recipient_without_smtp_rejected() {
        let mut config = valid_config();
        config
            .recipients
            .insert("123-RSD".to_string(), "a@example.com".to_string());
        assert!(config.validate().is_err());

        config.smtp = Some(SmtpSettings {
            host: "smtp.example.com".to_string(),
            port: 587,
            username: "mail".to_string(),
            password: "secret".to_string(),
            use_tls: true,
        });
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_no_sink_rejected() {
        let mut config = valid_config();
        config.save_to_csv = false;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_inverted_window_rejected() {
        let mut config = valid_config();
        config.max_age_days = 0;
        config.min_age_days = 3;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_recipient() {
        let (account, email) = parse_recipient("123-RSD:me@example.com").unwrap();
        assert_eq!(account, "123-RSD");
        assert_eq!(email, "me@example.com");

        assert!(parse_recipient("no-separator").is_err());
        assert!(parse_recipient(":me@example.com").is_err());
        assert!(parse_recipient("123-RSD:").is_err());
    }
}
