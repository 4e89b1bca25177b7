//! Configuration loading and management.

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Ban lifecycle configuration.
///
/// Every field has a default, so an empty document is a valid config.
#[derive(Debug, Clone, Deserialize)]
pub struct BanConfig {
    /// Group every registered principal belongs to; rejoined on unban.
    #[serde(default = "default_registered_group")]
    pub registered_group: String,
    /// Group rejoined on unban when `email:confirmed` is 1.
    #[serde(default = "default_verified_group")]
    pub verified_group: String,
    /// Group rejoined on unban otherwise.
    #[serde(default = "default_unverified_group")]
    pub unverified_group: String,
    /// Capability that lets a banned principal log in.
    #[serde(default = "default_login_privilege")]
    pub login_privilege: String,
    /// Group granting the login capability to individual principals.
    #[serde(default = "default_login_override_group")]
    pub login_override_group: String,
    /// Notification template used for ban notices.
    #[serde(default = "default_notification_template")]
    pub notification_template: String,
    /// Site title interpolated into the notice subject.
    #[serde(default = "default_site_title")]
    pub site_title: String,
    /// Expiry sweep configuration.
    #[serde(default)]
    pub sweep: SweepConfig,
    /// Optional SQLite storage configuration.
    pub database: Option<DatabaseConfig>,
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to SQLite database file (or `:memory:`).
    pub path: String,
}

/// Expiry sweep configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SweepConfig {
    /// Run the background sweep (default: false, expiry is lazy only).
    #[serde(default)]
    pub enabled: bool,
    /// Seconds between sweeps (default: 60).
    #[serde(default = "default_sweep_interval_secs")]
    pub interval_secs: u64,
    /// Maximum principals unbanned per sweep (default: 100).
    #[serde(default = "default_sweep_batch_size")]
    pub batch_size: usize,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_secs: default_sweep_interval_secs(),
            batch_size: default_sweep_batch_size(),
        }
    }
}

impl SweepConfig {
    /// Interval between sweeps, never shorter than one second.
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(1))
    }
}

impl Default for BanConfig {
    fn default() -> Self {
        Self {
            registered_group: default_registered_group(),
            verified_group: default_verified_group(),
            unverified_group: default_unverified_group(),
            login_privilege: default_login_privilege(),
            login_override_group: default_login_override_group(),
            notification_template: default_notification_template(),
            site_title: default_site_title(),
            sweep: SweepConfig::default(),
            database: None,
        }
    }
}

impl BanConfig {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: BanConfig = toml::from_str(content)?;
        Ok(config)
    }
}

// =============================================================================
// Defaults
// =============================================================================

fn default_registered_group() -> String {
    "registered-users".to_string()
}

fn default_verified_group() -> String {
    "verified-users".to_string()
}

fn default_unverified_group() -> String {
    "unverified-users".to_string()
}

fn default_login_privilege() -> String {
    "local:login".to_string()
}

fn default_login_override_group() -> String {
    "cid:0:privileges:local:login".to_string()
}

fn default_notification_template() -> String {
    "banned".to_string()
}

fn default_site_title() -> String {
    "Community".to_string()
}

fn default_sweep_interval_secs() -> u64 {
    60
}

fn default_sweep_batch_size() -> usize {
    100
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = BanConfig::from_toml_str("").unwrap();
        assert_eq!(config.registered_group, "registered-users");
        assert_eq!(config.verified_group, "verified-users");
        assert_eq!(config.unverified_group, "unverified-users");
        assert_eq!(config.login_privilege, "local:login");
        assert_eq!(config.login_override_group, "cid:0:privileges:local:login");
        assert_eq!(config.notification_template, "banned");
        assert!(!config.sweep.enabled);
        assert_eq!(config.sweep.batch_size, 100);
        assert!(config.database.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = BanConfig::from_toml_str(
            r#"
            site_title = "Straylight"
            verified_group = "confirmed"

            [sweep]
            enabled = true
            interval_secs = 0

            [database]
            path = "data/bans.db"
            "#,
        )
        .unwrap();
        assert_eq!(config.site_title, "Straylight");
        assert_eq!(config.verified_group, "confirmed");
        assert!(config.sweep.enabled);
        assert_eq!(config.sweep.interval(), Duration::from_secs(1));
        assert_eq!(config.database.unwrap().path, "data/bans.db");
    }

    #[test]
    fn test_example_config_parses() {
        let config = BanConfig::from_toml_str(include_str!("../userbans.example.toml")).unwrap();
        assert_eq!(config.site_title, "Community");
        assert_eq!(config.sweep.interval(), Duration::from_secs(60));
        assert_eq!(config.database.unwrap().path, "data/userbans.db");
    }

    #[test]
    fn test_parse_error() {
        let err = BanConfig::from_toml_str("sweep = 3").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_load_missing_file() {
        let err = BanConfig::load("/nonexistent/bans.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
