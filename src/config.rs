//! Configuration file handling.
//!
//! This module handles loading, validating and merging configuration from
//! an `experiment-server.toml` file.

use crate::aggregation::DEFAULT_TICK_INTERVAL;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default configuration file name.
pub const DEFAULT_CONFIG_FILE: &str = "experiment-server.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Report schedule settings.
    #[serde(default)]
    pub report: ReportConfig,

    /// Mail transport settings.
    #[serde(default)]
    pub mail: MailConfig,
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
        }
    }
}

fn default_port() -> u16 {
    8080
}

/// Report schedule settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Hours of the day (0-23) during which a report is sent.
    #[serde(default = "default_hours")]
    pub hours: Vec<u32>,

    /// How often the schedule is checked, in milliseconds.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            hours: default_hours(),
            tick_interval_ms: default_tick_interval_ms(),
        }
    }
}

impl ReportConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

fn default_hours() -> Vec<u32> {
    vec![9, 17]
}

fn default_tick_interval_ms() -> u64 {
    DEFAULT_TICK_INTERVAL.as_millis() as u64
}

/// SMTP credentials and addressing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailConfig {
    /// From address.
    #[serde(default)]
    pub sender: String,

    /// Report recipients.
    #[serde(default)]
    pub to: Vec<String>,

    #[serde(default)]
    pub smtp_host: String,

    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,

    #[serde(default)]
    pub smtp_user: String,

    #[serde(default)]
    pub smtp_passphrase: String,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            sender: "experiment-server@example.org".to_string(),
            to: vec!["operators@example.org".to_string()],
            smtp_host: "smtp.example.org".to_string(),
            smtp_port: default_smtp_port(),
            smtp_user: "experiment-server@example.org".to_string(),
            smtp_passphrase: String::new(),
        }
    }
}

fn default_smtp_port() -> u16 {
    587
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).with_context(|| {
            format!(
                "Failed to open config, does the config file ({}) exist?",
                path.display()
            )
        })?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Check values that serde cannot.
    pub fn validate(&self) -> Result<()> {
        if let Some(hour) = self.report.hours.iter().find(|h| **h > 23) {
            bail!("Report hour {} is out of range (0-23)", hour);
        }

        if self.report.tick_interval_ms == 0 {
            bail!("report.tick_interval_ms must be at least 1");
        }

        if self.server.port == 0 {
            bail!("server.port must be non-zero");
        }

        if self.mail.sender.trim().is_empty() {
            bail!("mail.sender is required");
        }

        if self.mail.to.is_empty() {
            bail!("mail.to needs at least one recipient");
        }

        if self.mail.smtp_host.trim().is_empty() {
            bail!("mail.smtp_host is required");
        }

        Ok(())
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(port) = args.port {
            self.server.port = port;
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.report.hours, vec![9, 17]);
        assert_eq!(config.report.tick_interval(), Duration::from_millis(500));
        assert_eq!(config.mail.smtp_port, 587);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[server]
port = 9000

[report]
hours = [8, 12, 20]

[mail]
sender = "server@lab.example"
to = ["a@lab.example", "b@lab.example"]
smtp_host = "mail.lab.example"
smtp_port = 465
smtp_user = "server"
smtp_passphrase = "hunter2"
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.report.hours, vec![8, 12, 20]);
        assert_eq!(config.report.tick_interval_ms, 500);
        assert_eq!(config.mail.to.len(), 2);
        assert_eq!(config.mail.smtp_port, 465);
        assert_eq!(config.mail.smtp_passphrase, "hunter2");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_hour() {
        let mut config = Config::default();
        config.report.hours = vec![9, 24];
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("24"));
    }

    #[test]
    fn test_validate_rejects_missing_mail_settings() {
        let mut config = Config::default();
        config.mail.to.clear();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.mail.smtp_host = " ".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.report.tick_interval_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[report]\nhours = [7]").unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.report.hours, vec![7]);
        assert_eq!(config.server.port, 8080);
    }

    #[test]
    fn test_load_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load(&dir.path().join("absent.toml")).unwrap_err();
        assert!(err.to_string().contains("absent.toml"));
    }

    #[test]
    fn test_load_malformed_file_fails() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[report]\nhours = \"nine\"").unwrap();

        assert!(Config::load(file.path()).is_err());
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(toml_str.contains("[server]"));
        assert!(toml_str.contains("[report]"));
        assert!(toml_str.contains("[mail]"));

        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.report.hours, vec![9, 17]);
    }
}
