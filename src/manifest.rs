//! Configuration file parsing for hostwatch
//!
//! Parses `hostwatch.toml` configuration files using serde

use crate::error::{Error, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Load configuration from a file
///
/// Relative `hosts_file` and `log_file` paths are resolved against the
/// directory containing the config file.
pub fn load(path: &Path) -> Result<HostwatchConfig> {
    let content = fs::read_to_string(path).map_err(|e| Error::ConfigRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    let mut config: HostwatchConfig = toml::from_str(&content)?;

    if let Some(base) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        config.monitor.resolve_paths(base);
    }

    config.validate()?;

    Ok(config)
}

/// Root configuration structure
#[derive(Debug, Deserialize)]
pub struct HostwatchConfig {
    /// Polling loop settings
    #[serde(default)]
    pub monitor: MonitorConfig,

    /// Alert delivery settings
    pub mail: MailConfig,
}

impl HostwatchConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.monitor.threshold == 0 {
            return Err(Error::ConfigValidation(
                "monitor.threshold must be at least 1".into(),
            ));
        }

        if self.monitor.interval == 0 {
            return Err(Error::ConfigValidation(
                "monitor.interval must be at least 1 second".into(),
            ));
        }

        if self.monitor.probe_timeout == 0 {
            return Err(Error::ConfigValidation(
                "monitor.probe_timeout must be at least 1 second".into(),
            ));
        }

        if self.mail.sender.trim().is_empty() {
            return Err(Error::ConfigValidation("mail.sender is empty".into()));
        }

        if self.mail.recipients.is_empty() {
            return Err(Error::ConfigValidation(
                "mail.recipients must list at least one address".into(),
            ));
        }

        if self.mail.username.is_some() != self.mail.password.is_some() {
            return Err(Error::ConfigValidation(
                "mail.username and mail.password must be set together".into(),
            ));
        }

        Ok(())
    }
}

/// Polling loop configuration
#[derive(Debug, Clone, Deserialize)]
pub struct MonitorConfig {
    /// Pause between cycles in seconds
    #[serde(default = "default_interval")]
    pub interval: u64,

    /// Consecutive failures that trigger an alert
    #[serde(default = "default_threshold")]
    pub threshold: u32,

    /// Per-probe timeout in seconds
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout: u64,

    /// Ping binary used for probing
    #[serde(default = "default_ping_command")]
    pub ping_command: PathBuf,

    /// Whether probe infrastructure errors count as failures
    #[serde(default = "default_count_probe_errors")]
    pub count_probe_errors: bool,

    /// Host list file
    #[serde(default = "default_hosts_file")]
    pub hosts_file: PathBuf,

    /// Log file (appended to)
    #[serde(default = "default_log_file")]
    pub log_file: PathBuf,
}

impl MonitorConfig {
    /// Get the cycle interval as Duration
    pub fn interval_duration(&self) -> Duration {
        Duration::from_secs(self.interval)
    }

    /// Get the probe timeout as Duration
    pub fn probe_timeout_duration(&self) -> Duration {
        Duration::from_secs(self.probe_timeout)
    }

    fn resolve_paths(&mut self, base: &Path) {
        if self.hosts_file.is_relative() {
            self.hosts_file = base.join(&self.hosts_file);
        }
        if self.log_file.is_relative() {
            self.log_file = base.join(&self.log_file);
        }
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            interval: default_interval(),
            threshold: default_threshold(),
            probe_timeout: default_probe_timeout(),
            ping_command: default_ping_command(),
            count_probe_errors: default_count_probe_errors(),
            hosts_file: default_hosts_file(),
            log_file: default_log_file(),
        }
    }
}

fn default_interval() -> u64 {
    10
}

fn default_threshold() -> u32 {
    3
}

fn default_probe_timeout() -> u64 {
    1
}

fn default_ping_command() -> PathBuf {
    PathBuf::from("ping")
}

fn default_count_probe_errors() -> bool {
    true
}

fn default_hosts_file() -> PathBuf {
    PathBuf::from("ip_list.txt")
}

fn default_log_file() -> PathBuf {
    PathBuf::from("hostwatch.log")
}

/// How the relay connection is encrypted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TlsMode {
    /// STARTTLS must succeed or delivery fails
    #[default]
    Required,
    /// Upgrade with STARTTLS when the relay offers it
    Opportunistic,
}

/// Mail relay configuration
#[derive(Debug, Clone, Deserialize)]
pub struct MailConfig {
    /// Fixed sender address
    pub sender: String,

    /// Alert recipients
    #[serde(default)]
    pub recipients: Vec<String>,

    /// Relay host name or address
    #[serde(default = "default_relay")]
    pub relay: String,

    /// Relay port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Encryption mode
    #[serde(default)]
    pub tls: TlsMode,

    /// Optional SMTP username
    pub username: Option<String>,

    /// Optional SMTP password
    pub password: Option<String>,

    /// Network timeout for the relay connection in seconds
    #[serde(default = "default_mail_timeout")]
    pub timeout: u64,
}

impl MailConfig {
    /// Get the relay timeout as Duration
    pub fn timeout_duration(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }
}

fn default_relay() -> String {
    "127.0.0.1".into()
}

fn default_port() -> u16 {
    587
}

fn default_mail_timeout() -> u64 {
    30
}
