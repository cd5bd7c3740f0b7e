//! Unified error types for hostwatch

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for hostwatch operations
#[derive(Error, Debug)]
pub enum Error {
    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    // Config errors
    #[error("Failed to read config file '{path}': {source}")]
    ConfigRead { path: PathBuf, source: io::Error },

    #[error("Failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Config validation failed: {0}")]
    ConfigValidation(String),

    // Host list errors
    #[error("Failed to read host list '{path}': {source}")]
    HostListRead { path: PathBuf, source: io::Error },

    // Logging errors
    #[error("Failed to open log file '{path}': {source}")]
    LogFile { path: PathBuf, source: io::Error },

    // Probe errors
    #[error("Probe of '{address}' failed: {message}")]
    Probe { address: String, message: String },

    #[error("Host '{address}' is unreachable")]
    Unreachable { address: String },

    // Mail errors
    #[error("Invalid mail address: {0}")]
    MailAddress(#[from] lettre::address::AddressError),

    #[error("Failed to build alert message: {0}")]
    MailMessage(#[from] lettre::error::Error),

    #[error("Mail relay error: {0}")]
    MailTransport(#[from] lettre::transport::smtp::Error),
}

impl Error {
    /// Process exit code for this error
    ///
    /// - 2: configuration could not be read, parsed or validated
    /// - 3: host list could not be loaded
    /// - 4: log file could not be opened
    /// - 5: a one-off probe got no reply
    /// - 1: anything else, including a probe that could not be run
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::ConfigRead { .. }
            | Error::ConfigParse(_)
            | Error::ConfigValidation(_)
            | Error::MailAddress(_) => 2,
            Error::HostListRead { .. } => 3,
            Error::LogFile { .. } => 4,
            Error::Unreachable { .. } => 5,
            _ => 1,
        }
    }
}

/// Result type alias for hostwatch operations
pub type Result<T> = std::result::Result<T, Error>;
