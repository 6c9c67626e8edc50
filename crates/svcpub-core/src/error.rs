//! Error types for the service publishing flow
//!
//! Every error here is terminal for the current run: nothing is retried
//! automatically, and the orchestrator only catches errors at the boundary
//! to report the failing stage.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for publishing operations
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type, one variant per failure domain
#[derive(Error, Debug)]
pub enum Error {
    /// A required configuration value is unset or empty
    #[error("missing configuration value: {0}")]
    MissingConfig(&'static str),

    /// A configuration value is present but not usable
    #[error("invalid configuration value for {key}: '{value}' (expected true or false)")]
    InvalidConfig {
        /// The offending key
        key: &'static str,
        /// The rejected value
        value: String,
    },

    /// Dynamic config edit failed
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Access-control update failed (after the record was created)
    #[error("access control update failed: {0}")]
    Access(ConfigError),

    /// DNS record creation failed
    #[error(transparent)]
    Dns(#[from] DnsError),

    /// Operator input was rejected
    #[error(transparent)]
    Input(#[from] InputError),

    /// Console I/O failed while prompting
    #[error("console I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from editing the reverse proxy's dynamic config file
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The dynamic config file does not exist
    #[error("dynamic config file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// The file exists but is not valid TOML (or not UTF-8)
    #[error("failed to parse dynamic config {}: {message}", path.display())]
    ParseFailure {
        /// Path of the unparseable file
        path: PathBuf,
        /// Parser diagnostic
        message: String,
    },

    /// Writing the timestamped backup failed; the mutation did not proceed
    #[error("failed to write backup {}: {source}", path.display())]
    BackupFailed {
        /// Intended backup path
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// A router or service with this name already exists (never overwritten)
    #[error("router or service '{0}' already exists in the dynamic config")]
    DuplicateService(String),

    /// Writing the updated document failed; the backup remains for recovery
    #[error("failed to write updated dynamic config {}: {source}", path.display())]
    WriteFailed {
        /// Path of the live config file
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Reading the file failed for a reason other than absence
    #[error("failed to read dynamic config {}: {source}", path.display())]
    ReadFailed {
        /// Path of the unreadable file
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

/// Errors from the DNS provider, classified once; the caller never retries
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DnsError {
    /// The provider rejected the API token
    #[error("DNS provider rejected the API token")]
    Unauthorized,

    /// A record with this name already exists at the provider
    #[error("DNS record already exists: {0}")]
    AlreadyExists(String),

    /// The provider could not be reached (network or timeout)
    #[error("DNS provider unreachable: {0}")]
    Unreachable(String),

    /// Any other non-success provider response, with the raw message
    #[error("DNS provider rejected the request (status {status}): {message}")]
    ProviderRejected {
        /// HTTP status of the response
        status: u16,
        /// Raw provider message
        message: String,
    },
}

/// Errors from validating operator input
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InputError {
    /// A required field was left empty
    #[error("{0} must not be empty")]
    Empty(&'static str),

    /// The backend address is not host:port with a numeric port
    #[error("address must look like host:port, got '{0}'")]
    MalformedAddress(String),

    /// The scheme is neither "http" nor "https"
    #[error("scheme must be 'http' or 'https', got '{0}'")]
    InvalidScheme(String),
}
