//! Error types for fgt-backup
//!
//! Errors come in two tiers:
//! - Fatal run errors ([`Error`], [`RosterError`]) abort the whole run before
//!   any device is touched.
//! - Per-device errors ([`InvalidRecord`], [`FetchError`], [`WriteError`]) are
//!   folded into a [`BackupOutcome`](crate::types::BackupOutcome) at the
//!   device boundary and never escape a single device's run.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for fgt-backup operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for fgt-backup
///
/// Only conditions that stop the entire run end up here.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "probe_timeout")
        key: Option<String>,
    },

    /// The device roster could not be loaded
    #[error("roster error: {0}")]
    Roster(#[from] RosterError),

    /// A backup or log directory could not be created
    #[error("failed to provision directory {path}: {source}")]
    Provision {
        /// Directory that could not be created
        path: PathBuf,
        /// Underlying I/O failure
        #[source]
        source: std::io::Error,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error (config file)
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP client could not be built
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Process exit code for a run aborted by this error
    pub fn exit_code(&self) -> u8 {
        match self {
            Error::Roster(_) => 2,
            Error::Provision { .. } => 3,
            Error::Config { .. } | Error::Serialization(_) => 4,
            Error::Io(_) | Error::Http(_) | Error::Other(_) => 1,
        }
    }
}

/// Roster loading errors. All of them are fatal for the run.
#[derive(Debug, Error)]
pub enum RosterError {
    /// Roster file does not exist
    #[error("roster file {0} not found")]
    NotFound(PathBuf),

    /// Roster file exists but could not be read
    #[error("failed to read roster file {path}: {reason}")]
    Read {
        /// Roster file path
        path: PathBuf,
        /// Reason reported by the reader
        reason: String,
    },

    /// A required column is absent from the header row
    #[error("roster is missing required column '{0}'")]
    MissingColumn(&'static str),

    /// A data row could not be decoded
    #[error("malformed roster row at line {line}: {reason}")]
    Malformed {
        /// 1-based line number in the source file
        line: u64,
        /// What was wrong with the row
        reason: String,
    },

    /// Roster has a header but no devices
    #[error("roster contains no devices")]
    Empty,
}

/// Why a roster entry cannot be processed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum InvalidRecord {
    /// Both `ip_1` and `ip_2` are empty
    #[error("no IP address configured")]
    NoAddress,

    /// `apikey` is empty
    #[error("no API key configured")]
    NoApiKey,
}

/// Backup request failure (transport or HTTP level)
#[derive(Debug, Error)]
pub enum FetchError {
    /// Request could not be sent or the body could not be read
    #[error("request to {url} failed: {reason}")]
    Transport {
        /// Requested URL
        url: String,
        /// Underlying cause
        reason: String,
    },

    /// No complete response within the configured fetch timeout
    #[error("request to {url} timed out after {secs}s")]
    Timeout {
        /// Requested URL
        url: String,
        /// Timeout that elapsed, in seconds
        secs: u64,
    },

    /// Appliance answered with a non-2xx status
    #[error("request to {url} returned status {status}: {body}")]
    Status {
        /// Requested URL
        url: String,
        /// HTTP status code
        status: u16,
        /// Beginning of the response body
        body: String,
    },

    /// Address does not form a valid URL
    #[error("invalid backup URL for address '{address}': {reason}")]
    InvalidUrl {
        /// Offending address
        address: String,
        /// Parser message
        reason: String,
    },
}

/// Artifact persistence failure
#[derive(Debug, Error)]
pub enum WriteError {
    /// Directory creation, write or rename failed
    #[error("failed to write {path}: {source}")]
    Io {
        /// Path being written
        path: PathBuf,
        /// Underlying I/O failure
        #[source]
        source: std::io::Error,
    },
}
