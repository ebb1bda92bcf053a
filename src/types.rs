//! Core types for fgt-backup

use chrono::{DateTime, Local, TimeZone};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use crate::error::InvalidRecord;

/// One appliance from the roster
///
/// Field names follow the roster's CSV header (`name,ip_1,ip_2,apikey`).
/// An empty address means "not configured".
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceRecord {
    /// Display name, also used in artifact file names
    pub name: String,
    /// Primary management address (`host` or `host:port`)
    #[serde(rename = "ip_1", default)]
    pub primary_address: String,
    /// Secondary management address, empty when absent
    #[serde(rename = "ip_2", default)]
    pub secondary_address: String,
    /// REST API token
    #[serde(rename = "apikey", default)]
    pub api_key: String,
}

impl DeviceRecord {
    /// Create a record from its four roster fields
    pub fn new(
        name: impl Into<String>,
        primary_address: impl Into<String>,
        secondary_address: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            primary_address: primary_address.into(),
            secondary_address: secondary_address.into(),
            api_key: api_key.into(),
        }
    }

    /// Check the minimum fields needed to attempt a backup
    pub fn validate(&self) -> Result<(), InvalidRecord> {
        if self.primary_address.is_empty() && self.secondary_address.is_empty() {
            return Err(InvalidRecord::NoAddress);
        }
        if self.api_key.is_empty() {
            return Err(InvalidRecord::NoApiKey);
        }
        Ok(())
    }

    /// Configured addresses in probing order, primary first
    pub fn candidates(&self) -> Vec<&str> {
        [self.primary_address.as_str(), self.secondary_address.as_str()]
            .into_iter()
            .filter(|a| !a.is_empty())
            .collect()
    }
}

// The API key must never end up in a log line.
impl fmt::Debug for DeviceRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceRecord")
            .field("name", &self.name)
            .field("primary_address", &self.primary_address)
            .field("secondary_address", &self.secondary_address)
            .field(
                "api_key",
                &if self.api_key.is_empty() { "" } else { "<redacted>" },
            )
            .finish()
    }
}

/// Which entry point started the run
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RunKind {
    /// Whole roster, unattended
    #[default]
    Scheduled,
    /// Operator-selected devices from the interactive menu
    Manual,
}

impl RunKind {
    /// Tag used in log file and artifact names
    pub fn tag(&self) -> &'static str {
        match self {
            RunKind::Scheduled => "bkp",
            RunKind::Manual => "manual-bkp",
        }
    }
}

/// Date and timestamp captured once at run start
///
/// Every artifact of a run shares the same stamp, so one run lands in one
/// dated directory even if it crosses midnight.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunStamp {
    /// Calendar date, `YYYY-mm-dd`
    pub date: String,
    /// Local time, `YYYYmmddTHHMMSS`
    pub timestamp: String,
}

impl RunStamp {
    /// Stamp for the current local time
    pub fn now() -> Self {
        Self::from_datetime(&Local::now())
    }

    /// Stamp for an arbitrary point in time
    pub fn from_datetime<Tz: TimeZone>(at: &DateTime<Tz>) -> Self
    where
        Tz::Offset: fmt::Display,
    {
        Self {
            date: at.format("%Y-%m-%d").to_string(),
            timestamp: at.format("%Y%m%dT%H%M%S").to_string(),
        }
    }
}

/// Result of backing up one device
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BackupOutcome {
    /// Configuration saved
    Success {
        /// Address the configuration was fetched from
        address: String,
        /// Artifact written for this run
        path: PathBuf,
    },
    /// No configured address answered the probe
    Offline,
    /// Backup request failed at transport or HTTP level
    FetchError {
        /// Address the request went to
        address: String,
        /// Underlying cause
        reason: String,
    },
    /// Response body was not a configuration export
    InvalidPayload {
        /// Address the payload came from
        address: String,
    },
    /// Payload was valid but could not be persisted
    WriteError {
        /// Address the payload came from
        address: String,
        /// Underlying cause
        reason: String,
    },
    /// Roster entry lacks an address or API key; nothing was attempted
    ValidationSkipped(InvalidRecord),
}

impl BackupOutcome {
    /// Whether the device counts as backed up
    pub fn is_success(&self) -> bool {
        matches!(self, BackupOutcome::Success { .. })
    }

    /// The reachable address used for this device, if any
    pub fn address(&self) -> Option<&str> {
        match self {
            BackupOutcome::Success { address, .. }
            | BackupOutcome::FetchError { address, .. }
            | BackupOutcome::InvalidPayload { address }
            | BackupOutcome::WriteError { address, .. } => Some(address),
            BackupOutcome::Offline | BackupOutcome::ValidationSkipped(_) => None,
        }
    }
}

impl fmt::Display for BackupOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackupOutcome::Success { path, .. } => write!(f, "saved to {}", path.display()),
            BackupOutcome::Offline => write!(f, "offline on all configured addresses"),
            BackupOutcome::FetchError { reason, .. } => write!(f, "backup request failed: {reason}"),
            BackupOutcome::InvalidPayload { .. } => {
                write!(f, "response is not a configuration export")
            }
            BackupOutcome::WriteError { reason, .. } => write!(f, "could not save backup: {reason}"),
            BackupOutcome::ValidationSkipped(reason) => write!(f, "skipped: {reason}"),
        }
    }
}

/// Tally of a run, in roster order
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Devices whose configuration was saved
    pub succeeded: Vec<String>,
    /// Devices that failed for any reason
    pub failed: Vec<String>,
    /// Devices not started because the run was cancelled
    pub cancelled: Vec<String>,
}

impl RunSummary {
    /// File a finished device under success or failure
    pub fn record(&mut self, name: &str, outcome: &BackupOutcome) {
        if outcome.is_success() {
            self.succeeded.push(name.to_string());
        } else {
            self.failed.push(name.to_string());
        }
    }

    /// File a device that was never started
    pub fn record_cancelled(&mut self, name: &str) {
        self.cancelled.push(name.to_string());
    }

    /// Number of devices covered by the summary
    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len() + self.cancelled.len()
    }

    /// True when every device was backed up
    pub fn all_succeeded(&self) -> bool {
        self.failed.is_empty() && self.cancelled.is_empty()
    }
}

/// Progress notifications published while a run is in flight
#[derive(Clone, Debug)]
pub enum RunEvent {
    /// A device's backup has started
    DeviceStarted {
        /// Position in the run's device list
        index: usize,
        /// Device name
        name: String,
    },
    /// A device's backup has finished
    DeviceFinished {
        /// Position in the run's device list
        index: usize,
        /// Device name
        name: String,
        /// How it ended
        outcome: BackupOutcome,
    },
    /// All devices are done (or were cancelled)
    RunFinished {
        /// Final tally
        summary: RunSummary,
    },
}
