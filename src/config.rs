//! Configuration types for fgt-backup

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{path::Path, path::PathBuf, time::Duration};

/// HTTP method used against the backup endpoint
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackupMethod {
    /// `GET` (FortiOS 7.x style)
    Get,
    /// `POST` (accepted by every FortiOS release the tool targets)
    #[default]
    Post,
}

/// Main configuration for a backup run
///
/// Every field has a default, so an empty JSON object is a valid config file.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// CSV roster with `name,ip_1,ip_2,apikey` columns (default: "fortigates.csv")
    #[serde(default = "default_roster_path")]
    pub roster_path: PathBuf,

    /// Root of the dated backup tree (default: "./backups")
    #[serde(default = "default_backup_root")]
    pub backup_root: PathBuf,

    /// Directory for run logs (default: "./logs")
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,

    /// Reachability probe timeout per address (default: 3 seconds)
    #[serde(with = "duration_serde", default = "default_probe_timeout")]
    pub probe_timeout: Duration,

    /// Backup request timeout (default: 60 seconds)
    #[serde(with = "duration_serde", default = "default_fetch_timeout")]
    pub fetch_timeout: Duration,

    /// Skip TLS certificate verification (default: false)
    ///
    /// Appliances usually present self-signed certificates, so most fleets
    /// need this turned on explicitly.
    #[serde(default)]
    pub accept_invalid_certs: bool,

    /// URL scheme used to reach appliances (default: "https")
    #[serde(default = "default_scheme")]
    pub scheme: String,

    /// Path and query of the backup endpoint
    #[serde(default = "default_backup_path")]
    pub backup_path: String,

    /// HTTP method for the backup request
    #[serde(default)]
    pub backup_method: BackupMethod,

    /// Number of devices backed up at the same time (default: 1, sequential)
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            roster_path: default_roster_path(),
            backup_root: default_backup_root(),
            log_dir: default_log_dir(),
            probe_timeout: default_probe_timeout(),
            fetch_timeout: default_fetch_timeout(),
            accept_invalid_certs: false,
            scheme: default_scheme(),
            backup_path: default_backup_path(),
            backup_method: BackupMethod::default(),
            concurrency: default_concurrency(),
        }
    }
}

impl Config {
    /// Load a configuration file (JSON)
    pub async fn load(path: &Path) -> Result<Self> {
        let raw = tokio::fs::read_to_string(path).await?;
        let config: Config = serde_json::from_str(&raw)?;
        tracing::debug!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    /// Reject settings that would make a run hang or never start
    pub fn validate(&self) -> Result<()> {
        if self.probe_timeout.is_zero() {
            return Err(config_error("probe timeout must be positive", "probe_timeout"));
        }
        if self.fetch_timeout.is_zero() {
            return Err(config_error("fetch timeout must be positive", "fetch_timeout"));
        }
        if self.concurrency == 0 {
            return Err(config_error("concurrency must be at least 1", "concurrency"));
        }
        if self.scheme.trim().is_empty() {
            return Err(config_error("scheme must not be empty", "scheme"));
        }
        if !self.backup_path.starts_with('/') {
            return Err(config_error(
                "backup path must start with '/'",
                "backup_path",
            ));
        }
        Ok(())
    }
}

fn config_error(message: &str, key: &str) -> Error {
    Error::Config {
        message: message.to_string(),
        key: Some(key.to_string()),
    }
}

fn default_roster_path() -> PathBuf {
    PathBuf::from("fortigates.csv")
}

fn default_backup_root() -> PathBuf {
    PathBuf::from("backups")
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("logs")
}

fn default_probe_timeout() -> Duration {
    Duration::from_secs(3)
}

fn default_fetch_timeout() -> Duration {
    Duration::from_secs(60)
}

fn default_scheme() -> String {
    "https".to_string()
}

fn default_backup_path() -> String {
    "/api/v2/monitor/system/config/backup?scope=global".to_string()
}

fn default_concurrency() -> usize {
    1
}

// Duration serialization helper
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
