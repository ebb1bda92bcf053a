//! Device roster loading
//!
//! The roster is a CSV file with a header row naming at least `name`, `ip_1`,
//! `ip_2` and `apikey`. Any problem with the file itself is fatal; problems
//! with an individual device (no address, no key) are left to the backup run.

use crate::error::RosterError;
use crate::types::DeviceRecord;
use std::collections::HashSet;
use std::path::Path;

/// Columns every roster must declare
pub const REQUIRED_COLUMNS: [&str; 4] = ["name", "ip_1", "ip_2", "apikey"];

/// Read and parse the roster file at `path`
pub async fn load(path: &Path) -> Result<Vec<DeviceRecord>, RosterError> {
    let raw = tokio::fs::read(path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => RosterError::NotFound(path.to_path_buf()),
        _ => RosterError::Read {
            path: path.to_path_buf(),
            reason: e.to_string(),
        },
    })?;

    let devices = parse(raw.as_slice())?;
    tracing::info!(path = %path.display(), devices = devices.len(), "roster loaded");
    Ok(devices)
}

/// Parse roster CSV from any reader
pub fn parse<R: std::io::Read>(source: R) -> Result<Vec<DeviceRecord>, RosterError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(source);

    let headers = reader.headers().map_err(|e| RosterError::Malformed {
        line: 1,
        reason: e.to_string(),
    })?;
    for column in REQUIRED_COLUMNS {
        if !headers.iter().any(|h| h == column) {
            return Err(RosterError::MissingColumn(column));
        }
    }

    let mut devices = Vec::new();
    for row in reader.deserialize::<DeviceRecord>() {
        let device = row.map_err(|e| RosterError::Malformed {
            line: e.position().map(|p| p.line()).unwrap_or_default(),
            reason: e.to_string(),
        })?;
        tracing::debug!(index = devices.len(), ?device, "roster entry");
        devices.push(device);
    }

    if devices.is_empty() {
        return Err(RosterError::Empty);
    }

    let mut seen = HashSet::new();
    for device in &devices {
        if !seen.insert(device.name.as_str()) {
            tracing::warn!(
                device = %device.name,
                "duplicate device name in roster, artifacts of this run will collide"
            );
        }
    }

    Ok(devices)
}
