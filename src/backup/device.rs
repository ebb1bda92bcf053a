//! Per-device backup sequence.

use super::BackupRunner;
use super::probe::probe;
use super::validate::is_valid_payload;
use crate::types::{BackupOutcome, DeviceRecord};

/// Step a device's backup is in
///
/// Steps run in declaration order and the first failing step ends the
/// device's run; nothing is retried.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeviceStage {
    /// Checking the roster entry has an address and a key
    Validating,
    /// Looking for a reachable address
    Probing,
    /// Downloading the configuration
    Fetching,
    /// Checking the payload marker
    ValidatingPayload,
    /// Saving the artifact
    Writing,
}

impl BackupRunner {
    /// Back up a single device
    ///
    /// Every failure is turned into a [`BackupOutcome`]; this never errors.
    pub async fn backup_device(&self, device: &DeviceRecord) -> BackupOutcome {
        let name = device.name.as_str();
        tracing::info!("========================================");
        tracing::info!("Fortigate: {name}");

        let outcome = self.advance(device).await;

        if outcome.is_success() {
            tracing::info!(device = %name, address = outcome.address().unwrap_or("-"), "{outcome}");
        } else {
            tracing::error!(device = %name, address = outcome.address().unwrap_or("-"), "{outcome}");
        }
        tracing::info!("========================================");
        outcome
    }

    async fn advance(&self, device: &DeviceRecord) -> BackupOutcome {
        let name = device.name.as_str();

        tracing::debug!(device = %name, stage = ?DeviceStage::Validating, "entering stage");
        if let Err(reason) = device.validate() {
            tracing::warn!(device = %name, "{reason}, check the roster file. Skipping...");
            return BackupOutcome::ValidationSkipped(reason);
        }

        tracing::debug!(device = %name, stage = ?DeviceStage::Probing, "entering stage");
        let Some(address) = probe(self.prober.as_ref(), &device.candidates()).await else {
            return BackupOutcome::Offline;
        };

        tracing::debug!(device = %name, stage = ?DeviceStage::Fetching, address = %address, "entering stage");
        let payload = match self.fetcher.fetch(&address, &device.api_key).await {
            Ok(payload) => payload,
            Err(e) => {
                return BackupOutcome::FetchError {
                    address,
                    reason: e.to_string(),
                };
            }
        };

        tracing::debug!(device = %name, stage = ?DeviceStage::ValidatingPayload, bytes = payload.len(), "entering stage");
        if !is_valid_payload(&payload) {
            return BackupOutcome::InvalidPayload { address };
        }

        tracing::debug!(device = %name, stage = ?DeviceStage::Writing, "entering stage");
        match self.writer.write(name, &payload).await {
            Ok(path) => BackupOutcome::Success { address, path },
            Err(e) => BackupOutcome::WriteError {
                address,
                reason: e.to_string(),
            },
        }
    }
}
