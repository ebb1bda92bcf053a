//! Roster-wide run, provisioning and summary.

use futures::StreamExt;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use super::BackupRunner;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::types::{DeviceRecord, RunEvent, RunStamp, RunSummary};

/// Create the run's dated backup directory and the log directory
///
/// Idempotent; a failure here is fatal for the run. Returns the dated backup
/// directory.
pub async fn provision(config: &Config, stamp: &RunStamp) -> Result<PathBuf> {
    let backup_dir = config.backup_root.join(&stamp.date);
    create_dir(&backup_dir).await?;
    create_dir(&config.log_dir).await?;
    Ok(backup_dir)
}

async fn create_dir(path: &Path) -> Result<()> {
    tokio::fs::create_dir_all(path)
        .await
        .map_err(|source| Error::Provision {
            path: path.to_path_buf(),
            source,
        })
}

impl BackupRunner {
    /// Back up `devices` in order and tally the outcomes
    ///
    /// Up to `concurrency` devices run at once (one by default). Results are
    /// collected in input order, so the summary lists keep roster order
    /// whatever the concurrency. Once `cancel` fires no further device is
    /// started; devices already running finish normally.
    pub async fn run(&self, devices: &[DeviceRecord], cancel: &CancellationToken) -> RunSummary {
        tracing::info!(devices = devices.len(), concurrency = self.config.concurrency, "Starting backups...");

        let results: Vec<_> = futures::stream::iter(devices.iter().enumerate())
            .map(|(index, device)| {
                let span = tracing::info_span!("device", name = %device.name);
                async move {
                    if cancel.is_cancelled() {
                        return (device, None);
                    }
                    self.event_tx
                        .send(RunEvent::DeviceStarted {
                            index,
                            name: device.name.clone(),
                        })
                        .ok();
                    let outcome = self.backup_device(device).await;
                    self.event_tx
                        .send(RunEvent::DeviceFinished {
                            index,
                            name: device.name.clone(),
                            outcome: outcome.clone(),
                        })
                        .ok();
                    (device, Some(outcome))
                }
                .instrument(span)
            })
            .buffered(self.config.concurrency.max(1))
            .collect()
            .await;

        let mut summary = RunSummary::default();
        for (device, outcome) in results {
            match outcome {
                Some(outcome) => summary.record(&device.name, &outcome),
                None => summary.record_cancelled(&device.name),
            }
        }

        if !summary.cancelled.is_empty() {
            tracing::warn!(skipped = summary.cancelled.len(), "run cancelled before all devices were started");
        }
        log_summary(&summary);
        self.event_tx
            .send(RunEvent::RunFinished {
                summary: summary.clone(),
            })
            .ok();
        summary
    }
}

/// Write the run's results to the log
pub fn log_summary(summary: &RunSummary) {
    tracing::info!("Backup results:");
    tracing::info!("{} OK: {:?}", summary.succeeded.len(), summary.succeeded);
    tracing::info!("{} Failed: {:?}", summary.failed.len(), summary.failed);
    if !summary.cancelled.is_empty() {
        tracing::info!("{} Cancelled: {:?}", summary.cancelled.len(), summary.cancelled);
    }
}
