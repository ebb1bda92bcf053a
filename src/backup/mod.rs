//! Backup engine split into focused submodules.
//!
//! The `BackupRunner` struct and its methods are organized by step:
//! - [`probe`] - Reachability checks across a device's addresses
//! - [`fetch`] - Authenticated configuration download
//! - [`validate`] - Payload marker check
//! - [`artifact`] - Artifact naming and persistence
//! - [`device`] - Per-device backup sequence
//! - [`run`] - Roster-wide run, provisioning and summary

pub mod artifact;
mod device;
pub mod fetch;
pub mod probe;
mod run;
pub mod validate;

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

pub use artifact::ArtifactWriter;
pub use device::DeviceStage;
pub use fetch::{Fetcher, HttpFetcher};
pub use probe::{HttpsProber, ProbeFailure, Prober};
pub use run::{log_summary, provision};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::types::{RunEvent, RunKind, RunStamp};
use std::sync::Arc;
use tokio::sync::broadcast;

/// Capacity of the progress event channel
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Drives backups for a set of devices
///
/// Holds no per-device state: every device's run gets its own locals, so one
/// device can never leak an address or error into the next.
#[derive(Clone)]
pub struct BackupRunner {
    config: Arc<Config>,
    prober: Arc<dyn Prober>,
    fetcher: Arc<dyn Fetcher>,
    writer: ArtifactWriter,
    event_tx: broadcast::Sender<RunEvent>,
}

impl BackupRunner {
    /// Build a runner talking HTTP(S) to the appliances
    ///
    /// Artifacts go to `<backup_root>/<stamp.date>/`.
    pub fn new(config: Config, kind: RunKind, stamp: RunStamp) -> Result<Self> {
        config.validate()?;

        if config.accept_invalid_certs {
            tracing::warn!("TLS certificate verification is disabled for appliance connections");
        }

        let client = reqwest::Client::builder()
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(Error::Http)?;

        let prober = HttpsProber::new(client.clone(), &config.scheme, config.probe_timeout);
        let fetcher = HttpFetcher::new(
            client,
            &config.scheme,
            &config.backup_path,
            config.backup_method,
            config.fetch_timeout,
        );
        let writer = ArtifactWriter::new(config.backup_root.join(&stamp.date), kind, stamp);

        Ok(Self::with_components(
            config,
            writer,
            Arc::new(prober),
            Arc::new(fetcher),
        ))
    }

    /// Build a runner from explicit parts
    pub fn with_components(
        config: Config,
        writer: ArtifactWriter,
        prober: Arc<dyn Prober>,
        fetcher: Arc<dyn Fetcher>,
    ) -> Self {
        let (event_tx, _rx) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            config: Arc::new(config),
            prober,
            fetcher,
            writer,
            event_tx,
        }
    }

    /// Subscribe to progress events
    ///
    /// Only events published after subscribing are received.
    pub fn subscribe(&self) -> broadcast::Receiver<RunEvent> {
        self.event_tx.subscribe()
    }

    /// Artifact writer used by this runner
    pub fn writer(&self) -> &ArtifactWriter {
        &self.writer
    }
}

/// Build `<scheme>://<address><path>` for an appliance
pub(crate) fn appliance_url(
    scheme: &str,
    address: &str,
    path: &str,
) -> std::result::Result<url::Url, url::ParseError> {
    url::Url::parse(&format!("{scheme}://{address}{path}"))
}
