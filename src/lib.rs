//! # fgt-backup
//!
//! Configuration backups for a fleet of Fortigate firewalls over the FortiOS
//! REST API.
//!
//! For every device in the roster the runner:
//! 1. checks the roster entry has an address and an API key,
//! 2. probes the primary address, then the secondary one,
//! 3. downloads the configuration from the first address that answered,
//! 4. checks the payload starts with `#config`,
//! 5. saves it as `<backup-root>/<date>/<name>-bkp-<timestamp>.conf`.
//!
//! Each device ends in exactly one [`BackupOutcome`]; failures never stop the
//! run. Only a broken roster or unusable backup/log directories are fatal.
//!
//! ## Quick Start
//!
//! ```no_run
//! use fgt_backup::{BackupRunner, Config, RunKind, RunStamp, roster};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config {
//!         accept_invalid_certs: true,
//!         ..Default::default()
//!     };
//!     let stamp = RunStamp::now();
//!     fgt_backup::backup::provision(&config, &stamp).await?;
//!
//!     let devices = roster::load(&config.roster_path).await?;
//!     let runner = BackupRunner::new(config, RunKind::Scheduled, stamp)?;
//!     let summary = runner.run(&devices, &CancellationToken::new()).await;
//!
//!     println!("{} OK, {} failed", summary.succeeded.len(), summary.failed.len());
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Backup engine (probe, fetch, validate, write, run)
pub mod backup;
/// Configuration types
pub mod config;
/// Error types
pub mod error;
/// Run log setup
pub mod logging;
/// Device roster loading
pub mod roster;
/// Interactive device selection
pub mod selection;
/// Core types and events
pub mod types;

// Re-export commonly used types
pub use backup::BackupRunner;
pub use config::{BackupMethod, Config};
pub use error::{Error, FetchError, InvalidRecord, Result, RosterError, WriteError};
pub use selection::{Selection, parse_selection};
pub use types::{BackupOutcome, DeviceRecord, RunEvent, RunKind, RunStamp, RunSummary};

use tokio_util::sync::CancellationToken;

/// Cancel `token` when a termination signal arrives
///
/// Must be called from within a tokio runtime. Spawns a task that waits for
/// SIGTERM/SIGINT on Unix, Ctrl+C elsewhere.
/// A cancelled run finishes the devices already in flight and starts no more.
/// A second signal exits the process immediately with status 130.
pub fn cancel_on_signal(token: CancellationToken) {
    let mut signals = Signals::install();
    tokio::spawn(async move {
        signals.recv().await;
        tracing::warn!("termination requested, no further devices will be started");
        token.cancel();

        signals.recv().await;
        tracing::error!("second termination request, exiting immediately");
        std::process::exit(130);
    });
}

/// Termination signal listener, registered once for the whole process
struct Signals {
    #[cfg(unix)]
    handlers: Option<(tokio::signal::unix::Signal, tokio::signal::unix::Signal)>,
}

impl Signals {
    #[cfg(unix)]
    fn install() -> Self {
        use tokio::signal::unix::{SignalKind, signal};

        // Set up signal handlers - these may fail in restricted environments (containers, tests)
        match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
            (Ok(sigterm), Ok(sigint)) => Self {
                handlers: Some((sigterm, sigint)),
            },
            (Err(e), _) | (_, Err(e)) => {
                tracing::warn!(error = %e, "Could not register signal handlers, using ctrl_c fallback");
                Self { handlers: None }
            }
        }
    }

    #[cfg(not(unix))]
    fn install() -> Self {
        Self {}
    }

    #[cfg(unix)]
    async fn recv(&mut self) {
        match &mut self.handlers {
            Some((sigterm, sigint)) => {
                tokio::select! {
                    _ = sigterm.recv() => {
                        tracing::info!("Received SIGTERM signal");
                    }
                    _ = sigint.recv() => {
                        tracing::info!("Received SIGINT signal (Ctrl+C)");
                    }
                }
            }
            None => ctrl_c_or_never().await,
        }
    }

    #[cfg(not(unix))]
    async fn recv(&mut self) {
        ctrl_c_or_never().await;
    }
}

// A run that cannot listen for Ctrl+C simply cannot be cancelled.
async fn ctrl_c_or_never() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
            std::future::pending::<()>().await;
        }
    }
}
