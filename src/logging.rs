//! Run log setup
//!
//! Each run appends to its own file, `<log_dir>/<tag>-<timestamp>.log`, with
//! lines shaped `YYYY-mm-dd HH:MM:SS LEVEL message fields...`.

use crate::error::{Error, Result};
use crate::types::{RunKind, RunStamp};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::fmt::time::ChronoLocal;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Timestamp format of run log lines
const LOG_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// How the run log should be set up
#[derive(Clone, Debug)]
pub struct LogSettings {
    /// Directory the log file goes into (must exist)
    pub dir: PathBuf,
    /// Run kind, selects the file name tag
    pub kind: RunKind,
    /// Run stamp, selects the file name timestamp
    pub stamp: RunStamp,
    /// Log at debug level instead of info
    pub debug: bool,
    /// Mirror the log to stderr
    pub console: bool,
}

/// Path of the log file for a run
pub fn log_file_path(dir: &Path, kind: RunKind, stamp: &RunStamp) -> PathBuf {
    dir.join(format!("{}-{}.log", kind.tag(), stamp.timestamp))
}

/// Install the global subscriber; returns the log file path
///
/// `RUST_LOG` takes precedence over the `debug` flag when set.
pub fn init(settings: &LogSettings) -> Result<PathBuf> {
    let path = log_file_path(&settings.dir, settings.kind, &settings.stamp);
    let file = OpenOptions::new().create(true).append(true).open(&path)?;

    let level = if settings.debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(false)
        .with_timer(ChronoLocal::new(LOG_TIME_FORMAT.to_string()))
        .boxed();

    let console_layer = settings.console.then(|| {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_timer(ChronoLocal::new(LOG_TIME_FORMAT.to_string()))
            .boxed()
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(console_layer)
        .try_init()
        .map_err(|e| Error::Other(format!("failed to install log subscriber: {e}")))?;

    Ok(path)
}
