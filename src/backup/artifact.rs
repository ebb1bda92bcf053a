//! Artifact naming and persistence.
//!
//! Layout: `<backup-root>/<run-date>/<device>-<tag>-<timestamp>.conf`, where
//! `<tag>` is `bkp` or `manual-bkp` depending on the run kind.

use crate::error::WriteError;
use crate::types::{RunKind, RunStamp};
use std::path::{Path, PathBuf};

/// Suffix of the temporary file a payload is staged in
const PARTIAL_SUFFIX: &str = "part";

/// Writes validated payloads into a run's dated backup directory
#[derive(Clone, Debug)]
pub struct ArtifactWriter {
    dir: PathBuf,
    kind: RunKind,
    stamp: RunStamp,
}

impl ArtifactWriter {
    /// Writer for one run; `dir` is the already dated directory
    pub fn new(dir: PathBuf, kind: RunKind, stamp: RunStamp) -> Self {
        Self { dir, kind, stamp }
    }

    /// Dated directory artifacts land in
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Final path of `device`'s artifact for this run
    pub fn artifact_path(&self, device: &str) -> PathBuf {
        self.dir.join(format!(
            "{}-{}-{}.conf",
            file_safe(device),
            self.kind.tag(),
            self.stamp.timestamp
        ))
    }

    /// Persist `payload` byte for byte
    ///
    /// The payload is staged next to the target and renamed into place, so
    /// the final path only ever holds a complete file. On failure the staged
    /// file is removed.
    pub async fn write(&self, device: &str, payload: &[u8]) -> Result<PathBuf, WriteError> {
        let path = self.artifact_path(device);
        let staged = path.with_extension(format!("conf.{PARTIAL_SUFFIX}"));
        tracing::debug!(path = %path.display(), "backup file path");

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|source| WriteError::Io {
                path: self.dir.clone(),
                source,
            })?;

        let result = async {
            tokio::fs::write(&staged, payload).await?;
            tokio::fs::rename(&staged, &path).await
        }
        .await;

        if let Err(source) = result {
            if let Err(e) = tokio::fs::remove_file(&staged).await
                && e.kind() != std::io::ErrorKind::NotFound
            {
                tracing::warn!(path = %staged.display(), error = %e, "failed to remove partial backup file");
            }
            return Err(WriteError::Io { path, source });
        }

        Ok(path)
    }
}

/// Replace path separators so a device name stays a single path component
fn file_safe(name: &str) -> String {
    name.chars()
        .map(|c| if matches!(c, '/' | '\\') { '_' } else { c })
        .collect()
}
