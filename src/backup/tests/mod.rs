//! Runner-level tests with scripted probe/fetch fakes and wiremock appliances.


use super::*;
use crate::error::FetchError;
use crate::types::{BackupOutcome, DeviceRecord, RunKind, RunStamp};
use async_trait::async_trait;
use std::collections::HashMap;
use std::result::Result;
use std::sync::Mutex;
use std::time::Duration;
use tempfile::TempDir;

pub(super) const CONFIG_BODY: &[u8] =
    b"#config-version=FGT60F-7.2.5-FW-build1517-230606:opmode=0:vdom=0:user=api\n#conf_file_ver=1\nconfig system global\nend\n";

pub(super) fn stamp() -> RunStamp {
    RunStamp {
        date: "2024-03-09".into(),
        timestamp: "20240309T070501".into(),
    }
}

/// Prober that answers from a fixed set and records every address it was asked about
#[derive(Default)]
pub(super) struct ScriptedProber {
    reachable: Vec<String>,
    pub(super) calls: Mutex<Vec<String>>,
}

impl ScriptedProber {
    pub(super) fn reachable(addresses: &[&str]) -> Self {
        Self {
            reachable: addresses.iter().map(|a| a.to_string()).collect(),
            calls: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl Prober for ScriptedProber {
    async fn check(&self, address: &str) -> Result<(), ProbeFailure> {
        self.calls.lock().unwrap().push(address.to_string());
        if self.reachable.iter().any(|a| a == address) {
            Ok(())
        } else {
            Err(ProbeFailure::Timeout)
        }
    }
}

/// Canned answer of a [`ScriptedFetcher`]
#[derive(Clone)]
pub(super) enum Reply {
    Body(Vec<u8>),
    Status(u16),
}

/// Fetcher returning canned replies per address
#[derive(Default)]
pub(super) struct ScriptedFetcher {
    replies: HashMap<String, Reply>,
    pub(super) calls: Mutex<Vec<(String, String)>>,
}

impl ScriptedFetcher {
    pub(super) fn reply(mut self, address: &str, reply: Reply) -> Self {
        self.replies.insert(address.to_string(), reply);
        self
    }
}

#[async_trait]
impl Fetcher for ScriptedFetcher {
    async fn fetch(&self, address: &str, api_key: &str) -> Result<Vec<u8>, FetchError> {
        self.calls
            .lock()
            .unwrap()
            .push((address.to_string(), api_key.to_string()));
        match self.replies.get(address) {
            Some(Reply::Body(body)) => Ok(body.clone()),
            Some(Reply::Status(status)) => Err(FetchError::Status {
                url: format!("https://{address}/api"),
                status: *status,
                body: String::new(),
            }),
            None => Err(FetchError::Transport {
                url: format!("https://{address}/api"),
                reason: "connection reset".into(),
            }),
        }
    }
}

/// Runner wired to fakes, writing into a fresh temp directory
pub(super) fn scripted_runner(
    prober: Arc<ScriptedProber>,
    fetcher: Arc<ScriptedFetcher>,
    concurrency: usize,
) -> (BackupRunner, TempDir) {
    let temp = TempDir::new().unwrap();
    let config = Config {
        backup_root: temp.path().join("backups"),
        log_dir: temp.path().join("logs"),
        concurrency,
        ..Default::default()
    };
    let writer = ArtifactWriter::new(
        config.backup_root.join(stamp().date),
        RunKind::Scheduled,
        stamp(),
    );
    let runner = BackupRunner::with_components(config, writer, prober, fetcher);
    (runner, temp)
}

/// Runner talking plain HTTP to wiremock servers
pub(super) fn http_runner(kind: RunKind) -> (BackupRunner, TempDir) {
    let temp = TempDir::new().unwrap();
    let config = Config {
        backup_root: temp.path().join("backups"),
        log_dir: temp.path().join("logs"),
        scheme: "http".into(),
        probe_timeout: Duration::from_millis(500),
        fetch_timeout: Duration::from_secs(5),
        ..Default::default()
    };
    let runner = BackupRunner::new(config, kind, stamp()).unwrap();
    (runner, temp)
}

/// Shared buffer collecting formatted log output
#[derive(Clone, Default)]
pub(super) struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    pub(super) fn contents(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }
}

impl std::io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Route this thread's log output into a buffer until the guard drops
pub(super) fn capture_logs() -> (LogBuffer, tracing::subscriber::DefaultGuard) {
    let buffer = LogBuffer::default();
    let writer = buffer.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::DEBUG)
        .finish();
    (buffer, tracing::subscriber::set_default(subscriber))
}

/// Address of a local port with nothing listening on it
pub(super) fn closed_address() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr.to_string()
}

pub(super) fn device(name: &str, primary: &str, secondary: &str, key: &str) -> DeviceRecord {
    DeviceRecord::new(name, primary, secondary, key)
}

pub(super) fn success_path(outcome: &BackupOutcome) -> std::path::PathBuf {
    match outcome {
        BackupOutcome::Success { path, .. } => path.clone(),
        other => panic!("expected success, got {other:?}"),
    }
}
