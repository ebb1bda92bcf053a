//! Common test utilities for fgt-backup end-to-end tests

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use fgt_backup::Config;

/// Configuration export as served by a healthy appliance
pub const CONFIG_EXPORT: &str = "#config-version=FGT60F-7.2.5-FW-build1517-230606:opmode=0:vdom=0:user=api\n\
#conf_file_ver=1\n\
#buildno=1517\n\
config system global\n\
    set hostname \"lab-fw\"\n\
end\n";

/// Backup endpoint path, without query
pub const BACKUP_PATH: &str = "/api/v2/monitor/system/config/backup";

/// Workspace for one test run: roster, backup root and log dir under a temp dir
pub struct Workspace {
    /// Keeps the directory alive
    pub temp: TempDir,
    /// Config pointing into the temp dir, plain HTTP, short timeouts
    pub config: Config,
}

impl Workspace {
    /// Create the workspace and write `roster` as its CSV roster
    pub fn with_roster(roster: &str) -> Self {
        let temp = TempDir::new().unwrap();
        let roster_path = temp.path().join("fortigates.csv");
        std::fs::write(&roster_path, roster).unwrap();

        let config = Config {
            roster_path,
            backup_root: temp.path().join("backups"),
            log_dir: temp.path().join("logs"),
            scheme: "http".into(),
            probe_timeout: Duration::from_millis(500),
            fetch_timeout: Duration::from_secs(5),
            ..Default::default()
        };
        Self { temp, config }
    }

    /// Every file below the backup root
    pub fn artifacts(&self) -> Vec<PathBuf> {
        let mut found = Vec::new();
        collect_files(&self.config.backup_root, &mut found);
        found.sort();
        found
    }
}

fn collect_files(dir: &Path, found: &mut Vec<PathBuf>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries {
        let path = entry.unwrap().path();
        if path.is_dir() {
            collect_files(&path, found);
        } else {
            found.push(path);
        }
    }
}

/// Mock appliance answering the probe and serving `body` to `api_key`
pub async fn appliance(api_key: &str, status: u16, body: &str) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>login</html>"))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(BACKUP_PATH))
        .and(header("Authorization", format!("Bearer {api_key}").as_str()))
        .respond_with(ResponseTemplate::new(status).set_body_string(body))
        .mount(&server)
        .await;
    server
}

/// Address of a local port with nothing listening on it
pub fn closed_address() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr.to_string()
}
