//! End-to-end runs: CSV roster, mock appliances over HTTP, artifacts on disk.

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use common::*;
use fgt_backup::backup::provision;
use fgt_backup::selection::{Selection, parse_selection};
use fgt_backup::{BackupRunner, RosterError, RunKind, RunStamp, roster};
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn full_run_over_mixed_fleet() {
    let healthy = appliance("KEY-A", 200, CONFIG_EXPORT).await;
    let standby = appliance("KEY-C", 200, CONFIG_EXPORT).await;
    let login_page = appliance("KEY-D", 200, "<html>session expired</html>").await;
    let rejecting = appliance("KEY-E", 403, r#"{"http_status":403}"#).await;

    let roster_csv = format!(
        "name,ip_1,ip_2,apikey\n\
         fw-a,{a},,KEY-A\n\
         fw-b,,,KEY-B\n\
         fw-c,{dead},{c},KEY-C\n\
         fw-d,{d},,KEY-D\n\
         fw-e,{e},,KEY-E\n\
         fw-f,{dead},,KEY-F\n",
        a = healthy.address(),
        c = standby.address(),
        d = login_page.address(),
        e = rejecting.address(),
        dead = closed_address(),
    );
    let ws = Workspace::with_roster(&roster_csv);
    let stamp = RunStamp::now();

    let backup_dir = provision(&ws.config, &stamp).await.unwrap();
    let devices = roster::load(&ws.config.roster_path).await.unwrap();
    let runner = BackupRunner::new(ws.config.clone(), RunKind::Scheduled, stamp.clone()).unwrap();

    let summary = runner.run(&devices, &CancellationToken::new()).await;

    assert_eq!(summary.succeeded, vec!["fw-a", "fw-c"]);
    assert_eq!(summary.failed, vec!["fw-b", "fw-d", "fw-e", "fw-f"]);
    assert_eq!(summary.total(), devices.len());

    let artifacts = ws.artifacts();
    assert_eq!(
        artifacts,
        vec![
            backup_dir.join(format!("fw-a-bkp-{}.conf", stamp.timestamp)),
            backup_dir.join(format!("fw-c-bkp-{}.conf", stamp.timestamp)),
        ]
    );
    for artifact in &artifacts {
        assert_eq!(std::fs::read_to_string(artifact).unwrap(), CONFIG_EXPORT);
    }
}

#[tokio::test]
async fn manual_selection_backs_up_only_chosen_devices() {
    let first = appliance("K1", 200, CONFIG_EXPORT).await;
    let second = appliance("K2", 200, CONFIG_EXPORT).await;
    let roster_csv = format!(
        "name,ip_1,ip_2,apikey\nfw-1,{},,K1\nfw-2,{},,K2\n",
        first.address(),
        second.address()
    );
    let ws = Workspace::with_roster(&roster_csv);
    let stamp = RunStamp::now();
    provision(&ws.config, &stamp).await.unwrap();
    let devices = roster::load(&ws.config.roster_path).await.unwrap();

    let choice = parse_selection("1", devices.len());
    assert_eq!(choice, Selection::Indexes(vec![1]));
    let selected: Vec<_> = choice.resolve(&devices).into_iter().cloned().collect();

    let runner = BackupRunner::new(ws.config.clone(), RunKind::Manual, stamp.clone()).unwrap();
    let summary = runner.run(&selected, &CancellationToken::new()).await;

    assert_eq!(summary.succeeded, vec!["fw-2"]);
    assert!(summary.failed.is_empty());
    let artifacts = ws.artifacts();
    assert_eq!(artifacts.len(), 1);
    assert!(
        artifacts[0]
            .to_string_lossy()
            .ends_with(&format!("fw-2-manual-bkp-{}.conf", stamp.timestamp))
    );
}

#[tokio::test]
async fn broken_roster_aborts_before_any_device() {
    let ws = Workspace::with_roster("name,address,apikey\nfw-a,10.0.0.1,K\n");

    let err = roster::load(&ws.config.roster_path).await.unwrap_err();
    assert!(matches!(err, RosterError::MissingColumn("ip_1")));
    assert!(ws.artifacts().is_empty());
}
