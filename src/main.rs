//! `fgt-backup`: back up Fortigate configurations listed in a CSV roster.
//!
//! Usage:
//!   fgt-backup [OPTIONS] [run]      back up every device (default)
//!   fgt-backup [OPTIONS] manual     pick devices from an interactive menu

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;

use fgt_backup::backup::provision;
use fgt_backup::logging::{self, LogSettings};
use fgt_backup::selection::{self, Selection};
use fgt_backup::{
    BackupRunner, Config, DeviceRecord, Error, Result, RunEvent, RunKind, RunStamp, RunSummary,
    roster,
};

/// Fortigate configuration backup.
#[derive(Parser, Debug)]
#[command(name = "fgt-backup", about = "Back up Fortigate configurations over the REST API")]
struct Cli {
    /// Enable debug logging.
    #[arg(short = 'd', long = "debug", global = true)]
    debug: bool,

    /// JSON configuration file; flags below override its values.
    #[arg(short = 'c', long = "config", global = true)]
    config: Option<PathBuf>,

    /// Device roster (CSV with name,ip_1,ip_2,apikey).
    #[arg(long = "roster", global = true)]
    roster: Option<PathBuf>,

    /// Root directory for dated backup folders.
    #[arg(long = "backup-root", global = true)]
    backup_root: Option<PathBuf>,

    /// Directory for run logs.
    #[arg(long = "log-dir", global = true)]
    log_dir: Option<PathBuf>,

    /// Accept self-signed or otherwise invalid appliance certificates.
    #[arg(long = "insecure", global = true)]
    insecure: bool,

    /// Number of devices backed up at the same time.
    #[arg(long = "concurrency", global = true)]
    concurrency: Option<usize>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, Copy)]
enum Command {
    /// Back up every device in the roster.
    Run,
    /// Choose the devices to back up from a menu.
    Manual,
}

impl Cli {
    fn kind(&self) -> RunKind {
        match self.command {
            Some(Command::Manual) => RunKind::Manual,
            Some(Command::Run) | None => RunKind::Scheduled,
        }
    }

    async fn config(&self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::load(path).await?,
            None => Config::default(),
        };
        if let Some(roster) = &self.roster {
            config.roster_path = roster.clone();
        }
        if let Some(root) = &self.backup_root {
            config.backup_root = root.clone();
        }
        if let Some(dir) = &self.log_dir {
            config.log_dir = dir.clone();
        }
        if self.insecure {
            config.accept_invalid_certs = true;
        }
        if let Some(concurrency) = self.concurrency {
            config.concurrency = concurrency;
        }
        config.validate()?;
        Ok(config)
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("ERROR: failed to start async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };
    let result = runtime.block_on(execute(&cli));
    // A stdin read still pending after an interrupted prompt must not hold the process open.
    runtime.shutdown_background();

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "run aborted");
            eprintln!("ERROR: {e}");
            ExitCode::from(e.exit_code())
        }
    }
}

async fn execute(cli: &Cli) -> Result<()> {
    let kind = cli.kind();
    let config = cli.config().await?;
    let stamp = RunStamp::now();

    provision(&config, &stamp).await?;
    let log_path = logging::init(&LogSettings {
        dir: config.log_dir.clone(),
        kind,
        stamp: stamp.clone(),
        debug: cli.debug,
        console: kind == RunKind::Scheduled,
    })?;

    match kind {
        RunKind::Scheduled => tracing::info!("#####  Fortigate Backup Log  #####"),
        RunKind::Manual => tracing::info!("#####  Fortigate Manual Backup Log  #####"),
    }

    let devices = roster::load(&config.roster_path).await?;
    let runner = BackupRunner::new(config, kind, stamp)?;

    let cancel = CancellationToken::new();
    fgt_backup::cancel_on_signal(cancel.clone());

    match kind {
        RunKind::Scheduled => {
            runner.run(&devices, &cancel).await;
        }
        RunKind::Manual => manual(&runner, &devices, &cancel, &log_path).await?,
    }
    Ok(())
}

/// Interactive run: menu, selection prompt, per-device progress, results
async fn manual(
    runner: &BackupRunner,
    devices: &[DeviceRecord],
    cancel: &CancellationToken,
    log_path: &Path,
) -> Result<()> {
    println!("{:>50}", "====== Fortigates Manual Backup ======\n");
    let names: Vec<&str> = devices.iter().map(|d| d.name.as_str()).collect();
    print!("{}", selection::render_menu(&names));
    tracing::info!("Prompt user to select Fortigates for backup");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let choice =
        selection::read_selection(&mut lines, &mut std::io::stdout(), devices.len(), cancel)
            .await?;
    let selected = match choice {
        Selection::Exit => {
            tracing::info!("User chose to exit");
            return Ok(());
        }
        choice => choice.resolve(devices),
    };
    for device in &selected {
        tracing::info!("Selected: {}", device.name);
    }
    let selected: Vec<DeviceRecord> = selected.into_iter().cloned().collect();

    let mut events = runner.subscribe();
    let printer = tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                RunEvent::DeviceFinished { name, outcome, .. } => {
                    let status = if outcome.is_success() { "OK" } else { "FAILED" };
                    println!("{:<40} {status}", format!("Backing up {name}..."));
                }
                RunEvent::RunFinished { .. } => break,
                RunEvent::DeviceStarted { .. } => {}
            }
        }
    });

    println!("\nStarting backups...");
    let summary = runner.run(&selected, cancel).await;
    printer.await.map_err(|e| Error::Other(e.to_string()))?;

    print_results(&summary);
    println!("\nFor more details check the log file {}", log_path.display());
    Ok(())
}

fn print_results(summary: &RunSummary) {
    println!("\nBackup results:");
    println!("{} OK: {:?}", summary.succeeded.len(), summary.succeeded);
    println!("{} Failed: {:?}", summary.failed.len(), summary.failed);
    if !summary.cancelled.is_empty() {
        println!("{} Cancelled: {:?}", summary.cancelled.len(), summary.cancelled);
    }
}
