mod output;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use fim_core::{BaselineStore, FimError, HashAlgorithm, Monitor, ScanError, Settings, StoreError};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Process exit codes
mod exit {
    pub const CLEAN: u8 = 0;
    pub const CHANGES: u8 = 1;
    // 2 is clap's usage error
    pub const BASELINE_NOT_FOUND: u8 = 3;
    pub const BASELINE_CORRUPT: u8 = 4;
    pub const ROOT_MISMATCH: u8 = 5;
    pub const DIRECTORY_NOT_FOUND: u8 = 6;
    pub const FAILURE: u8 = 70;
}

#[derive(Parser, Debug)]
#[command(name = "fim", author, version, about = "Scan-based file integrity monitor", long_about = None)]
struct Cli {
    /// Settings file (defaults to settings.json in the config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Raise log verbosity (-v info, -vv debug); RUST_LOG takes precedence
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug)]
struct Target {
    /// Monitored directory
    directory: PathBuf,

    /// Baseline file (defaults to one file per directory in the data directory)
    #[arg(long)]
    baseline: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct ScanTuning {
    /// Extra glob pattern to exclude (repeatable)
    #[arg(long = "exclude", value_name = "PATTERN")]
    excludes: Vec<String>,

    /// Hashing threads (1 = serial)
    #[arg(long)]
    workers: Option<usize>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Hash the tree and write (or overwrite) its baseline
    Scan {
        #[command(flatten)]
        target: Target,
        #[command(flatten)]
        tuning: ScanTuning,
        /// Digest for the new baseline (blake3, sha256)
        #[arg(long)]
        algorithm: Option<HashAlgorithm>,
        #[arg(long)]
        json: bool,
    },
    /// Re-scan the tree and report changes against the baseline
    Verify {
        #[command(flatten)]
        target: Target,
        #[command(flatten)]
        tuning: ScanTuning,
        #[arg(long)]
        json: bool,
    },
    /// Show whether the tree has a baseline
    Status {
        #[command(flatten)]
        target: Target,
        #[arg(long)]
        json: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match run(cli) {
        Ok(code) => ExitCode::from(code),
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::from(exit_code_for(&err))
        }
    }
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn exit_code_for(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<FimError>() {
        Some(FimError::Scan(ScanError::DirectoryNotFound(_) | ScanError::NotADirectory(_))) => {
            exit::DIRECTORY_NOT_FOUND
        }
        Some(FimError::Store(StoreError::NotFound(_))) => exit::BASELINE_NOT_FOUND,
        Some(FimError::Store(StoreError::Corrupt { .. })) => exit::BASELINE_CORRUPT,
        Some(FimError::RootMismatch { .. }) => exit::ROOT_MISMATCH,
        _ => exit::FAILURE,
    }
}

fn load_settings(config: Option<&Path>) -> Result<Settings> {
    let settings = match config {
        Some(path) => Settings::load(path)?,
        None => Settings::load_default()?,
    };
    debug!(?settings, "settings loaded");
    Ok(settings)
}

fn apply_tuning(settings: &mut Settings, tuning: ScanTuning) {
    settings.exclude_patterns.extend(tuning.excludes);
    if let Some(workers) = tuning.workers {
        settings.workers = workers;
    }
}

fn open_store(monitor: &Monitor, target: &Target) -> Result<BaselineStore> {
    match &target.baseline {
        Some(path) => Ok(BaselineStore::new(path)),
        None => {
            let root = monitor.resolve_root(&target.directory)?;
            Ok(monitor.default_store(&root)?)
        }
    }
}

fn run(cli: Cli) -> Result<u8> {
    let mut settings = load_settings(cli.config.as_deref())?;

    match cli.command {
        Commands::Scan {
            target,
            tuning,
            algorithm,
            json,
        } => {
            apply_tuning(&mut settings, tuning);
            if let Some(algorithm) = algorithm {
                settings.hash_algorithm = algorithm;
            }
            let monitor = Monitor::new(settings)?;
            let store = open_store(&monitor, &target)?;
            let summary = monitor.scan(&target.directory, &store)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                print!("{}", output::render_scan(&summary));
            }
            Ok(exit::CLEAN)
        }

        Commands::Verify {
            target,
            tuning,
            json,
        } => {
            apply_tuning(&mut settings, tuning);
            let monitor = Monitor::new(settings)?;
            let store = open_store(&monitor, &target)?;
            let outcome = monitor.verify(&target.directory, &store)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&outcome)?);
            } else {
                print!("{}", output::render_verify(&outcome));
            }
            Ok(if outcome.report.is_clean() {
                exit::CLEAN
            } else {
                exit::CHANGES
            })
        }

        Commands::Status { target, json } => {
            let monitor = Monitor::new(settings)?;
            let store = open_store(&monitor, &target)?;
            let state = monitor.status(&target.directory, &store)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&state)?);
            } else {
                print!("{}", output::render_status(&state, store.path()));
            }
            Ok(exit::CLEAN)
        }
    }
}
