use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde::Serialize;
use thiserror::Error;
use tracing::{error, info, warn};

use qastatus_core::config::ConfigError;
use qastatus_core::domain::{ChildIndex, Task, TestStatus, compute};
use qastatus_core::observability::{LogFormat, init_logging};
use qastatus_core::{SyncConfig, SyncFacade, compute_all};

#[derive(Debug, Parser)]
#[command(name = "qastatus", version, about = "Derived QA test status and its remote sync")]
struct Cli {
    /// Relay endpoint (overrides QASTATUS_PROXY_URL)
    #[arg(long, global = true)]
    proxy_url: Option<String>,

    /// Direct backend base URL (overrides QASTATUS_BACKEND_URL)
    #[arg(long, global = true)]
    backend_url: Option<String>,

    /// Direct backend API key (overrides QASTATUS_BACKEND_KEY)
    #[arg(long, global = true)]
    backend_key: Option<String>,

    /// Hostname the app is served from (overrides QASTATUS_HOSTNAME)
    #[arg(long, global = true)]
    hostname: Option<String>,

    #[arg(long, global = true, env = "QASTATUS_LOG_FORMAT", default_value = "pretty")]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print derived statuses for a forest file
    Compute {
        #[arg(long)]
        tasks: PathBuf,
        /// Only this task key
        #[arg(long)]
        key: Option<String>,
    },
    /// Compute every status and save it remotely
    Push {
        #[arg(long)]
        tasks: PathBuf,
    },
    /// Load persisted statuses
    Pull {
        #[arg(required = true)]
        keys: Vec<String>,
    },
    /// Report parent cycles in a forest file
    Check {
        #[arg(long)]
        tasks: PathBuf,
    },
}

#[derive(Debug, Error)]
enum CliError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("unknown task key: {0}")]
    UnknownTask(String),

    #[error("parent cycle: {}", .0.join(" -> "))]
    Cycle(Vec<String>),

    #[error("failed to write output: {0}")]
    Output(#[from] serde_json::Error),
}

#[derive(Debug, Serialize)]
struct PushSummary {
    available: bool,
    persisted: usize,
    local_only: Vec<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.log_format);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "command failed");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    match &cli.command {
        Command::Compute { tasks, key } => {
            let forest = read_forest(tasks)?;
            let statuses = compute_statuses(&forest, key.as_deref())?;
            print_json(&statuses)
        }
        Command::Push { tasks } => {
            let forest = read_forest(tasks)?;
            let sync = SyncFacade::from_config(&sync_config(&cli)?);
            if !sync.is_available() {
                warn!("no transport configured; statuses stay local");
            }
            let statuses = compute_all(&forest);
            let report = sync.save_all(&statuses).await;
            info!(
                persisted = report.persisted,
                local_only = report.local_only.len(),
                "push finished"
            );
            print_json(&PushSummary {
                available: sync.is_available(),
                persisted: report.persisted,
                local_only: report.local_only,
            })
        }
        Command::Pull { keys } => {
            let sync = SyncFacade::from_config(&sync_config(&cli)?);
            let loaded: BTreeMap<String, TestStatus> =
                sync.load_many(keys).await.into_iter().collect();
            print_json(&loaded)
        }
        Command::Check { tasks } => {
            let forest = read_forest(tasks)?;
            check_forest(&forest)?;
            println!("ok: {} tasks, no cycles", forest.len());
            Ok(())
        }
    }
}

/// 環境変数を読み、フラグで上書きする
fn sync_config(cli: &Cli) -> Result<SyncConfig, CliError> {
    let mut config = SyncConfig::from_env()?;
    apply_overrides(&mut config, cli);
    Ok(config)
}

fn apply_overrides(config: &mut SyncConfig, cli: &Cli) {
    let overrides = [
        (&mut config.proxy_url, &cli.proxy_url),
        (&mut config.backend_url, &cli.backend_url),
        (&mut config.backend_key, &cli.backend_key),
        (&mut config.hostname, &cli.hostname),
    ];
    for (slot, flag) in overrides {
        if let Some(value) = flag {
            *slot = Some(value.clone());
        }
    }
}

fn read_forest(path: &Path) -> Result<Vec<Task>, CliError> {
    let raw = std::fs::read_to_string(path).map_err(|source| CliError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_forest(&raw).map_err(|source| CliError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn parse_forest(raw: &str) -> Result<Vec<Task>, serde_json::Error> {
    serde_json::from_str(raw)
}

fn compute_statuses(
    forest: &[Task],
    key: Option<&str>,
) -> Result<BTreeMap<String, TestStatus>, CliError> {
    match key {
        Some(key) => {
            let task = forest
                .iter()
                .find(|t| t.key == key)
                .ok_or_else(|| CliError::UnknownTask(key.to_string()))?;
            let index = ChildIndex::build(forest);
            Ok(BTreeMap::from([(task.key.clone(), compute(task, &index))]))
        }
        None => Ok(compute_all(forest).into_iter().collect()),
    }
}

fn check_forest(forest: &[Task]) -> Result<(), CliError> {
    match ChildIndex::build(forest).find_cycle() {
        Some(ids) => Err(CliError::Cycle(
            ids.iter().map(|id| id.as_str().to_string()).collect(),
        )),
        None => Ok(()),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), CliError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
