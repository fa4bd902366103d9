mod config;
mod observability;

use clap::{Parser, Subcommand};
use config::{Config, ConfigError};
use megaverse::bulk::GridPlan;
use megaverse::errors::{BulkError, ResetError};
use megaverse::types::{BulkOperation, RunSummary};
use megaverse::{Megaverse, MegaverseError};
use observability::ObservabilityError;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "megaverse", about = "Builds megaverse maps against the challenge API")]
struct Cli {
    /// YAML config file. Environment variables, and a `.env` file in the
    /// working directory, override its values.
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Subcommand)]
enum CliCommand {
    /// Run the HTTP API
    Serve,
    /// Delete a Polyanet at every cell of the grid
    Reset {
        #[arg(long)]
        grid_size: Option<u32>,
        #[arg(long)]
        delay_ms: Option<u64>,
    },
    /// Apply a goal map: JSON `{"goal": [[...]]}` or a bare matrix of labels
    Plan {
        file: PathBuf,
        #[arg(long)]
        delay_ms: Option<u64>,
    },
    /// Run a JSON list of create/delete operations in order
    Bulk {
        file: PathBuf,
        #[arg(long)]
        delay_ms: Option<u64>,
    },
}

#[derive(thiserror::Error, Debug)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Observability(#[from] ObservabilityError),
    #[error(transparent)]
    Megaverse(#[from] MegaverseError),
    #[error(transparent)]
    Gateway(#[from] gateway::errors::GatewayError),
    #[error(transparent)]
    Reset(#[from] ResetError),
    #[error(transparent)]
    Bulk(#[from] BulkError),
    #[error("could not read {}: {source}", .path.display())]
    ReadInput {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not parse {}: {source}", .path.display())]
    ParseInput {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("could not start runtime: {0}")]
    Runtime(std::io::Error),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PlanFile {
    Goal { goal: GridPlan },
    Matrix(GridPlan),
}

impl PlanFile {
    fn into_plan(self) -> GridPlan {
        match self {
            PlanFile::Goal { goal } => goal,
            PlanFile::Matrix(plan) => plan,
        }
    }
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T, CliError> {
    let data = std::fs::read(path).map_err(|source| CliError::ReadInput {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_slice(&data).map_err(|source| CliError::ParseInput {
        path: path.to_path_buf(),
        source,
    })
}

fn report(summary: RunSummary) {
    tracing::info!(
        applied = summary.applied,
        skipped = summary.skipped,
        "Run finished"
    );
}

async fn execute(command: CliCommand, config: Config) -> Result<(), CliError> {
    let megaverse = Megaverse::new(&config.megaverse()?)?;

    match command {
        CliCommand::Serve => {
            let gateway_config = config.gateway()?;
            tracing::info!(
                listener = %gateway_config.listener.address(),
                admin_listener = %gateway_config.admin_listener.address(),
                "Starting gateway"
            );
            gateway::run(gateway_config, megaverse).await?;
        }
        CliCommand::Reset {
            grid_size,
            delay_ms,
        } => {
            let summary = megaverse
                .reset_grid(grid_size, delay_ms.map(Duration::from_millis))
                .await?;
            report(summary);
        }
        CliCommand::Plan { file, delay_ms } => {
            let plan = read_json::<PlanFile>(&file)?.into_plan();
            let summary = megaverse
                .run_grid_plan(&plan, delay_ms.map(Duration::from_millis))
                .await?;
            report(summary);
        }
        CliCommand::Bulk { file, delay_ms } => {
            let operations: Vec<BulkOperation> = read_json(&file)?;
            let summary = megaverse
                .run_bulk_operations(&operations, delay_ms.map(Duration::from_millis))
                .await?;
            report(summary);
        }
    }

    Ok(())
}

fn run(cli: Cli) -> Result<(), CliError> {
    let dotenv = config::read_dotenv(Path::new(config::DOTENV_FILE))?;
    let env = config::env_with_dotenv(|name| std::env::var(name).ok(), dotenv);
    let config = Config::load(cli.config.as_deref(), env)?;

    let _sentry_guard = observability::init_logging(config.common.logging.as_ref())?;
    if let Some(metrics_config) = &config.common.metrics {
        observability::init_metrics(metrics_config)?;
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(CliError::Runtime)?;

    runtime.block_on(execute(cli.command, config))
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "megaverse failed");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
