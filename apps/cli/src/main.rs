//! TuneDeck CLI - terminal front end for the fine-tuning simulator
//!
//! Provides a `tunedeck` command that validates datasets, runs simulated training
//! jobs with live progress, and exports or deploys the result.

mod commands;
mod config;

use clap::{CommandFactory, Parser, Subcommand};
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use commands::train::TrainArgs;

/// TuneDeck - mock fine-tuning dashboard
#[derive(Parser, Debug)]
#[command(name = "tunedeck", author, version, about = "TuneDeck - simulated model fine-tuning")]
struct Args {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    /// Extra configuration file, applied after ~/.tunedeck/config.toml and ./.tunedeckrc
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Validate a dataset file
    ///
    /// Accepts .csv, .jsonl, .json and .txt files and reports whether they can be
    /// used for training.
    Validate {
        file: PathBuf,

        /// Output results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run a simulated training job on a dataset file
    Train(TrainArgs),

    /// List export formats and deployment targets
    Catalog {
        /// Output results as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let cli_config = config::CliConfig::discover_and_load(args.config.as_deref())?;

    let level_name = args.log_level.as_deref().or(cli_config.log_level.as_deref()).unwrap_or("warn");
    let level = match level_name {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "error" => Level::ERROR,
        _ => Level::WARN,
    };

    // Logs go to stderr so `--json` output stays machine-readable.
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .without_time()
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let Some(command) = args.command else {
        Args::command().print_help()?;
        return Ok(());
    };

    match command {
        Command::Validate { file, json } => commands::validate::execute(&file, json).await,
        Command::Train(train) => commands::train::execute(train, &cli_config).await,
        Command::Catalog { json } => commands::catalog::execute(&cli_config, json).await,
    }
}
