use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

use trivia_offline::commands;
use trivia_offline::config::{self, Config};
use trivia_offline::context::OfflineContext;
use trivia_offline::error::Result;
use trivia_offline::orchestrator::OfflineOrchestrator;
use trivia_offline::questions::{
    BundledSource, FallbackDataset, HttpQuestionSource, QuestionSource,
};

#[derive(Parser, Debug)]
#[command(name = "trivia-offline")]
#[command(about = "Offline question cache and sync for the trivia game", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Path to configuration file (YAML/JSON/TOML)
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    /// Treat the host as offline
    #[arg(long, global = true)]
    offline: bool,
}

#[derive(Debug, clap::Subcommand)]
enum Command {
    /// Download the full question list into the offline cache
    Download,
    /// Show connectivity, cache state and last sync time
    Status {
        /// Also print prometheus metrics
        #[arg(long)]
        metrics: bool,
    },
    /// Remove the cached question set and sync time
    Clear,
    /// Load the questions a game would start with
    Load {
        /// Print every question
        #[arg(long)]
        list: bool,
    },
    /// Record an answered question
    Answer {
        question_id: String,
        /// The answer was correct
        #[arg(long)]
        correct: bool,
        /// Seconds taken to answer
        #[arg(long, default_value_t = 0.0)]
        time_taken: f64,
    },
    /// Show the local answer history
    History {
        /// Only show the most recent entries
        #[arg(short, long)]
        limit: Option<usize>,
    },
    /// Check configuration
    Check {
        /// Install the worker against the configured origin
        #[arg(long)]
        install: bool,
        /// Fetch the question list from the remote source
        #[arg(long)]
        remote: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.debug { "debug" } else { "info" };
    let directive = format!("trivia_offline={log_level}")
        .parse()
        .unwrap_or_else(|_| tracing_subscriber::filter::LevelFilter::INFO.into());
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(directive))
        .with_writer(std::io::stderr)
        .init();

    let config = match &args.config {
        Some(path) => {
            info!("Loading configuration from: {}", path.display());
            config::load_from_path(path).await.inspect_err(|e| {
                error!(
                    "Failed to load configuration from {}: {}",
                    path.display(),
                    e
                )
            })?
        }
        None => config::load_from_env_or_file()
            .await
            .inspect_err(|e| error!("Failed to load configuration: {}", e))?,
    };

    if let Command::Check { install, remote } = args.command {
        return commands::run_config_check(config, install, remote).await;
    }

    let orchestrator = build_orchestrator(&config, !args.offline)?;
    orchestrator.start().await?;

    let result = match args.command {
        Command::Download => commands::run_download(&orchestrator).await,
        Command::Status { metrics } => commands::run_status(&orchestrator, metrics).await,
        Command::Clear => commands::run_clear(&orchestrator).await,
        Command::Load { list } => commands::run_load(&orchestrator, list).await,
        Command::Answer {
            question_id,
            correct,
            time_taken,
        } => commands::run_answer(&orchestrator, question_id, correct, time_taken).await,
        Command::History { limit } => commands::run_history(&orchestrator, limit).await,
        Command::Check { .. } => Ok(()),
    };

    orchestrator.stop();
    orchestrator.context().shutdown();
    result
}

fn build_orchestrator(config: &Config, online: bool) -> Result<Arc<OfflineOrchestrator>> {
    let context = Arc::new(OfflineContext::from_config(config, online)?);

    let source: Arc<dyn QuestionSource> = if config.remote.is_configured() {
        let source = HttpQuestionSource::from_config(&config.remote)?;
        info!("Using remote question source at {}", source.endpoint());
        Arc::new(source)
    } else {
        info!("No remote source configured, serving the bundled set");
        Arc::new(BundledSource::default())
    };

    Ok(OfflineOrchestrator::new(
        context,
        source,
        FallbackDataset::bundled(),
        config.sync.clone(),
    ))
}
