#![forbid(unsafe_code)]

//! `agent-courier` — chat bridge daemon binary.
//!
//! Bootstraps configuration, the durable session store, and the
//! orchestrator, then reads prompts from stdin as a stand-in front-end
//! until the real chat transport is wired up. Slash commands: `/cancel`,
//! `/status`, `/end`, `/new`, `/history`.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use agent_courier::config::GlobalConfig;
use agent_courier::delivery::log::{FsCleanup, LogDelivery};
use agent_courier::orchestrator::Orchestrator;
use agent_courier::runner::launcher::CliLauncher;
use agent_courier::store::{db, session_store::SessionStore};
use agent_courier::{AppError, Result};

/// User and chat identity for the local stdin front-end.
const LOCAL_USER: &str = "local";

#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "agent-courier", about = "Chat bridge for a headless AI coding CLI", version, long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long)]
    config: PathBuf,

    /// Log output format (text or json).
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    /// Override the configured workspace root.
    #[arg(long)]
    workspace: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(args.log_format)?;
    info!("agent-courier bootstrap");

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| AppError::Config(format!("failed to build tokio runtime: {err}")))?
        .block_on(run(args))
}

async fn run(args: Cli) -> Result<()> {
    let config_text = std::fs::read_to_string(&args.config)
        .map_err(|err| AppError::Config(format!("cannot read config: {err}")))?;
    let mut config = GlobalConfig::from_toml_str(&config_text)?;

    if let Some(ws) = args.workspace {
        config.workspace_root = ws
            .canonicalize()
            .map_err(|err| AppError::Config(format!("invalid workspace override: {err}")))?;
    }
    let config = Arc::new(config);
    info!(workspace = %config.workspace_root.display(), "configuration loaded");

    let pool = db::connect(config.db_path()).await?;
    info!("database connected");

    let orchestrator = Arc::new(Orchestrator::new(
        Arc::clone(&config),
        SessionStore::new(pool),
        Arc::new(LogDelivery),
        Arc::new(FsCleanup),
        Arc::new(CliLauncher),
    ));

    let repl = tokio::spawn(stdin_repl(Arc::clone(&orchestrator)));

    tokio::signal::ctrl_c()
        .await
        .map_err(|err| AppError::Io(err.to_string()))?;
    info!("shutdown signal received");

    repl.abort();
    orchestrator.shutdown_all().await;
    info!("all assistant processes stopped");
    Ok(())
}

/// Minimal interactive front-end: one line is one user turn.
async fn stdin_repl(orchestrator: Arc<Orchestrator>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(err) => {
                error!(%err, "stdin read failed");
                break;
            }
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let outcome = match line {
            "/cancel" => orchestrator.cancel(LOCAL_USER).await,
            "/end" => orchestrator.end(LOCAL_USER).await,
            "/new" => orchestrator.reset(LOCAL_USER, LOCAL_USER).await.map(|_| ()),
            "/status" => match orchestrator.status(LOCAL_USER).await {
                Ok(snapshot) => {
                    info!(?snapshot, "session status");
                    Ok(())
                }
                Err(err) => Err(err),
            },
            "/history" => match orchestrator.history(LOCAL_USER).await {
                Ok(ids) => {
                    info!(?ids, "prior sessions");
                    Ok(())
                }
                Err(err) => Err(err),
            },
            prompt => orchestrator.send(LOCAL_USER, LOCAL_USER, prompt).await,
        };

        if let Err(err) = outcome {
            warn!(%err, "command failed");
        }
    }
}

fn init_tracing(format: LogFormat) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = fmt().with_env_filter(filter);
    let result = match format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    result.map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))
}
