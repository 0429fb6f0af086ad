//! PrdPilot - code-grounded PRD assistant
//!
//! CLI entry point for serving the HTTP API and managing the project index.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Parser;
use eyre::{Context, Result, bail};
use tracing::{debug, info};

use prdpilot::cli::{Cli, Command};
use prdpilot::config::Config;
use prdpilot::project::{ProjectContext, ProjectIndexer};
use prdpilot::server::{self, ActiveProject, AppState};

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("prdpilot")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    // CLI --log-level > config file > INFO
    let level = match cli_log_level.or(config_log_level) {
        Some(s) => match s.to_uppercase().as_str() {
            "TRACE" => tracing::Level::TRACE,
            "DEBUG" => tracing::Level::DEBUG,
            "INFO" => tracing::Level::INFO,
            "WARN" | "WARNING" => tracing::Level::WARN,
            "ERROR" => tracing::Level::ERROR,
            _ => {
                eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", s);
                tracing::Level::INFO
            }
        },
        None => tracing::Level::INFO,
    };

    let log_file = fs::File::create(log_dir.join("prdpilot.log")).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_log_level = Config::load_log_level(cli.config.as_ref());
    setup_logging(cli.log_level.as_deref(), config_log_level.as_deref()).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    info!("PrdPilot loaded config: default={}", config.llm.default);

    debug!(command = ?cli.command, "main: dispatching command");
    match cli.command {
        Command::Serve {
            host,
            port,
            project,
            force_index,
        } => cmd_serve(&config, host, port, project.as_deref(), force_index).await,
        Command::Index { path, force } => cmd_index(&config, &path, force).await,
        Command::Ask { question } => cmd_ask(&config, &question).await,
    }
}

async fn cmd_serve(
    config: &Config,
    host: Option<String>,
    port: Option<u16>,
    project: Option<&Path>,
    force_index: bool,
) -> Result<()> {
    debug!(?host, ?port, ?project, force_index, "cmd_serve: called");
    let state = AppState::from_config(config)?;

    if let Some(path) = project {
        let (index, tree) = state
            .indexer
            .build_or_load(path, force_index)
            .await
            .context(format!("Failed to index {}", path.display()))?;
        state
            .project
            .replace(ActiveProject {
                context: Arc::new(index),
                tree,
            })
            .await;
        println!("Indexed {}", path.display());
    }

    let host = host.unwrap_or_else(|| config.server.host.clone());
    let port = port.unwrap_or(config.server.port);
    println!("Listening on http://{}:{}", host, port);
    server::serve(state, &host, port).await
}

async fn cmd_index(config: &Config, path: &Path, force: bool) -> Result<()> {
    debug!(path = %path.display(), force, "cmd_index: called");
    let indexer = ProjectIndexer::from_config(config);
    let (index, tree) = indexer.build_or_load(path, force).await?;

    if tree.is_error() {
        println!("Warning: project could not be ingested, fallback content was indexed");
    }
    println!("{}", tree.render());
    println!(
        "{} files, {} chunks in collection '{}'",
        tree.file_count(),
        index.chunk_count(),
        index.collection()
    );
    Ok(())
}

async fn cmd_ask(config: &Config, question: &str) -> Result<()> {
    debug!(%question, "cmd_ask: called");
    let indexer = ProjectIndexer::from_config(config);
    let Some(index) = indexer.open_existing().await? else {
        bail!("No project index found; run `pp index <PATH>` first");
    };

    println!("{}", index.query(question).await);
    Ok(())
}
