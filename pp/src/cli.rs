//! CLI command definitions and subcommands

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// PrdPilot - code-grounded PRD assistant
#[derive(Parser)]
#[command(
    name = "pp",
    about = "Turn a PM conversation into a PRD, user stories and a technical plan grounded in your codebase",
    version
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(
        short = 'l',
        long = "log-level",
        global = true,
        help = "Log level (TRACE, DEBUG, INFO, WARN, ERROR)"
    )]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start the HTTP server
    Serve {
        /// Address to bind (overrides config)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind (overrides config)
        #[arg(short, long)]
        port: Option<u16>,

        /// Index this project before accepting requests
        #[arg(long, value_name = "PATH")]
        project: Option<PathBuf>,

        /// Rebuild the index even if one exists
        #[arg(long, requires = "project")]
        force_index: bool,
    },

    /// Build or load the project index and print its file tree
    Index {
        /// Project root
        path: PathBuf,

        /// Rebuild the index even if one exists
        #[arg(short, long)]
        force: bool,
    },

    /// Ask one question against the persisted index
    Ask {
        /// Natural-language question
        question: String,
    },
}
