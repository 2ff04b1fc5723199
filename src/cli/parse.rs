//! CLI parse: clap types for recsync. No behavior; definitions only.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Recsync CLI - Idempotent seeding of related records on a remote API
#[derive(Parser)]
#[command(name = "recsync")]
#[command(about = "Bring related records on a remote record API up to target counts")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Workspace directory holding recsync.toml
    #[arg(long, default_value = ".")]
    pub workspace: PathBuf,

    /// Configuration file path (overrides default config loading)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging (default: off)
    #[arg(long, default_value = "false")]
    pub verbose: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file)
    #[arg(long)]
    pub log_output: Option<String>,

    /// Log file path (if output is "file")
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create records until every configured target count is met
    Seed {
        /// Approve submission prompts without asking
        #[arg(long)]
        yes: bool,
        /// Seed a single entity type (its parents are resolved as context)
        #[arg(long)]
        only: Option<String>,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Delete every record in scope for the configured targets, children first
    Purge {
        /// Approve deletion prompts without asking
        #[arg(long)]
        yes: bool,
        /// Purge a single entity type
        #[arg(long)]
        only: Option<String>,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Show existing counts and deltas without writing anything
    Status {
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Validate configuration and the dependency plan
    Validate,
}
