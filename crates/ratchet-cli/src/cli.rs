//! CLI argument definitions using clap derive API

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Ratchet - forward-only schema migrations
#[derive(Parser, Debug)]
#[command(name = "ratchet")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Global options
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Global arguments available to all commands
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to project directory
    #[arg(short = 'p', long, global = true, default_value = ".")]
    pub project_dir: PathBuf,

    /// Override the migrations directory
    #[arg(short, long, global = true)]
    pub directory: Option<PathBuf>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Migrate the database
    Migrate(MigrateArgs),
}

/// Arguments for the migrate command group
#[derive(Args, Debug)]
pub struct MigrateArgs {
    #[command(subcommand)]
    pub command: MigrateCommands,
}

/// Migration subcommands
#[derive(Subcommand, Debug)]
pub enum MigrateCommands {
    /// Create the next sequential migration file
    Create(CreateArgs),

    /// Apply all or N pending migrations
    Up(UpArgs),

    /// Print the current migration version
    Version,

    /// Print the migration history
    History(HistoryArgs),

    /// Clean up the history after a failed migration
    Repair,

    /// Initialise or reset the migration lock
    SetupLock,
}

/// Arguments for migrate create
#[derive(Args, Debug)]
pub struct CreateArgs {
    /// Migration name ([A-Za-z0-9_-] only)
    pub name: Option<String>,

    /// Version interval for the new migration
    #[arg(long)]
    pub interval: Option<u64>,

    /// Width of the zero-padded version prefix
    #[arg(long)]
    pub zero_prefix_length: Option<usize>,
}

/// Arguments for migrate up
#[derive(Args, Debug)]
pub struct UpArgs {
    /// Apply at most N migrations (default: all)
    pub limit: Option<i64>,

    /// Versions to skip during migration
    #[arg(long, value_delimiter = ',')]
    pub skip_versions: Vec<u64>,

    /// Route partition-safe UPDATE/DELETE files through partitioned DML
    #[arg(long)]
    pub detect_partitioned_dml: bool,

    /// Worker count for partitioned DML
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Print the rows affected by each DML migration
    #[arg(long)]
    pub print_rows_affected: bool,
}

/// Arguments for migrate history
#[derive(Args, Debug)]
pub struct HistoryArgs {
    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,
}

/// Output formats for history
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Human-readable table (default)
    #[default]
    Text,
    /// Machine-readable JSON
    Json,
}

#[cfg(test)]
#[path = "cli_test.rs"]
mod tests;
