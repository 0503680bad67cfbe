//! CLI argument definitions using clap.

use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;

/// Strata CLI - schema version control for SQLite
#[derive(Parser, Debug)]
#[command(name = "strata")]
#[command(version)]
#[command(about = "Strata CLI - schema version control for SQLite", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to a configuration file (defaults to ./strata.toml if present)
    #[arg(long, global = true, env = "STRATA_CONFIG")]
    pub config: Option<PathBuf>,

    /// Name of the schema history table
    #[arg(long, global = true)]
    pub history_table: Option<String>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the schema digest of a database or SQL file
    Digest(DigestArgs),

    /// Compare a database with a SQL schema file
    Diff(DiffArgs),

    /// Show the schema history recorded in a database
    History(HistoryArgs),

    /// Apply a SQL schema file to a new or matching database
    Apply(ApplyArgs),

    /// Display version information
    Version,
}

// =============================================================================
// Digest Command
// =============================================================================

/// Arguments for the `digest` command
#[derive(Args, Debug)]
pub struct DigestArgs {
    /// Database path or URL, or a SQL file (defaults to the configured database)
    pub path: Option<String>,

    /// Treat the input as SQL text regardless of its extension
    #[arg(long)]
    pub sql: bool,
}

// =============================================================================
// Diff Command
// =============================================================================

/// Arguments for the `diff` command
#[derive(Args, Debug)]
pub struct DiffArgs {
    /// Database path or URL
    pub database: String,

    /// SQL schema file
    pub schema: PathBuf,

    /// Print a Rust update rule stub instead of failing on a difference
    #[arg(long)]
    pub rule: bool,
}

// =============================================================================
// History Command
// =============================================================================

/// Arguments for the `history` command
#[derive(Args, Debug)]
pub struct HistoryArgs {
    /// Database path or URL
    pub database: String,

    /// Digest prefixes to show, or `latest` for the newest record only
    pub filters: Vec<String>,

    /// Print one JSON object per record
    #[arg(long)]
    pub json: bool,
}

// =============================================================================
// Apply Command
// =============================================================================

/// Arguments for the `apply` command
#[derive(Args, Debug)]
pub struct ApplyArgs {
    /// Database path or URL
    pub database: String,

    /// SQL schema file
    pub schema: PathBuf,

    /// Give up after this many seconds
    #[arg(long)]
    pub timeout: Option<u64>,
}
