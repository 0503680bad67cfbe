//! CLI error types and result alias.

use miette::Diagnostic;
use strata_migrate::MigrationError;
use strata_sqlite::SqliteError;
use thiserror::Error;

/// Result type alias for CLI operations
pub type CliResult<T> = Result<T, CliError>;

/// CLI error types
#[derive(Error, Debug, Diagnostic)]
pub enum CliError {
    /// IO error
    #[error("IO error: {0}")]
    #[diagnostic(code(strata::io))]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    #[diagnostic(code(strata::config))]
    Config(String),

    /// Database error
    #[error("Database error: {0}")]
    #[diagnostic(code(strata::database))]
    Database(String),

    /// Migration error
    #[error("Migration error: {0}")]
    #[diagnostic(code(strata::migration))]
    Migration(String),

    /// The database does not match the schema
    #[error("{0}")]
    #[diagnostic(code(strata::mismatch), help("run `strata diff --rule` to draft an update rule"))]
    Mismatch(String),

    /// Command error
    #[error("Command error: {0}")]
    #[diagnostic(code(strata::command))]
    Command(String),
}

impl From<toml::de::Error> for CliError {
    fn from(err: toml::de::Error) -> Self {
        CliError::Config(format!("Failed to parse TOML: {}", err))
    }
}

impl From<SqliteError> for CliError {
    fn from(err: SqliteError) -> Self {
        CliError::Database(err.to_string())
    }
}

impl From<MigrationError> for CliError {
    fn from(err: MigrationError) -> Self {
        CliError::Migration(err.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(err: serde_json::Error) -> Self {
        CliError::Command(format!("Failed to encode JSON: {}", err))
    }
}
