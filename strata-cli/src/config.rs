//! CLI configuration handling.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use strata_migrate::{DEFAULT_HISTORY_TABLE, MigrationConfig};

use crate::cli::Cli;
use crate::error::{CliError, CliResult};

/// Default config file name (looked up in the current directory)
pub const CONFIG_FILE_NAME: &str = "strata.toml";

/// Strata CLI configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Database configuration
    pub database: DatabaseConfig,

    /// History table configuration
    pub history: HistoryConfig,

    /// Output configuration
    pub output: OutputConfig,
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> CliResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Resolve the configuration for a CLI invocation.
    ///
    /// An explicit `--config` file must exist; otherwise `strata.toml` in
    /// `cwd` is used when present. Flags override file values.
    pub fn resolve(cli: &Cli, cwd: &Path) -> CliResult<Self> {
        let mut config = match &cli.config {
            Some(path) => {
                let path = resolve_path(cwd, path);
                if !path.exists() {
                    return Err(CliError::Config(format!(
                        "config file {} not found",
                        path.display()
                    )));
                }
                Self::load(&path)?
            }
            None => {
                let default = cwd.join(CONFIG_FILE_NAME);
                if default.exists() {
                    Self::load(&default)?
                } else {
                    Self::default()
                }
            }
        };

        if let Some(table) = &cli.history_table {
            config.history.table = table.clone();
        }
        if cli.no_color || std::env::var_os("NO_COLOR").is_some() {
            config.output.color = false;
        }
        if config.history.table.is_empty() {
            return Err(CliError::Config("history table name must not be empty".to_string()));
        }
        Ok(config)
    }

    /// Migration engine configuration for these settings
    pub fn migration_config(&self) -> MigrationConfig {
        MigrationConfig::new().history_table(self.history.table.clone())
    }
}

/// Database configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Database path or URL used when a command is given none
    pub url: Option<String>,

    /// Busy timeout in milliseconds
    pub busy_timeout_ms: Option<u32>,
}

/// History table configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Name of the schema history table
    pub table: String,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            table: DEFAULT_HISTORY_TABLE.to_string(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Use colors in human-readable output
    pub color: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { color: true }
    }
}

/// Resolve a path relative to `cwd` unless it is absolute
pub fn resolve_path(cwd: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        cwd.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.history.table, "_schema_history");
        assert!(config.output.color);
        assert!(config.database.url.is_none());
    }

    #[test]
    fn test_parse_partial_toml() {
        let config: Config = toml::from_str(
            r#"
            [database]
            url = "sqlite://app.db"

            [history]
            table = "versions"
            "#,
        )
        .unwrap();
        assert_eq!(config.database.url.as_deref(), Some("sqlite://app.db"));
        assert_eq!(config.history.table, "versions");
        assert!(config.output.color);
    }

    #[test]
    fn test_flags_override_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            "[history]\ntable = \"versions\"\n[output]\ncolor = true\n",
        )
        .unwrap();

        let cli = Cli::parse_from(["strata", "version"]);
        let config = Config::resolve(&cli, dir.path()).unwrap();
        assert_eq!(config.history.table, "versions");

        let cli = Cli::parse_from(["strata", "--history-table", "ledger", "--no-color", "version"]);
        let config = Config::resolve(&cli, dir.path()).unwrap();
        assert_eq!(config.history.table, "ledger");
        assert!(!config.output.color);
        assert_eq!(config.migration_config().history_table, "ledger");
    }

    #[test]
    fn test_missing_explicit_config() {
        let dir = tempfile::tempdir().unwrap();
        let cli = Cli::parse_from(["strata", "--config", "nope.toml", "version"]);
        assert!(matches!(Config::resolve(&cli, dir.path()), Err(CliError::Config(_))));
    }

    #[test]
    fn test_resolve_path() {
        let cwd = Path::new("/work");
        assert_eq!(resolve_path(cwd, Path::new("a.sql")), PathBuf::from("/work/a.sql"));
        assert_eq!(resolve_path(cwd, Path::new("/abs.sql")), PathBuf::from("/abs.sql"));
    }
}
