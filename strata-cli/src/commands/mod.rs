//! CLI command implementations.

use std::path::Path;

use strata_sqlite::{SqliteConfig, SqliteConnection};

use crate::config::{Config, resolve_path};
use crate::error::{CliError, CliResult};

pub mod apply;
pub mod diff;
pub mod digest;
pub mod history;
pub mod version;

/// Whether `target` names a SQL text file rather than a database
pub fn is_sql_file(target: &str) -> bool {
    Path::new(target)
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("sql"))
}

/// Read a schema file, resolving relative paths against `cwd`
pub fn read_sql(cwd: &Path, path: &Path) -> CliResult<String> {
    let path = resolve_path(cwd, path);
    std::fs::read_to_string(&path)
        .map_err(|e| CliError::Command(format!("cannot read {}: {}", path.display(), e)))
}

/// Connection settings for a database path or URL.
///
/// The configured busy timeout applies unless the URL sets its own.
pub fn database_config(target: &str, config: &Config, read_only: bool) -> CliResult<SqliteConfig> {
    let mut sqlite = SqliteConfig::from_url(target)?;
    if let Some(ms) = config.database.busy_timeout_ms {
        if !target.contains("busy_timeout=") {
            sqlite = sqlite.busy_timeout(ms);
        }
    }
    if read_only {
        sqlite = sqlite.read_only(true);
    }
    Ok(sqlite)
}

/// Open the database at `target`
pub async fn open_database(target: &str, config: &Config, read_only: bool) -> CliResult<SqliteConnection> {
    let sqlite = database_config(target, config, read_only)?;
    Ok(SqliteConnection::open(&sqlite).await?)
}
