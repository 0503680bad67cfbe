//! `strata digest` command - Print a schema digest.

use std::path::Path;

use strata_migrate::{db_digest_with, sql_digest_with};
use strata_sqlite::Context;

use crate::cli::DigestArgs;
use crate::commands::{is_sql_file, open_database, read_sql};
use crate::config::Config;
use crate::error::{CliError, CliResult};

/// Run the digest command
pub async fn run(args: DigestArgs, config: &Config, cwd: &Path) -> CliResult<()> {
    let target = args
        .path
        .or_else(|| config.database.url.clone())
        .ok_or_else(|| {
            CliError::Command("no path given and no [database] url configured".to_string())
        })?;
    let reader = config.migration_config().catalog_reader();

    if args.sql || is_sql_file(&target) {
        let sql = read_sql(cwd, Path::new(&target))?;
        let digest = sql_digest_with(&sql, &reader, &Context::background())?;
        println!("sql: {}", digest);
        return Ok(());
    }

    let conn = open_database(&target, config, true).await?;
    let digest = conn.call(move |c| db_digest_with(c, &reader, &Context::background())).await??;
    conn.close().await?;
    println!("db:  {}", digest);
    Ok(())
}
