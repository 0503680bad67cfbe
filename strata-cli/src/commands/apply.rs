//! `strata apply` command - Provision a database from a schema file.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use strata_migrate::{ApplyOutcome, MigrationEngine, Schema};
use strata_sqlite::Context;

use crate::cli::ApplyArgs;
use crate::commands::{open_database, read_sql};
use crate::config::Config;
use crate::error::CliResult;
use crate::output::{self, ConsoleSink};

/// Run the apply command
pub async fn run(args: ApplyArgs, config: &Config, cwd: &Path) -> CliResult<()> {
    output::header("Apply");
    output::kv("Database", &args.database);
    output::kv("Schema", &args.schema.display().to_string());
    output::kv("History table", &config.history.table);
    output::newline();

    let sql = read_sql(cwd, &args.schema)?;
    let schema = Arc::new(Schema::new(sql));
    let ctx = match args.timeout {
        Some(secs) => Context::with_timeout(Duration::from_secs(secs)),
        None => Context::background(),
    };

    let engine = MigrationEngine::new(config.migration_config()).with_sink(Arc::new(ConsoleSink));
    let conn = open_database(&args.database, config, false).await?;
    let result = engine.apply_async(schema, &conn, ctx).await;
    conn.close().await?;
    let report = result?;

    for warning in &report.warnings {
        output::warn(warning);
    }
    output::newline();
    match report.outcome {
        ApplyOutcome::UpToDate => output::dim(&report.summary()),
        _ => output::success(&report.summary()),
    }
    Ok(())
}
