//! `strata diff` command - Compare a database with a schema file.

use std::path::Path;

use strata_migrate::{SchemaRow, diff_schema, load_schema, schema_digest};
use strata_sqlite::Context;

use crate::cli::DiffArgs;
use crate::commands::{open_database, read_sql};
use crate::config::Config;
use crate::error::{CliError, CliResult};

/// Run the diff command
pub async fn run(args: DiffArgs, config: &Config, cwd: &Path) -> CliResult<()> {
    let reader = config.migration_config().catalog_reader();
    let sql = read_sql(cwd, &args.schema)?;
    let want = load_schema(&reader, &sql, &Context::background())?;

    let conn = open_database(&args.database, config, true).await?;
    let got: Vec<SchemaRow> = conn.call(move |c| reader.read(c)).await??;
    conn.close().await?;

    let db = schema_digest(&got)?;
    let target = schema_digest(&want)?;
    let diff = diff_schema(&got, &want);

    if args.rule {
        if db == target {
            return Err(CliError::Command(
                "database already matches the schema, no rule needed".to_string(),
            ));
        }
        print!("{}", rule_stub(&db, &target, &diff));
        return Ok(());
    }

    println!("db:  {}", db);
    println!("sql: {}", target);
    if db == target {
        return Ok(());
    }
    println!("{}", diff.trim_end());
    Err(CliError::Mismatch("database does not match the schema".to_string()))
}

/// Render a Rust update rule with the diff as comments in its body.
pub fn rule_stub(source: &str, target: &str, diff: &str) -> String {
    let mut out = String::new();
    out.push_str("UpdateRule::from_fn(\n");
    out.push_str(&format!("    \"{}\",\n", source));
    out.push_str(&format!("    \"{}\",\n", target));
    out.push_str("    |ctx, tx| {\n");
    for line in diff.trim().lines() {
        if line.is_empty() {
            out.push_str("        //\n");
        } else {
            out.push_str(&format!("        // {}\n", line));
        }
    }
    out.push_str("        todo!()\n");
    out.push_str("    },\n");
    out.push_str("),\n");
    out
}
