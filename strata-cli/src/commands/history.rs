//! `strata history` command - Show the schema history ledger.

use chrono::SecondsFormat;
use strata_migrate::{HistoryRecord, HistoryStore, MigrateResult};

use crate::cli::HistoryArgs;
use crate::commands::open_database;
use crate::config::Config;
use crate::error::{CliError, CliResult};

/// Run the history command
pub async fn run(args: HistoryArgs, config: &Config) -> CliResult<()> {
    let store = HistoryStore::new(config.history.table.clone());
    let table = store.table().to_string();

    let conn = open_database(&args.database, config, true).await?;
    let records = conn
        .call(move |c| -> MigrateResult<Option<Vec<HistoryRecord>>> {
            if !store.exists(c)? {
                return Ok(None);
            }
            store.read_all(c).map(Some)
        })
        .await??;
    conn.close().await?;

    let Some(records) = records else {
        return Err(CliError::Command(format!(
            "no history table \"{}\" in {}",
            table, args.database
        )));
    };

    for record in select(&records, &args.filters) {
        if args.json {
            println!("{}", serde_json::to_string(record)?);
        } else {
            println!("{}", format_record(record));
        }
    }
    Ok(())
}

/// Records matching `filters`, oldest first.
///
/// With no filters every record matches. `latest` selects the newest record
/// and any other filter is a digest prefix.
pub fn select<'a>(records: &'a [HistoryRecord], filters: &[String]) -> Vec<&'a HistoryRecord> {
    if filters.is_empty() {
        return records.iter().collect();
    }
    let latest = filters.iter().any(|f| f == "latest");
    let last = records.len().saturating_sub(1);

    records
        .iter()
        .enumerate()
        .filter(|(i, record)| {
            (latest && *i == last)
                || filters
                    .iter()
                    .filter(|f| f.as_str() != "latest")
                    .any(|prefix| record.digest.starts_with(prefix.as_str()))
        })
        .map(|(_, record)| record)
        .collect()
}

/// One tab-separated history line
pub fn format_record(record: &HistoryRecord) -> String {
    let size = record.schema.as_ref().map_or(0, String::len);
    format!(
        "{}\t{}\t[{} bytes]",
        record.timestamp.to_rfc3339_opts(SecondsFormat::Micros, true),
        record.digest,
        size
    )
}
