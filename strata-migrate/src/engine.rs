//! Migration engine implementation.
//!
//! [`MigrationEngine::apply`] brings a database to the current version of a
//! [`Schema`] inside a single transaction:
//!
//! 1. The definition is checked before the database is touched.
//! 2. The ledger table is created if missing, and the live digest and
//!    history are read.
//! 3. With an empty ledger, an empty database gets the current text, a
//!    database that already matches it is adopted, anything else is refused.
//! 4. If the newest ledger entry already has the current digest there is
//!    nothing to do.
//! 5. Otherwise the update rules are run from the last one whose source is
//!    the live digest, each confirmed against its target digest.
//!
//! Any failure rolls the whole transaction back.

use std::sync::Arc;
use std::time::Instant;

use rusqlite::{Connection, Transaction};
use strata_sqlite::{Context, SqliteConnection};
use tracing::{debug, warn};

use crate::catalog::{CatalogReader, MAIN_CATALOG};
use crate::digest::{live_digest, schema_digest};
use crate::error::{MigrateResult, MigrationError};
use crate::history::{DEFAULT_HISTORY_TABLE, HistoryRecord, HistoryStore, SchemaCodec, next_timestamp};
use crate::log::{LogSink, RuleContext, TracingSink};
use crate::schema::{Schema, check_with};

/// Configuration for the migration engine.
#[derive(Debug, Clone)]
pub struct MigrationConfig {
    /// Name of the ledger table.
    pub history_table: String,
    /// Catalog root holding the managed schema.
    pub catalog: String,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            history_table: DEFAULT_HISTORY_TABLE.to_string(),
            catalog: MAIN_CATALOG.to_string(),
        }
    }
}

impl MigrationConfig {
    /// Create a new configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the ledger table name.
    pub fn history_table(mut self, table: impl Into<String>) -> Self {
        self.history_table = table.into();
        self
    }

    /// Set the catalog root.
    pub fn catalog(mut self, catalog: impl Into<String>) -> Self {
        self.catalog = catalog.into();
        self
    }

    /// A catalog reader matching this configuration.
    pub fn catalog_reader(&self) -> CatalogReader {
        CatalogReader::new()
            .root(self.catalog.clone())
            .history_table(self.history_table.clone())
    }
}

/// What an apply call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// The ledger already recorded the current version.
    UpToDate,
    /// An empty database received the current schema.
    Initialized,
    /// An unrecorded database already matching the current schema was recorded.
    Adopted,
    /// One or more update rules were run.
    Upgraded,
}

/// Result of an apply call.
#[derive(Debug, Clone)]
pub struct ApplyReport {
    /// What happened.
    pub outcome: ApplyOutcome,
    /// Newest ledger digest before the call, if there was one.
    pub from_digest: Option<String>,
    /// Digest of the current schema.
    pub to_digest: String,
    /// 1-based indexes of the rules that ran.
    pub applied: Vec<usize>,
    /// Warnings generated during the call.
    pub warnings: Vec<String>,
    /// Total duration in milliseconds.
    pub duration_ms: i64,
}

impl ApplyReport {
    fn new(outcome: ApplyOutcome, from_digest: Option<String>, to_digest: &str) -> Self {
        Self {
            outcome,
            from_digest,
            to_digest: to_digest.to_string(),
            applied: Vec::new(),
            warnings: Vec::new(),
            duration_ms: 0,
        }
    }

    /// Check if the database was changed.
    pub fn has_changes(&self) -> bool {
        self.outcome != ApplyOutcome::UpToDate
    }

    /// Get a summary of the result.
    pub fn summary(&self) -> String {
        let short = short_digest(&self.to_digest);
        match self.outcome {
            ApplyOutcome::UpToDate => format!("Schema is up-to-date at {}", short),
            ApplyOutcome::Initialized => {
                format!("Initialized schema {} in {}ms", short, self.duration_ms)
            }
            ApplyOutcome::Adopted => format!("Adopted existing schema {}", short),
            ApplyOutcome::Upgraded => format!(
                "{} upgrades applied, now at {} in {}ms",
                self.applied.len(),
                short,
                self.duration_ms
            ),
        }
    }
}

fn short_digest(digest: &str) -> &str {
    digest.get(..12).unwrap_or(digest)
}

/// A read-only view of where a database stands.
#[derive(Debug, Clone)]
pub struct MigrationStatus {
    /// Digest of the current schema.
    pub current_digest: String,
    /// Digest of the live database.
    pub live_digest: String,
    /// Newest ledger record.
    pub latest: Option<HistoryRecord>,
    /// Whether the live database holds any objects.
    pub live_is_empty: bool,
    /// Rules that would run, or `None` if no rule starts at the live digest.
    pub pending: Option<usize>,
}

impl MigrationStatus {
    /// Check whether the ledger records the current version.
    pub fn is_up_to_date(&self) -> bool {
        self.latest
            .as_ref()
            .is_some_and(|r| r.digest == self.current_digest)
    }

    /// Check whether the database has objects but no ledger entries that
    /// explain them.
    pub fn is_unmanaged(&self) -> bool {
        self.latest.is_none() && !self.live_is_empty && self.live_digest != self.current_digest
    }

    /// Check whether an apply call would fail with no matching update rule.
    pub fn is_stale(&self) -> bool {
        self.latest.is_some() && !self.is_up_to_date() && self.pending.is_none()
    }
}

/// The migration engine.
#[derive(Clone)]
pub struct MigrationEngine {
    config: MigrationConfig,
    sink: Arc<dyn LogSink>,
    history: HistoryStore,
}

impl Default for MigrationEngine {
    fn default() -> Self {
        Self::new(MigrationConfig::default())
    }
}

impl MigrationEngine {
    /// Create a new migration engine.
    pub fn new(config: MigrationConfig) -> Self {
        let history = HistoryStore::new(config.history_table.clone());
        Self {
            config,
            sink: Arc::new(TracingSink),
            history,
        }
    }

    /// Report progress to `sink` instead of `tracing`.
    pub fn with_sink(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Store schema text in the ledger using `codec`.
    pub fn with_codec(mut self, codec: Arc<dyn SchemaCodec>) -> Self {
        self.history = self.history.with_codec(codec);
        self
    }

    /// Get the configuration.
    pub fn config(&self) -> &MigrationConfig {
        &self.config
    }

    /// Get the history store.
    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    fn log(&self, message: impl AsRef<str>) {
        self.sink.log(message.as_ref());
    }

    /// Bring the database behind `conn` to the current version of `schema`.
    pub fn apply(&self, schema: &Schema, conn: &Connection, ctx: &Context) -> MigrateResult<ApplyReport> {
        let start = Instant::now();
        let reader = self.config.catalog_reader();

        let current = check_with(schema, &reader, ctx)?;
        ctx.check()?;
        self.log("Checking schema version...");

        let guard = ctx.attach(conn);
        let tx = conn.unchecked_transaction()?;
        let result = self.apply_in(schema, &tx, ctx, &reader, &current);
        drop(guard);

        let mut report = match result {
            Ok(report) => report,
            Err(err) => {
                if let Err(e) = tx.rollback() {
                    warn!(error = %e, "Rollback failed");
                }
                return Err(settle(err, ctx));
            }
        };

        ctx.check()?;
        tx.commit()?;

        report.duration_ms = start.elapsed().as_millis() as i64;
        if report.outcome == ApplyOutcome::Upgraded {
            self.log(format!("Schema successfully updated to digest {}", current));
        }
        debug!(summary = %report.summary(), "Apply finished");
        Ok(report)
    }

    fn apply_in(
        &self,
        schema: &Schema,
        tx: &Transaction<'_>,
        ctx: &Context,
        reader: &CatalogReader,
        current: &str,
    ) -> MigrateResult<ApplyReport> {
        self.history.ensure_table(tx)?;
        let rows = reader.read(tx)?;
        let live = schema_digest(&rows)?;
        let history = self.history.read_all(tx)?;

        let Some(latest) = history.last() else {
            if rows.is_empty() {
                self.log(format!("No schema is defined, applying initial schema {}", current));
                tx.execute_batch(&schema.current).map_err(MigrationError::Bootstrap)?;
                ctx.check()?;
                let got = live_digest(tx, reader)?;
                if got != current {
                    return Err(MigrationError::Confirmation {
                        step: "initial schema".to_string(),
                        expected: current.to_string(),
                        actual: got,
                    });
                }
                self.record(tx, None, current, &schema.current)?;
                return Ok(ApplyReport::new(ApplyOutcome::Initialized, None, current));
            }
            if live == current {
                self.log(format!("Database schema matches digest {}, adopting it", current));
                self.record(tx, None, current, &schema.current)?;
                return Ok(ApplyReport::new(ApplyOutcome::Adopted, None, current));
            }
            return Err(MigrationError::UnmanagedSchema);
        };

        let from = Some(latest.digest.clone());
        if latest.digest == current {
            self.log(format!("Schema is up-to-date at digest {}", current));
            let mut report = ApplyReport::new(ApplyOutcome::UpToDate, from, current);
            if live != current {
                let msg = format!(
                    "Live schema digest {} differs from recorded digest {}",
                    live, current
                );
                self.log(&msg);
                report.warnings.push(msg);
            }
            return Ok(report);
        }

        self.log(format!("Current schema digest is {}", current));
        self.log(format!(
            "Latest DB schema digest is {} ({})",
            latest.digest,
            latest.timestamp.to_rfc3339()
        ));
        if live != latest.digest {
            self.log(format!("Live DB schema digest is {}", live));
        }

        let first = schema
            .last_rule_from(&live)
            .ok_or_else(|| MigrationError::NoUpdateFound(live.clone()))?;
        let pending = &schema.updates[first..];
        self.log(format!("Applying {} pending schema upgrades", pending.len()));

        let mut report = ApplyReport::new(ApplyOutcome::Upgraded, from, current);
        for (offset, rule) in pending.iter().enumerate() {
            let index = first + offset + 1;
            ctx.check()?;

            let apply = rule
                .apply
                .as_ref()
                .ok_or_else(|| MigrationError::other(format!("update {} has no apply function", index)))?;
            let rc = RuleContext::new(self.sink.as_ref(), ctx, index, &rule.source, &rule.target);
            apply(&rc, tx).map_err(|e| MigrationError::rule_failed(index, &rule.source, e))?;

            let got = live_digest(tx, reader)?;
            if got != rule.target {
                return Err(MigrationError::Confirmation {
                    step: index.to_string(),
                    expected: rule.target.clone(),
                    actual: got,
                });
            }
            self.log(format!("[{}] updated to digest {}", index, rule.target));
            report.applied.push(index);
        }

        self.record(tx, Some(latest), current, &schema.current)?;
        Ok(report)
    }

    fn record(
        &self,
        tx: &Transaction<'_>,
        previous: Option<&HistoryRecord>,
        digest: &str,
        text: &str,
    ) -> MigrateResult<()> {
        let record = HistoryRecord::new(digest, Some(text.to_string())).at(next_timestamp(previous));
        self.history.append(tx, &record)
    }

    /// [`apply`](Self::apply) on the worker thread of an async connection.
    pub async fn apply_async(
        &self,
        schema: Arc<Schema>,
        conn: &SqliteConnection,
        ctx: Context,
    ) -> MigrateResult<ApplyReport> {
        let engine = self.clone();
        conn.call(move |c| engine.apply(&schema, c, &ctx)).await?
    }

    /// Report where the database stands without modifying it.
    pub fn status(&self, schema: &Schema, conn: &Connection, ctx: &Context) -> MigrateResult<MigrationStatus> {
        let reader = self.config.catalog_reader();
        let current = check_with(schema, &reader, ctx)?;

        let _guard = ctx.attach(conn);
        let rows = reader.read(conn)?;
        let live = schema_digest(&rows)?;
        let latest = if self.history.exists(conn)? {
            self.history.latest(conn)?
        } else {
            None
        };
        ctx.check()?;

        let pending = match &latest {
            Some(record) if record.digest == current => Some(0),
            Some(_) => schema
                .last_rule_from(&live)
                .map(|i| schema.updates.len() - i),
            None if rows.is_empty() || live == current => Some(0),
            None => None,
        };

        Ok(MigrationStatus {
            current_digest: current,
            live_digest: live,
            latest,
            live_is_empty: rows.is_empty(),
            pending,
        })
    }
}

/// Prefer the context's own error once it is done.
fn settle(err: MigrationError, ctx: &Context) -> MigrationError {
    match ctx.check() {
        Err(e) => e.into(),
        Ok(()) => err,
    }
}
