//! Shadow databases for interpreting schema text.
//!
//! A shadow database is a private in-memory SQLite instance. Schema text is
//! executed inside a transaction there, the resulting catalog is read, and
//! everything is discarded. Nothing ever touches a managed database.
//!
//! ```rust,ignore
//! let shadow = ShadowDatabase::new(Context::background())?;
//! let rows = shadow.load(&CatalogReader::default(), "CREATE TABLE t (a TEXT);")?;
//! ```

use rusqlite::Connection;
use strata_sqlite::{Context, open_disposable};
use tracing::trace;

use crate::catalog::{CatalogReader, SchemaRow};
use crate::error::{MigrateResult, MigrationError};

/// A disposable database used to interpret SQL text.
pub struct ShadowDatabase {
    conn: Connection,
    ctx: Context,
}

impl ShadowDatabase {
    /// Open a fresh shadow database bound to `ctx`.
    pub fn new(ctx: Context) -> MigrateResult<Self> {
        ctx.check()?;
        Ok(Self {
            conn: open_disposable()?,
            ctx,
        })
    }

    /// Execute `sql` and return the canonical schema it produces.
    ///
    /// The transaction is rolled back whether or not execution succeeds, so
    /// the same shadow database may be loaded repeatedly.
    pub fn load(&self, reader: &CatalogReader, sql: &str) -> MigrateResult<Vec<SchemaRow>> {
        let guard = self.ctx.attach(&self.conn);
        let tx = self.conn.unchecked_transaction()?;

        let result = tx
            .execute_batch(sql)
            .map_err(MigrationError::from)
            .and_then(|_| reader.read(&tx));

        drop(guard);
        if let Err(e) = tx.rollback() {
            trace!(error = %e, "Shadow rollback failed");
        }

        match result {
            Ok(rows) => Ok(rows),
            Err(_) if self.ctx.is_done() => Err(self.cancellation()),
            Err(e) => Err(e),
        }
    }

    fn cancellation(&self) -> MigrationError {
        match self.ctx.check() {
            Err(e) => e.into(),
            Ok(()) => MigrationError::Cancelled,
        }
    }
}

/// Interpret `sql` in a fresh shadow database and return its canonical schema.
pub fn load_schema(reader: &CatalogReader, sql: &str, ctx: &Context) -> MigrateResult<Vec<SchemaRow>> {
    ShadowDatabase::new(ctx.clone())?.load(reader, sql)
}
