//! Ready-made update rule actions.

use std::sync::Arc;

use rusqlite::Transaction;
use tracing::debug;

use crate::error::{MigrateResult, MigrationError};
use crate::log::RuleContext;
use crate::schema::ApplyFn;

/// Execute `statements` in order inside the upgrade transaction.
///
/// A failure is reported with the 1-based position of the failing statement.
/// Each entry may itself hold several `;`-separated statements.
pub fn exec<I, S>(statements: I) -> ApplyFn
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let statements: Vec<String> = statements.into_iter().map(Into::into).collect();
    Arc::new(move |ctx: &RuleContext<'_>, tx: &Transaction<'_>| -> MigrateResult<()> {
        for (i, stmt) in statements.iter().enumerate() {
            ctx.check()?;
            debug!(rule = ctx.index(), stmt = i + 1, sql = %stmt, "Executing update statement");
            tx.execute_batch(stmt).map_err(|source| MigrationError::Statement {
                index: i + 1,
                source,
            })?;
        }
        Ok(())
    })
}

/// An action that does nothing.
///
/// Used when a revision changes the schema text but not its structure, so
/// the digest stays the same.
pub fn no_action() -> ApplyFn {
    Arc::new(|_: &RuleContext<'_>, _: &Transaction<'_>| -> MigrateResult<()> {
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log::MemorySink;
    use rusqlite::Connection;
    use strata_sqlite::Context;

    fn run(apply: &ApplyFn, conn: &Connection) -> Result<(), MigrationError> {
        let sink = MemorySink::new();
        let ctx = Context::background();
        let rc = RuleContext::new(&sink, &ctx, 1, "a", "b");
        let tx = conn.unchecked_transaction().unwrap();
        apply(&rc, &tx)?;
        tx.commit().unwrap();
        Ok(())
    }

    #[test]
    fn test_exec_runs_in_order() {
        let conn = Connection::open_in_memory().unwrap();
        let apply = exec(["CREATE TABLE t (a TEXT)", "INSERT INTO t VALUES ('x')"]);
        run(&apply, &conn).unwrap();

        let n: i64 = conn.query_row("SELECT count(*) FROM t", [], |r| r.get(0)).unwrap();
        assert_eq!(n, 1);
    }

    #[test]
    fn test_exec_reports_statement_index() {
        let conn = Connection::open_in_memory().unwrap();
        let apply = exec(vec!["CREATE TABLE t (a TEXT)".to_string(), "BOGUS".to_string()]);
        let err = run(&apply, &conn).unwrap_err();
        assert!(matches!(err, MigrationError::Statement { index: 2, .. }));
        assert!(err.to_string().starts_with("stmt 2: "));
    }

    #[test]
    fn test_no_action() {
        let conn = Connection::open_in_memory().unwrap();
        run(&no_action(), &conn).unwrap();
    }
}
