//! Checking a live database against an expected definition.

use std::fmt;

use rusqlite::Connection;
use strata_sqlite::Context;

use crate::catalog::CatalogReader;
use crate::diff::diff_schema;
use crate::error::MigrateResult;
use crate::shadow::load_schema;

/// The live schema does not match the expected definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Rendered difference, live schema on the left.
    pub diff: String,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid schema (-got, +want):\n{}", self.diff)
    }
}

impl std::error::Error for ValidationError {}

/// Check that the schema visible through `conn` is structurally the one
/// `sql` defines.
pub fn validate(conn: &Connection, sql: &str) -> MigrateResult<()> {
    validate_with(conn, sql, &CatalogReader::default(), &Context::background())
}

/// [`validate`] with an explicit reader and context.
pub fn validate_with(
    conn: &Connection,
    sql: &str,
    reader: &CatalogReader,
    ctx: &Context,
) -> MigrateResult<()> {
    let want = load_schema(reader, sql, ctx)?;
    let got = {
        let _guard = ctx.attach(conn);
        reader.read(conn)?
    };
    ctx.check()?;

    if got == want {
        return Ok(());
    }
    Err(ValidationError {
        diff: diff_schema(&got, &want),
    }
    .into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MigrationError;

    #[test]
    fn test_validate_matches() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE t (a TEXT); ALTER TABLE t ADD COLUMN b INTEGER;")
            .unwrap();
        validate(&conn, "CREATE TABLE t (a TEXT, b INTEGER);").unwrap();
    }

    #[test]
    fn test_validate_reports_diff() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE t (a TEXT);").unwrap();

        let err = validate(&conn, "CREATE TABLE t (a TEXT); CREATE INDEX t_a ON t (a);").unwrap_err();
        let MigrationError::Validation(invalid) = &err else {
            panic!("unexpected error: {}", err);
        };
        assert!(invalid.diff.contains(">> Add index \"t_a\""));
        assert!(err.to_string().starts_with("invalid schema (-got, +want):\n"));
    }

    #[test]
    fn test_validate_bad_sql() {
        let conn = Connection::open_in_memory().unwrap();
        let err = validate(&conn, "CREATE TABLE (").unwrap_err();
        assert!(matches!(err, MigrationError::Sqlite(_)));
    }
}
