//! Schema fingerprints.
//!
//! A fingerprint is the lower-case hex SHA-256 of the canonical schema rows
//! encoded as compact JSON followed by a single newline. Two schemas that
//! differ only in whitespace around lines, object order or how a table got
//! its columns share a fingerprint.

use rusqlite::Connection;
use sha2::{Digest, Sha256};
use strata_sqlite::Context;

use crate::catalog::{CatalogReader, SchemaRow};
use crate::error::MigrateResult;
use crate::shadow::load_schema;

/// Fingerprint a canonical schema snapshot.
pub fn schema_digest(rows: &[SchemaRow]) -> MigrateResult<String> {
    let mut encoded = serde_json::to_vec(rows)?;
    encoded.push(b'\n');
    Ok(hex::encode(Sha256::digest(&encoded)))
}

/// Fingerprint the schema a piece of SQL text would produce.
pub fn sql_digest(sql: &str) -> MigrateResult<String> {
    sql_digest_with(sql, &CatalogReader::default(), &Context::background())
}

/// Fingerprint SQL text with an explicit reader and context.
pub fn sql_digest_with(sql: &str, reader: &CatalogReader, ctx: &Context) -> MigrateResult<String> {
    schema_digest(&load_schema(reader, sql, ctx)?)
}

/// Fingerprint the live schema visible through `conn`.
pub fn db_digest(conn: &Connection) -> MigrateResult<String> {
    db_digest_with(conn, &CatalogReader::default(), &Context::background())
}

/// Fingerprint the live schema with an explicit reader and context.
///
/// `ctx` is attached to `conn` for the duration of the catalog read.
pub fn db_digest_with(conn: &Connection, reader: &CatalogReader, ctx: &Context) -> MigrateResult<String> {
    ctx.check()?;
    let result = {
        let _guard = ctx.attach(conn);
        live_digest(conn, reader)
    };
    ctx.check()?;
    result
}

/// Fingerprint the live schema without touching the connection's interrupt
/// hook. Callers must already have a context attached.
pub(crate) fn live_digest(conn: &Connection, reader: &CatalogReader) -> MigrateResult<String> {
    schema_digest(&reader.read(conn)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MigrationError;

    const SCHEMA: &str = "
        CREATE TABLE t (a TEXT, b INTEGER);
        CREATE VIEW v AS SELECT a FROM t;
    ";

    #[test]
    fn test_digest_shape() {
        let digest = sql_digest(SCHEMA).unwrap();
        assert_eq!(digest.len(), 64);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_empty_digest() {
        let expected = hex::encode(Sha256::digest(b"[]\n"));
        assert_eq!(schema_digest(&[]).unwrap(), expected);
        assert_eq!(sql_digest("").unwrap(), expected);
    }

    #[test]
    fn test_insensitive_to_order_and_whitespace() {
        let reordered = "CREATE VIEW v AS SELECT a FROM t;\n\n   CREATE TABLE t (a TEXT, b INTEGER);";
        assert_eq!(sql_digest(SCHEMA).unwrap(), sql_digest(reordered).unwrap());
    }

    #[test]
    fn test_sql_and_db_agree() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(SCHEMA).unwrap();
        assert_eq!(db_digest(&conn).unwrap(), sql_digest(SCHEMA).unwrap());
    }

    #[test]
    fn test_structural_change_changes_digest() {
        assert_ne!(
            sql_digest("CREATE TABLE t (a TEXT)").unwrap(),
            sql_digest("CREATE TABLE t (a TEXT NOT NULL)").unwrap()
        );
    }

    #[test]
    fn test_history_table_is_ignored() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(SCHEMA).unwrap();
        let before = db_digest(&conn).unwrap();
        conn.execute_batch("CREATE TABLE _schema_history (timestamp INTEGER)").unwrap();
        assert_eq!(db_digest(&conn).unwrap(), before);
    }

    #[test]
    fn test_db_digest_with_reader_and_context() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(SCHEMA).unwrap();
        conn.execute_batch("CREATE TABLE versions (timestamp INTEGER)").unwrap();

        let reader = CatalogReader::new().history_table("versions");
        let ctx = Context::background();
        assert_eq!(db_digest_with(&conn, &reader, &ctx).unwrap(), sql_digest(SCHEMA).unwrap());
        assert_ne!(db_digest(&conn).unwrap(), sql_digest(SCHEMA).unwrap());
    }

    #[test]
    fn test_db_digest_with_cancelled_context() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(SCHEMA).unwrap();
        let ctx = Context::background();
        ctx.cancel();

        let err = db_digest_with(&conn, &CatalogReader::default(), &ctx).unwrap_err();
        assert!(matches!(err, MigrationError::Cancelled));

        // The interrupt hook is gone once the call returns.
        assert_eq!(db_digest(&conn).unwrap(), sql_digest(SCHEMA).unwrap());
    }
}
