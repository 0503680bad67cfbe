//! Schema history tracking.
//!
//! Every successful upgrade appends one row to a ledger table inside the
//! managed database. The row records when the upgrade happened, the digest
//! it produced and the schema text, passed through a [`SchemaCodec`].

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use rusqlite::types::ValueRef;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::catalog::quote_identifier;
use crate::error::{MigrateResult, MigrationError};

/// Default name of the ledger table.
pub const DEFAULT_HISTORY_TABLE: &str = "_schema_history";

/// A record of an applied schema version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRecord {
    /// When the version was applied, with microsecond precision.
    pub timestamp: DateTime<Utc>,
    /// Digest of the schema after the upgrade.
    pub digest: String,
    /// The schema text, if it was stored.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
}

impl HistoryRecord {
    /// Create a record stamped now.
    pub fn new(digest: impl Into<String>, schema: Option<String>) -> Self {
        Self {
            timestamp: now_micros(),
            digest: digest.into(),
            schema,
        }
    }

    /// Set the timestamp.
    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }
}

fn now_micros() -> DateTime<Utc> {
    let now = Utc::now();
    DateTime::from_timestamp_micros(now.timestamp_micros()).unwrap_or(now)
}

/// A timestamp for a record following `previous`.
///
/// The clock is used unless it has not moved past `previous`, in which case
/// the result is one microsecond later.
pub fn next_timestamp(previous: Option<&HistoryRecord>) -> DateTime<Utc> {
    let now = now_micros();
    match previous {
        Some(prev) if now <= prev.timestamp => prev.timestamp + chrono::Duration::microseconds(1),
        _ => now,
    }
}

/// Encodes schema text for storage in the ledger.
pub trait SchemaCodec: Send + Sync + fmt::Debug {
    /// Encode schema text.
    fn encode(&self, schema: &str) -> MigrateResult<Vec<u8>>;

    /// Decode stored bytes.
    fn decode(&self, bytes: &[u8]) -> MigrateResult<String>;
}

/// Stores schema text as UTF-8 bytes.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainCodec;

impl SchemaCodec for PlainCodec {
    fn encode(&self, schema: &str) -> MigrateResult<Vec<u8>> {
        Ok(schema.as_bytes().to_vec())
    }

    fn decode(&self, bytes: &[u8]) -> MigrateResult<String> {
        String::from_utf8(bytes.to_vec()).map_err(|e| MigrationError::other(format!("decode schema: {}", e)))
    }
}

/// Stores schema text LZ4-compressed with its length prepended.
#[derive(Debug, Clone, Copy, Default)]
pub struct Lz4Codec;

impl SchemaCodec for Lz4Codec {
    fn encode(&self, schema: &str) -> MigrateResult<Vec<u8>> {
        Ok(lz4_flex::compress_prepend_size(schema.as_bytes()))
    }

    fn decode(&self, bytes: &[u8]) -> MigrateResult<String> {
        let raw = lz4_flex::decompress_size_prepended(bytes)
            .map_err(|e| MigrationError::other(format!("decompress schema: {}", e)))?;
        PlainCodec.decode(&raw)
    }
}

/// Reads and writes the ledger table.
#[derive(Debug, Clone)]
pub struct HistoryStore {
    table: String,
    codec: Arc<dyn SchemaCodec>,
}

impl Default for HistoryStore {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_TABLE)
    }
}

impl HistoryStore {
    /// Create a store for `table` using [`PlainCodec`].
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            codec: Arc::new(PlainCodec),
        }
    }

    /// Use a different codec for schema text.
    pub fn with_codec(mut self, codec: Arc<dyn SchemaCodec>) -> Self {
        self.codec = codec;
        self
    }

    /// The ledger table name.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// SQL that creates the ledger table if it is missing.
    pub fn create_sql(&self) -> String {
        format!(
            "CREATE TABLE IF NOT EXISTS {} (\n\
             \ttimestamp INTEGER UNIQUE NOT NULL,\n\
             \tdigest TEXT NOT NULL,\n\
             \tschema BLOB\n\
             )",
            quote_identifier(&self.table)
        )
    }

    /// Create the ledger table if it does not exist.
    pub fn ensure_table(&self, conn: &Connection) -> MigrateResult<()> {
        debug!(table = %self.table, "Ensuring history table");
        conn.execute_batch(&self.create_sql())?;
        Ok(())
    }

    /// Check whether the ledger table exists.
    pub fn exists(&self, conn: &Connection) -> MigrateResult<bool> {
        let n: i64 = conn.query_row(
            "SELECT count(*) FROM sqlite_schema WHERE type = 'table' AND name = ?1",
            [&self.table],
            |row| row.get(0),
        )?;
        Ok(n > 0)
    }

    /// Append a record.
    pub fn append(&self, conn: &Connection, record: &HistoryRecord) -> MigrateResult<()> {
        let schema = record
            .schema
            .as_deref()
            .map(|s| self.codec.encode(s))
            .transpose()?;
        conn.execute(
            &format!(
                "INSERT INTO {} (timestamp, digest, schema) VALUES (?1, ?2, ?3)",
                quote_identifier(&self.table)
            ),
            rusqlite::params![record.timestamp.timestamp_micros(), record.digest, schema],
        )?;
        debug!(table = %self.table, digest = %record.digest, "Recorded schema version");
        Ok(())
    }

    /// Every record, oldest first.
    pub fn read_all(&self, conn: &Connection) -> MigrateResult<Vec<HistoryRecord>> {
        self.query(conn, "ORDER BY timestamp")
    }

    /// The newest record, if any.
    pub fn latest(&self, conn: &Connection) -> MigrateResult<Option<HistoryRecord>> {
        Ok(self.query(conn, "ORDER BY timestamp DESC LIMIT 1")?.pop())
    }

    fn query(&self, conn: &Connection, tail: &str) -> MigrateResult<Vec<HistoryRecord>> {
        let sql = format!(
            "SELECT timestamp, digest, schema FROM {} {}",
            quote_identifier(&self.table),
            tail
        );
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query([])?;

        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let micros: i64 = row.get(0)?;
            let digest: String = row.get(1)?;
            let schema = match row.get_ref(2)? {
                ValueRef::Null => None,
                ValueRef::Text(bytes) | ValueRef::Blob(bytes) => Some(self.decode(bytes)),
                other => Some(format!("{:?}", other)),
            };
            let timestamp = DateTime::from_timestamp_micros(micros).ok_or_else(|| {
                MigrationError::other(format!("history timestamp {} out of range", micros))
            })?;
            out.push(HistoryRecord {
                timestamp,
                digest,
                schema,
            });
        }
        Ok(out)
    }

    fn decode(&self, bytes: &[u8]) -> String {
        match self.codec.decode(bytes) {
            Ok(text) => text,
            Err(e) => {
                debug!(error = %e, "Stored schema did not decode, keeping raw text");
                String::from_utf8_lossy(bytes).into_owned()
            }
        }
    }
}
