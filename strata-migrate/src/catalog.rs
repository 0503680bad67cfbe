//! Reading the live structure of a database from its catalog.
//!
//! SQLite keeps one row per table, index, view and trigger in the
//! `sqlite_schema` table of each attached catalog. [`CatalogReader`] turns
//! those rows into a canonical, sorted list of [`SchemaRow`] values:
//!
//! - the schema history table and everything attached to it is dropped, as
//!   are objects SQLite generates itself (`sqlite_autoindex_*`,
//!   `sqlite_sequence`, `sqlite_stat*`);
//! - tables carry their column metadata and no SQL text, since `ALTER TABLE`
//!   rewrites the stored text in ways that depend on history;
//! - every other object keeps its SQL text with each line trimmed.
//!
//! The canonical form is what fingerprints, diffs and validation work on.

use std::cmp::Ordering;
use std::fmt;

use rusqlite::Connection;
use rusqlite::types::ValueRef;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{MigrateResult, MigrationError};
use crate::history::DEFAULT_HISTORY_TABLE;

/// The catalog root that holds the primary database.
pub const MAIN_CATALOG: &str = "main";

/// Kind of a structural object.
///
/// Variants are declared in lexical order of their names so that the derived
/// ordering matches sorting by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectKind {
    /// An index.
    Index,
    /// A table (including virtual tables).
    Table,
    /// A trigger.
    Trigger,
    /// A view.
    View,
}

impl ObjectKind {
    /// The catalog spelling of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Index => "index",
            Self::Table => "table",
            Self::Trigger => "trigger",
            Self::View => "view",
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value {
            "index" => Some(Self::Index),
            "table" => Some(Self::Table),
            "trigger" => Some(Self::Trigger),
            "view" => Some(Self::View),
            _ => None,
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A column default as reported by the catalog.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum DefaultValue {
    /// No default.
    #[default]
    Null,
    /// An integer default.
    Integer(i64),
    /// A floating-point default.
    Real(f64),
    /// A default expression or literal, as text.
    Text(String),
    /// Raw bytes.
    Blob(Vec<u8>),
}

impl DefaultValue {
    /// Check whether there is no default.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    fn from_sql(value: ValueRef<'_>) -> Self {
        match value {
            ValueRef::Null => Self::Null,
            ValueRef::Integer(i) => Self::Integer(i),
            ValueRef::Real(f) => Self::Real(f),
            ValueRef::Text(t) => Self::Text(String::from_utf8_lossy(t).into_owned()),
            ValueRef::Blob(b) => Self::Blob(b.to_vec()),
        }
    }
}

impl fmt::Display for DefaultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("NULL"),
            Self::Integer(i) => write!(f, "{}", i),
            Self::Real(r) => write!(f, "{}", r),
            Self::Text(t) => f.write_str(t),
            Self::Blob(b) => write!(f, "x'{}'", hex::encode(b)),
        }
    }
}

fn is_false(b: &bool) -> bool {
    !*b
}

fn is_zero(n: &i64) -> bool {
    *n == 0
}

/// One column of a table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaColumn {
    /// Column name.
    pub name: String,
    /// Declared type, upper-cased.
    #[serde(rename = "type")]
    pub col_type: String,
    /// Whether the column is `NOT NULL`.
    #[serde(rename = "notNull", default, skip_serializing_if = "is_false")]
    pub not_null: bool,
    /// The column default.
    #[serde(default, skip_serializing_if = "DefaultValue::is_null")]
    pub default: DefaultValue,
    /// Whether the column is part of the primary key.
    #[serde(rename = "primaryKey", default, skip_serializing_if = "is_false")]
    pub primary_key: bool,
    /// Hidden-column kind: 0 normal, 1 hidden (virtual tables), 2 generated
    /// virtual, 3 generated stored.
    #[serde(default, skip_serializing_if = "is_zero")]
    pub hidden: i64,
}

impl SchemaColumn {
    /// Canonical ordering of columns within a table: type, then name, then flags.
    pub fn canonical_cmp(&self, other: &Self) -> Ordering {
        (&self.col_type, &self.name, self.not_null, self.primary_key, self.hidden).cmp(&(
            &other.col_type,
            &other.name,
            other.not_null,
            other.primary_key,
            other.hidden,
        ))
    }
}

impl fmt::Display for SchemaColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if !self.col_type.is_empty() {
            write!(f, " {}", self.col_type)?;
        }
        if self.not_null {
            f.write_str(" NOT NULL")?;
        }
        if !self.default.is_null() {
            write!(f, " DEFAULT {}", self.default)?;
        }
        if self.primary_key {
            f.write_str(" PRIMARY KEY")?;
        }
        match self.hidden {
            0 => {}
            1 => f.write_str(" HIDDEN")?,
            2 => f.write_str(" GENERATED VIRTUAL")?,
            3 => f.write_str(" GENERATED STORED")?,
            n => write!(f, " HIDDEN({})", n)?,
        }
        Ok(())
    }
}

/// One structural object in canonical form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaRow {
    /// Object kind.
    #[serde(rename = "type")]
    pub kind: ObjectKind,
    /// Object name.
    pub name: String,
    /// Owning table (equal to `name` for tables and views).
    #[serde(rename = "tableName")]
    pub table_name: String,
    /// Columns, for tables only.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub columns: Vec<SchemaColumn>,
    /// Normalized SQL text, empty for tables.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub sql: String,
}

impl SchemaRow {
    /// The identity used to match objects across two snapshots.
    pub fn key(&self) -> (ObjectKind, &str) {
        (self.kind, self.name.as_str())
    }

    /// Canonical ordering of rows: kind, name, owning table, SQL.
    pub fn canonical_cmp(&self, other: &Self) -> Ordering {
        (self.kind, &self.name, &self.table_name, &self.sql).cmp(&(
            other.kind,
            &other.name,
            &other.table_name,
            &other.sql,
        ))
    }
}

/// Trim each line of `sql` and join the lines with newlines.
pub fn normalize_sql(sql: &str) -> String {
    sql.lines().map(str::trim).collect::<Vec<_>>().join("\n")
}

/// Quote a SQLite identifier.
pub(crate) fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Reads canonical schema snapshots from a connection.
#[derive(Debug, Clone)]
pub struct CatalogReader {
    root: String,
    history_table: String,
}

impl Default for CatalogReader {
    fn default() -> Self {
        Self {
            root: MAIN_CATALOG.to_string(),
            history_table: DEFAULT_HISTORY_TABLE.to_string(),
        }
    }
}

impl CatalogReader {
    /// Create a reader for the main catalog using the default history table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Read from a different catalog root.
    pub fn root(mut self, root: impl Into<String>) -> Self {
        self.root = root.into();
        self
    }

    /// Exclude a differently named history table.
    pub fn history_table(mut self, table: impl Into<String>) -> Self {
        self.history_table = table.into();
        self
    }

    /// The catalog root name.
    pub fn root_name(&self) -> &str {
        &self.root
    }

    /// The name of the excluded history table.
    pub fn history_table_name(&self) -> &str {
        &self.history_table
    }

    fn is_excluded(&self, name: &str, table_name: &str) -> bool {
        table_name == self.history_table || name.starts_with("sqlite_")
    }

    /// Read the canonical, sorted schema snapshot visible through `conn`.
    pub fn read(&self, conn: &Connection) -> MigrateResult<Vec<SchemaRow>> {
        let sql = format!(
            "SELECT type, name, tbl_name, sql FROM {}.sqlite_schema",
            quote_identifier(&self.root)
        );
        let mut stmt = conn.prepare(&sql)?;
        let raw = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, Option<String>>(3)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| MigrationError::catalog(&self.root, e))?;

        let mut out = Vec::with_capacity(raw.len());
        for (kind, name, table_name, text) in raw {
            if self.is_excluded(&name, &table_name) {
                continue;
            }
            let kind = ObjectKind::parse(&kind).ok_or_else(|| {
                MigrationError::catalog(&self.root, format!("unknown object type {:?}", kind))
            })?;

            let (columns, sql) = if kind == ObjectKind::Table {
                (self.read_columns(conn, &name)?, String::new())
            } else {
                (Vec::new(), normalize_sql(text.as_deref().unwrap_or_default()))
            };
            out.push(SchemaRow {
                kind,
                name,
                table_name,
                columns,
                sql,
            });
        }

        out.sort_by(SchemaRow::canonical_cmp);
        debug!(catalog = %self.root, objects = out.len(), "Read schema catalog");
        Ok(out)
    }

    /// Read the sorted column metadata of one table.
    pub fn read_columns(&self, conn: &Connection, table: &str) -> MigrateResult<Vec<SchemaColumn>> {
        let mut stmt = conn.prepare(
            r#"SELECT name, type, "notnull", dflt_value, pk, hidden FROM pragma_table_xinfo(?1, ?2)"#,
        )?;
        let mut columns = stmt
            .query_map([table, self.root.as_str()], |row| {
                Ok(SchemaColumn {
                    name: row.get(0)?,
                    col_type: row.get::<_, String>(1)?.to_uppercase(),
                    not_null: row.get::<_, i64>(2)? != 0,
                    default: DefaultValue::from_sql(row.get_ref(3)?),
                    primary_key: row.get::<_, i64>(4)? != 0,
                    hidden: row.get(5)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| MigrationError::catalog(&self.root, format!("columns of {}: {}", table, e)))?;

        columns.sort_by(SchemaColumn::canonical_cmp);
        Ok(columns)
    }

    /// Report whether the catalog holds no objects besides excluded ones.
    pub fn is_empty(&self, conn: &Connection) -> MigrateResult<bool> {
        Ok(self.read(conn)?.is_empty())
    }
}

/// Read the canonical schema of the main catalog with default settings.
pub fn read_schema(conn: &Connection) -> MigrateResult<Vec<SchemaRow>> {
    CatalogReader::default().read(conn)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn db(sql: &str) -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(sql).unwrap();
        conn
    }

    #[test]
    fn test_normalize_sql() {
        assert_eq!(
            normalize_sql("  CREATE VIEW v AS\n     SELECT 1  \n"),
            "CREATE VIEW v AS\nSELECT 1"
        );
    }

    #[test]
    fn test_read_sorted_and_filtered() {
        let conn = db(r#"
            CREATE TABLE b (id INTEGER PRIMARY KEY AUTOINCREMENT, name text UNIQUE);
            CREATE TABLE a (x TEXT);
            CREATE INDEX a_x ON a (x);
            CREATE VIEW v AS
                SELECT x FROM a;
            CREATE TABLE _schema_history (timestamp INTEGER UNIQUE NOT NULL);
        "#);
        let rows = read_schema(&conn).unwrap();
        let names: Vec<_> = rows.iter().map(|r| (r.kind, r.name.as_str())).collect();
        assert_eq!(
            names,
            vec![
                (ObjectKind::Index, "a_x"),
                (ObjectKind::Table, "a"),
                (ObjectKind::Table, "b"),
                (ObjectKind::View, "v"),
            ]
        );

        let view = &rows[3];
        assert_eq!(view.sql, "CREATE VIEW v AS\nSELECT x FROM a");
        assert!(view.columns.is_empty());
    }

    #[test]
    fn test_table_rows_carry_columns_not_sql() {
        let conn = db("CREATE TABLE t (b integer NOT NULL DEFAULT 0, a text PRIMARY KEY)");
        let rows = read_schema(&conn).unwrap();
        assert_eq!(rows.len(), 1);

        let table = &rows[0];
        assert!(table.sql.is_empty());
        assert_eq!(table.columns.len(), 2);
        assert_eq!(table.columns[0].name, "b");
        assert_eq!(table.columns[0].col_type, "INTEGER");
        assert!(table.columns[0].not_null);
        assert_eq!(table.columns[0].default, DefaultValue::Text("0".to_string()));
        assert_eq!(table.columns[1].name, "a");
        assert!(table.columns[1].primary_key);
    }

    #[test]
    fn test_alter_matches_create() {
        let created = db("CREATE TABLE t (x text, y integer)");
        let altered = db("CREATE TABLE t (x text); ALTER TABLE t ADD COLUMN y integer");
        assert_eq!(read_schema(&created).unwrap(), read_schema(&altered).unwrap());
    }

    #[test]
    fn test_custom_history_table_excluded() {
        let conn = db("CREATE TABLE ledger (a); CREATE INDEX ledger_a ON ledger (a)");
        let reader = CatalogReader::new().history_table("ledger");
        assert!(reader.is_empty(&conn).unwrap());
        assert!(!CatalogReader::new().is_empty(&conn).unwrap());
    }

    #[test]
    fn test_unknown_root_fails() {
        let conn = db("");
        let reader = CatalogReader::new().root("nope");
        assert!(reader.read(&conn).is_err());
    }

    #[test]
    fn test_column_display() {
        let col = SchemaColumn {
            name: "y".to_string(),
            col_type: "INTEGER".to_string(),
            not_null: true,
            default: DefaultValue::Text("0".to_string()),
            primary_key: false,
            hidden: 0,
        };
        assert_eq!(col.to_string(), "y INTEGER NOT NULL DEFAULT 0");
    }

    #[test]
    fn test_row_serialization_is_compact() {
        let row = SchemaRow {
            kind: ObjectKind::Table,
            name: "t".to_string(),
            table_name: "t".to_string(),
            columns: vec![SchemaColumn {
                name: "a".to_string(),
                col_type: "TEXT".to_string(),
                not_null: false,
                default: DefaultValue::Null,
                primary_key: false,
                hidden: 0,
            }],
            sql: String::new(),
        };
        assert_eq!(
            serde_json::to_string(&row).unwrap(),
            r#"{"type":"table","name":"t","tableName":"t","columns":[{"name":"a","type":"TEXT"}]}"#
        );
    }
}
