//! # strata-migrate
//!
//! Schema version control for SQLite databases.
//!
//! This crate provides functionality for:
//! - Fingerprinting a schema, whether live in a database or written as SQL text
//! - Diffing two schemas into a readable report
//! - Checking that a schema definition and its update rules form a chain
//! - Applying update rules transactionally, confirming every step
//! - Tracking applied versions in a history table inside the database
//! - Validating a live database against its expected definition
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐     ┌────────────────┐     ┌──────────────┐
//! │ Schema text  │────▶│ Shadow DB      │────▶│ Catalog rows │──┐
//! └──────────────┘     └────────────────┘     └──────────────┘  │
//!                                                               ▼
//! ┌──────────────┐     ┌────────────────┐     ┌──────────────┐  ┌────────┐
//! │ Live DB      │────▶│ Catalog reader │────▶│ Catalog rows │─▶│ Digest │
//! └──────────────┘     └────────────────┘     └──────────────┘  └────────┘
//!        ▲                                                          │
//!        │             ┌────────────────┐     ┌──────────────┐      │
//!        └─────────────│ Update rules   │◀────│ Engine       │◀─────┘
//!                      └────────────────┘     └──────────────┘
//!                                                    │
//!                                                    ▼
//!                                             ┌──────────────┐
//!                                             │ History tbl  │
//!                                             └──────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use strata_migrate::{MigrationEngine, Schema, UpdateRule, exec, no_action};
//! use strata_sqlite::{Context, SqliteConfig, open};
//!
//! fn upgrade() -> Result<(), Box<dyn std::error::Error>> {
//!     let schema = Schema::new(include_str!("schema.sql"))
//!         .with_update(UpdateRule::new(
//!             "2f0c…", // digest of version 1
//!             "9b41…", // digest of version 2
//!             exec(["ALTER TABLE users ADD COLUMN email TEXT"]),
//!         ))
//!         .with_update(UpdateRule::new("9b41…", "9b41…", no_action()));
//!
//!     let conn = open(&SqliteConfig::file("app.db"))?;
//!     let report = MigrationEngine::default().apply(&schema, &conn, &Context::background())?;
//!     println!("{}", report.summary());
//!     Ok(())
//! }
//! ```
//!
//! Digests for new rules are printed by `strata diff app.db schema.sql --rule`.

pub mod catalog;
pub mod diff;
pub mod digest;
pub mod edit;
pub mod engine;
pub mod error;
pub mod history;
pub mod log;
pub mod rules;
pub mod schema;
pub mod shadow;
pub mod validate;

// Re-exports
pub use catalog::{
    CatalogReader, DefaultValue, ObjectKind, SchemaColumn, SchemaRow, normalize_sql, read_schema,
};
pub use diff::{DiffEntry, SchemaDiff, compare, diff_schema};
pub use digest::{db_digest, db_digest_with, schema_digest, sql_digest, sql_digest_with};
pub use engine::{ApplyOutcome, ApplyReport, MigrationConfig, MigrationEngine, MigrationStatus};
pub use error::{ConsistencyError, ConsistencyErrors, MigrateResult, MigrationError};
pub use history::{
    DEFAULT_HISTORY_TABLE, HistoryRecord, HistoryStore, Lz4Codec, PlainCodec, SchemaCodec,
    next_timestamp,
};
pub use log::{LogSink, MemorySink, RuleContext, TracingSink};
pub use rules::{exec, no_action};
pub use schema::{ApplyFn, Schema, UpdateRule};
pub use shadow::{ShadowDatabase, load_schema};
pub use validate::{ValidationError, validate, validate_with};
