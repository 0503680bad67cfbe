//! # Strata
//!
//! Schema version control for SQLite.
//!
//! Strata provides:
//! - Content fingerprints of a database schema, independent of how it was built
//! - Readable diffs between a live database and the schema it should have
//! - Update rules keyed by fingerprint, applied and confirmed in one transaction
//! - A history table that records every version a database has been at
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use strata::prelude::*;
//!
//! const SCHEMA: &str = "
//!     CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT NOT NULL, email TEXT);
//! ";
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let schema = Schema::new(SCHEMA).with_update(UpdateRule::new(
//!         "5e2d…",
//!         "a0c7…",
//!         exec(["ALTER TABLE users ADD COLUMN email TEXT"]),
//!     ));
//!
//!     let conn = open(&SqliteConfig::file("app.db"))?;
//!     let report = MigrationEngine::default().apply(&schema, &conn, &Context::background())?;
//!     println!("{}", report.summary());
//!     Ok(())
//! }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

/// Fingerprinting, diffing, history and the migration engine.
pub mod migrate {
    pub use strata_migrate::*;
}

/// Connections, configuration and cancellation.
pub mod sqlite {
    pub use strata_sqlite::*;
}

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::migrate::{
        ApplyOutcome, ApplyReport, MigrateResult, MigrationConfig, MigrationEngine, MigrationError,
        RuleContext, Schema, UpdateRule, db_digest, diff_schema, exec, no_action, read_schema,
        sql_digest, validate,
    };
    pub use crate::sqlite::{Context, SqliteConfig, SqliteConnection, open};
}

// Re-export key types at the crate root
pub use migrate::{MigrationEngine, MigrationError, Schema, UpdateRule};
pub use sqlite::{Context, SqliteError};
