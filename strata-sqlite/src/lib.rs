//! SQLite engine boundary for Strata.
//!
//! This crate owns everything that touches the SQLite driver directly and is
//! not specific to schema versioning:
//!
//! - Connection configuration and URL parsing ([`SqliteConfig`])
//! - Blocking, disposable and async connections ([`open`], [`open_disposable`],
//!   [`SqliteConnection`])
//! - Cancellation and deadlines threaded into every statement ([`Context`])
//!
//! # Example
//!
//! ```rust,ignore
//! use strata_sqlite::{Context, SqliteConfig, open};
//!
//! let conn = open(&SqliteConfig::from_url("sqlite://./app.db")?)?;
//! let ctx = Context::background();
//! let _guard = ctx.attach(&conn);
//! conn.execute_batch("CREATE TABLE t (a TEXT)")?;
//! ```

pub mod config;
pub mod connection;
pub mod context;
pub mod error;

pub use config::{DatabasePath, JournalMode, SqliteConfig, SynchronousMode};
pub use connection::{SqliteConnection, open, open_disposable};
pub use context::{Context, InterruptGuard};
pub use error::{SqliteError, SqliteResult};

// The migration engine hands `rusqlite` types to user code.
pub use rusqlite;
