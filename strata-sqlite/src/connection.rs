//! Opening SQLite connections.
//!
//! Three flavours are provided:
//!
//! - [`open`]: a blocking `rusqlite` connection for a managed database.
//! - [`open_disposable`]: a private in-memory instance that disappears when
//!   dropped, used to interpret SQL text.
//! - [`SqliteConnection`]: an async handle backed by `tokio-rusqlite`, which
//!   runs closures on a dedicated connection thread.

use rusqlite::{Connection, OpenFlags};
use tracing::debug;

use crate::config::{DatabasePath, SqliteConfig};
use crate::error::{SqliteError, SqliteResult};

fn open_flags(config: &SqliteConfig) -> OpenFlags {
    let mut flags = OpenFlags::SQLITE_OPEN_URI | OpenFlags::SQLITE_OPEN_NO_MUTEX;
    if config.read_only {
        flags |= OpenFlags::SQLITE_OPEN_READ_ONLY;
    } else {
        flags |= OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE;
    }
    flags
}

/// Open a blocking connection described by `config`.
pub fn open(config: &SqliteConfig) -> SqliteResult<Connection> {
    debug!(path = %config.path_str(), read_only = config.read_only, "Opening SQLite database");

    let conn = match &config.path {
        DatabasePath::Memory => Connection::open_in_memory()?,
        DatabasePath::File(path) => {
            if config.read_only && !path.exists() {
                return Err(SqliteError::connection(format!(
                    "database {} does not exist",
                    path.display()
                )));
            }
            Connection::open_with_flags(path, open_flags(config))?
        }
    };

    let init = config.init_sql();
    if !init.is_empty() {
        conn.execute_batch(&init)?;
    }
    Ok(conn)
}

/// Open a fresh, empty, private in-memory database.
///
/// Nothing written to it outlives the returned connection.
pub fn open_disposable() -> SqliteResult<Connection> {
    debug!("Opening disposable in-memory database");
    Ok(Connection::open_in_memory()?)
}

/// An async SQLite connection.
///
/// All work happens on the connection's own thread; [`SqliteConnection::call`]
/// ships a closure there and awaits its result.
#[derive(Clone)]
pub struct SqliteConnection {
    conn: tokio_rusqlite::Connection,
    path: String,
}

impl SqliteConnection {
    /// Open an async connection described by `config`.
    pub async fn open(config: &SqliteConfig) -> SqliteResult<Self> {
        debug!(path = %config.path_str(), "Opening async SQLite connection");

        let conn = match &config.path {
            DatabasePath::Memory => tokio_rusqlite::Connection::open_in_memory().await?,
            DatabasePath::File(path) => {
                if config.read_only && !path.exists() {
                    return Err(SqliteError::connection(format!(
                        "database {} does not exist",
                        path.display()
                    )));
                }
                tokio_rusqlite::Connection::open_with_flags(path, open_flags(config)).await?
            }
        };

        let init = config.init_sql();
        if !init.is_empty() {
            conn.call(move |c| Ok(c.execute_batch(&init)?)).await?;
        }

        Ok(Self {
            conn,
            path: config.path_str().to_string(),
        })
    }

    /// The path this connection was opened with.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Run `f` against the underlying connection on its worker thread.
    pub async fn call<F, R>(&self, f: F) -> SqliteResult<R>
    where
        F: FnOnce(&mut Connection) -> R + Send + 'static,
        R: Send + 'static,
    {
        self.conn
            .call(move |conn| Ok(f(conn)))
            .await
            .map_err(SqliteError::from)
    }

    /// Execute a batch of statements.
    pub async fn execute_batch(&self, sql: &str) -> SqliteResult<()> {
        let sql = sql.to_string();
        debug!(sql = %sql, "Executing batch");

        self.call(move |conn| conn.execute_batch(&sql))
            .await?
            .map_err(SqliteError::from)
    }

    /// Close the connection, waiting for pending calls to finish.
    pub async fn close(self) -> SqliteResult<()> {
        self.conn.close().await.map_err(SqliteError::from)
    }
}
