//! SQLite configuration.

use std::path::{Path, PathBuf};

use crate::error::{SqliteError, SqliteResult};

/// SQLite database configuration.
#[derive(Debug, Clone)]
pub struct SqliteConfig {
    /// Database path (or ":memory:" for in-memory).
    pub path: DatabasePath,
    /// Enable foreign keys.
    pub foreign_keys: bool,
    /// Busy timeout in milliseconds.
    pub busy_timeout_ms: Option<u32>,
    /// Journal mode. `None` leaves the database's current mode alone.
    pub journal_mode: Option<JournalMode>,
    /// Synchronous mode. `None` leaves the connection default.
    pub synchronous: Option<SynchronousMode>,
    /// Open the database read-only.
    pub read_only: bool,
}

/// Database path configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DatabasePath {
    /// In-memory database.
    #[default]
    Memory,
    /// File-based database.
    File(PathBuf),
}

impl DatabasePath {
    /// Get the path string for SQLite.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Memory => ":memory:",
            Self::File(path) => path.to_str().unwrap_or(":memory:"),
        }
    }

    /// Check if this is an in-memory database.
    pub fn is_memory(&self) -> bool {
        matches!(self, Self::Memory)
    }
}

/// SQLite synchronous mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SynchronousMode {
    /// Synchronous OFF - Fastest but unsafe.
    Off,
    /// Synchronous NORMAL - Good balance.
    #[default]
    Normal,
    /// Synchronous FULL - Safe but slower.
    Full,
    /// Synchronous EXTRA - Maximum safety.
    Extra,
}

impl SynchronousMode {
    /// Get the SQLite pragma value.
    pub fn as_pragma(&self) -> &'static str {
        match self {
            Self::Off => "OFF",
            Self::Normal => "NORMAL",
            Self::Full => "FULL",
            Self::Extra => "EXTRA",
        }
    }

    fn parse(value: &str) -> Self {
        match value.to_lowercase().as_str() {
            "off" => Self::Off,
            "full" => Self::Full,
            "extra" => Self::Extra,
            _ => Self::Normal,
        }
    }
}

/// SQLite journal mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum JournalMode {
    /// DELETE - Default mode, deletes journal after transaction.
    #[default]
    Delete,
    /// TRUNCATE - Truncates journal instead of deleting.
    Truncate,
    /// PERSIST - Keep journal file, zero out on commit.
    Persist,
    /// MEMORY - Keep journal in memory.
    Memory,
    /// WAL - Write-Ahead Logging.
    Wal,
    /// OFF - No journal (dangerous).
    Off,
}

impl JournalMode {
    /// Get the SQLite pragma value.
    pub fn as_pragma(&self) -> &'static str {
        match self {
            Self::Delete => "DELETE",
            Self::Truncate => "TRUNCATE",
            Self::Persist => "PERSIST",
            Self::Memory => "MEMORY",
            Self::Wal => "WAL",
            Self::Off => "OFF",
        }
    }

    fn parse(value: &str) -> Self {
        match value.to_lowercase().as_str() {
            "truncate" => Self::Truncate,
            "persist" => Self::Persist,
            "memory" => Self::Memory,
            "wal" => Self::Wal,
            "off" => Self::Off,
            _ => Self::Delete,
        }
    }
}

impl Default for SqliteConfig {
    fn default() -> Self {
        Self {
            path: DatabasePath::Memory,
            foreign_keys: true,
            busy_timeout_ms: Some(5000),
            journal_mode: None,
            synchronous: None,
            read_only: false,
        }
    }
}

impl SqliteConfig {
    /// Create a new configuration for an in-memory database.
    pub fn memory() -> Self {
        Self {
            path: DatabasePath::Memory,
            ..Default::default()
        }
    }

    /// Create a new configuration for a file-based database.
    pub fn file(path: impl AsRef<Path>) -> Self {
        Self {
            path: DatabasePath::File(path.as_ref().to_path_buf()),
            ..Default::default()
        }
    }

    /// Parse a SQLite URL into configuration.
    ///
    /// Supported formats:
    /// - `sqlite::memory:` - In-memory database
    /// - `sqlite://path/to/db.sqlite` - File-based database
    /// - `sqlite:///absolute/path/db.sqlite` - Absolute path
    /// - `file:path/to/db.sqlite` - Alternative format
    /// - a bare filesystem path
    pub fn from_url(url: impl AsRef<str>) -> SqliteResult<Self> {
        let url_str = url.as_ref();

        if url_str == "sqlite::memory:" || url_str == ":memory:" {
            return Ok(Self::memory());
        }

        let path = if let Some(path_part) = url_str.strip_prefix("sqlite://") {
            let path_only = path_part.split('?').next().unwrap_or(path_part);
            if path_only.is_empty() {
                return Err(SqliteError::config("database path is required"));
            }
            path_only.to_string()
        } else if let Some(path_part) = url_str.strip_prefix("sqlite:") {
            let path_only = path_part.split('?').next().unwrap_or(path_part);
            if path_only == ":memory:" {
                return Ok(Self::memory());
            }
            path_only.to_string()
        } else if let Some(path_part) = url_str.strip_prefix("file:") {
            path_part.split('?').next().unwrap_or(path_part).to_string()
        } else {
            url_str.split('?').next().unwrap_or(url_str).to_string()
        };

        if path.is_empty() {
            return Err(SqliteError::config("database path is required"));
        }

        let mut config = Self::file(&path);

        if let Some(query_start) = url_str.find('?') {
            let query = &url_str[query_start + 1..];
            for pair in query.split('&') {
                let Some((key, value)) = pair.split_once('=') else {
                    continue;
                };
                match key {
                    "mode" if value == "memory" => config.path = DatabasePath::Memory,
                    "mode" if value == "ro" => config.read_only = true,
                    "foreign_keys" => {
                        config.foreign_keys = value == "true" || value == "1";
                    }
                    "busy_timeout" => {
                        if let Ok(ms) = value.parse() {
                            config.busy_timeout_ms = Some(ms);
                        }
                    }
                    "synchronous" => config.synchronous = Some(SynchronousMode::parse(value)),
                    "journal_mode" => config.journal_mode = Some(JournalMode::parse(value)),
                    _ => {}
                }
            }
        }

        Ok(config)
    }

    /// Get the path string for SQLite.
    pub fn path_str(&self) -> &str {
        self.path.as_str()
    }

    /// Generate the initialization SQL for this configuration.
    ///
    /// Read-only connections only get pragmas that do not write.
    pub fn init_sql(&self) -> String {
        let mut sql = String::new();

        if self.foreign_keys {
            sql.push_str("PRAGMA foreign_keys = ON;\n");
        }

        if let Some(timeout) = self.busy_timeout_ms {
            sql.push_str(&format!("PRAGMA busy_timeout = {};\n", timeout));
        }

        if !self.read_only {
            if let Some(mode) = self.journal_mode {
                sql.push_str(&format!("PRAGMA journal_mode = {};\n", mode.as_pragma()));
            }
            if let Some(mode) = self.synchronous {
                sql.push_str(&format!("PRAGMA synchronous = {};\n", mode.as_pragma()));
            }
        }

        sql
    }

    /// Set the database path.
    pub fn path(mut self, path: DatabasePath) -> Self {
        self.path = path;
        self
    }

    /// Enable or disable foreign keys.
    pub fn foreign_keys(mut self, enabled: bool) -> Self {
        self.foreign_keys = enabled;
        self
    }

    /// Set the busy timeout in milliseconds.
    pub fn busy_timeout(mut self, ms: u32) -> Self {
        self.busy_timeout_ms = Some(ms);
        self
    }

    /// Set the synchronous mode.
    pub fn synchronous(mut self, mode: SynchronousMode) -> Self {
        self.synchronous = Some(mode);
        self
    }

    /// Set the journal mode.
    pub fn journal_mode(mut self, mode: JournalMode) -> Self {
        self.journal_mode = Some(mode);
        self
    }

    /// Open the database read-only.
    pub fn read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }
}
