//! Error types for the migration engine.

use std::fmt;

use strata_sqlite::SqliteError;
use thiserror::Error;

use crate::validate::ValidationError;

/// Result type alias for migration operations.
pub type MigrateResult<T> = Result<T, MigrationError>;

/// Errors that can occur during migration operations.
#[derive(Debug, Error)]
pub enum MigrationError {
    /// SQLite driver error.
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Engine boundary error (connection, configuration, async worker).
    #[error(transparent)]
    Engine(SqliteError),

    /// The context was cancelled before the operation finished.
    #[error("operation cancelled")]
    Cancelled,

    /// The context deadline passed before the operation finished.
    #[error("operation deadline exceeded")]
    DeadlineExceeded,

    /// The schema definition or its update rules are inconsistent.
    #[error("{0}")]
    Inconsistent(ConsistencyErrors),

    /// The database has structure that is not recorded in its history.
    #[error("database has an unmanaged schema already")]
    UnmanagedSchema,

    /// The live digest does not appear as the source of any update rule.
    #[error("no update found for digest {0} (this binary may be too old)")]
    NoUpdateFound(String),

    /// An update rule returned an error.
    #[error("update {index} failed at digest {source_digest}: {source}")]
    RuleFailed {
        /// 1-based index of the rule.
        index: usize,
        /// Declared source digest of the rule.
        source_digest: String,
        /// The underlying failure.
        #[source]
        source: Box<MigrationError>,
    },

    /// A step ran without error but produced an unexpected digest.
    #[error("confirming update {step}: got digest {actual}, want {expected}")]
    Confirmation {
        /// What was being confirmed ("1", "2", ... or "initial schema").
        step: String,
        /// Digest declared by the rule or definition.
        expected: String,
        /// Digest actually observed.
        actual: String,
    },

    /// Executing the current definition on an empty database failed.
    #[error("apply current schema: {0}")]
    Bootstrap(#[source] rusqlite::Error),

    /// A statement inside a rule failed.
    #[error("stmt {index}: {source}")]
    Statement {
        /// 1-based index of the statement.
        index: usize,
        /// The driver error.
        #[source]
        source: rusqlite::Error,
    },

    /// Reading a catalog row failed.
    #[error("scan {catalog} schema: {message}")]
    Catalog {
        /// Catalog root name.
        catalog: String,
        /// What went wrong.
        message: String,
    },

    /// Digest encoding error.
    #[error("encode schema: {0}")]
    Encode(#[from] serde_json::Error),

    /// The live schema differs from the expected definition.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// General migration error.
    #[error("Migration error: {0}")]
    Other(String),
}

impl MigrationError {
    /// Create an other error.
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    /// Create a catalog decoding error.
    pub fn catalog(catalog: impl Into<String>, msg: impl fmt::Display) -> Self {
        Self::Catalog {
            catalog: catalog.into(),
            message: msg.to_string(),
        }
    }

    /// Wrap a rule failure with its position and declared source.
    pub fn rule_failed(index: usize, source_digest: impl Into<String>, err: MigrationError) -> Self {
        Self::RuleFailed {
            index,
            source_digest: source_digest.into(),
            source: Box::new(err),
        }
    }

    /// Check whether this error came from a cancelled or expired context.
    pub fn is_cancellation(&self) -> bool {
        match self {
            Self::Cancelled | Self::DeadlineExceeded => true,
            Self::RuleFailed { source, .. } => source.is_cancellation(),
            _ => false,
        }
    }

    /// Check whether this error is a static definition problem, found before
    /// any database access.
    pub fn is_definition_error(&self) -> bool {
        matches!(self, Self::Inconsistent(_))
    }
}

impl From<SqliteError> for MigrationError {
    fn from(err: SqliteError) -> Self {
        match err {
            SqliteError::Sqlite(e) => Self::Sqlite(e),
            SqliteError::Cancelled => Self::Cancelled,
            SqliteError::DeadlineExceeded => Self::DeadlineExceeded,
            other => Self::Engine(other),
        }
    }
}

/// A single consistency problem in a schema definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsistencyError {
    /// The current schema text is empty.
    NoCurrent,
    /// The current schema text could not be interpreted.
    InvalidCurrent(String),
    /// Rule `index` (1-based) has an empty source digest.
    MissingSource(usize),
    /// Rule `index` (1-based) has an empty target digest.
    MissingTarget(usize),
    /// Rule `index` (1-based) has no apply function.
    MissingApply(usize),
    /// Rule `index` (1-based) does not start where the previous one ended.
    BrokenStitch {
        /// 1-based index of the rule.
        index: usize,
        /// Target of the previous rule.
        want: String,
        /// Source of this rule.
        got: String,
    },
    /// The last rule does not reach the current schema.
    MissingTail {
        /// Target of the last rule.
        from: String,
        /// Digest of the current schema.
        to: String,
    },
}

impl fmt::Display for ConsistencyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoCurrent => write!(f, "no current schema is defined"),
            Self::InvalidCurrent(msg) => write!(f, "current schema: {}", msg),
            Self::MissingSource(i) => write!(f, "upgrade {}: missing source", i),
            Self::MissingTarget(i) => write!(f, "upgrade {}: missing target", i),
            Self::MissingApply(i) => write!(f, "upgrade {}: missing apply function", i),
            Self::BrokenStitch { index, want, got } => {
                write!(f, "upgrade {}: want source {}, got {}", index, want, got)
            }
            Self::MissingTail { from, to } => write!(f, "missing upgrade from {} to {}", from, to),
        }
    }
}

/// Every consistency problem found in one check, in discovery order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConsistencyErrors(pub Vec<ConsistencyError>);

impl ConsistencyErrors {
    /// The individual problems.
    pub fn problems(&self) -> &[ConsistencyError] {
        &self.0
    }

    /// Check whether no problems were recorded.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ConsistencyErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, problem) in self.0.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", problem)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = MigrationError::NoUpdateFound("abc123".to_string());
        let msg = err.to_string();
        assert!(msg.contains("abc123"));
        assert!(msg.contains("too old"));
    }

    #[test]
    fn test_confirmation_display() {
        let err = MigrationError::Confirmation {
            step: "3".to_string(),
            expected: "abc".to_string(),
            actual: "xyz".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("confirming update 3"));
        assert!(msg.contains("abc"));
        assert!(msg.contains("xyz"));
    }

    #[test]
    fn test_rule_failed_wraps_source() {
        let err = MigrationError::rule_failed(2, "deadbeef", MigrationError::other("boom"));
        let msg = err.to_string();
        assert!(msg.contains("update 2"));
        assert!(msg.contains("deadbeef"));
        assert!(msg.contains("boom"));
    }

    #[test]
    fn test_consistency_errors_join() {
        let errs = ConsistencyErrors(vec![
            ConsistencyError::MissingSource(1),
            ConsistencyError::BrokenStitch {
                index: 2,
                want: "def".to_string(),
                got: "ghi".to_string(),
            },
        ]);
        assert_eq!(
            errs.to_string(),
            "upgrade 1: missing source\nupgrade 2: want source def, got ghi"
        );
    }

    #[test]
    fn test_cancellation_mapping() {
        assert!(MigrationError::from(SqliteError::Cancelled).is_cancellation());
        assert!(MigrationError::from(SqliteError::DeadlineExceeded).is_cancellation());
        let wrapped = MigrationError::rule_failed(1, "a", MigrationError::Cancelled);
        assert!(wrapped.is_cancellation());
        assert!(!MigrationError::UnmanagedSchema.is_cancellation());
    }
}
