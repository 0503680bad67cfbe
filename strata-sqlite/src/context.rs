//! Cancellation and deadlines for SQLite calls.
//!
//! A [`Context`] is a cheap, cloneable token. Code that runs against a
//! connection attaches the context with [`Context::attach`], which installs a
//! SQLite progress handler: once the context is cancelled or its deadline
//! passes, the statement currently executing is interrupted and fails with
//! `SQLITE_INTERRUPT`. [`Context::check`] turns that state into a
//! [`SqliteError`] at step boundaries.
//!
//! ```rust,ignore
//! let ctx = Context::with_timeout(Duration::from_secs(30));
//! let _guard = ctx.attach(&conn);
//! conn.execute_batch(sql)?;
//! ctx.check()?;
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use rusqlite::Connection;
use tracing::trace;

use crate::error::{SqliteError, SqliteResult};

/// Number of virtual machine instructions between progress handler calls.
const PROGRESS_INTERVAL: i32 = 1000;

/// A cancellation and deadline token threaded through database calls.
#[derive(Debug, Clone, Default)]
pub struct Context {
    cancelled: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl Context {
    /// A context that is never done unless cancelled.
    pub fn background() -> Self {
        Self::default()
    }

    /// A context that expires after `timeout`.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_deadline(Instant::now() + timeout)
    }

    /// A context that expires at `deadline`.
    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
            deadline: Some(deadline),
        }
    }

    /// The deadline, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Cancel this context and every clone of it.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Report whether the context has been cancelled or has expired.
    pub fn is_done(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
            || self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Report an error if the context is done.
    pub fn check(&self) -> SqliteResult<()> {
        if self.cancelled.load(Ordering::SeqCst) {
            Err(SqliteError::Cancelled)
        } else if self.deadline.is_some_and(|d| Instant::now() >= d) {
            Err(SqliteError::DeadlineExceeded)
        } else {
            Ok(())
        }
    }

    /// Install an interrupt hook on `conn` for as long as the guard lives.
    pub fn attach<'c>(&self, conn: &'c Connection) -> InterruptGuard<'c> {
        let cancelled = Arc::clone(&self.cancelled);
        let deadline = self.deadline;
        conn.progress_handler(
            PROGRESS_INTERVAL,
            Some(move || {
                cancelled.load(Ordering::SeqCst) || deadline.is_some_and(|d| Instant::now() >= d)
            }),
        );
        trace!("Attached context interrupt handler");
        InterruptGuard { conn }
    }
}

/// Removes the progress handler installed by [`Context::attach`] on drop.
pub struct InterruptGuard<'c> {
    conn: &'c Connection,
}

impl Drop for InterruptGuard<'_> {
    fn drop(&mut self) {
        self.conn.progress_handler(0, None::<fn() -> bool>);
        trace!("Detached context interrupt handler");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_background_is_not_done() {
        let ctx = Context::background();
        assert!(!ctx.is_done());
        assert!(ctx.check().is_ok());
        assert!(ctx.deadline().is_none());
    }

    #[test]
    fn test_cancel_is_shared_by_clones() {
        let ctx = Context::background();
        let clone = ctx.clone();
        clone.cancel();
        assert!(ctx.is_done());
        assert!(matches!(ctx.check(), Err(SqliteError::Cancelled)));
    }

    #[test]
    fn test_expired_deadline() {
        let ctx = Context::with_deadline(Instant::now() - Duration::from_millis(1));
        assert!(ctx.is_done());
        assert!(matches!(ctx.check(), Err(SqliteError::DeadlineExceeded)));
    }

    #[test]
    fn test_attach_interrupts_statements() {
        let conn = Connection::open_in_memory().unwrap();
        let ctx = Context::background();
        ctx.cancel();

        let guard = ctx.attach(&conn);
        let result: rusqlite::Result<i64> = conn.query_row(
            "WITH RECURSIVE c(x) AS (SELECT 1 UNION ALL SELECT x + 1 FROM c WHERE x < 1000000) \
             SELECT count(*) FROM c",
            [],
            |row| row.get(0),
        );
        assert!(result.is_err());

        drop(guard);
        let n: i64 = conn.query_row("SELECT 1", [], |row| row.get(0)).unwrap();
        assert_eq!(n, 1);
    }
}
