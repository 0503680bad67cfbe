//! Progress reporting.
//!
//! The engine reports what it is doing through a [`LogSink`]. Update rules
//! get the same sink through their [`RuleContext`].

use parking_lot::Mutex;
use strata_sqlite::Context;
use tracing::info;

use crate::error::MigrateResult;

/// Receives progress messages.
pub trait LogSink: Send + Sync {
    /// Record one message.
    fn log(&self, message: &str);
}

/// Emits every message as a `tracing` info event.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn log(&self, message: &str) {
        info!(target: "strata::migrate", "{}", message);
    }
}

/// Collects messages in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    messages: Mutex<Vec<String>>,
}

impl MemorySink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// A copy of every message so far.
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().clone()
    }

    /// Check whether any message contains `needle`.
    pub fn contains(&self, needle: &str) -> bool {
        self.messages.lock().iter().any(|m| m.contains(needle))
    }

    /// Drop all collected messages.
    pub fn clear(&self) {
        self.messages.lock().clear();
    }
}

impl LogSink for MemorySink {
    fn log(&self, message: &str) {
        self.messages.lock().push(message.to_string());
    }
}

/// What an update rule sees while it runs.
pub struct RuleContext<'a> {
    pub(crate) sink: &'a dyn LogSink,
    pub(crate) ctx: &'a Context,
    pub(crate) index: usize,
    pub(crate) source: &'a str,
    pub(crate) target: &'a str,
}

impl<'a> RuleContext<'a> {
    /// Build a context for running a rule outside the engine.
    pub fn new(sink: &'a dyn LogSink, ctx: &'a Context, index: usize, source: &'a str, target: &'a str) -> Self {
        Self {
            sink,
            ctx,
            index,
            source,
            target,
        }
    }

    /// Report progress.
    pub fn log(&self, message: impl AsRef<str>) {
        self.sink.log(message.as_ref());
    }

    /// The cancellation context of the running upgrade.
    pub fn context(&self) -> &Context {
        self.ctx
    }

    /// Fail if the upgrade has been cancelled or has expired.
    pub fn check(&self) -> MigrateResult<()> {
        Ok(self.ctx.check()?)
    }

    /// 1-based position of the rule in the update list.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Digest the rule starts from.
    pub fn source(&self) -> &str {
        self.source
    }

    /// Digest the rule must produce.
    pub fn target(&self) -> &str {
        self.target
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_sink() {
        let sink = MemorySink::new();
        sink.log("one");
        sink.log("two");
        assert_eq!(sink.messages(), vec!["one", "two"]);
        assert!(sink.contains("tw"));
        sink.clear();
        assert!(sink.messages().is_empty());
    }

    #[test]
    fn test_rule_context_forwards() {
        let sink = MemorySink::new();
        let ctx = Context::background();
        let rc = RuleContext::new(&sink, &ctx, 3, "aaa", "bbb");
        rc.log(format!("rule {}", rc.index()));
        assert_eq!(sink.messages(), vec!["rule 3"]);
        assert_eq!(rc.source(), "aaa");
        assert_eq!(rc.target(), "bbb");
        assert!(rc.check().is_ok());

        ctx.cancel();
        assert!(rc.check().is_err());
    }
}
