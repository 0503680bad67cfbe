//! Schema definitions and their update rules.
//!
//! A [`Schema`] is the SQL text of the newest version plus an ordered list of
//! [`UpdateRule`]s. Each rule moves a database from one digest to the next;
//! the last rule must end at the digest of the current text.
//!
//! ```rust,ignore
//! let schema = Schema::new(CURRENT_SQL)
//!     .with_update(UpdateRule::new(V1, V2, exec(["ALTER TABLE t ADD COLUMN y INTEGER"])))
//!     .with_update(UpdateRule::new(V2, V3, no_action()));
//! schema.check()?;
//! ```

use std::fmt;
use std::sync::Arc;

use rusqlite::Transaction;
use strata_sqlite::Context;

use crate::catalog::CatalogReader;
use crate::digest::sql_digest_with;
use crate::error::{ConsistencyError, ConsistencyErrors, MigrateResult, MigrationError};
use crate::log::RuleContext;

/// The action of an update rule.
///
/// It runs inside the upgrade transaction and must leave the database at the
/// rule's target digest.
pub type ApplyFn =
    Arc<dyn Fn(&RuleContext<'_>, &Transaction<'_>) -> MigrateResult<()> + Send + Sync>;

/// One step from a source digest to a target digest.
#[derive(Clone)]
pub struct UpdateRule {
    /// Digest of the schema this rule starts from.
    pub source: String,
    /// Digest of the schema this rule produces.
    pub target: String,
    /// What to run.
    pub apply: Option<ApplyFn>,
}

impl UpdateRule {
    /// Create a rule from a prepared action such as [`exec`](crate::exec).
    pub fn new(source: impl Into<String>, target: impl Into<String>, apply: ApplyFn) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            apply: Some(apply),
        }
    }

    /// Create a rule from a closure.
    pub fn from_fn<F>(source: impl Into<String>, target: impl Into<String>, f: F) -> Self
    where
        F: Fn(&RuleContext<'_>, &Transaction<'_>) -> MigrateResult<()> + Send + Sync + 'static,
    {
        Self::new(source, target, Arc::new(f))
    }
}

impl fmt::Debug for UpdateRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpdateRule")
            .field("source", &self.source)
            .field("target", &self.target)
            .field("apply", &self.apply.as_ref().map(|_| "<fn>"))
            .finish()
    }
}

/// A schema definition: the current text and how to reach it.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    /// SQL text of the newest schema version.
    pub current: String,
    /// Update rules, oldest first.
    pub updates: Vec<UpdateRule>,
}

impl Schema {
    /// Create a definition with no update rules.
    pub fn new(current: impl Into<String>) -> Self {
        Self {
            current: current.into(),
            updates: Vec::new(),
        }
    }

    /// Append an update rule.
    pub fn with_update(mut self, rule: UpdateRule) -> Self {
        self.updates.push(rule);
        self
    }

    /// Append several update rules.
    pub fn with_updates(mut self, rules: impl IntoIterator<Item = UpdateRule>) -> Self {
        self.updates.extend(rules);
        self
    }

    /// Fingerprint of the current text.
    pub fn current_digest(&self) -> MigrateResult<String> {
        sql_digest_with(&self.current, &CatalogReader::default(), &Context::background())
    }

    /// Position of the last rule whose source is `digest`.
    ///
    /// The last occurrence wins, so a chain that revisits a digest resumes
    /// from its latest visit.
    pub fn last_rule_from(&self, digest: &str) -> Option<usize> {
        self.updates.iter().rposition(|rule| rule.source == digest)
    }

    /// Check that the definition is self-consistent.
    ///
    /// Every problem is reported, not just the first.
    pub fn check(&self) -> MigrateResult<()> {
        check_with(self, &CatalogReader::default(), &Context::background()).map(|_| ())
    }
}

/// Check a definition and return the digest of its current text.
pub(crate) fn check_with(schema: &Schema, reader: &CatalogReader, ctx: &Context) -> MigrateResult<String> {
    if schema.current.trim().is_empty() {
        return Err(MigrationError::Inconsistent(ConsistencyErrors(vec![
            ConsistencyError::NoCurrent,
        ])));
    }

    let mut problems = Vec::new();
    let mut last = "";
    for (i, rule) in schema.updates.iter().enumerate() {
        let index = i + 1;
        if rule.source.is_empty() {
            problems.push(ConsistencyError::MissingSource(index));
        }
        if rule.target.is_empty() {
            problems.push(ConsistencyError::MissingTarget(index));
        }
        if rule.apply.is_none() {
            problems.push(ConsistencyError::MissingApply(index));
        }
        if !last.is_empty() && rule.source != last {
            problems.push(ConsistencyError::BrokenStitch {
                index,
                want: last.to_string(),
                got: rule.source.clone(),
            });
        }
        last = &rule.target;
    }

    let current = match sql_digest_with(&schema.current, reader, ctx) {
        Ok(digest) => Some(digest),
        Err(e) if e.is_cancellation() => return Err(e),
        Err(e) => {
            problems.push(ConsistencyError::InvalidCurrent(e.to_string()));
            None
        }
    };

    if let Some(current) = &current {
        if !last.is_empty() && last != current {
            problems.push(ConsistencyError::MissingTail {
                from: last.to_string(),
                to: current.clone(),
            });
        }
    }

    match current {
        Some(digest) if problems.is_empty() => Ok(digest),
        _ => Err(MigrationError::Inconsistent(ConsistencyErrors(problems))),
    }
}
