//! Human-readable differences between two schema snapshots.
//!
//! Objects are matched by kind and name. Every object on the left is either
//! removed or, if its counterpart differs, modified; objects that only
//! appear on the right are added. Tables are compared column by column,
//! everything else line by line.

use std::collections::HashMap;
use std::fmt;

use crate::catalog::{ObjectKind, SchemaRow};
use crate::edit::{EditOp, edit_script, unified};

/// Lines of context shown around changed SQL lines.
const CONTEXT_LINES: usize = 2;

/// One difference between two snapshots.
#[derive(Debug, Clone, PartialEq)]
pub enum DiffEntry {
    /// Present only on the left.
    Remove(SchemaRow),
    /// Present on both sides with different content.
    Modify {
        /// The left object.
        from: SchemaRow,
        /// The right object.
        to: SchemaRow,
    },
    /// Present only on the right.
    Add(SchemaRow),
}

impl DiffEntry {
    /// The object this entry is about.
    pub fn row(&self) -> &SchemaRow {
        match self {
            Self::Remove(row) | Self::Add(row) => row,
            Self::Modify { to, .. } => to,
        }
    }
}

/// A diff between two schema snapshots.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchemaDiff {
    /// Differences, in rendering order.
    pub entries: Vec<DiffEntry>,
}

impl SchemaDiff {
    /// Check if there are any differences.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Get a human-readable summary of the diff.
    pub fn summary(&self) -> String {
        let count = |pred: fn(&DiffEntry) -> bool| self.entries.iter().filter(|e| pred(e)).count();
        let removed = count(|e| matches!(e, DiffEntry::Remove(_)));
        let modified = count(|e| matches!(e, DiffEntry::Modify { .. }));
        let added = count(|e| matches!(e, DiffEntry::Add(_)));

        let mut parts = Vec::new();
        if removed > 0 {
            parts.push(format!("Remove {} objects", removed));
        }
        if modified > 0 {
            parts.push(format!("Modify {} objects", modified));
        }
        if added > 0 {
            parts.push(format!("Add {} objects", added));
        }
        if parts.is_empty() {
            "No changes".to_string()
        } else {
            parts.join(", ")
        }
    }
}

/// Compare two snapshots.
///
/// Both inputs should be in canonical order, as produced by the catalog
/// reader.
pub fn compare(lhs: &[SchemaRow], rhs: &[SchemaRow]) -> SchemaDiff {
    let left: HashMap<(ObjectKind, &str), &SchemaRow> = lhs.iter().map(|r| (r.key(), r)).collect();
    let right: HashMap<(ObjectKind, &str), &SchemaRow> = rhs.iter().map(|r| (r.key(), r)).collect();

    let mut entries = Vec::new();
    for row in lhs {
        match right.get(&row.key()) {
            None => entries.push(DiffEntry::Remove(row.clone())),
            Some(other) if *other != row => entries.push(DiffEntry::Modify {
                from: row.clone(),
                to: (*other).clone(),
            }),
            Some(_) => {}
        }
    }
    for row in rhs {
        if !left.contains_key(&row.key()) {
            entries.push(DiffEntry::Add(row.clone()));
        }
    }
    SchemaDiff { entries }
}

/// Render the difference between two snapshots, or an empty string if they
/// are equal.
pub fn diff_schema(lhs: &[SchemaRow], rhs: &[SchemaRow]) -> String {
    compare(lhs, rhs).to_string()
}

fn write_modify(f: &mut fmt::Formatter<'_>, from: &SchemaRow, to: &SchemaRow) -> fmt::Result {
    if from.columns.is_empty() && to.columns.is_empty() {
        return f.write_str(&unified(&from.sql, &to.sql, CONTEXT_LINES));
    }

    for edit in edit_script(&from.columns, &to.columns) {
        match edit.op {
            EditOp::Insert => {
                for col in &to.columns[edit.rhs] {
                    writeln!(f, " + add column {}", col)?;
                }
            }
            EditOp::Replace => {
                for (old, new) in from.columns[edit.lhs].iter().zip(&to.columns[edit.rhs]) {
                    writeln!(f, " ! replace column {}", old)?;
                    writeln!(f, "   with {}", new)?;
                }
            }
            EditOp::Delete => {
                for col in &from.columns[edit.lhs] {
                    writeln!(f, " - remove column {}", col)?;
                }
            }
        }
    }
    Ok(())
}

impl fmt::Display for SchemaDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for entry in &self.entries {
            match entry {
                DiffEntry::Remove(row) => {
                    writeln!(f, "\n>> Remove {} {:?}", row.kind, row.name)?;
                }
                DiffEntry::Modify { from, to } => {
                    writeln!(f, "\n>> Modify {} {:?}", to.kind, to.name)?;
                    write_modify(f, from, to)?;
                }
                DiffEntry::Add(row) => {
                    writeln!(f, "\n>> Add {} {:?}", row.kind, row.name)?;
                    for col in &row.columns {
                        writeln!(f, "+ column {}", col)?;
                    }
                    for line in row.sql.lines() {
                        writeln!(f, "+ {}", line)?;
                    }
                }
            }
        }
        Ok(())
    }
}
