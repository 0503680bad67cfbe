//! Minimal edit scripts between two sequences.
//!
//! Both column lists and lines of SQL text are compared with the same
//! longest-common-subsequence walk. [`edit_script`] returns only the changes,
//! with adjacent delete and insert runs paired into replacements.
//! [`unified`] renders a line diff with surrounding context.

use std::fmt::Write;
use std::ops::Range;

/// The kind of a single edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditOp {
    /// Elements present only on the right.
    Insert,
    /// Elements present only on the left.
    Delete,
    /// Left elements replaced one-for-one by right elements.
    Replace,
}

/// One change between two sequences.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    /// What kind of change this is.
    pub op: EditOp,
    /// Affected positions on the left (empty for inserts).
    pub lhs: Range<usize>,
    /// Affected positions on the right (empty for deletes).
    pub rhs: Range<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Keep,
    Delete,
    Insert,
}

/// Walk both sequences along a longest common subsequence.
fn steps<T: PartialEq>(lhs: &[T], rhs: &[T]) -> Vec<Step> {
    let (n, m) = (lhs.len(), rhs.len());
    // lcs[i][j] is the LCS length of lhs[i..] and rhs[j..].
    let mut lcs = vec![vec![0u32; m + 1]; n + 1];
    for i in (0..n).rev() {
        for j in (0..m).rev() {
            lcs[i][j] = if lhs[i] == rhs[j] {
                lcs[i + 1][j + 1] + 1
            } else {
                lcs[i + 1][j].max(lcs[i][j + 1])
            };
        }
    }

    let mut out = Vec::with_capacity(n + m);
    let (mut i, mut j) = (0, 0);
    while i < n && j < m {
        if lhs[i] == rhs[j] {
            out.push(Step::Keep);
            i += 1;
            j += 1;
        } else if lcs[i + 1][j] >= lcs[i][j + 1] {
            out.push(Step::Delete);
            i += 1;
        } else {
            out.push(Step::Insert);
            j += 1;
        }
    }
    out.extend(std::iter::repeat_n(Step::Delete, n - i));
    out.extend(std::iter::repeat_n(Step::Insert, m - j));
    out
}

/// Compute the changes that turn `lhs` into `rhs`.
///
/// An empty result means the sequences are equal.
pub fn edit_script<T: PartialEq>(lhs: &[T], rhs: &[T]) -> Vec<Edit> {
    let steps = steps(lhs, rhs);
    let mut edits = Vec::new();
    let (mut i, mut j, mut k) = (0, 0, 0);

    while k < steps.len() {
        if steps[k] == Step::Keep {
            i += 1;
            j += 1;
            k += 1;
            continue;
        }

        let (i0, j0) = (i, j);
        while k < steps.len() && steps[k] != Step::Keep {
            match steps[k] {
                Step::Delete => i += 1,
                Step::Insert => j += 1,
                Step::Keep => {}
            }
            k += 1;
        }

        let paired = (i - i0).min(j - j0);
        if paired > 0 {
            edits.push(Edit {
                op: EditOp::Replace,
                lhs: i0..i0 + paired,
                rhs: j0..j0 + paired,
            });
        }
        if i0 + paired < i {
            edits.push(Edit {
                op: EditOp::Delete,
                lhs: i0 + paired..i,
                rhs: j..j,
            });
        }
        if j0 + paired < j {
            edits.push(Edit {
                op: EditOp::Insert,
                lhs: i..i,
                rhs: j0 + paired..j,
            });
        }
    }
    edits
}

/// Render a unified line diff of two texts with `context` lines of context.
///
/// Returns an empty string when the texts have the same lines.
pub fn unified(lhs: &str, rhs: &str, context: usize) -> String {
    let a: Vec<&str> = lhs.lines().collect();
    let b: Vec<&str> = rhs.lines().collect();
    let steps = steps(&a, &b);

    // Position in each side before every step.
    let mut pos = Vec::with_capacity(steps.len() + 1);
    let (mut i, mut j) = (0, 0);
    for step in &steps {
        pos.push((i, j));
        match step {
            Step::Keep => {
                i += 1;
                j += 1;
            }
            Step::Delete => i += 1,
            Step::Insert => j += 1,
        }
    }
    pos.push((i, j));

    let changed: Vec<usize> = (0..steps.len()).filter(|&k| steps[k] != Step::Keep).collect();
    let Some(&first) = changed.first() else {
        return String::new();
    };

    let mut hunks = Vec::new();
    let (mut start, mut end) = (first, first);
    for &k in &changed[1..] {
        if k - end - 1 <= 2 * context {
            end = k;
        } else {
            hunks.push((start, end));
            start = k;
            end = k;
        }
    }
    hunks.push((start, end));

    let mut out = String::new();
    for (start, end) in hunks {
        let lo = start.saturating_sub(context);
        let hi = (end + context + 1).min(steps.len());
        let (a0, b0) = pos[lo];
        let (a1, b1) = pos[hi];
        let _ = writeln!(
            out,
            "@@ -{} +{} @@",
            hunk_range(a0, a1 - a0),
            hunk_range(b0, b1 - b0)
        );
        for k in lo..hi {
            let (ai, bj) = pos[k];
            let _ = match steps[k] {
                Step::Keep => writeln!(out, " {}", a[ai]),
                Step::Delete => writeln!(out, "-{}", a[ai]),
                Step::Insert => writeln!(out, "+{}", b[bj]),
            };
        }
    }
    out
}

fn hunk_range(start: usize, len: usize) -> String {
    match len {
        0 => format!("{},0", start),
        1 => format!("{}", start + 1),
        _ => format!("{},{}", start + 1, len),
    }
}
