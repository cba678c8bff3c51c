//! Unified diffs between two renderings of an item
//!
//! Lines are aligned with a longest-common-subsequence; when several
//! alignments are equally long the earliest matching position wins, so the
//! output is fully deterministic. Hunks carry [`CONTEXT`] lines of context
//! and are merged when the unchanged gap between them is small enough to
//! share it.

use crate::snapshot::SpecItem;
use crate::strip::strip_comments;
use std::ops::Range;

/// Lines of context around each change
pub const CONTEXT: usize = 3;

/// A diff line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiffLine {
    Context(String),
    Added(String),
    Removed(String),
}

impl std::fmt::Display for DiffLine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DiffLine::Context(s) => write!(f, " {s}"),
            DiffLine::Added(s) => write!(f, "+{s}"),
            DiffLine::Removed(s) => write!(f, "-{s}"),
        }
    }
}

/// A diff hunk. Ranges are 0-based line ranges into each side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffHunk {
    pub old: Range<usize>,
    pub new: Range<usize>,
    pub lines: Vec<DiffLine>,
}

impl DiffHunk {
    /// `@@ -a,b +c,d @@`, with the usual unified-diff range shorthand
    pub fn header(&self) -> String {
        format!(
            "@@ -{} +{} @@",
            format_range(&self.old),
            format_range(&self.new)
        )
    }
}

fn format_range(range: &Range<usize>) -> String {
    let length = range.end - range.start;
    match length {
        0 => format!("{},0", range.start),
        1 => format!("{}", range.start + 1),
        _ => format!("{},{}", range.start + 1, length),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OpKind {
    Equal,
    Change,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Op {
    kind: OpKind,
    old: Range<usize>,
    new: Range<usize>,
}

/// Line diff between two texts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextDiff {
    pub hunks: Vec<DiffHunk>,
}

impl TextDiff {
    /// Compute the diff between two sequences of lines
    pub fn compute<S: AsRef<str>>(old: &[S], new: &[S]) -> Self {
        let old: Vec<&str> = old.iter().map(AsRef::as_ref).collect();
        let new: Vec<&str> = new.iter().map(AsRef::as_ref).collect();

        let hunks = group(align(&old, &new), CONTEXT)
            .into_iter()
            .map(|ops| build_hunk(&ops, &old, &new))
            .collect();
        Self { hunks }
    }

    /// Whether the two sides were identical
    pub fn is_empty(&self) -> bool {
        self.hunks.is_empty()
    }

    /// Hunk headers and lines, without the file header
    pub fn to_lines(&self) -> Vec<String> {
        let mut out = Vec::new();
        for hunk in &self.hunks {
            out.push(hunk.header());
            out.extend(hunk.lines.iter().map(ToString::to_string));
        }
        out
    }
}

/// Diff two items after stripping their comments.
///
/// The result starts with `--- <older fork>` / `+++ <newer fork>` and is
/// empty when the stripped renderings are identical.
pub fn diff(older: &SpecItem<'_>, newer: &SpecItem<'_>) -> Vec<String> {
    diff_text(older.fork, older.text, newer.fork, newer.text)
}

/// Like [`diff`], on raw text
pub fn diff_text(old_name: &str, old: &str, new_name: &str, new: &str) -> Vec<String> {
    unified(old_name, &strip_comments(old), new_name, &strip_comments(new))
}

/// Unified diff of two line sequences, with a header naming both sides
pub fn unified<S: AsRef<str>>(old_name: &str, old: &[S], new_name: &str, new: &[S]) -> Vec<String> {
    let diff = TextDiff::compute(old, new);
    if diff.is_empty() {
        return Vec::new();
    }

    let mut out = vec![format!("--- {old_name}"), format!("+++ {new_name}")];
    out.extend(diff.to_lines());
    out
}

/// Align two line sequences into equal and changed runs
fn align(a: &[&str], b: &[&str]) -> Vec<Op> {
    let prefix = a.iter().zip(b).take_while(|(x, y)| x == y).count();
    let suffix = a[prefix..]
        .iter()
        .rev()
        .zip(b[prefix..].iter().rev())
        .take_while(|(x, y)| x == y)
        .count();

    let mid_a = &a[prefix..a.len() - suffix];
    let mid_b = &b[prefix..b.len() - suffix];
    let (n, m) = (mid_a.len(), mid_b.len());

    // lcs[i * (m + 1) + j] = LCS length of mid_a[i..] and mid_b[j..]
    let width = m + 1;
    let mut lcs = vec![0u32; (n + 1) * width];
    for i in (0..n).rev() {
        for j in (0..m).rev() {
            lcs[i * width + j] = if mid_a[i] == mid_b[j] {
                lcs[(i + 1) * width + j + 1] + 1
            } else {
                lcs[(i + 1) * width + j].max(lcs[i * width + j + 1])
            };
        }
    }

    let mut ops: Vec<Op> = Vec::new();
    push_op(&mut ops, OpKind::Equal, 0, 0, prefix, prefix);

    let (mut i, mut j) = (0, 0);
    while i < n || j < m {
        let (at_a, at_b) = (prefix + i, prefix + j);
        if i < n && j < m && mid_a[i] == mid_b[j] {
            push_op(&mut ops, OpKind::Equal, at_a, at_b, 1, 1);
            i += 1;
            j += 1;
        } else if j == m || (i < n && lcs[(i + 1) * width + j] >= lcs[i * width + j + 1]) {
            push_op(&mut ops, OpKind::Change, at_a, at_b, 1, 0);
            i += 1;
        } else {
            push_op(&mut ops, OpKind::Change, at_a, at_b, 0, 1);
            j += 1;
        }
    }

    push_op(&mut ops, OpKind::Equal, prefix + n, prefix + m, suffix, suffix);
    ops
}

/// Append a run, merging it into the previous one when they are contiguous
fn push_op(ops: &mut Vec<Op>, kind: OpKind, i: usize, j: usize, di: usize, dj: usize) {
    if di == 0 && dj == 0 {
        return;
    }
    match ops.last_mut() {
        Some(last) if last.kind == kind && last.old.end == i && last.new.end == j => {
            last.old.end += di;
            last.new.end += dj;
        }
        _ => ops.push(Op {
            kind,
            old: i..i + di,
            new: j..j + dj,
        }),
    }
}

/// Split aligned runs into hunks with `n` lines of context
fn group(mut ops: Vec<Op>, n: usize) -> Vec<Vec<Op>> {
    if let Some(first) = ops.first_mut().filter(|op| op.kind == OpKind::Equal) {
        first.old.start = first.old.start.max(first.old.end.saturating_sub(n));
        first.new.start = first.new.start.max(first.new.end.saturating_sub(n));
    }
    if let Some(last) = ops.last_mut().filter(|op| op.kind == OpKind::Equal) {
        last.old.end = last.old.end.min(last.old.start + n);
        last.new.end = last.new.end.min(last.new.start + n);
    }

    let mut groups = Vec::new();
    let mut current: Vec<Op> = Vec::new();
    for mut op in ops {
        if op.kind == OpKind::Equal && op.old.len() > 2 * n {
            current.push(Op {
                kind: OpKind::Equal,
                old: op.old.start..op.old.end.min(op.old.start + n),
                new: op.new.start..op.new.end.min(op.new.start + n),
            });
            groups.push(std::mem::take(&mut current));
            op.old.start = op.old.start.max(op.old.end - n);
            op.new.start = op.new.start.max(op.new.end - n);
        }
        current.push(op);
    }

    let only_context = current.len() == 1 && current[0].kind == OpKind::Equal;
    if !current.is_empty() && !only_context {
        groups.push(current);
    }
    groups
}

fn build_hunk(ops: &[Op], old: &[&str], new: &[&str]) -> DiffHunk {
    let mut lines = Vec::new();
    for op in ops {
        match op.kind {
            OpKind::Equal => {
                lines.extend(old[op.old.clone()].iter().map(|l| DiffLine::Context(l.to_string())));
            }
            OpKind::Change => {
                lines.extend(old[op.old.clone()].iter().map(|l| DiffLine::Removed(l.to_string())));
                lines.extend(new[op.new.clone()].iter().map(|l| DiffLine::Added(l.to_string())));
            }
        }
    }

    let (first, last) = (&ops[0], &ops[ops.len() - 1]);
    DiffHunk {
        old: first.old.start..last.old.end,
        new: first.new.start..last.new.end,
        lines,
    }
}
