//! Statement-level differences between two versions of a spec.
//!
//! Both texts are split into statements and aligned with a longest common
//! subsequence. When two alignments are equally long the lexicographically
//! smaller statement is skipped first, so the alignment of `(a, b)` is the
//! mirror image of the alignment of `(b, a)`. Unmatched statements between
//! two anchors are paired by position; a pair that is still mostly the same
//! statement becomes a single modification.

use std::fmt;

use serde::{Deserialize, Serialize};

use specmem_core::text::{jaccard, tokenize};

use crate::contradiction::ContradictionDetector;
use crate::segment::segments;

/// Minimum token overlap for a removed/added pair to count as one edit.
pub const MODIFIED_SIMILARITY: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChangeKind {
    Added,
    Removed,
    Modified,
}

impl ChangeKind {
    /// The kind seen from the other direction.
    pub fn inverse(self) -> Self {
        match self {
            ChangeKind::Added => ChangeKind::Removed,
            ChangeKind::Removed => ChangeKind::Added,
            ChangeKind::Modified => ChangeKind::Modified,
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeKind::Added => write!(f, "ADDED"),
            ChangeKind::Removed => write!(f, "REMOVED"),
            ChangeKind::Modified => write!(f, "MODIFIED"),
        }
    }
}

/// One changed statement.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChangeUnit {
    pub kind: ChangeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub before: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after: Option<String>,
}

impl ChangeUnit {
    pub fn added(text: impl Into<String>) -> Self {
        Self {
            kind: ChangeKind::Added,
            before: None,
            after: Some(text.into()),
        }
    }

    pub fn removed(text: impl Into<String>) -> Self {
        Self {
            kind: ChangeKind::Removed,
            before: Some(text.into()),
            after: None,
        }
    }

    pub fn modified(before: impl Into<String>, after: impl Into<String>) -> Self {
        Self {
            kind: ChangeKind::Modified,
            before: Some(before.into()),
            after: Some(after.into()),
        }
    }

    /// The same change seen from the other direction.
    pub fn inverse(&self) -> Self {
        Self {
            kind: self.kind.inverse(),
            before: self.after.clone(),
            after: self.before.clone(),
        }
    }
}

/// The difference between two versions of one spec.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpecChange {
    pub spec_id: String,
    pub from_version: String,
    pub to_version: String,
    pub changes: Vec<ChangeUnit>,
}

impl SpecChange {
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn count(&self, kind: ChangeKind) -> usize {
        self.changes.iter().filter(|c| c.kind == kind).count()
    }
}

/// Statement-level changes turning `old` into `new`.
pub fn diff_texts(old: &str, new: &str, detector: &dyn ContradictionDetector) -> Vec<ChangeUnit> {
    let a = segments(old);
    let b = segments(new);
    let mut changes = Vec::new();
    let mut removed: Vec<&str> = Vec::new();
    let mut added: Vec<&str> = Vec::new();

    for step in align(&a, &b) {
        match step {
            Step::Keep => flush_gap(&mut removed, &mut added, detector, &mut changes),
            Step::Remove(i) => removed.push(&a[i]),
            Step::Add(j) => added.push(&b[j]),
        }
    }
    flush_gap(&mut removed, &mut added, detector, &mut changes);
    changes
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Step {
    Keep,
    Remove(usize),
    Add(usize),
}

/// LCS alignment with a content-based tie-break.
fn align(a: &[String], b: &[String]) -> Vec<Step> {
    let (n, m) = (a.len(), b.len());
    // lcs[i][j] = LCS length of a[i..] and b[j..]
    let mut lcs = vec![vec![0usize; m + 1]; n + 1];
    for i in (0..n).rev() {
        for j in (0..m).rev() {
            lcs[i][j] = if a[i] == b[j] {
                lcs[i + 1][j + 1] + 1
            } else {
                lcs[i + 1][j].max(lcs[i][j + 1])
            };
        }
    }

    let mut steps = Vec::with_capacity(n + m);
    let (mut i, mut j) = (0, 0);
    while i < n && j < m {
        if a[i] == b[j] {
            steps.push(Step::Keep);
            i += 1;
            j += 1;
        } else if lcs[i + 1][j] > lcs[i][j + 1]
            || (lcs[i + 1][j] == lcs[i][j + 1] && a[i] < b[j])
        {
            steps.push(Step::Remove(i));
            i += 1;
        } else {
            steps.push(Step::Add(j));
            j += 1;
        }
    }
    steps.extend((i..n).map(Step::Remove));
    steps.extend((j..m).map(Step::Add));
    steps
}

fn flush_gap(
    removed: &mut Vec<&str>,
    added: &mut Vec<&str>,
    detector: &dyn ContradictionDetector,
    out: &mut Vec<ChangeUnit>,
) {
    let paired = removed.len().min(added.len());
    for k in 0..paired {
        let (before, after) = (removed[k], added[k]);
        if is_modification(before, after, detector) {
            out.push(ChangeUnit::modified(before, after));
        } else {
            out.push(ChangeUnit::removed(before));
            out.push(ChangeUnit::added(after));
        }
    }
    out.extend(removed[paired..].iter().map(|s| ChangeUnit::removed(*s)));
    out.extend(added[paired..].iter().map(|s| ChangeUnit::added(*s)));
    removed.clear();
    added.clear();
}

fn is_modification(before: &str, after: &str, detector: &dyn ContradictionDetector) -> bool {
    jaccard(&tokenize(before), &tokenize(after)) >= MODIFIED_SIMILARITY
        && !detector.conflicts(before, after)
}
