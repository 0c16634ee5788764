//! Line diffs between a document's current content and its history.

use std::fmt::{self, Write as _};

use similar::{ChangeTag, TextDiff};

use docvault_types::DocumentId;

use crate::engine::DocumentStore;
use crate::error::{StoreError, StoreResult};
use crate::variant::Variant;

/// Which content of a document to compare.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RevisionSelector {
    /// The document's current content.
    Current,
    /// A recorded history entry.
    Sequence(u32),
}

impl fmt::Display for RevisionSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Current => f.write_str("current"),
            Self::Sequence(n) => write!(f, "#{n}"),
        }
    }
}

/// The result of comparing two contents.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContentDiff {
    pub hunks: Vec<DiffHunk>,
    pub old_lines: usize,
    pub new_lines: usize,
}

impl ContentDiff {
    /// `true` when the contents are identical.
    pub fn is_empty(&self) -> bool {
        self.hunks.is_empty()
    }

    pub fn additions(&self) -> usize {
        self.count(|l| matches!(l, DiffLine::Added(_)))
    }

    pub fn deletions(&self) -> usize {
        self.count(|l| matches!(l, DiffLine::Removed(_)))
    }

    fn count(&self, pred: impl Fn(&DiffLine) -> bool) -> usize {
        self.hunks.iter().flat_map(|h| &h.lines).filter(|l| pred(l)).count()
    }

    /// Unified-diff text with `@@` hunk headers.
    pub fn to_unified(&self) -> String {
        let mut out = String::new();
        for hunk in &self.hunks {
            let _ = writeln!(
                out,
                "@@ -{},{} +{},{} @@",
                hunk.old_start, hunk.old_count, hunk.new_start, hunk.new_count
            );
            for line in &hunk.lines {
                let _ = writeln!(out, "{line}");
            }
        }
        out
    }
}

/// A contiguous run of changes with up to three lines of context.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DiffHunk {
    /// 1-based.
    pub old_start: usize,
    pub old_count: usize,
    /// 1-based.
    pub new_start: usize,
    pub new_count: usize,
    pub lines: Vec<DiffLine>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DiffLine {
    Context(String),
    Added(String),
    Removed(String),
}

impl fmt::Display for DiffLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Context(text) => write!(f, " {text}"),
            Self::Added(text) => write!(f, "+{text}"),
            Self::Removed(text) => write!(f, "-{text}"),
        }
    }
}

/// Line diff of two payloads. Non-UTF-8 payloads that differ produce a
/// single hunk describing their sizes.
pub fn diff_contents(old: &[u8], new: &[u8]) -> ContentDiff {
    if old == new {
        let lines = std::str::from_utf8(old).map_or(0, |s| s.lines().count());
        return ContentDiff {
            hunks: Vec::new(),
            old_lines: lines,
            new_lines: lines,
        };
    }
    let (Ok(old_text), Ok(new_text)) = (std::str::from_utf8(old), std::str::from_utf8(new)) else {
        return binary_diff(old, new);
    };

    let text_diff = TextDiff::from_lines(old_text, new_text);
    let hunks = text_diff
        .grouped_ops(3)
        .iter()
        .filter_map(|group| {
            let first = group.first()?;
            let mut hunk = DiffHunk {
                old_start: first.old_range().start + 1,
                old_count: 0,
                new_start: first.new_range().start + 1,
                new_count: 0,
                lines: Vec::new(),
            };
            for change in group.iter().flat_map(|op| text_diff.iter_changes(op)) {
                let text = change.value().trim_end_matches(['\r', '\n']).to_string();
                match change.tag() {
                    ChangeTag::Equal => {
                        hunk.old_count += 1;
                        hunk.new_count += 1;
                        hunk.lines.push(DiffLine::Context(text));
                    }
                    ChangeTag::Delete => {
                        hunk.old_count += 1;
                        hunk.lines.push(DiffLine::Removed(text));
                    }
                    ChangeTag::Insert => {
                        hunk.new_count += 1;
                        hunk.lines.push(DiffLine::Added(text));
                    }
                }
            }
            Some(hunk)
        })
        .collect();

    ContentDiff {
        hunks,
        old_lines: old_text.lines().count(),
        new_lines: new_text.lines().count(),
    }
}

fn binary_diff(old: &[u8], new: &[u8]) -> ContentDiff {
    let mut lines = Vec::new();
    if !old.is_empty() {
        lines.push(DiffLine::Removed(format!("(binary content, {} bytes)", old.len())));
    }
    if !new.is_empty() {
        lines.push(DiffLine::Added(format!("(binary content, {} bytes)", new.len())));
    }
    ContentDiff {
        hunks: vec![DiffHunk {
            old_start: 1,
            old_count: usize::from(!old.is_empty()),
            new_start: 1,
            new_count: usize::from(!new.is_empty()),
            lines,
        }],
        old_lines: 0,
        new_lines: 0,
    }
}

impl<V: Variant> DocumentStore<V> {
    /// Diff two contents of one document.
    pub fn diff(
        &self,
        id: &DocumentId,
        from: RevisionSelector,
        to: RevisionSelector,
    ) -> StoreResult<ContentDiff> {
        let old = self.select(id, from)?;
        let new = self.select(id, to)?;
        Ok(diff_contents(&old, &new))
    }

    fn select(&self, id: &DocumentId, selector: RevisionSelector) -> StoreResult<Vec<u8>> {
        match selector {
            RevisionSelector::Current => Ok(self.load(id)?.content),
            RevisionSelector::Sequence(sequence) => {
                self.load(id)?;
                self.backend
                    .revision(id, sequence)?
                    .map(|entry| entry.content)
                    .ok_or(StoreError::NoSuchRevision { id: *id, sequence })
            }
        }
    }
}
