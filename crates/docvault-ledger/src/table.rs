use std::collections::BTreeMap;

use tracing::debug;

use docvault_types::{ContentDigest, DocumentId, RevisionId};

use crate::error::{LedgerError, LedgerResult};
use crate::records::{Numbering, RevisionEntry, RevisionInput};

/// Per-document revision history without any locking.
///
/// Backends hold a `RevisionTable` next to their document map so a single
/// write lock (or a single file rewrite) covers both.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RevisionTable {
    entries: BTreeMap<DocumentId, Vec<RevisionEntry>>,
}

impl RevisionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a table from stored entries, keeping their order per
    /// document. Duplicate sequences are rejected.
    pub fn from_entries(entries: impl IntoIterator<Item = RevisionEntry>) -> LedgerResult<Self> {
        let mut table = Self::new();
        for entry in entries {
            table.insert(entry)?;
        }
        Ok(table)
    }

    /// Build the entry `append` would record, without recording it.
    pub fn prepare(&self, input: RevisionInput, numbering: Numbering) -> LedgerResult<RevisionEntry> {
        let sequence = match numbering {
            Numbering::Next => self.count_for(&input.document).saturating_add(1),
            Numbering::Explicit(0) => return Err(LedgerError::InvalidSequence(0)),
            Numbering::Explicit(sequence) => sequence,
        };
        if self.find_by_sequence(&input.document, sequence).is_some() {
            return Err(LedgerError::SequenceConflict {
                document: input.document,
                sequence,
            });
        }
        Ok(RevisionEntry {
            id: RevisionId::new(),
            document: input.document,
            digest: ContentDigest::of(&input.content),
            content: input.content,
            sequence,
            snapshot_created_at: input.snapshot_created_at,
            snapshot_updated_at: input.snapshot_updated_at,
            by_user: input.by_user,
            recorded_at: input.recorded_at,
        })
    }

    /// Number and record a new entry.
    pub fn append(&mut self, input: RevisionInput, numbering: Numbering) -> LedgerResult<RevisionEntry> {
        let entry = self.prepare(input, numbering)?;
        self.insert(entry.clone())?;
        Ok(entry)
    }

    /// Record an already-numbered entry.
    pub fn insert(&mut self, entry: RevisionEntry) -> LedgerResult<()> {
        if entry.sequence == 0 {
            return Err(LedgerError::InvalidSequence(0));
        }
        let history = self.entries.entry(entry.document).or_default();
        if history.iter().any(|e| e.sequence == entry.sequence) {
            return Err(LedgerError::SequenceConflict {
                document: entry.document,
                sequence: entry.sequence,
            });
        }
        debug!(document = %entry.document, sequence = entry.sequence, bytes = entry.size(), "revision recorded");
        history.push(entry);
        Ok(())
    }

    pub fn find_by_sequence(&self, document: &DocumentId, sequence: u32) -> Option<&RevisionEntry> {
        self.list_for(document).iter().find(|e| e.sequence == sequence)
    }

    /// Entries for `document` in the order they were recorded.
    pub fn list_for(&self, document: &DocumentId) -> &[RevisionEntry] {
        self.entries.get(document).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn count_for(&self, document: &DocumentId) -> u32 {
        u32::try_from(self.list_for(document).len()).unwrap_or(u32::MAX)
    }

    /// Drop a document's whole history. Returns how many entries went.
    pub fn delete_all_for(&mut self, document: &DocumentId) -> usize {
        let removed = self.entries.remove(document).map_or(0, |h| h.len());
        if removed > 0 {
            debug!(document = %document, removed, "revision history deleted");
        }
        removed
    }

    /// Every entry, grouped by document.
    pub fn entries(&self) -> impl Iterator<Item = &RevisionEntry> {
        self.entries.values().flatten()
    }

    pub fn len(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.values().all(Vec::is_empty)
    }
}
