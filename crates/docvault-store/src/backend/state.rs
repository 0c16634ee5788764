use std::collections::BTreeMap;

use docvault_ledger::{LedgerError, RevisionEntry, RevisionTable};
use docvault_types::DocumentId;

use crate::backend::Commit;
use crate::document::Document;
use crate::error::{StoreError, StoreResult};
use crate::variant::Variant;

/// Documents plus their history, mutated together.
#[derive(Clone, Debug)]
pub(crate) struct BackendState<V: Variant> {
    pub documents: BTreeMap<DocumentId, Document<V>>,
    pub ledger: RevisionTable,
}

impl<V: Variant> Default for BackendState<V> {
    fn default() -> Self {
        Self {
            documents: BTreeMap::new(),
            ledger: RevisionTable::new(),
        }
    }
}

impl<V: Variant> BackendState<V> {
    pub fn from_parts(
        documents: impl IntoIterator<Item = Document<V>>,
        revisions: impl IntoIterator<Item = RevisionEntry>,
    ) -> StoreResult<Self> {
        Ok(Self {
            documents: documents.into_iter().map(|d| (d.id, d)).collect(),
            ledger: RevisionTable::from_entries(revisions)?,
        })
    }

    /// Apply a commit. Every fallible check runs before the first mutation,
    /// so an error leaves the state untouched.
    pub fn apply(&mut self, commit: Commit<V>) -> StoreResult<Option<RevisionEntry>> {
        let id = commit.document.id;
        let found = self.documents.get(&id).map(|d| d.version);
        match (commit.expected_version, found) {
            (None, None) => {}
            (Some(expected), Some(found)) if expected == found => {}
            (expected, found) => {
                return Err(StoreError::ConcurrentModification {
                    id,
                    expected: expected.unwrap_or(0),
                    found: found.unwrap_or(0),
                })
            }
        }

        let recorded = match commit.revision {
            Some((input, numbering)) => {
                if input.document != id {
                    return Err(LedgerError::DocumentMismatch {
                        expected: id,
                        found: input.document,
                    }
                    .into());
                }
                Some(self.ledger.append(input, numbering)?)
            }
            None => None,
        };
        self.documents.insert(id, commit.document);
        Ok(recorded)
    }

    pub fn purge(&mut self, id: &DocumentId) -> Option<(Document<V>, usize)> {
        let document = self.documents.remove(id)?;
        let removed = self.ledger.delete_all_for(id);
        Some((document, removed))
    }
}
