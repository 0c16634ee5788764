//! Storage backends.
//!
//! A backend owns both the documents of one variant and their revision
//! history. [`DocumentBackend::commit`] writes a document together with its
//! optional revision entry as one unit: either both land or neither does.

mod file;
mod memory;
mod state;

pub use file::FileBackend;
pub use memory::InMemoryBackend;

use std::sync::Arc;

use docvault_ledger::{Numbering, RevisionEntry, RevisionInput};
use docvault_types::DocumentId;

use crate::document::Document;
use crate::error::StoreResult;
use crate::variant::Variant;

/// One atomic write.
#[derive(Clone, Debug)]
pub struct Commit<V: Variant> {
    /// The document's new state.
    pub document: Document<V>,
    /// Version the stored document must have; `None` when it must not exist.
    pub expected_version: Option<u32>,
    /// Outgoing state to append to the history, if the content changed.
    pub revision: Option<(RevisionInput, Numbering)>,
}

impl<V: Variant> Commit<V> {
    /// Insert a document that does not exist yet.
    pub fn create(document: Document<V>) -> Self {
        Self {
            document,
            expected_version: None,
            revision: None,
        }
    }

    /// Replace a document whose stored version is `expected_version`.
    pub fn replace(document: Document<V>, expected_version: u32) -> Self {
        Self {
            document,
            expected_version: Some(expected_version),
            revision: None,
        }
    }

    pub fn with_revision(mut self, input: RevisionInput, numbering: Numbering) -> Self {
        self.revision = Some((input, numbering));
        self
    }
}

/// Persistence boundary for documents and their history.
///
/// Implementations must be safe to share across threads. Invariants:
/// - `commit` is all-or-nothing: if it returns `Err`, neither the document
///   nor the history changed.
/// - `commit` rejects a document whose stored version differs from
///   `expected_version` with `ConcurrentModification`.
/// - `list` returns documents in id order, which is creation order.
pub trait DocumentBackend<V: Variant>: Send + Sync {
    fn load(&self, id: &DocumentId) -> StoreResult<Option<Document<V>>>;

    fn list(&self) -> StoreResult<Vec<Document<V>>>;

    /// Apply a commit; returns the recorded revision entry, if any.
    fn commit(&self, commit: Commit<V>) -> StoreResult<Option<RevisionEntry>>;

    /// A document's history ordered by sequence.
    fn revisions(&self, id: &DocumentId) -> StoreResult<Vec<RevisionEntry>>;

    fn revision(&self, id: &DocumentId, sequence: u32) -> StoreResult<Option<RevisionEntry>>;

    fn revision_count(&self, id: &DocumentId) -> StoreResult<u32>;

    /// Remove a document and its whole history. Returns the removed document
    /// and how many revision entries went with it.
    fn purge(&self, id: &DocumentId) -> StoreResult<Option<(Document<V>, usize)>>;
}

impl<V: Variant, B: DocumentBackend<V> + ?Sized> DocumentBackend<V> for Arc<B> {
    fn load(&self, id: &DocumentId) -> StoreResult<Option<Document<V>>> {
        (**self).load(id)
    }

    fn list(&self) -> StoreResult<Vec<Document<V>>> {
        (**self).list()
    }

    fn commit(&self, commit: Commit<V>) -> StoreResult<Option<RevisionEntry>> {
        (**self).commit(commit)
    }

    fn revisions(&self, id: &DocumentId) -> StoreResult<Vec<RevisionEntry>> {
        (**self).revisions(id)
    }

    fn revision(&self, id: &DocumentId, sequence: u32) -> StoreResult<Option<RevisionEntry>> {
        (**self).revision(id, sequence)
    }

    fn revision_count(&self, id: &DocumentId) -> StoreResult<u32> {
        (**self).revision_count(id)
    }

    fn purge(&self, id: &DocumentId) -> StoreResult<Option<(Document<V>, usize)>> {
        (**self).purge(id)
    }
}
