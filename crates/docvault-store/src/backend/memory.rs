use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use docvault_ledger::RevisionEntry;
use docvault_types::DocumentId;

use crate::backend::state::BackendState;
use crate::backend::{Commit, DocumentBackend};
use crate::document::Document;
use crate::error::{StoreError, StoreResult};
use crate::variant::Variant;

/// Backend that keeps everything in memory behind one `RwLock`.
///
/// Documents and history share the lock, so a commit is never observed
/// half-applied.
pub struct InMemoryBackend<V: Variant> {
    state: RwLock<BackendState<V>>,
}

impl<V: Variant> InMemoryBackend<V> {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(BackendState::default()),
        }
    }

    /// Number of stored documents, trashed ones included.
    pub fn len(&self) -> StoreResult<usize> {
        Ok(self.read()?.documents.len())
    }

    pub fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.read()?.documents.is_empty())
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, BackendState<V>>> {
        self.state.read().map_err(|_| StoreError::LockPoisoned)
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, BackendState<V>>> {
        self.state.write().map_err(|_| StoreError::LockPoisoned)
    }
}

impl<V: Variant> Default for InMemoryBackend<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Variant> DocumentBackend<V> for InMemoryBackend<V> {
    fn load(&self, id: &DocumentId) -> StoreResult<Option<Document<V>>> {
        Ok(self.read()?.documents.get(id).cloned())
    }

    fn list(&self) -> StoreResult<Vec<Document<V>>> {
        Ok(self.read()?.documents.values().cloned().collect())
    }

    fn commit(&self, commit: Commit<V>) -> StoreResult<Option<RevisionEntry>> {
        self.write()?.apply(commit)
    }

    fn revisions(&self, id: &DocumentId) -> StoreResult<Vec<RevisionEntry>> {
        Ok(self.read()?.ledger.list_for(id).to_vec())
    }

    fn revision(&self, id: &DocumentId, sequence: u32) -> StoreResult<Option<RevisionEntry>> {
        Ok(self.read()?.ledger.find_by_sequence(id, sequence).cloned())
    }

    fn revision_count(&self, id: &DocumentId) -> StoreResult<u32> {
        Ok(self.read()?.ledger.count_for(id))
    }

    fn purge(&self, id: &DocumentId) -> StoreResult<Option<(Document<V>, usize)>> {
        Ok(self.write()?.purge(id))
    }
}
