use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use docvault_types::DocumentId;

use crate::error::{StoreError, StoreResult};

/// Per-document mutual exclusion.
///
/// Mutations on one document run one at a time; different documents never
/// wait on each other.
#[derive(Debug, Default)]
pub struct DocumentLocks {
    table: Mutex<HashMap<DocumentId, Arc<Mutex<()>>>>,
}

impl DocumentLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` while holding the lock for `id`.
    pub fn with_lock<T>(&self, id: &DocumentId, f: impl FnOnce() -> StoreResult<T>) -> StoreResult<T> {
        let lock = {
            let mut table = self.table.lock().map_err(|_| StoreError::LockPoisoned)?;
            Arc::clone(table.entry(*id).or_default())
        };
        // The guarded value is `()`, so a panic in an earlier holder left
        // nothing inconsistent behind.
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
        f()
    }

    /// Drop the lock entry for a document that no longer exists.
    pub fn forget(&self, id: &DocumentId) -> StoreResult<()> {
        self.table
            .lock()
            .map_err(|_| StoreError::LockPoisoned)?
            .remove(id);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.table.lock().map_or(0, |table| table.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
