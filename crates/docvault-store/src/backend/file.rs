use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use fs4::fs_std::FileExt;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use docvault_ledger::RevisionEntry;
use docvault_types::{DocumentId, DocumentKind};

use crate::backend::state::BackendState;
use crate::backend::{Commit, DocumentBackend};
use crate::document::Document;
use crate::error::{StoreError, StoreResult};
use crate::variant::Variant;

const FORMAT_VERSION: u32 = 1;

/// On-disk layout of a backend file.
#[derive(Serialize)]
#[serde(bound = "")]
struct Snapshot<'a, V: Variant> {
    format: u32,
    kind: DocumentKind,
    documents: Vec<&'a Document<V>>,
    revisions: Vec<&'a RevisionEntry>,
}

/// Read ahead of the body so a file of the wrong kind is reported as such
/// rather than as a missing field.
#[derive(Deserialize)]
struct Header {
    format: u32,
    kind: DocumentKind,
}

#[derive(Deserialize)]
#[serde(bound = "")]
struct StoredSnapshot<V: Variant> {
    documents: Vec<Document<V>>,
    revisions: Vec<RevisionEntry>,
}

/// Backend persisted to a single JSON file.
///
/// Every commit rewrites the whole file: the new state is written to a
/// temporary file in the same directory and renamed over the old one. The
/// in-memory state only changes once the rename succeeded, so a failed
/// write leaves both the file and the live state as they were.
///
/// Several handles, in one process or many, may share a file. Writers take
/// an exclusive lock on a `.lock` file next to it and apply their commit to
/// the state on disk, not to the state they loaded earlier; a commit built
/// from a stale read fails the version check with `ConcurrentModification`.
pub struct FileBackend<V: Variant> {
    path: PathBuf,
    state: RwLock<BackendState<V>>,
}

impl<V: Variant> FileBackend<V> {
    /// Open the backend at `path`. A missing file is an empty store; the
    /// file is created on the first commit.
    pub fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let path = path.into();
        let state = read_state(&path)?;
        info!(
            path = %path.display(),
            documents = state.documents.len(),
            revisions = state.ledger.len(),
            "store loaded"
        );
        Ok(Self {
            path,
            state: RwLock::new(state),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn dir(&self) -> &Path {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        }
    }

    fn lock_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".lock");
        PathBuf::from(name)
    }

    /// Block until this handle is the only writer of the file. The lock is
    /// released when the returned file is dropped.
    fn lock_exclusive(&self) -> StoreResult<fs::File> {
        fs::create_dir_all(self.dir())?;
        let file = fs::OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(self.lock_path())?;
        FileExt::lock_exclusive(&file)?;
        Ok(file)
    }

    /// Run `change` against the current file contents under the writer
    /// lock. `None` means nothing changed and nothing is written; the
    /// handle still picks up what other writers committed.
    fn transact<T>(
        &self,
        change: impl FnOnce(&mut BackendState<V>) -> StoreResult<Option<T>>,
    ) -> StoreResult<Option<T>> {
        let mut state = self.write()?;
        let _lock = self.lock_exclusive()?;
        let mut next = read_state(&self.path)?;
        let outcome = change(&mut next)?;
        if outcome.is_some() {
            self.persist(&next)?;
        }
        *state = next;
        Ok(outcome)
    }

    fn persist(&self, state: &BackendState<V>) -> StoreResult<()> {
        let snapshot = Snapshot {
            format: FORMAT_VERSION,
            kind: V::KIND,
            documents: state.documents.values().collect(),
            revisions: state.ledger.entries().collect(),
        };

        let mut tmp = NamedTempFile::new_in(self.dir())?;
        {
            let mut writer = BufWriter::new(tmp.as_file_mut());
            serde_json::to_writer_pretty(&mut writer, &snapshot)
                .map_err(|e| StoreError::Serialization(e.to_string()))?;
            writer.flush()?;
        }
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| StoreError::Io(e.error))?;
        debug!(path = %self.path.display(), "store file written");
        Ok(())
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, BackendState<V>>> {
        self.state.read().map_err(|_| StoreError::LockPoisoned)
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, BackendState<V>>> {
        self.state.write().map_err(|_| StoreError::LockPoisoned)
    }
}

/// Load the state stored at `path`; a missing file is an empty state.
fn read_state<V: Variant>(path: &Path) -> StoreResult<BackendState<V>> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "no store file yet");
            return Ok(BackendState::default());
        }
        Err(e) => return Err(e.into()),
    };
    let malformed = |e: serde_json::Error| StoreError::Serialization(format!("{}: {e}", path.display()));

    let header: Header = serde_json::from_slice(&bytes).map_err(malformed)?;
    if header.format != FORMAT_VERSION {
        return Err(StoreError::Serialization(format!(
            "{}: unsupported format version {}",
            path.display(),
            header.format
        )));
    }
    if header.kind != V::KIND {
        return Err(StoreError::Serialization(format!(
            "{}: holds {} documents, expected {}",
            path.display(),
            header.kind,
            V::KIND
        )));
    }

    let stored: StoredSnapshot<V> = serde_json::from_slice(&bytes).map_err(malformed)?;
    BackendState::from_parts(stored.documents, stored.revisions)
}

impl<V: Variant> DocumentBackend<V> for FileBackend<V> {
    fn load(&self, id: &DocumentId) -> StoreResult<Option<Document<V>>> {
        Ok(self.read()?.documents.get(id).cloned())
    }

    fn list(&self) -> StoreResult<Vec<Document<V>>> {
        Ok(self.read()?.documents.values().cloned().collect())
    }

    fn commit(&self, commit: Commit<V>) -> StoreResult<Option<RevisionEntry>> {
        let recorded = self.transact(|state| state.apply(commit).map(Some))?;
        Ok(recorded.flatten())
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
        self.transact(|state| Ok(state.purge(id)))
    }
}
