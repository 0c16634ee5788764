use tracing::info;

use docvault_ledger::{Numbering, RevisionInput};
use docvault_types::{Actor, DocumentId};

use crate::backend::Commit;
use crate::document::Document;
use crate::engine::{next_version, DocumentStore};
use crate::error::{StoreError, StoreResult};
use crate::variant::Variant;

impl<V: Variant> DocumentStore<V> {
    /// Make the content of history entry `sequence` current again.
    ///
    /// The content being replaced is recorded as a new history entry
    /// numbered after the existing ones, the version goes up by one and
    /// `based_on` remembers which entry was restored. The restored bytes
    /// are not run through the content gate again.
    pub fn restore_to_version(
        &self,
        id: &DocumentId,
        sequence: u32,
        actor: &Actor,
    ) -> StoreResult<Document<V>> {
        self.locked(id, || {
            let mut document = self.load(id)?;
            self.check_owner(&document, actor)?;
            let entry = self
                .backend
                .revision(id, sequence)?
                .ok_or(StoreError::NoSuchRevision { id: *id, sequence })?;

            let now = self.clock.now();
            let expected_version = document.version;
            let outgoing = RevisionInput {
                document: document.id,
                content: std::mem::replace(&mut document.content, entry.content),
                snapshot_created_at: document.created_at,
                snapshot_updated_at: now,
                by_user: document.owner.clone(),
                recorded_at: now,
            };
            document.version = next_version(&document)?;
            document.based_on = Some(sequence);
            document.owner = actor.id.clone();
            document.updated_at = now;

            let recorded = self.backend.commit(
                Commit::replace(document.clone(), expected_version).with_revision(outgoing, Numbering::Next),
            )?;
            info!(
                kind = %V::KIND,
                document = %id,
                restored = sequence,
                version = document.version,
                sequence = recorded.map(|e| e.sequence),
                "document restored"
            );
            Ok(document)
        })
    }
}
