//! The document store.
//!
//! [`DocumentStore`] is one engine for both variants. Every mutation follows
//! the same shape: checks that need no lock (input, content gate) run first,
//! then the document's lock is taken, the current state is re-read, and a
//! single [`Commit`] carries the new document together with the history
//! entry for the content it replaces.

use std::sync::Arc;

use tracing::{debug, info, warn};

use docvault_ledger::{HistoryReport, HistoryVerifier, Numbering, RevisionEntry, RevisionInput};
use docvault_types::{Actor, Clock, DocumentId, SystemClock, UserId};

use crate::backend::{Commit, DocumentBackend, InMemoryBackend};
use crate::config::{OwnershipPolicy, SequenceScheme, StoreConfig};
use crate::document::{Document, DocumentFilter, DocumentState, DocumentUpdate, NewDocument};
use crate::error::{StoreError, StoreResult};
use crate::gate::{ContentGate, ContentProposal, GateDecision, SchemaResolver};
use crate::locks::DocumentLocks;
use crate::variant::{ModelVariant, SchemaVariant, Variant};

/// A document removed by [`DocumentStore::purge`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Purged<V: Variant> {
    pub document: Document<V>,
    pub revisions_removed: usize,
}

/// Versioned store for one document variant.
pub struct DocumentStore<V: Variant> {
    pub(crate) backend: Box<dyn DocumentBackend<V>>,
    gate: Box<dyn ContentGate>,
    pub(crate) locks: DocumentLocks,
    pub(crate) clock: Arc<dyn Clock>,
    config: StoreConfig,
}

impl<V: Variant> DocumentStore<V> {
    pub fn new(
        backend: impl DocumentBackend<V> + 'static,
        gate: impl ContentGate + 'static,
        config: StoreConfig,
    ) -> Self {
        Self {
            backend: Box::new(backend),
            gate: Box::new(gate),
            locks: DocumentLocks::new(),
            clock: Arc::new(SystemClock),
            config,
        }
    }

    /// A store with an in-memory backend and default configuration.
    pub fn in_memory(gate: impl ContentGate + 'static) -> Self {
        Self::new(InMemoryBackend::new(), gate, StoreConfig::default())
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn gate_name(&self) -> &str {
        self.gate.name()
    }

    // -----------------------------------------------------------------------
    // Mutations
    // -----------------------------------------------------------------------

    pub fn create(&self, new: NewDocument<V>, actor: &Actor) -> StoreResult<Document<V>> {
        check_name(&new.name)?;
        if new.content.is_empty() {
            return Err(StoreError::InvalidInput("content must not be empty".into()));
        }
        self.admit(V::schema_ref(&new.fields).as_ref(), &new.content)?;

        let now = self.clock.now();
        let document = Document {
            id: DocumentId::new(),
            name: new.name,
            description: new.description,
            content: new.content,
            version: 1,
            based_on: None,
            owner: actor.id.clone(),
            created_at: now,
            updated_at: now,
            deleted_at: None,
            fields: new.fields,
        };
        self.backend.commit(Commit::create(document.clone()))?;
        info!(
            kind = %V::KIND,
            document = %document.id,
            owner = %document.owner,
            bytes = document.content.len(),
            "document created"
        );
        Ok(document)
    }

    /// Apply metadata edits and, when the content differs, record the
    /// outgoing content in the history and bump the version.
    ///
    /// A gate rejection leaves the document entirely unchanged, metadata
    /// edits included.
    pub fn update(
        &self,
        id: &DocumentId,
        update: DocumentUpdate<V>,
        actor: &Actor,
    ) -> StoreResult<Document<V>> {
        if let Some(name) = &update.name {
            check_name(name)?;
        }
        let DocumentUpdate {
            name,
            description,
            content,
            patch,
        } = update;
        let content = content.filter(|c| !c.is_empty());

        let seen = self.load(id)?;
        if self.config.ownership == OwnershipPolicy::Enforce {
            self.check_owner(&seen, actor)?;
        }
        let validated_against = V::patched_schema_ref(&seen.fields, &patch);
        if let Some(content) = &content {
            self.admit(validated_against.as_ref(), content)?;
        }

        self.locked(id, || {
            let mut document = self.load(id)?;
            self.check_owner(&document, actor)?;
            if content.is_some() && V::patched_schema_ref(&document.fields, &patch) != validated_against {
                return Err(StoreError::ConcurrentModification {
                    id: *id,
                    expected: seen.version,
                    found: document.version,
                });
            }

            let now = self.clock.now();
            let expected_version = document.version;
            if let Some(name) = name {
                document.name = name;
            }
            if let Some(description) = description {
                document.description = description;
            }
            V::apply_patch(&mut document.fields, patch);

            let mut revision = None;
            match content {
                Some(content) if content != document.content => {
                    let numbering = self.update_numbering(&document);
                    let outgoing = std::mem::replace(&mut document.content, content);
                    revision = Some((
                        RevisionInput {
                            document: document.id,
                            content: outgoing,
                            snapshot_created_at: document.created_at,
                            snapshot_updated_at: now,
                            by_user: document.owner.clone(),
                            recorded_at: now,
                        },
                        numbering,
                    ));
                    document.version = next_version(&document)?;
                    document.owner = actor.id.clone();
                    document.based_on = None;
                }
                Some(_) => debug!(document = %id, "content unchanged, no revision recorded"),
                None => {}
            }
            document.updated_at = now;

            let mut commit = Commit::replace(document.clone(), expected_version);
            commit.revision = revision;
            let recorded = self.backend.commit(commit)?;
            debug!(
                kind = %V::KIND,
                document = %id,
                version = document.version,
                sequence = recorded.as_ref().map(|e| e.sequence),
                "document updated"
            );
            Ok(document)
        })
    }

    /// Move a document to the trash. Trashing a trashed document is a no-op.
    pub fn soft_delete(&self, id: &DocumentId, actor: &Actor) -> StoreResult<Document<V>> {
        self.set_trashed(id, actor, true)
    }

    /// Take a document out of the trash. A no-op for active documents.
    pub fn restore_from_trash(&self, id: &DocumentId, actor: &Actor) -> StoreResult<Document<V>> {
        self.set_trashed(id, actor, false)
    }

    fn set_trashed(&self, id: &DocumentId, actor: &Actor, trashed: bool) -> StoreResult<Document<V>> {
        self.locked(id, || {
            let mut document = self.load(id)?;
            self.check_owner(&document, actor)?;
            if document.is_trashed() == trashed {
                return Ok(document);
            }
            let expected_version = document.version;
            document.deleted_at = if trashed { Some(self.clock.now()) } else { None };
            self.backend.commit(Commit::replace(document.clone(), expected_version))?;
            debug!(kind = %V::KIND, document = %id, state = %document.state(), "trash state changed");
            Ok(document)
        })
    }

    /// Remove a document and its whole history. Administrative: no
    /// ownership check.
    pub fn purge(&self, id: &DocumentId) -> StoreResult<Purged<V>> {
        let purged = self.locked(id, || {
            let (document, revisions_removed) = self.backend.purge(id)?.ok_or(StoreError::NotFound {
                kind: V::KIND,
                id: *id,
            })?;
            Ok(Purged {
                document,
                revisions_removed,
            })
        })?;
        self.locks.forget(id)?;
        info!(
            kind = %V::KIND,
            document = %id,
            revisions = purged.revisions_removed,
            "document purged"
        );
        Ok(purged)
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn get(&self, id: &DocumentId) -> StoreResult<Document<V>> {
        self.load(id)
    }

    pub fn find(&self, id: &DocumentId) -> StoreResult<Option<Document<V>>> {
        self.backend.load(id)
    }

    pub fn list(&self, filter: &DocumentFilter) -> StoreResult<Vec<Document<V>>> {
        Ok(self
            .backend
            .list()?
            .into_iter()
            .filter(|d| filter.matches(d))
            .collect())
    }

    pub fn list_by_owner(&self, owner: &UserId) -> StoreResult<Vec<Document<V>>> {
        self.list(&DocumentFilter::owned_by(owner.clone()))
    }

    pub fn list_active(&self) -> StoreResult<Vec<Document<V>>> {
        self.list(&DocumentFilter::default().in_state(DocumentState::Active))
    }

    pub fn list_trashed(&self) -> StoreResult<Vec<Document<V>>> {
        self.list(&DocumentFilter::default().in_state(DocumentState::Trashed))
    }

    /// History of an existing document, oldest first.
    pub fn list_revisions(&self, id: &DocumentId) -> StoreResult<Vec<RevisionEntry>> {
        self.load(id)?;
        self.backend.revisions(id)
    }

    pub fn get_revision(&self, id: &DocumentId, sequence: u32) -> StoreResult<RevisionEntry> {
        self.backend
            .revision(id, sequence)?
            .ok_or(StoreError::NoSuchRevision { id: *id, sequence })
    }

    /// Check the document's history for sequence and digest integrity.
    pub fn verify_history(&self, id: &DocumentId) -> StoreResult<HistoryReport> {
        let entries = self.list_revisions(id)?;
        let verifier = HistoryVerifier::new(self.config.sequence_scheme == SequenceScheme::Dense);
        let report = verifier.verify(id, &entries);
        if !report.is_valid() {
            warn!(
                document = %id,
                violations = report.violations.len(),
                "history verification found problems"
            );
        }
        Ok(report)
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    /// Run `f` under the document's lock. An id that turns out not to
    /// exist leaves no entry in the lock table.
    pub(crate) fn locked<T>(&self, id: &DocumentId, f: impl FnOnce() -> StoreResult<T>) -> StoreResult<T> {
        let result = self.locks.with_lock(id, f);
        if matches!(result, Err(StoreError::NotFound { .. })) {
            self.locks.forget(id)?;
        }
        result
    }

    pub(crate) fn load(&self, id: &DocumentId) -> StoreResult<Document<V>> {
        self.backend.load(id)?.ok_or(StoreError::NotFound {
            kind: V::KIND,
            id: *id,
        })
    }

    pub(crate) fn check_owner(&self, document: &Document<V>, actor: &Actor) -> StoreResult<()> {
        if actor.is(&document.owner) {
            return Ok(());
        }
        match self.config.ownership {
            OwnershipPolicy::Enforce => Err(StoreError::OwnershipMismatch {
                id: document.id,
                owner: document.owner.clone(),
                actor: actor.id.clone(),
            }),
            OwnershipPolicy::Advisory => {
                warn!(
                    document = %document.id,
                    owner = %document.owner,
                    actor = %actor.id,
                    "actor does not own document; proceeding"
                );
                Ok(())
            }
        }
    }

    fn admit(&self, schema_ref: Option<&DocumentId>, content: &[u8]) -> StoreResult<()> {
        let proposal = ContentProposal {
            kind: V::KIND,
            schema_ref,
            content,
        };
        match self.gate.evaluate(&proposal)? {
            GateDecision::Pass => Ok(()),
            GateDecision::Fail { reason } => {
                debug!(gate = self.gate.name(), kind = %V::KIND, "content rejected");
                Err(StoreError::ValidationFailed { message: reason })
            }
        }
    }

    fn update_numbering(&self, document: &Document<V>) -> Numbering {
        match self.config.sequence_scheme {
            SequenceScheme::Dense => Numbering::Next,
            SequenceScheme::DocumentVersion => Numbering::Explicit(document.version),
        }
    }
}

impl DocumentStore<ModelVariant> {
    /// Flip the favorite flag. An unset flag counts as `false`.
    pub fn toggle_favorite(&self, id: &DocumentId, actor: &Actor) -> StoreResult<Document<ModelVariant>> {
        self.locked(id, || {
            let mut document = self.load(id)?;
            self.check_owner(&document, actor)?;
            let expected_version = document.version;
            document.fields.favorite = Some(!document.fields.is_favorite());
            document.updated_at = self.clock.now();
            self.backend.commit(Commit::replace(document.clone(), expected_version))?;
            debug!(document = %id, favorite = document.fields.is_favorite(), "favorite toggled");
            Ok(document)
        })
    }
}

impl SchemaResolver for DocumentStore<SchemaVariant> {
    fn resolve(&self, id: &DocumentId) -> StoreResult<Option<Vec<u8>>> {
        Ok(self.backend.load(id)?.map(|d| d.content))
    }
}

fn check_name(name: &str) -> StoreResult<()> {
    if name.trim().is_empty() {
        return Err(StoreError::InvalidInput("name must not be blank".into()));
    }
    Ok(())
}

pub(crate) fn next_version<V: Variant>(document: &Document<V>) -> StoreResult<u32> {
    document
        .version
        .checked_add(1)
        .ok_or_else(|| StoreError::InvalidInput(format!("document {} has exhausted its versions", document.id)))
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    use proptest::prelude::*;

    use super::*;
    use crate::backend::InMemoryBackend;
    use crate::gate::{OpenGate, SchemaGate};
    use crate::testing::{order, ORDER_XSD, ORDER_XSD_WITH_NOTE};
    use crate::variant::{ModelFields, ModelPatch, SchemaFields, TagRef};
    use docvault_types::ManualClock;
    use docvault_validate::XsdValidator;

    fn alice() -> Actor {
        Actor::new("alice", "Alice")
    }

    fn bob() -> Actor {
        Actor::new("bob", "Bob")
    }

    fn schema_store(config: StoreConfig) -> DocumentStore<SchemaVariant> {
        DocumentStore::new(InMemoryBackend::new(), OpenGate, config)
            .with_clock(Arc::new(ManualClock::default()))
    }

    struct Models {
        schemas: Arc<DocumentStore<SchemaVariant>>,
        models: DocumentStore<ModelVariant>,
        schema: Document<SchemaVariant>,
    }

    fn models_with(backend: impl DocumentBackend<ModelVariant> + 'static, config: StoreConfig) -> Models {
        let clock: Arc<dyn Clock> = Arc::new(ManualClock::default());
        let schemas = Arc::new(
            DocumentStore::new(InMemoryBackend::new(), OpenGate, config.clone()).with_clock(clock.clone()),
        );
        let schema = schemas
            .create(NewDocument::new("orders", ORDER_XSD, SchemaFields {}), &alice())
            .unwrap();
        let resolver: Arc<dyn SchemaResolver> = schemas.clone();
        let gate = SchemaGate::new(resolver, Arc::new(XsdValidator::default()));
        let models = DocumentStore::new(backend, gate, config).with_clock(clock);
        Models {
            schemas,
            models,
            schema,
        }
    }

    fn models(config: StoreConfig) -> Models {
        models_with(InMemoryBackend::new(), config)
    }

    impl Models {
        fn create(&self, content: &str) -> Document<ModelVariant> {
            self.models
                .create(NewDocument::new("model", content, ModelFields::new(self.schema.id)), &alice())
                .unwrap()
        }
    }

    fn content(update: &str) -> DocumentUpdate<ModelVariant> {
        DocumentUpdate::new().with_content(update)
    }

    // -- create ------------------------------------------------------------

    #[test]
    fn create_initializes_document() {
        let store = schema_store(StoreConfig::default());
        let doc = store
            .create(
                NewDocument::new("orders", ORDER_XSD, SchemaFields {}).with_description("order format"),
                &alice(),
            )
            .unwrap();
        assert_eq!(doc.version, 1);
        assert_eq!(doc.based_on, None);
        assert_eq!(doc.owner.as_str(), "alice");
        assert_eq!(doc.created_at, doc.updated_at);
        assert_eq!(doc.deleted_at, None);
        assert_eq!(doc.description, "order format");
        assert_eq!(store.get(&doc.id).unwrap(), doc);
        assert!(store.list_revisions(&doc.id).unwrap().is_empty());
    }

    #[test]
    fn create_rejects_blank_name_and_empty_content() {
        let store = schema_store(StoreConfig::default());
        let blank = store.create(NewDocument::new("  ", "x", SchemaFields {}), &alice());
        assert!(matches!(blank, Err(StoreError::InvalidInput(_))));
        let empty = store.create(NewDocument::new("n", "", SchemaFields {}), &alice());
        assert!(matches!(empty, Err(StoreError::InvalidInput(_))));
        assert!(store.list_active().unwrap().is_empty());
    }

    #[test]
    fn schemas_accept_any_content() {
        let store = schema_store(StoreConfig::default());
        assert_eq!(store.gate_name(), "open");
        let doc = store.create(NewDocument::new("odd", "not xml at all", SchemaFields {}), &alice());
        assert!(doc.is_ok());
    }

    #[test]
    fn invalid_model_is_not_created() {
        let m = models(StoreConfig::default());
        let err = m
            .models
            .create(NewDocument::new("m", "<invoice/>", ModelFields::new(m.schema.id)), &alice())
            .unwrap_err();
        let StoreError::ValidationFailed { message } = err else {
            panic!("expected validation failure");
        };
        assert_eq!(message, "error: line 1, column 1: root element <invoice> is not declared in the schema");
        assert!(m.models.list_active().unwrap().is_empty());
    }

    // -- update ------------------------------------------------------------

    #[test]
    fn content_change_records_outgoing_state() {
        let m = models(StoreConfig::default());
        let created = m.create(&order(1, &["pen"]));
        let updated = m.models.update(&created.id, content(&order(1, &["ink"])), &alice()).unwrap();

        assert_eq!(updated.version, 2);
        assert_eq!(updated.content, order(1, &["ink"]).into_bytes());
        assert!(updated.updated_at > created.updated_at);
        assert_eq!(updated.created_at, created.created_at);

        let history = m.models.list_revisions(&created.id).unwrap();
        assert_eq!(history.len(), 1);
        let entry = &history[0];
        assert_eq!(entry.sequence, 1);
        assert_eq!(entry.content, created.content);
        assert_eq!(entry.snapshot_created_at, created.created_at);
        assert_eq!(entry.snapshot_updated_at, updated.updated_at);
        assert_eq!(entry.by_user.as_str(), "alice");
        assert!(entry.is_intact());
        assert_eq!(m.models.get_revision(&created.id, 1).unwrap(), *entry);
    }

    #[test]
    fn identical_content_only_touches_updated_at() {
        let m = models(StoreConfig::default());
        let created = m.create(&order(1, &["pen"]));
        let updated = m.models.update(&created.id, content(&order(1, &["pen"])), &alice()).unwrap();
        assert_eq!(updated.version, 1);
        assert!(updated.updated_at > created.updated_at);
        assert!(m.models.list_revisions(&created.id).unwrap().is_empty());
    }

    #[test]
    fn metadata_update_does_not_bump_version() {
        let m = models(StoreConfig::default());
        let created = m.create(&order(1, &["pen"]));
        let updated = m
            .models
            .update(
                &created.id,
                DocumentUpdate::new()
                    .with_name("renamed")
                    .with_description("now with a description")
                    .with_content("")
                    .with_patch(ModelPatch::tags([TagRef::from("urgent")])),
                &alice(),
            )
            .unwrap();
        assert_eq!(updated.version, 1);
        assert_eq!(updated.name, "renamed");
        assert_eq!(updated.description, "now with a description");
        assert_eq!(updated.content, created.content);
        assert!(updated.fields.tags.contains(&TagRef::from("urgent")));
        assert!(m.models.list_revisions(&created.id).unwrap().is_empty());
    }

    #[test]
    fn blank_name_update_is_rejected() {
        let m = models(StoreConfig::default());
        let created = m.create(&order(1, &["pen"]));
        let err = m
            .models
            .update(&created.id, DocumentUpdate::new().with_name(""), &alice())
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidInput(_)));
    }

    #[test]
    fn rejected_content_discards_metadata_edits() {
        let m = models(StoreConfig::default());
        let created = m.create(&order(1, &["pen"]));
        let err = m
            .models
            .update(
                &created.id,
                DocumentUpdate::new().with_name("renamed").with_content("<order/>"),
                &alice(),
            )
            .unwrap_err();
        let StoreError::ValidationFailed { message } = err else {
            panic!("expected validation failure");
        };
        assert!(message.contains("missing required attribute 'id' on element <order>"));
        assert_eq!(m.models.get(&created.id).unwrap(), created);
        assert!(m.models.list_revisions(&created.id).unwrap().is_empty());
    }

    #[test]
    fn update_unknown_document() {
        let m = models(StoreConfig::default());
        let err = m.models.update(&DocumentId::new(), content("<x/>"), &alice()).unwrap_err();
        assert!(matches!(err, StoreError::NotFound { kind: docvault_types::DocumentKind::Model, .. }));
    }

    #[test]
    fn trashed_documents_stay_updatable() {
        let m = models(StoreConfig::default());
        let created = m.create(&order(1, &["pen"]));
        m.models.soft_delete(&created.id, &alice()).unwrap();
        let updated = m.models.update(&created.id, content(&order(1, &["ink"])), &alice()).unwrap();
        assert_eq!(updated.version, 2);
        assert!(updated.is_trashed());
    }

    #[test]
    fn version_scheme_numbers_entries_by_superseded_version() {
        let config = StoreConfig {
            sequence_scheme: SequenceScheme::DocumentVersion,
            ..StoreConfig::default()
        };
        let m = models(config);
        let doc = m.create(&order(1, &["a"]));
        m.models.update(&doc.id, content(&order(1, &["a"])), &alice()).unwrap();
        m.models.update(&doc.id, content(&order(1, &["b"])), &alice()).unwrap();
        m.models.update(&doc.id, content(&order(1, &["c"])), &alice()).unwrap();
        let sequences: Vec<u32> = m
            .models
            .list_revisions(&doc.id)
            .unwrap()
            .iter()
            .map(|e| e.sequence)
            .collect();
        assert_eq!(sequences, vec![1, 2]);
    }

    /// Sequence given to the next update's entry for a document imported at
    /// version 3 with no history.
    fn sequence_after_import(scheme: SequenceScheme) -> Vec<u32> {
        let backend = Arc::new(InMemoryBackend::<ModelVariant>::new());
        let m = models_with(
            Arc::clone(&backend),
            StoreConfig {
                sequence_scheme: scheme,
                ..StoreConfig::default()
            },
        );
        let doc = m.create(&order(1, &["a"]));
        let mut imported = doc.clone();
        imported.version = 3;
        backend.commit(Commit::replace(imported, 1)).unwrap();

        let updated = m.models.update(&doc.id, content(&order(1, &["b"])), &alice()).unwrap();
        assert_eq!(updated.version, 4);
        m.models
            .list_revisions(&doc.id)
            .unwrap()
            .iter()
            .map(|e| e.sequence)
            .collect()
    }

    #[test]
    fn schemes_differ_only_on_misaligned_history() {
        assert_eq!(sequence_after_import(SequenceScheme::Dense), vec![1]);
        assert_eq!(sequence_after_import(SequenceScheme::DocumentVersion), vec![3]);
    }

    // -- ownership ---------------------------------------------------------

    #[test]
    fn enforced_ownership_rejects_foreign_actor() {
        let m = models(StoreConfig::default());
        let created = m.create(&order(1, &["pen"]));

        let err = m.models.update(&created.id, content(&order(1, &["ink"])), &bob()).unwrap_err();
        assert!(matches!(
            err,
            StoreError::OwnershipMismatch { ref owner, ref actor, .. }
                if owner.as_str() == "alice" && actor.as_str() == "bob"
        ));
        for result in [
            m.models.soft_delete(&created.id, &bob()),
            m.models.restore_from_trash(&created.id, &bob()),
            m.models.toggle_favorite(&created.id, &bob()),
        ] {
            assert!(matches!(result, Err(StoreError::OwnershipMismatch { .. })));
        }
        assert_eq!(m.models.get(&created.id).unwrap(), created);
    }

    #[test]
    fn advisory_ownership_proceeds_and_transfers_owner() {
        let config = StoreConfig {
            ownership: OwnershipPolicy::Advisory,
            ..StoreConfig::default()
        };
        let m = models(config);
        let created = m.create(&order(1, &["pen"]));
        let updated = m.models.update(&created.id, content(&order(1, &["ink"])), &bob()).unwrap();
        assert_eq!(updated.owner.as_str(), "bob");
        assert_eq!(updated.version, 2);
        assert_eq!(m.models.get_revision(&created.id, 1).unwrap().by_user.as_str(), "alice");
    }

    #[test]
    fn owner_follows_content_changes_only() {
        let config = StoreConfig {
            ownership: OwnershipPolicy::Advisory,
            ..StoreConfig::default()
        };
        let m = models(config);
        let created = m.create(&order(1, &["pen"]));
        let renamed = m
            .models
            .update(&created.id, DocumentUpdate::new().with_name("bob's name"), &bob())
            .unwrap();
        assert_eq!(renamed.owner.as_str(), "alice");
    }

    // -- trash and favorites ----------------------------------------------

    #[test]
    fn trash_round_trip_only_touches_deleted_at() {
        let m = models(StoreConfig::default());
        let created = m.create(&order(1, &["pen"]));

        let trashed = m.models.soft_delete(&created.id, &alice()).unwrap();
        assert!(trashed.deleted_at.is_some());
        assert_eq!(m.models.list_trashed().unwrap().len(), 1);
        assert!(m.models.list_active().unwrap().is_empty());

        let again = m.models.soft_delete(&created.id, &alice()).unwrap();
        assert_eq!(again.deleted_at, trashed.deleted_at);

        let restored = m.models.restore_from_trash(&created.id, &alice()).unwrap();
        assert_eq!(restored, created);
        assert_eq!(m.models.list_active().unwrap(), vec![created.clone()]);
        assert_eq!(m.models.restore_from_trash(&created.id, &alice()).unwrap(), created);
    }

    #[test]
    fn toggle_favorite_flips_from_unset() {
        let m = models(StoreConfig::default());
        let created = m.create(&order(1, &["pen"]));
        assert_eq!(created.fields.favorite, None);

        let on = m.models.toggle_favorite(&created.id, &alice()).unwrap();
        assert_eq!(on.fields.favorite, Some(true));
        assert!(on.updated_at > created.updated_at);
        assert_eq!(on.version, 1);

        let off = m.models.toggle_favorite(&created.id, &alice()).unwrap();
        assert_eq!(off.fields.favorite, Some(false));
    }

    // -- queries -----------------------------------------------------------

    #[test]
    fn listing_filters_by_owner_and_state() {
        let config = StoreConfig {
            ownership: OwnershipPolicy::Advisory,
            ..StoreConfig::default()
        };
        let m = models(config);
        let first = m.create(&order(1, &["a"]));
        let second = m.create(&order(2, &["b"]));
        m.models.update(&second.id, content(&order(2, &["c"])), &bob()).unwrap();
        m.models.soft_delete(&first.id, &alice()).unwrap();

        let alice_docs = m.models.list_by_owner(&UserId::new("alice")).unwrap();
        assert_eq!(alice_docs.iter().map(|d| d.id).collect::<Vec<_>>(), vec![first.id]);
        let bob_active = m
            .models
            .list(&DocumentFilter::owned_by(UserId::new("bob")).in_state(DocumentState::Active))
            .unwrap();
        assert_eq!(bob_active.len(), 1);
        assert_eq!(m.models.list(&DocumentFilter::default()).unwrap().len(), 2);
        assert!(m
            .models
            .list(&DocumentFilter::owned_by(UserId::new("alice")).in_state(DocumentState::Active))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn revision_lookups_report_missing_pieces() {
        let m = models(StoreConfig::default());
        let created = m.create(&order(1, &["pen"]));
        let err = m.models.get_revision(&created.id, 1).unwrap_err();
        assert!(matches!(err, StoreError::NoSuchRevision { sequence: 1, .. }));
        let err = m.models.list_revisions(&DocumentId::new()).unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
        assert!(m.models.find(&DocumentId::new()).unwrap().is_none());
    }

    #[test]
    fn verify_history_of_healthy_document() {
        let m = models(StoreConfig::default());
        let doc = m.create(&order(1, &["a"]));
        m.models.update(&doc.id, content(&order(1, &["b"])), &alice()).unwrap();
        m.models.restore_to_version(&doc.id, 1, &alice()).unwrap();
        let report = m.models.verify_history(&doc.id).unwrap();
        assert!(report.is_valid());
        assert_eq!(report.entry_count, 2);
    }

    // -- purge -------------------------------------------------------------

    #[test]
    fn purge_cascades_to_history() {
        let m = models(StoreConfig::default());
        let doc = m.create(&order(1, &["a"]));
        m.models.update(&doc.id, content(&order(1, &["b"])), &alice()).unwrap();

        let purged = m.models.purge(&doc.id).unwrap();
        assert_eq!(purged.document.id, doc.id);
        assert_eq!(purged.revisions_removed, 1);
        assert!(matches!(m.models.get(&doc.id), Err(StoreError::NotFound { .. })));
        assert!(matches!(m.models.purge(&doc.id), Err(StoreError::NotFound { .. })));
        assert!(m.models.locks.is_empty());
    }

    #[test]
    fn unknown_ids_leave_no_lock_entries() {
        let m = models(StoreConfig::default());
        for _ in 0..50 {
            let id = DocumentId::new();
            assert!(matches!(m.models.soft_delete(&id, &alice()), Err(StoreError::NotFound { .. })));
            assert!(matches!(m.models.restore_from_trash(&id, &alice()), Err(StoreError::NotFound { .. })));
            assert!(matches!(m.models.toggle_favorite(&id, &alice()), Err(StoreError::NotFound { .. })));
            assert!(matches!(m.models.restore_to_version(&id, 1, &alice()), Err(StoreError::NotFound { .. })));
            assert!(matches!(m.models.purge(&id), Err(StoreError::NotFound { .. })));
        }
        assert!(m.models.locks.is_empty());
    }

    // -- the end-to-end scenario -------------------------------------------

    #[test]
    fn model_lifecycle_against_schema() {
        let m = models(StoreConfig::default());
        let a = order(7, &["pen"]);
        let b = order(7, &["pen", "ink"]);

        let model = m.create(&a);
        assert_eq!(model.version, 1);

        let model = m.models.update(&model.id, content(&b), &alice()).unwrap();
        assert_eq!(model.version, 2);
        let history = m.models.list_revisions(&model.id).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].content, a.as_bytes());

        let model = m.models.update(&model.id, content(&b), &alice()).unwrap();
        assert_eq!(model.version, 2);
        assert_eq!(m.models.list_revisions(&model.id).unwrap().len(), 1);

        let sequence = history[0].sequence;
        let model = m.models.restore_to_version(&model.id, sequence, &alice()).unwrap();
        assert_eq!(model.version, 3);
        assert_eq!(model.content, a.as_bytes());
        assert_eq!(model.based_on, Some(sequence));
        let history = m.models.list_revisions(&model.id).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].content, b.as_bytes());
        assert_eq!(m.schemas.get(&m.schema.id).unwrap().version, 1);
    }

    // -- atomicity and concurrency -----------------------------------------

    /// Delegates to an in-memory backend; commits fail while `fail` is set.
    #[derive(Default)]
    struct FlakyBackend {
        inner: InMemoryBackend<ModelVariant>,
        fail: AtomicBool,
    }

    impl DocumentBackend<ModelVariant> for FlakyBackend {
        fn load(&self, id: &DocumentId) -> StoreResult<Option<Document<ModelVariant>>> {
            self.inner.load(id)
        }
        fn list(&self) -> StoreResult<Vec<Document<ModelVariant>>> {
            self.inner.list()
        }
        fn commit(&self, commit: Commit<ModelVariant>) -> StoreResult<Option<RevisionEntry>> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(StoreError::Io(std::io::Error::other("disk full")));
            }
            self.inner.commit(commit)
        }
        fn revisions(&self, id: &DocumentId) -> StoreResult<Vec<RevisionEntry>> {
            self.inner.revisions(id)
        }
        fn revision(&self, id: &DocumentId, sequence: u32) -> StoreResult<Option<RevisionEntry>> {
            self.inner.revision(id, sequence)
        }
        fn revision_count(&self, id: &DocumentId) -> StoreResult<u32> {
            self.inner.revision_count(id)
        }
        fn purge(&self, id: &DocumentId) -> StoreResult<Option<(Document<ModelVariant>, usize)>> {
            self.inner.purge(id)
        }
    }

    #[test]
    fn failed_commit_changes_nothing() {
        let backend = Arc::new(FlakyBackend::default());
        let m = models_with(backend.clone(), StoreConfig::default());
        let doc = m.create(&order(1, &["a"]));
        m.models.update(&doc.id, content(&order(1, &["b"])), &alice()).unwrap();
        let before = m.models.get(&doc.id).unwrap();

        backend.fail.store(true, Ordering::SeqCst);
        let err = m.models.update(&doc.id, content(&order(1, &["c"])), &alice()).unwrap_err();
        assert!(matches!(err, StoreError::Io(_)));
        assert!(m.models.restore_to_version(&doc.id, 1, &alice()).is_err());
        assert!(m.models.toggle_favorite(&doc.id, &alice()).is_err());

        assert_eq!(m.models.get(&doc.id).unwrap(), before);
        assert_eq!(m.models.list_revisions(&doc.id).unwrap().len(), 1);
    }

    /// Swaps the stored document's schema reference right after the first
    /// read, simulating a concurrent writer.
    struct SchemaSwapBackend {
        inner: InMemoryBackend<ModelVariant>,
        swap_to: Mutex<Option<DocumentId>>,
    }

    impl DocumentBackend<ModelVariant> for SchemaSwapBackend {
        fn load(&self, id: &DocumentId) -> StoreResult<Option<Document<ModelVariant>>> {
            let loaded = self.inner.load(id)?;
            if let (Some(doc), Some(schema)) = (&loaded, self.swap_to.lock().unwrap().take()) {
                let mut swapped = doc.clone();
                swapped.fields.schema_ref = schema;
                self.inner.commit(Commit::replace(swapped, doc.version))?;
            }
            Ok(loaded)
        }
        fn list(&self) -> StoreResult<Vec<Document<ModelVariant>>> {
            self.inner.list()
        }
        fn commit(&self, commit: Commit<ModelVariant>) -> StoreResult<Option<RevisionEntry>> {
            self.inner.commit(commit)
        }
        fn revisions(&self, id: &DocumentId) -> StoreResult<Vec<RevisionEntry>> {
            self.inner.revisions(id)
        }
        fn revision(&self, id: &DocumentId, sequence: u32) -> StoreResult<Option<RevisionEntry>> {
            self.inner.revision(id, sequence)
        }
        fn revision_count(&self, id: &DocumentId) -> StoreResult<u32> {
            self.inner.revision_count(id)
        }
        fn purge(&self, id: &DocumentId) -> StoreResult<Option<(Document<ModelVariant>, usize)>> {
            self.inner.purge(id)
        }
    }

    #[test]
    fn schema_change_after_validation_is_a_conflict() {
        let backend = Arc::new(SchemaSwapBackend {
            inner: InMemoryBackend::new(),
            swap_to: Mutex::new(None),
        });
        let m = models_with(backend.clone(), StoreConfig::default());
        let other = m
            .schemas
            .create(NewDocument::new("notes", ORDER_XSD_WITH_NOTE, SchemaFields {}), &alice())
            .unwrap();
        let doc = m.create(&order(1, &["a"]));

        *backend.swap_to.lock().unwrap() = Some(other.id);
        let err = m.models.update(&doc.id, content(&order(1, &["b"])), &alice()).unwrap_err();
        assert!(matches!(err, StoreError::ConcurrentModification { .. }));
        let stored = m.models.get(&doc.id).unwrap();
        assert_eq!(stored.content, doc.content);
        assert!(m.models.list_revisions(&doc.id).unwrap().is_empty());
    }

    #[test]
    fn concurrent_updates_never_lose_a_version() {
        let m = models(StoreConfig::default());
        let doc = m.create(&order(1, &["start"]));
        let writers = 8;

        std::thread::scope(|scope| {
            for i in 0..writers {
                let models = &m.models;
                let id = doc.id;
                scope.spawn(move || {
                    let item = format!("writer-{i}");
                    models.update(&id, content(&order(1, &[item.as_str()])), &alice()).unwrap();
                });
            }
        });

        let current = m.models.get(&doc.id).unwrap();
        assert_eq!(current.version, 1 + writers);
        let history = m.models.list_revisions(&doc.id).unwrap();
        assert_eq!(history.len() as u32, writers);
        let sequences: Vec<u32> = history.iter().map(|e| e.sequence).collect();
        assert_eq!(sequences, (1..=writers).collect::<Vec<_>>());
        assert!(m.models.verify_history(&doc.id).unwrap().is_valid());
    }

    proptest! {
        #[test]
        fn version_counts_content_changes(choices in proptest::collection::vec(0u8..4, 1..24)) {
            let store = schema_store(StoreConfig::default());
            let doc = store
                .create(NewDocument::new("p", "start", SchemaFields {}), &alice())
                .unwrap();
            let mut current = b"start".to_vec();
            let mut expected = 1u32;

            for choice in choices {
                let next = format!("content-{choice}").into_bytes();
                let updated = store
                    .update(&doc.id, DocumentUpdate::new().with_content(next.clone()), &alice())
                    .unwrap();
                if next != current {
                    expected += 1;
                }
                current = next;
                prop_assert_eq!(updated.version, expected);
                prop_assert_eq!(&updated.content, &current);
                let history = store.list_revisions(&doc.id).unwrap();
                prop_assert_eq!(history.len() as u32, updated.version - 1);
            }
        }
    }
}
