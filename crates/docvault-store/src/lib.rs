//! Versioned document store for docvault.
//!
//! Schema documents (XSDs) and model documents (XML validated against a
//! schema) share one engine, [`DocumentStore`], parameterized by a
//! [`Variant`]. The store provides:
//! - create / update with content gating and per-document versioning
//! - an append-only revision history for every content change
//! - restore of any recorded revision ([`DocumentStore::restore_to_version`])
//! - soft delete, favorites, listing, history diffs and verification
//! - in-memory and file-backed persistence with atomic commits
//!
//! [`Vault`] wires a schema store and a model store together so models are
//! validated against the schemas in the same vault.
//!
//! # Quick Start
//!
//! ```rust
//! use docvault_store::{DocumentUpdate, ModelFields, NewDocument, SchemaFields, StoreConfig, Vault};
//! use docvault_types::Actor;
//!
//! let vault = Vault::in_memory(StoreConfig::default());
//! let alice = Actor::new("alice", "Alice");
//!
//! let xsd = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
//!   <xs:element name="note" type="xs:string"/>
//! </xs:schema>"#;
//! let schema = vault.schemas().create(NewDocument::new("notes", xsd, SchemaFields {}), &alice).unwrap();
//!
//! let fields = ModelFields::new(schema.id);
//! let model = vault.models().create(NewDocument::new("n1", "<note>hi</note>", fields), &alice).unwrap();
//! let model = vault
//!     .models()
//!     .update(&model.id, DocumentUpdate::new().with_content("<note>bye</note>"), &alice)
//!     .unwrap();
//! assert_eq!(model.version, 2);
//!
//! let restored = vault.models().restore_to_version(&model.id, 1, &alice).unwrap();
//! assert_eq!(restored.content, b"<note>hi</note>");
//! ```

pub mod backend;
pub mod config;
pub mod diff;
pub mod document;
pub mod engine;
pub mod error;
pub mod gate;
pub mod locks;
pub mod variant;
pub mod vault;

mod restore;

#[cfg(test)]
mod testing;

pub use backend::{Commit, DocumentBackend, FileBackend, InMemoryBackend};
pub use config::{OwnershipPolicy, SequenceScheme, StoreConfig};
pub use diff::{diff_contents, ContentDiff, DiffHunk, DiffLine, RevisionSelector};
pub use document::{Document, DocumentFilter, DocumentState, DocumentUpdate, NewDocument};
pub use engine::{DocumentStore, Purged};
pub use error::{StoreError, StoreResult};
pub use gate::{ContentGate, ContentProposal, GateDecision, OpenGate, SchemaGate, SchemaResolver};
pub use locks::DocumentLocks;
pub use variant::{ModelFields, ModelPatch, ModelVariant, SchemaFields, SchemaVariant, TagRef, Variant};
pub use vault::Vault;
