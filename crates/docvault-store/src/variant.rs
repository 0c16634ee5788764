//! The two document variants.
//!
//! Schema and model documents share every lifecycle rule. They differ only in
//! the fields they carry next to the common ones and in whether their content
//! has to pass a schema check. [`Variant`] captures that difference so the
//! store is written once.

use std::collections::BTreeSet;
use std::fmt;
use std::fmt::Debug;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use docvault_types::{DocumentId, DocumentKind};

/// Type-level description of a document variant.
pub trait Variant: Clone + Debug + PartialEq + Eq + Send + Sync + 'static {
    const KIND: DocumentKind;

    /// Variant-specific fields stored on every document.
    type Fields: Clone + Debug + PartialEq + Eq + Serialize + DeserializeOwned + Send + Sync;

    /// Optional changes to `Fields` carried by an update.
    type Patch: Clone + Debug + Default + Send + Sync;

    /// The schema this document's content must conform to, if any.
    fn schema_ref(fields: &Self::Fields) -> Option<DocumentId>;

    /// The schema that applies once `patch` has been applied to `fields`.
    fn patched_schema_ref(fields: &Self::Fields, patch: &Self::Patch) -> Option<DocumentId>;

    fn apply_patch(fields: &mut Self::Fields, patch: Self::Patch);
}

/// Schema documents: content is an XSD, no extra fields.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SchemaVariant;

/// Schema documents have no fields beyond the common ones.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaFields {}

impl Variant for SchemaVariant {
    const KIND: DocumentKind = DocumentKind::Schema;
    type Fields = SchemaFields;
    type Patch = ();

    fn schema_ref(_: &SchemaFields) -> Option<DocumentId> {
        None
    }

    fn patched_schema_ref(_: &SchemaFields, _: &()) -> Option<DocumentId> {
        None
    }

    fn apply_patch(_: &mut SchemaFields, _: ()) {}
}

/// Model documents: content must validate against the referenced schema.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ModelVariant;

/// An already-resolved tag label attached to a model.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagRef(String);

impl TagRef {
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for TagRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TagRef({})", self.0)
    }
}

impl fmt::Display for TagRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TagRef {
    fn from(label: &str) -> Self {
        Self::new(label)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelFields {
    /// `None` until the first toggle.
    pub favorite: Option<bool>,
    pub tags: BTreeSet<TagRef>,
    pub schema_ref: DocumentId,
}

impl ModelFields {
    pub fn new(schema_ref: DocumentId) -> Self {
        Self {
            favorite: None,
            tags: BTreeSet::new(),
            schema_ref,
        }
    }

    pub fn with_tags(mut self, tags: impl IntoIterator<Item = TagRef>) -> Self {
        self.tags = tags.into_iter().collect();
        self
    }

    pub fn is_favorite(&self) -> bool {
        self.favorite.unwrap_or(false)
    }
}

/// Changes to a model's fields. `None` leaves the field as it is.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ModelPatch {
    pub schema_ref: Option<DocumentId>,
    /// Replaces the whole tag set.
    pub tags: Option<BTreeSet<TagRef>>,
}

impl ModelPatch {
    pub fn schema(schema_ref: DocumentId) -> Self {
        Self {
            schema_ref: Some(schema_ref),
            tags: None,
        }
    }

    pub fn tags(tags: impl IntoIterator<Item = TagRef>) -> Self {
        Self {
            schema_ref: None,
            tags: Some(tags.into_iter().collect()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.schema_ref.is_none() && self.tags.is_none()
    }
}

impl Variant for ModelVariant {
    const KIND: DocumentKind = DocumentKind::Model;
    type Fields = ModelFields;
    type Patch = ModelPatch;

    fn schema_ref(fields: &ModelFields) -> Option<DocumentId> {
        Some(fields.schema_ref)
    }

    fn patched_schema_ref(fields: &ModelFields, patch: &ModelPatch) -> Option<DocumentId> {
        Some(patch.schema_ref.unwrap_or(fields.schema_ref))
    }

    fn apply_patch(fields: &mut ModelFields, patch: ModelPatch) {
        if let Some(schema_ref) = patch.schema_ref {
            fields.schema_ref = schema_ref;
        }
        if let Some(tags) = patch.tags {
            fields.tags = tags;
        }
    }
}
