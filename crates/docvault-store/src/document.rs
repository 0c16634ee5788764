use std::fmt;

use serde::{Deserialize, Serialize};

use docvault_types::{ContentDigest, DocumentId, DocumentKind, Timestamp, UserId};

use crate::variant::Variant;

/// A stored document: the common fields plus the variant's own.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct Document<V: Variant> {
    pub id: DocumentId,
    pub name: String,
    pub description: String,
    #[serde(with = "docvault_types::hex_bytes")]
    pub content: Vec<u8>,
    /// Starts at 1 and increases by exactly one per content change or restore.
    pub version: u32,
    /// Set by a restore to the history sequence it restored; cleared by the
    /// next content-changing update.
    pub based_on: Option<u32>,
    /// The user who last changed the content.
    pub owner: UserId,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    /// `Some` while the document is in the trash.
    pub deleted_at: Option<Timestamp>,
    pub fields: V::Fields,
}

impl<V: Variant> Document<V> {
    pub fn kind(&self) -> DocumentKind {
        V::KIND
    }

    pub fn is_trashed(&self) -> bool {
        self.deleted_at.is_some()
    }

    pub fn state(&self) -> DocumentState {
        if self.is_trashed() {
            DocumentState::Trashed
        } else {
            DocumentState::Active
        }
    }

    pub fn digest(&self) -> ContentDigest {
        ContentDigest::of(&self.content)
    }

    pub fn size(&self) -> usize {
        self.content.len()
    }
}

/// Whether a document is live or in the trash.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentState {
    Active,
    Trashed,
}

impl fmt::Display for DocumentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Active => f.write_str("active"),
            Self::Trashed => f.write_str("trashed"),
        }
    }
}

/// Input to `create`.
#[derive(Clone, Debug)]
pub struct NewDocument<V: Variant> {
    pub name: String,
    pub description: String,
    pub content: Vec<u8>,
    pub fields: V::Fields,
}

impl<V: Variant> NewDocument<V> {
    pub fn new(name: impl Into<String>, content: impl Into<Vec<u8>>, fields: V::Fields) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            content: content.into(),
            fields,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// Input to `update`. Absent fields are left unchanged; empty content counts
/// as absent.
#[derive(Clone, Debug)]
pub struct DocumentUpdate<V: Variant> {
    pub name: Option<String>,
    pub description: Option<String>,
    pub content: Option<Vec<u8>>,
    pub patch: V::Patch,
}

impl<V: Variant> Default for DocumentUpdate<V> {
    fn default() -> Self {
        Self {
            name: None,
            description: None,
            content: None,
            patch: V::Patch::default(),
        }
    }
}

impl<V: Variant> DocumentUpdate<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_content(mut self, content: impl Into<Vec<u8>>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn with_patch(mut self, patch: V::Patch) -> Self {
        self.patch = patch;
        self
    }
}

/// Listing filter. `None` matches everything.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DocumentFilter {
    pub owner: Option<UserId>,
    pub state: Option<DocumentState>,
}

impl DocumentFilter {
    pub fn owned_by(owner: UserId) -> Self {
        Self {
            owner: Some(owner),
            state: None,
        }
    }

    pub fn in_state(mut self, state: DocumentState) -> Self {
        self.state = Some(state);
        self
    }

    pub fn matches<V: Variant>(&self, document: &Document<V>) -> bool {
        self.owner.as_ref().map_or(true, |owner| &document.owner == owner)
            && self.state.map_or(true, |state| document.state() == state)
    }
}
