use serde::{Deserialize, Serialize};

use docvault_types::{ContentDigest, DocumentId, RevisionId, Timestamp, UserId};

/// An immutable snapshot of a document's content at the moment it was
/// superseded.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevisionEntry {
    pub id: RevisionId,
    pub document: DocumentId,
    #[serde(with = "docvault_types::hex_bytes")]
    pub content: Vec<u8>,
    /// Digest of `content` taken when the entry was recorded.
    pub digest: ContentDigest,
    /// Per-document history sequence, starting at 1.
    pub sequence: u32,
    /// The superseded document's `created_at`.
    pub snapshot_created_at: Timestamp,
    /// When the supersession happened.
    pub snapshot_updated_at: Timestamp,
    /// Owner of the superseded state.
    pub by_user: UserId,
    pub recorded_at: Timestamp,
}

impl RevisionEntry {
    /// Whether the stored digest still matches the stored content.
    pub fn is_intact(&self) -> bool {
        self.digest.matches(&self.content)
    }

    pub fn size(&self) -> usize {
        self.content.len()
    }
}

/// The outgoing state handed to the ledger by a content-changing mutation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RevisionInput {
    pub document: DocumentId,
    pub content: Vec<u8>,
    pub snapshot_created_at: Timestamp,
    pub snapshot_updated_at: Timestamp,
    pub by_user: UserId,
    pub recorded_at: Timestamp,
}

/// How the ledger numbers a new entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Numbering {
    /// One more than the number of entries already recorded for the document.
    Next,
    /// A caller-chosen sequence; rejected if already taken.
    Explicit(u32),
}
