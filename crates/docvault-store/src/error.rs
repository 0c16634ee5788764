use docvault_ledger::LedgerError;
use docvault_types::{DocumentId, DocumentKind, UserId};

/// Errors from document store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No document with this id exists.
    #[error("{kind} not found: {id}")]
    NotFound { kind: DocumentKind, id: DocumentId },

    /// The content gate rejected the content. `message` is the validator's
    /// diagnostic, unmodified.
    #[error("validation failed: {message}")]
    ValidationFailed { message: String },

    /// The schema a model refers to is not a usable definition.
    #[error("invalid reference definition: {0}")]
    InvalidReferenceDefinition(String),

    #[error("document {id} has no revision with sequence {sequence}")]
    NoSuchRevision { id: DocumentId, sequence: u32 },

    #[error("{actor} does not own document {id} (owner: {owner})")]
    OwnershipMismatch {
        id: DocumentId,
        owner: UserId,
        actor: UserId,
    },

    /// The document changed between the read and the commit.
    #[error("document {id} was modified concurrently (expected version {expected}, found {found})")]
    ConcurrentModification {
        id: DocumentId,
        expected: u32,
        found: u32,
    },

    #[error("schema not found: {0}")]
    SchemaNotFound(DocumentId),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("store lock poisoned")]
    LockPoisoned,

    #[error("configuration error: {0}")]
    Config(String),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
