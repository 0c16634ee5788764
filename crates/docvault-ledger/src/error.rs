use docvault_types::DocumentId;

/// Errors produced by ledger operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error("document {document} already has a revision with sequence {sequence}")]
    SequenceConflict { document: DocumentId, sequence: u32 },

    #[error("invalid revision sequence {0}; sequences start at 1")]
    InvalidSequence(u32),

    #[error("revision for document {found} cannot be recorded against document {expected}")]
    DocumentMismatch {
        expected: DocumentId,
        found: DocumentId,
    },
}

pub type LedgerResult<T> = Result<T, LedgerError>;
