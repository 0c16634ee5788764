//! Revision ledger for docvault.
//!
//! Every time a document's content is about to be overwritten by different
//! bytes, the outgoing state is appended here as an immutable
//! [`RevisionEntry`]. This crate provides:
//! - [`RevisionEntry`] / [`RevisionInput`] record types
//! - per-document sequence assignment ([`Numbering`])
//! - [`RevisionTable`], the lock-free table backends embed so a document and
//!   its history commit together
//! - [`HistoryVerifier`] for sequence and digest integrity checks

pub mod error;
pub mod records;
pub mod table;
pub mod verify;

pub use error::{LedgerError, LedgerResult};
pub use records::{Numbering, RevisionEntry, RevisionInput};
pub use table::RevisionTable;
pub use verify::{HistoryReport, HistoryVerifier, HistoryViolation, HistoryViolationKind};
