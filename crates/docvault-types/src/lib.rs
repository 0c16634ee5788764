//! Foundation types for docvault.
//!
//! This crate provides the identity, digest, and time types shared by the
//! validator, the revision ledger, and the document store. Every other
//! docvault crate depends on `docvault-types`.
//!
//! # Key Types
//!
//! - [`DocumentId`] / [`RevisionId`]: UUID v7 identifiers (time-ordered)
//! - [`UserId`] / [`Actor`]: the identity recorded for every mutation
//! - [`ContentDigest`]: domain-separated BLAKE3 digest of a payload
//! - [`DocumentKind`]: schema or model
//! - [`Clock`]: injectable time source ([`SystemClock`], [`ManualClock`])

pub mod actor;
pub mod clock;
pub mod digest;
pub mod error;
pub mod hex_bytes;
pub mod id;
pub mod kind;

pub use actor::{Actor, UserId};
pub use clock::{Clock, ManualClock, SystemClock, Timestamp};
pub use digest::ContentDigest;
pub use error::TypeError;
pub use id::{DocumentId, RevisionId};
pub use kind::DocumentKind;
