//! Content gates.
//!
//! Every create and content-changing update passes its candidate bytes
//! through a [`ContentGate`] before anything is written. Schemas go through
//! [`OpenGate`]; models go through [`SchemaGate`], which resolves the
//! referenced schema and runs the structural validator.

use std::sync::Arc;

use tracing::debug;

use docvault_types::{DocumentId, DocumentKind};
use docvault_validate::{StructuralValidator, ValidationError};

use crate::error::{StoreError, StoreResult};

/// What a gate is asked to admit.
#[derive(Clone, Copy, Debug)]
pub struct ContentProposal<'a> {
    pub kind: DocumentKind,
    /// Schema the content must conform to, when the variant has one.
    pub schema_ref: Option<&'a DocumentId>,
    pub content: &'a [u8],
}

/// Outcome of a gate evaluation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GateDecision {
    Pass,
    Fail { reason: String },
}

impl GateDecision {
    pub fn is_pass(&self) -> bool {
        matches!(self, Self::Pass)
    }
}

/// A check content has to pass before it is stored.
///
/// `Ok(Fail)` means the content was rejected; `Err` means the gate itself
/// could not reach a decision (missing schema, unusable schema, I/O).
pub trait ContentGate: Send + Sync {
    fn name(&self) -> &str;

    fn evaluate(&self, proposal: &ContentProposal<'_>) -> StoreResult<GateDecision>;
}

/// Looks up the raw bytes of a schema document by id.
///
/// Trashed schemas still resolve; only a purged or unknown id yields `None`.
pub trait SchemaResolver: Send + Sync {
    fn resolve(&self, id: &DocumentId) -> StoreResult<Option<Vec<u8>>>;
}

/// Admits any content.
#[derive(Clone, Copy, Debug, Default)]
pub struct OpenGate;

impl ContentGate for OpenGate {
    fn name(&self) -> &str {
        "open"
    }

    fn evaluate(&self, _proposal: &ContentProposal<'_>) -> StoreResult<GateDecision> {
        Ok(GateDecision::Pass)
    }
}

/// Admits content that validates against the referenced schema.
pub struct SchemaGate {
    resolver: Arc<dyn SchemaResolver>,
    validator: Arc<dyn StructuralValidator>,
}

impl SchemaGate {
    pub fn new(resolver: Arc<dyn SchemaResolver>, validator: Arc<dyn StructuralValidator>) -> Self {
        Self {
            resolver,
            validator,
        }
    }
}

impl ContentGate for SchemaGate {
    fn name(&self) -> &str {
        "schema"
    }

    fn evaluate(&self, proposal: &ContentProposal<'_>) -> StoreResult<GateDecision> {
        let Some(schema_ref) = proposal.schema_ref else {
            return Err(StoreError::InvalidInput(format!(
                "{} content has no schema to validate against",
                proposal.kind
            )));
        };
        let reference = self
            .resolver
            .resolve(schema_ref)?
            .ok_or(StoreError::SchemaNotFound(*schema_ref))?;

        match self.validator.validate(&reference, proposal.content) {
            Ok(()) => {
                debug!(schema = %schema_ref, bytes = proposal.content.len(), "content validated");
                Ok(GateDecision::Pass)
            }
            Err(ValidationError::StructuralViolation(diagnostic)) => Ok(GateDecision::Fail {
                reason: diagnostic.to_string(),
            }),
            Err(ValidationError::InvalidReferenceDefinition(message)) => {
                Err(StoreError::InvalidReferenceDefinition(message))
            }
        }
    }
}
