use std::collections::HashSet;

use docvault_types::DocumentId;

use crate::records::RevisionEntry;

/// Result of checking one document's history.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HistoryReport {
    pub document: DocumentId,
    pub entry_count: u32,
    pub sequences_unique: bool,
    /// Sequences are exactly `1..=entry_count` in recording order.
    pub sequences_dense: bool,
    pub digests_valid: bool,
    pub attributed: bool,
    pub violations: Vec<HistoryViolation>,
}

impl HistoryReport {
    /// Returns `true` if all checks passed.
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }
}

/// A specific integrity problem found in a history.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HistoryViolation {
    pub sequence: u32,
    pub kind: HistoryViolationKind,
    pub description: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HistoryViolationKind {
    DuplicateSequence,
    SequenceGap,
    DigestMismatch,
    ForeignEntry,
}

/// History integrity checker.
#[derive(Clone, Copy, Debug)]
pub struct HistoryVerifier {
    require_dense: bool,
}

impl Default for HistoryVerifier {
    fn default() -> Self {
        Self { require_dense: true }
    }
}

impl HistoryVerifier {
    /// `require_dense = false` accepts gaps, as produced when update
    /// entries are numbered by document version.
    pub fn new(require_dense: bool) -> Self {
        Self { require_dense }
    }

    pub fn verify(&self, document: &DocumentId, entries: &[RevisionEntry]) -> HistoryReport {
        let mut violations = Vec::new();
        let mut sequences_unique = true;
        let mut sequences_dense = true;
        let mut digests_valid = true;
        let mut attributed = true;
        let mut seen = HashSet::new();

        for (index, entry) in entries.iter().enumerate() {
            if entry.document != *document {
                attributed = false;
                violations.push(HistoryViolation {
                    sequence: entry.sequence,
                    kind: HistoryViolationKind::ForeignEntry,
                    description: format!("entry belongs to document {}", entry.document),
                });
            }

            if !seen.insert(entry.sequence) {
                sequences_unique = false;
                violations.push(HistoryViolation {
                    sequence: entry.sequence,
                    kind: HistoryViolationKind::DuplicateSequence,
                    description: format!("sequence {} recorded more than once", entry.sequence),
                });
            }

            let expected = u32::try_from(index + 1).unwrap_or(u32::MAX);
            if entry.sequence != expected {
                sequences_dense = false;
                if self.require_dense {
                    violations.push(HistoryViolation {
                        sequence: entry.sequence,
                        kind: HistoryViolationKind::SequenceGap,
                        description: format!("expected sequence {expected}, found {}", entry.sequence),
                    });
                }
            }

            if !entry.is_intact() {
                digests_valid = false;
                violations.push(HistoryViolation {
                    sequence: entry.sequence,
                    kind: HistoryViolationKind::DigestMismatch,
                    description: "stored content does not match its digest".into(),
                });
            }
        }

        HistoryReport {
            document: *document,
            entry_count: u32::try_from(entries.len()).unwrap_or(u32::MAX),
            sequences_unique,
            sequences_dense,
            digests_valid,
            attributed,
            violations,
        }
    }
}
