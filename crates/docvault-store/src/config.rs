use std::path::Path;

use serde::{Deserialize, Serialize};

use docvault_validate::ValidationConfig;

use crate::error::{StoreError, StoreResult};

/// What happens when the acting user does not own the document.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OwnershipPolicy {
    /// Reject the operation with `OwnershipMismatch`.
    #[default]
    Enforce,
    /// Log a warning and carry on.
    Advisory,
}

/// How revision entries recorded by `update` are numbered.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SequenceScheme {
    /// Every entry gets `count + 1`, so a document's history is `1..=n`.
    #[default]
    Dense,
    /// Update entries take the superseded document version; restore entries
    /// still use `count + 1`. A collision is rejected by the ledger.
    ///
    /// The store itself keeps `version - 1` equal to the number of entries,
    /// so on histories it wrote this numbers exactly like `Dense`. The two
    /// only part ways on imported data whose history does not line up with
    /// the version, e.g. a snapshot with pruned entries.
    DocumentVersion,
}

/// Store configuration, usually read from `docvault.toml`.
///
/// ```toml
/// ownership = "enforce"
/// sequence_scheme = "dense"
///
/// [validation]
/// max_violations = 32
/// max_depth = 256
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub ownership: OwnershipPolicy,
    pub sequence_scheme: SequenceScheme,
    pub validation: ValidationConfig,
}

impl StoreConfig {
    pub fn from_toml_str(text: &str) -> StoreResult<Self> {
        toml::from_str(text).map_err(|e| StoreError::Config(e.to_string()))
    }

    pub fn load(path: impl AsRef<Path>) -> StoreResult<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&text)
    }

    pub fn to_toml_string(&self) -> StoreResult<String> {
        toml::to_string_pretty(self).map_err(|e| StoreError::Config(e.to_string()))
    }
}
