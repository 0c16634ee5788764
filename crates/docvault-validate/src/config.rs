use serde::{Deserialize, Serialize};

/// Configuration for structural validation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Stop collecting violations after this many. Always at least one is
    /// reported for an invalid document.
    pub max_violations: usize,
    /// Deepest element nesting accepted in a schema or a candidate.
    pub max_depth: usize,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            max_violations: 32,
            max_depth: 256,
        }
    }
}
