use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

const DOMAIN: &[u8] = b"docvault-content-v1:";

/// Domain-separated BLAKE3 digest of a document payload.
///
/// Stored alongside every revision so history integrity can be re-checked
/// without trusting the stored bytes.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContentDigest(#[serde(with = "crate::hex_bytes::array")] [u8; 32]);

impl ContentDigest {
    /// Digest the given bytes.
    pub fn of(content: &[u8]) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(DOMAIN);
        hasher.update(content);
        Self(*hasher.finalize().as_bytes())
    }

    /// Returns `true` if `content` hashes to this digest.
    pub fn matches(&self, content: &[u8]) -> bool {
        Self::of(content) == *self
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// First 8 hex characters.
    pub fn short_hex(&self) -> String {
        hex::encode(&self.0[..4])
    }

    pub fn from_hex(s: &str) -> Result<Self, TypeError> {
        let bytes = hex::decode(s).map_err(|e| TypeError::InvalidHex(e.to_string()))?;
        let array: [u8; 32] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| TypeError::InvalidLength {
                expected: 32,
                actual: bytes.len(),
            })?;
        Ok(Self(array))
    }
}

impl fmt::Debug for ContentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentDigest({})", self.short_hex())
    }
}

impl fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}
