//! Serde helpers that encode byte payloads as hex strings.
//!
//! Used with `#[serde(with = "docvault_types::hex_bytes")]` on `Vec<u8>`
//! fields so persisted documents stay readable JSON instead of number arrays.

use serde::{Deserialize, Deserializer, Serializer};

pub fn serialize<S>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&hex::encode(bytes))
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
where
    D: Deserializer<'de>,
{
    let encoded = String::deserialize(deserializer)?;
    hex::decode(&encoded).map_err(serde::de::Error::custom)
}

/// Fixed-size variant for 32-byte digests.
pub mod array {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(bytes: &[u8; 32], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<[u8; 32], D::Error>
    where
        D: Deserializer<'de>,
    {
        let encoded = String::deserialize(deserializer)?;
        let decoded = hex::decode(&encoded).map_err(serde::de::Error::custom)?;
        decoded.as_slice().try_into().map_err(|_| {
            serde::de::Error::custom(format!("expected 32 bytes, got {}", decoded.len()))
        })
    }
}
