use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Content-addressed identifier for any stored object.
///
/// An `ObjectId` is the BLAKE3 digest of an object's full encoded record
/// (`"<type> <len>\0<content>"`). Identical content always produces the same
/// `ObjectId`, so writes are deduplicated and reads are verifiable.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectId([u8; 32]);

impl ObjectId {
    /// Length of the hex form.
    pub const HEX_LEN: usize = 64;

    /// Compute an `ObjectId` over raw bytes.
    pub fn digest(data: &[u8]) -> Self {
        Self(*blake3::hash(data).as_bytes())
    }

    /// Create an `ObjectId` from a pre-computed hash.
    pub fn from_hash(hash: [u8; 32]) -> Self {
        Self(hash)
    }

    /// The raw 32-byte hash.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Hex-encoded string representation.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Short hex representation (first 8 characters).
    pub fn short_hex(&self) -> String {
        hex::encode(&self.0[..4])
    }

    /// Parse from a hex string.
    pub fn from_hex(s: &str) -> Result<Self, TypeError> {
        let bytes = hex::decode(s).map_err(|e| TypeError::InvalidHex(e.to_string()))?;
        if bytes.len() != 32 {
            return Err(TypeError::InvalidLength {
                expected: 32,
                actual: bytes.len(),
            });
        }
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }

    /// Relative location under an `objects/` directory:
    /// `<hex[0..2]>/<hex[2..]>`.
    pub fn fanout_path(&self) -> PathBuf {
        let hex = self.to_hex();
        let (dir, file) = hex.split_at(2);
        PathBuf::from(dir).join(file)
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({})", self.short_hex())
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl FromStr for ObjectId {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s.trim())
    }
}

impl From<[u8; 32]> for ObjectId {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_is_deterministic() {
        assert_eq!(ObjectId::digest(b"hello world"), ObjectId::digest(b"hello world"));
    }

    #[test]
    fn different_data_produces_different_ids() {
        assert_ne!(ObjectId::digest(b"hello"), ObjectId::digest(b"world"));
    }

    #[test]
    fn hex_roundtrip() {
        let id = ObjectId::digest(b"test");
        let parsed = ObjectId::from_hex(&id.to_hex()).unwrap();
        assert_eq!(id, parsed);
        assert_eq!(id.to_hex().len(), ObjectId::HEX_LEN);
    }

    #[test]
    fn parse_trims_trailing_newline() {
        let id = ObjectId::digest(b"head");
        let parsed: ObjectId = format!("{id}\n").parse().unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn from_hex_rejects_wrong_length() {
        let err = ObjectId::from_hex("abcd").unwrap_err();
        assert_eq!(err, TypeError::InvalidLength { expected: 32, actual: 2 });
    }

    #[test]
    fn from_hex_rejects_non_hex() {
        assert!(matches!(ObjectId::from_hex("zz"), Err(TypeError::InvalidHex(_))));
    }

    #[test]
    fn fanout_splits_after_two_chars() {
        let id = ObjectId::digest(b"fanout");
        let hex = id.to_hex();
        let path = id.fanout_path();
        let mut parts = path.iter();
        assert_eq!(parts.next().unwrap().to_str().unwrap(), &hex[..2]);
        assert_eq!(parts.next().unwrap().to_str().unwrap(), &hex[2..]);
        assert_eq!(hex[2..].len(), 62);
    }

    #[test]
    fn serde_roundtrip() {
        let id = ObjectId::digest(b"serde test");
        let json = serde_json::to_string(&id).unwrap();
        let parsed: ObjectId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, parsed);
    }
}
