//! Content hashing using blake3.
//!
//! Source images are hashed once when stored; render inputs (source hash plus
//! the resolved link map) are folded into a [`Fingerprint`] so a recompute can
//! tell "nothing I depend on changed" without parsing the SVG again.

use serde::{Deserialize, Serialize};

/// A 256-bit content hash (blake3 output).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContentHash([u8; 32]);

impl ContentHash {
    /// Create a new ContentHash from raw bytes.
    #[inline]
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Hash a byte slice in one go.
    pub fn of(data: impl AsRef<[u8]>) -> Self {
        Self(*blake3::hash(data.as_ref()).as_bytes())
    }

    /// Get the raw bytes.
    #[inline]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Convert to hex string (for debugging/display).
    pub fn to_hex(self) -> String {
        hex::encode(self.0)
    }

    /// Create from hex string.
    pub fn from_hex(s: &str) -> Option<Self> {
        let bytes = hex::decode(s).ok()?;
        if bytes.len() != 32 {
            return None;
        }
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Some(Self(arr))
    }
}

impl std::fmt::Display for ContentHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Display first 16 chars of hex for brevity
        write!(f, "{}", &self.to_hex()[..16])
    }
}

impl TryFrom<String> for ContentHash {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_hex(&value).ok_or_else(|| format!("invalid content hash `{value}`"))
    }
}

impl From<ContentHash> for String {
    fn from(hash: ContentHash) -> Self {
        hash.to_hex()
    }
}

/// Incremental hash over a sequence of labelled fields.
///
/// Every field is length-prefixed so that `("ab", "c")` and `("a", "bc")`
/// never collide.
pub struct Fingerprint {
    hasher: blake3::Hasher,
}

impl Fingerprint {
    pub fn new(domain: &str) -> Self {
        let mut fp = Self {
            hasher: blake3::Hasher::new(),
        };
        fp.field(domain.as_bytes());
        fp
    }

    /// Add a field to the fingerprint.
    pub fn field(&mut self, data: impl AsRef<[u8]>) -> &mut Self {
        let data = data.as_ref();
        self.hasher.update(&(data.len() as u64).to_le_bytes());
        self.hasher.update(data);
        self
    }

    /// Add an optional field; `None` and `Some("")` hash differently.
    pub fn optional(&mut self, data: Option<&str>) -> &mut Self {
        match data {
            Some(value) => self.field([1]).field(value),
            None => self.field([0]),
        }
    }

    pub fn finish(&self) -> ContentHash {
        ContentHash::new(*self.hasher.finalize().as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_hash_display() {
        let hash = ContentHash::new([0xab; 32]);
        assert_eq!(format!("{}", hash), "abababababababab");
    }

    #[test]
    fn test_content_hash_hex_roundtrip() {
        let original = ContentHash::of(b"<svg/>");
        let recovered = ContentHash::from_hex(&original.to_hex()).unwrap();
        assert_eq!(original, recovered);
        assert!(ContentHash::from_hex("abcd").is_none());
    }

    #[test]
    fn test_content_hash_serde_as_hex() {
        let hash = ContentHash::new([0x12; 32]);
        let json = serde_json::to_string(&hash).unwrap();
        assert_eq!(json, format!("\"{}\"", "12".repeat(32)));
        let back: ContentHash = serde_json::from_str(&json).unwrap();
        assert_eq!(back, hash);
        assert!(serde_json::from_str::<ContentHash>("\"zz\"").is_err());
    }

    #[test]
    fn test_fingerprint_field_boundaries() {
        let a = Fingerprint::new("t").field("ab").field("c").finish();
        let b = Fingerprint::new("t").field("a").field("bc").finish();
        assert_ne!(a, b);
    }

    #[test]
    fn test_fingerprint_optional() {
        let none = Fingerprint::new("t").optional(None).finish();
        let empty = Fingerprint::new("t").optional(Some("")).finish();
        assert_ne!(none, empty);
        let again = Fingerprint::new("t").optional(None).finish();
        assert_eq!(none, again);
    }
}
