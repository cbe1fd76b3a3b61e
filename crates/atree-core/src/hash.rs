//! Schema hashing primitives
//!
//! Provides [`SchemaHash`], a 32-byte Blake3 digest summarizing a branch
//! schema, and [`name_hash`], the short identity hash of a branch name.

use std::fmt::{self, Display, Formatter};

/// A 32-byte schema hash (Blake3)
///
/// Two branches whose schemas hash equal can exchange entries verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SchemaHash([u8; 32]);

impl SchemaHash {
    /// Create a hash from raw bytes
    #[inline]
    #[must_use]
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Short string representation (first 16 hex chars), for logs
    #[inline]
    #[must_use]
    pub fn short(&self) -> String {
        hex::encode(&self.0[..8])
    }
}

impl Display for SchemaHash {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

/// Lightweight identity hash of a branch name
///
/// Stable across runs (first two bytes of the Blake3 digest), used where a
/// compact key is enough.
#[inline]
#[must_use]
pub fn name_hash(name: &str) -> u16 {
    let digest = blake3::hash(name.as_bytes());
    let bytes = digest.as_bytes();
    u16::from_le_bytes([bytes[0], bytes[1]])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BranchConfig, BranchKind, FieldType};

    #[test]
    fn display_is_full_hex() {
        let hash = SchemaHash::new([0xab; 32]);
        assert_eq!(hash.to_string(), "ab".repeat(32));
        assert_eq!(hash.short(), "ab".repeat(8));
    }

    #[test]
    fn schema_hash_follows_fields() {
        let mut config = BranchConfig::new("tracks", 1, BranchKind::Track);
        let before = config.schema_hash();
        assert_eq!(before, config.clone().schema_hash());
        config.add_field("chi2", FieldType::Float, "").unwrap();
        let after = config.schema_hash();
        assert_ne!(before, after);
        assert!(after.to_string().starts_with(&after.short()));
    }

    #[test]
    fn name_hash_stable() {
        assert_eq!(name_hash("event"), name_hash("event"));
        let digest = blake3::hash(b"track");
        assert_eq!(
            name_hash("track"),
            u16::from_le_bytes([digest.as_bytes()[0], digest.as_bytes()[1]])
        );
    }
}
