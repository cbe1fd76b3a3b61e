//! Tree store collaborators
//!
//! Branches are written to and read from a store one entry at a time. Each
//! store entry holds the full collection of every attached branch. The
//! traits keep the byte format out of this crate; [`MemoryTree`] keeps
//! entries in memory and serializes to JSON.

use atree_core::{BranchConfig, BranchKind};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::data::BranchData;

/// Errors raised by tree stores
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StoreError {
    /// Branch not attached to the store
    #[error("branch '{0}' is not stored")]
    UnknownBranch(String),

    /// Entry index past the stored entries
    #[error("branch '{branch}' has {len} stored entries, entry {entry} out of range")]
    EntryOutOfRange {
        /// Branch name
        branch: String,
        /// Requested entry
        entry: usize,
        /// Stored entries
        len: usize,
    },

    /// Stored kind does not match the branch kind
    #[error("branch '{branch}' is stored as {actual}, expected {expected}")]
    KindMismatch {
        /// Branch name
        branch: String,
        /// Kind of the branch
        expected: BranchKind,
        /// Kind found in the store
        actual: BranchKind,
    },

    /// Store could not be encoded or decoded
    #[error("serialization failed: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

/// Output side of a tree store
pub trait TreeWriter {
    /// Register a branch; attaching the same name and kind twice is a no-op
    ///
    /// # Errors
    /// Returns [`StoreError::KindMismatch`] if the name is stored with
    /// another kind
    fn attach(&mut self, config: &BranchConfig) -> Result<(), StoreError>;

    /// Append one entry for `branch`
    ///
    /// # Errors
    /// Returns [`StoreError::UnknownBranch`] if `branch` was not attached
    fn write_entry(&mut self, branch: &str, data: &BranchData) -> Result<(), StoreError>;
}

/// Input side of a tree store
pub trait TreeReader {
    /// Check if `branch` is stored
    fn has_branch(&self, branch: &str) -> bool;

    /// Kind stored for `branch`
    ///
    /// # Errors
    /// Returns [`StoreError::UnknownBranch`]
    fn branch_kind(&self, branch: &str) -> Result<BranchKind, StoreError>;

    /// Number of entries stored for `branch`
    ///
    /// # Errors
    /// Returns [`StoreError::UnknownBranch`]
    fn entries(&self, branch: &str) -> Result<usize, StoreError>;

    /// Number of entries readable for every stored branch
    fn num_entries(&self) -> usize;

    /// Copy of entry `entry` of `branch`
    ///
    /// # Errors
    /// Returns [`StoreError::UnknownBranch`] or [`StoreError::EntryOutOfRange`]
    fn read_entry(&self, branch: &str, entry: usize) -> Result<BranchData, StoreError>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct StoredBranch {
    kind: BranchKind,
    entries: Vec<BranchData>,
}

/// In-memory tree store
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryTree {
    branches: IndexMap<String, StoredBranch>,
}

impl MemoryTree {
    /// Create an empty store
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stored branch names, in attach order
    pub fn branch_names(&self) -> impl Iterator<Item = &str> {
        self.branches.keys().map(String::as_str)
    }

    /// Encode the whole store as JSON
    ///
    /// # Errors
    /// Returns [`StoreError::Serialization`]
    pub fn to_json(&self) -> Result<String, StoreError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decode a store written by [`MemoryTree::to_json`]
    ///
    /// # Errors
    /// Returns [`StoreError::Serialization`]
    pub fn from_json(json: &str) -> Result<Self, StoreError> {
        Ok(serde_json::from_str(json)?)
    }

    fn stored(&self, branch: &str) -> Result<&StoredBranch, StoreError> {
        self.branches
            .get(branch)
            .ok_or_else(|| StoreError::UnknownBranch(branch.to_string()))
    }
}

impl TreeWriter for MemoryTree {
    fn attach(&mut self, config: &BranchConfig) -> Result<(), StoreError> {
        if let Some(stored) = self.branches.get(config.name()) {
            if stored.kind != config.kind() {
                return Err(StoreError::KindMismatch {
                    branch: config.name().to_string(),
                    expected: config.kind(),
                    actual: stored.kind,
                });
            }
            return Ok(());
        }
        self.branches.insert(
            config.name().to_string(),
            StoredBranch {
                kind: config.kind(),
                entries: Vec::new(),
            },
        );
        Ok(())
    }

    fn write_entry(&mut self, branch: &str, data: &BranchData) -> Result<(), StoreError> {
        let stored = self
            .branches
            .get_mut(branch)
            .ok_or_else(|| StoreError::UnknownBranch(branch.to_string()))?;
        if stored.kind != data.kind() {
            return Err(StoreError::KindMismatch {
                branch: branch.to_string(),
                expected: stored.kind,
                actual: data.kind(),
            });
        }
        stored.entries.push(data.clone());
        Ok(())
    }
}

impl TreeReader for MemoryTree {
    fn has_branch(&self, branch: &str) -> bool {
        self.branches.contains_key(branch)
    }

    fn branch_kind(&self, branch: &str) -> Result<BranchKind, StoreError> {
        self.stored(branch).map(|s| s.kind)
    }

    fn entries(&self, branch: &str) -> Result<usize, StoreError> {
        self.stored(branch).map(|s| s.entries.len())
    }

    fn num_entries(&self) -> usize {
        self.branches
            .values()
            .map(|s| s.entries.len())
            .min()
            .unwrap_or(0)
    }

    fn read_entry(&self, branch: &str, entry: usize) -> Result<BranchData, StoreError> {
        let stored = self.stored(branch)?;
        stored
            .entries
            .get(entry)
            .cloned()
            .ok_or_else(|| StoreError::EntryOutOfRange {
                branch: branch.to_string(),
                entry,
                len: stored.entries.len(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracks_config() -> BranchConfig {
        BranchConfig::new("tracks", 1, BranchKind::Track)
    }

    #[test]
    fn attach_is_idempotent_per_kind() {
        let mut tree = MemoryTree::new();
        tree.attach(&tracks_config()).unwrap();
        tree.attach(&tracks_config()).unwrap();
        assert_eq!(tree.branch_names().collect::<Vec<_>>(), vec!["tracks"]);

        let err = tree
            .attach(&BranchConfig::new("tracks", 1, BranchKind::Hit))
            .unwrap_err();
        assert!(matches!(err, StoreError::KindMismatch { .. }));
    }

    #[test]
    fn write_requires_attach_and_kind() {
        let mut tree = MemoryTree::new();
        let data = BranchData::new(BranchKind::Track, 1);
        assert_eq!(
            tree.write_entry("tracks", &data),
            Err(StoreError::UnknownBranch("tracks".into()))
        );

        tree.attach(&tracks_config()).unwrap();
        tree.write_entry("tracks", &data).unwrap();
        let hits = BranchData::new(BranchKind::Hit, 1);
        assert!(matches!(
            tree.write_entry("tracks", &hits),
            Err(StoreError::KindMismatch { .. })
        ));
        assert_eq!(tree.entries("tracks").unwrap(), 1);
    }

    #[test]
    fn read_back_entries() {
        let mut tree = MemoryTree::new();
        tree.attach(&tracks_config()).unwrap();
        let data = BranchData::new(BranchKind::Track, 1);
        tree.write_entry("tracks", &data).unwrap();

        assert!(tree.has_branch("tracks"));
        assert_eq!(tree.branch_kind("tracks").unwrap(), BranchKind::Track);
        assert_eq!(tree.read_entry("tracks", 0).unwrap(), data);
        assert!(matches!(
            tree.read_entry("tracks", 1),
            Err(StoreError::EntryOutOfRange { entry: 1, len: 1, .. })
        ));
        assert!(matches!(tree.entries("hits"), Err(StoreError::UnknownBranch(_))));
    }

    #[test]
    fn num_entries_is_shortest_branch() {
        let mut tree = MemoryTree::new();
        assert_eq!(tree.num_entries(), 0);
        tree.attach(&tracks_config()).unwrap();
        tree.attach(&BranchConfig::new("event", 0, BranchKind::EventHeader))
            .unwrap();
        let tracks = BranchData::new(BranchKind::Track, 1);
        tree.write_entry("tracks", &tracks).unwrap();
        tree.write_entry("tracks", &tracks).unwrap();
        tree.write_entry("event", &BranchData::new(BranchKind::EventHeader, 0))
            .unwrap();
        assert_eq!(tree.num_entries(), 1);
    }

    #[test]
    fn json_roundtrip() {
        let mut tree = MemoryTree::new();
        tree.attach(&tracks_config()).unwrap();
        tree.write_entry("tracks", &BranchData::new(BranchKind::Track, 1))
            .unwrap();
        let back = MemoryTree::from_json(&tree.to_json().unwrap()).unwrap();
        assert_eq!(back, tree);
        assert!(matches!(MemoryTree::from_json("{"), Err(StoreError::Serialization(_))));
    }
}
