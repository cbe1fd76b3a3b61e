//! Entry-to-entry correspondence between two branches

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Correspondence between entries of two branches
///
/// Both directions are kept: `direct` maps entries of the first branch to
/// the second, `inverted` maps back. A lookup flagged as reversed by
/// [`crate::Configuration::match_info`] reads the inverted map.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Matching {
    branch1_id: usize,
    branch2_id: usize,
    direct: BTreeMap<usize, usize>,
    inverted: BTreeMap<usize, usize>,
}

impl Matching {
    /// Create an empty matching between branches `branch1_id` and `branch2_id`
    #[inline]
    #[must_use]
    pub fn new(branch1_id: usize, branch2_id: usize) -> Self {
        Self {
            branch1_id,
            branch2_id,
            direct: BTreeMap::new(),
            inverted: BTreeMap::new(),
        }
    }

    /// Id of the first branch
    #[inline]
    #[must_use]
    pub fn branch1_id(&self) -> usize {
        self.branch1_id
    }

    /// Id of the second branch
    #[inline]
    #[must_use]
    pub fn branch2_id(&self) -> usize {
        self.branch2_id
    }

    /// Record that entry `index1` of the first branch corresponds to entry
    /// `index2` of the second
    ///
    /// A later call for the same entry replaces the earlier pairing in both
    /// directions.
    pub fn add_match(&mut self, index1: usize, index2: usize) {
        if let Some(old2) = self.direct.insert(index1, index2) {
            self.inverted.remove(&old2);
        }
        if let Some(old1) = self.inverted.insert(index2, index1) {
            if old1 != index1 {
                self.direct.remove(&old1);
            }
        }
    }

    /// Matched entry for `index`, reading the inverted map when `reversed`
    #[inline]
    #[must_use]
    pub fn match_for(&self, index: usize, reversed: bool) -> Option<usize> {
        self.matches(reversed).get(&index).copied()
    }

    /// One direction of the correspondence
    #[inline]
    #[must_use]
    pub fn matches(&self, reversed: bool) -> &BTreeMap<usize, usize> {
        if reversed {
            &self.inverted
        } else {
            &self.direct
        }
    }

    /// Number of matched pairs
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.direct.len()
    }

    /// Check if no pair is recorded
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.direct.is_empty()
    }

    /// Drop all pairs (between events)
    pub fn clear(&mut self) {
        self.direct.clear();
        self.inverted.clear();
    }
}
