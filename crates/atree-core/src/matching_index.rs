//! Matching index and its persisted list form
//!
//! The runtime [`MatchingIndex`] maps an ordered branch pair to the name of
//! the branch storing their correspondence. It is persisted as a list of
//! [`MatchingConfig`] records and rebuilt on load; the two conversions below
//! are inverse to each other for duplicate-free inputs.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::SchemaError;

/// Ordered pair of branch names `(branch1, branch2)`
pub type BranchPair = (String, String);

/// Runtime index: ordered branch pair -> data branch name
pub type MatchingIndex = BTreeMap<BranchPair, String>;

/// Persisted record declaring that `data_branch` links `branch1` to `branch2`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MatchingConfig {
    branch1: String,
    branch2: String,
    data_branch: String,
}

impl MatchingConfig {
    /// Create a record
    #[inline]
    #[must_use]
    pub fn new(
        branch1: impl Into<String>,
        branch2: impl Into<String>,
        data_branch: impl Into<String>,
    ) -> Self {
        Self {
            branch1: branch1.into(),
            branch2: branch2.into(),
            data_branch: data_branch.into(),
        }
    }

    /// First branch name
    #[inline]
    #[must_use]
    pub fn first_branch(&self) -> &str {
        &self.branch1
    }

    /// Second branch name
    #[inline]
    #[must_use]
    pub fn second_branch(&self) -> &str {
        &self.branch2
    }

    /// Name of the branch holding the correspondence
    #[inline]
    #[must_use]
    pub fn data_branch(&self) -> &str {
        &self.data_branch
    }

    /// Index key of this record
    #[inline]
    #[must_use]
    pub fn key(&self) -> BranchPair {
        (self.branch1.clone(), self.branch2.clone())
    }
}

/// Conventional data branch name for a match, e.g. `event2track`
#[inline]
#[must_use]
pub fn data_branch_name(branch1: &str, branch2: &str) -> String {
    format!("{branch1}2{branch2}")
}

/// Insert one entry, rejecting an existing ordered pair or data branch
///
/// Data branch names are unique across the index: `("a", "b2c")` and
/// `("a2b", "c")` both derive `a2b2c`, and only the first may keep it.
///
/// # Errors
/// - [`SchemaError::DuplicateMatch`] if the ordered pair is registered
/// - [`SchemaError::DuplicateDataBranch`] if another pair owns the name
///
/// The index is left unchanged on error.
pub fn insert_match(
    index: &mut MatchingIndex,
    key: BranchPair,
    data_branch: String,
) -> Result<(), SchemaError> {
    if index.contains_key(&key) {
        return Err(SchemaError::duplicate_match(&key));
    }
    if let Some(((branch1, branch2), _)) = index.iter().find(|(_, name)| **name == data_branch) {
        return Err(SchemaError::DuplicateDataBranch {
            data_branch,
            branch1: branch1.clone(),
            branch2: branch2.clone(),
        });
    }
    index.insert(key, data_branch);
    Ok(())
}

/// Build the runtime index from persisted records
///
/// Pure: on failure nothing is returned, there is no partial index.
///
/// # Errors
/// Returns [`SchemaError::DuplicateMatch`] if two records share an ordered
/// pair, [`SchemaError::DuplicateDataBranch`] if they share a data branch
pub fn make_matching_index(matches: &[MatchingConfig]) -> Result<MatchingIndex, SchemaError> {
    let mut result = MatchingIndex::new();
    for record in matches {
        insert_match(&mut result, record.key(), record.data_branch.clone())?;
    }
    Ok(result)
}

/// Flatten the runtime index into persisted records (key order)
#[must_use]
pub fn make_match_configs_from_index(index: &MatchingIndex) -> Vec<MatchingConfig> {
    index
        .iter()
        .map(|((branch1, branch2), data_branch)| {
            MatchingConfig::new(branch1.clone(), branch2.clone(), data_branch.clone())
        })
        .collect()
}
