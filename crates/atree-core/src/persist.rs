//! Persisted configuration forms
//!
//! Two shapes exist on disk, distinguished by a `schema_version` tag:
//! - version 3 ([`ConfigurationV3`]) stores the matching index directly
//! - version 4 ([`ConfigurationRecord`]) stores a list of [`MatchingConfig`]
//!   and the index is rebuilt on load
//!
//! Loading picks the conversion by version only; saving always writes
//! version 4.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::branch_config::BranchConfig;
use crate::configuration::Configuration;
use crate::error::SchemaError;
use crate::matching_index::{make_match_configs_from_index, make_matching_index, MatchingConfig, MatchingIndex};

/// Current schema version written by [`Configuration`]
pub const CURRENT_SCHEMA_VERSION: u32 = 4;

/// Version 4 record: match list, index not persisted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigurationRecord {
    /// Configuration name
    pub name: String,
    /// Branch schemas keyed by id
    #[serde(default, with = "id_keyed")]
    pub branches: BTreeMap<usize, BranchConfig>,
    /// Match list (order not significant)
    #[serde(default)]
    pub matches: Vec<MatchingConfig>,
}

/// Version 3 record: matching index stored directly
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigurationV3 {
    /// Configuration name
    pub name: String,
    /// Branch schemas keyed by id
    #[serde(default, with = "id_keyed")]
    pub branches: BTreeMap<usize, BranchConfig>,
    /// Ordered pair -> data branch
    #[serde(default, with = "pair_keyed")]
    pub matches: MatchingIndex,
}

/// Any supported persisted form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "schema_version")]
pub enum PersistedConfiguration {
    /// Legacy form
    #[serde(rename = "3")]
    V3(ConfigurationV3),
    /// Current form
    #[serde(rename = "4")]
    V4(ConfigurationRecord),
}

impl PersistedConfiguration {
    /// Schema version of this form
    #[inline]
    #[must_use]
    pub fn version(&self) -> u32 {
        match self {
            Self::V3(_) => 3,
            Self::V4(_) => CURRENT_SCHEMA_VERSION,
        }
    }

    /// Convert into the runtime configuration
    ///
    /// # Errors
    /// Returns [`SchemaError::DuplicateMatch`] if a version 4 list repeats a
    /// pair, [`SchemaError::DuplicateDataBranch`] if two pairs share a data
    /// branch, or a branch error if the branch table is inconsistent
    pub fn into_configuration(self) -> Result<Configuration, SchemaError> {
        match self {
            Self::V3(v3) => Configuration::from_parts(v3.name, v3.branches, v3.matches),
            Self::V4(record) => {
                let index = make_matching_index(&record.matches)?;
                Configuration::from_parts(record.name, record.branches, index)
            }
        }
    }
}

impl From<Configuration> for PersistedConfiguration {
    fn from(config: Configuration) -> Self {
        let (name, branches, index) = config.into_parts();
        Self::V4(ConfigurationRecord {
            name,
            branches,
            matches: make_match_configs_from_index(&index),
        })
    }
}

impl TryFrom<PersistedConfiguration> for Configuration {
    type Error = SchemaError;

    fn try_from(persisted: PersistedConfiguration) -> Result<Self, Self::Error> {
        persisted.into_configuration()
    }
}

impl Configuration {
    /// Legacy (version 3) form of this configuration
    #[must_use]
    pub fn to_legacy(&self) -> ConfigurationV3 {
        ConfigurationV3 {
            name: self.name().to_string(),
            branches: self.branch_configs().clone(),
            matches: self.matches().clone(),
        }
    }

    /// Load from the legacy (version 3) form
    ///
    /// # Errors
    /// Returns error if the branch table is inconsistent
    pub fn from_legacy(legacy: ConfigurationV3) -> Result<Self, SchemaError> {
        PersistedConfiguration::V3(legacy).into_configuration()
    }
}

/// Serde adapter for maps keyed by branch id
///
/// Text formats write integer map keys as strings; reading accepts both so
/// the records also load through the tagged (buffered) enum path.
mod id_keyed {
    use serde::de::{self, Visitor};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::collections::BTreeMap;
    use std::fmt;

    use crate::branch_config::BranchConfig;

    #[derive(PartialEq, Eq, PartialOrd, Ord)]
    struct BranchId(usize);

    impl<'de> Deserialize<'de> for BranchId {
        fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
        where
            D: Deserializer<'de>,
        {
            struct BranchIdVisitor;

            impl Visitor<'_> for BranchIdVisitor {
                type Value = BranchId;

                fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
                    formatter.write_str("a branch id as integer or decimal string")
                }

                fn visit_u64<E: de::Error>(self, value: u64) -> Result<Self::Value, E> {
                    usize::try_from(value).map(BranchId).map_err(E::custom)
                }

                fn visit_i64<E: de::Error>(self, value: i64) -> Result<Self::Value, E> {
                    usize::try_from(value).map(BranchId).map_err(E::custom)
                }

                fn visit_str<E: de::Error>(self, value: &str) -> Result<Self::Value, E> {
                    value.parse().map(BranchId).map_err(E::custom)
                }
            }

            deserializer.deserialize_any(BranchIdVisitor)
        }
    }

    pub(super) fn serialize<S>(
        branches: &BTreeMap<usize, BranchConfig>,
        serializer: S,
    ) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        branches.serialize(serializer)
    }

    pub(super) fn deserialize<'de, D>(deserializer: D) -> Result<BTreeMap<usize, BranchConfig>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = BTreeMap::<BranchId, BranchConfig>::deserialize(deserializer)?;
        Ok(raw.into_iter().map(|(id, branch)| (id.0, branch)).collect())
    }
}

/// Serde adapter for maps keyed by a branch pair
///
/// JSON object keys must be strings, so the map is written as a list of
/// `[[branch1, branch2], data_branch]` entries.
mod pair_keyed {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    use crate::matching_index::{BranchPair, MatchingIndex};

    pub(super) fn serialize<S>(index: &MatchingIndex, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_seq(index.iter())
    }

    pub(super) fn deserialize<'de, D>(deserializer: D) -> Result<MatchingIndex, D::Error>
    where
        D: Deserializer<'de>,
    {
        let entries = Vec::<(BranchPair, String)>::deserialize(deserializer)?;
        let mut index = MatchingIndex::new();
        for (key, data_branch) in entries {
            if index.contains_key(&key) {
                return Err(D::Error::custom(format!(
                    "duplicate match entry for ('{}', '{}')",
                    key.0, key.1
                )));
            }
            index.insert(key, data_branch);
        }
        Ok(index)
    }
}
