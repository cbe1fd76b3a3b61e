//! Session-wide configuration
//!
//! Provides [`Configuration`]: the branch schemas of one analysis session,
//! keyed by branch id, and the matching index answering "which branch links
//! branch A to branch B, and in which direction".

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};

use crate::branch_config::BranchConfig;
use crate::error::SchemaError;
use crate::matching::Matching;
use crate::matching_index::{
    data_branch_name, insert_match, make_match_configs_from_index, BranchPair, MatchingConfig,
    MatchingIndex,
};
use crate::persist::PersistedConfiguration;

/// Branch schemas and matching index of one analysis session
///
/// Serializes as the current persisted form (match list); deserializes from
/// either the current or the legacy form, rebuilding the index on load.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "PersistedConfiguration", try_from = "PersistedConfiguration")]
pub struct Configuration {
    name: String,
    branches: BTreeMap<usize, BranchConfig>,
    matches_index: MatchingIndex,
}

impl Configuration {
    /// Create an empty configuration
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            branches: BTreeMap::new(),
            matches_index: MatchingIndex::new(),
        }
    }

    /// Assemble a configuration from persisted parts, re-validating every branch
    pub(crate) fn from_parts(
        name: String,
        branches: BTreeMap<usize, BranchConfig>,
        matches_index: MatchingIndex,
    ) -> Result<Self, SchemaError> {
        let mut config = Self::new(name);
        for (key, branch) in branches {
            if key != branch.id() {
                return Err(SchemaError::Persistence(format!(
                    "branch '{}' stored under id {key} but declares id {}",
                    branch.name(),
                    branch.id()
                )));
            }
            config.add_branch_config(branch)?;
        }
        for (key, data_branch) in matches_index {
            insert_match(&mut config.matches_index, key, data_branch)?;
        }
        Ok(config)
    }

    /// Configuration name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Register a branch schema under its id
    ///
    /// # Errors
    /// Returns [`SchemaError::DuplicateBranch`] if the id or the name is taken
    pub fn add_branch_config(&mut self, branch: BranchConfig) -> Result<(), SchemaError> {
        if self.branches.contains_key(&branch.id()) {
            return Err(SchemaError::DuplicateBranch {
                what: format!("id {}", branch.id()),
            });
        }
        if self.branches.values().any(|b| b.name() == branch.name()) {
            return Err(SchemaError::DuplicateBranch {
                what: format!("name '{}'", branch.name()),
            });
        }
        tracing::debug!(branch = branch.name(), id = branch.id(), kind = %branch.kind(), "branch config added");
        self.branches.insert(branch.id(), branch);
        Ok(())
    }

    /// Schema of branch `id`
    ///
    /// # Errors
    /// Returns [`SchemaError::BranchNotFound`]
    pub fn branch_config(&self, id: usize) -> Result<&BranchConfig, SchemaError> {
        self.branches
            .get(&id)
            .ok_or_else(|| SchemaError::BranchNotFound(format!("id = {id}")))
    }

    /// Schema of the branch called `name`
    ///
    /// # Errors
    /// Returns [`SchemaError::BranchNotFound`]
    pub fn branch_config_by_name(&self, name: &str) -> Result<&BranchConfig, SchemaError> {
        self.branches
            .values()
            .find(|b| b.name() == name)
            .ok_or_else(|| SchemaError::BranchNotFound(name.to_string()))
    }

    /// Mutable schema of the branch called `name`
    ///
    /// # Errors
    /// Returns [`SchemaError::BranchNotFound`]
    pub fn branch_config_by_name_mut(&mut self, name: &str) -> Result<&mut BranchConfig, SchemaError> {
        self.branches
            .values_mut()
            .find(|b| b.name() == name)
            .ok_or_else(|| SchemaError::BranchNotFound(name.to_string()))
    }

    /// All branch schemas keyed by id
    #[inline]
    #[must_use]
    pub fn branch_configs(&self) -> &BTreeMap<usize, BranchConfig> {
        &self.branches
    }

    /// Number of registered branches
    #[inline]
    #[must_use]
    pub fn number_of_branches(&self) -> usize {
        self.branches.len()
    }

    /// Register the correspondence stored by `matching`
    ///
    /// The pair is derived from the matching's branch ids and the data
    /// branch is named `{branch1}2{branch2}`. Returns that name.
    ///
    /// # Errors
    /// - [`SchemaError::BranchNotFound`] if either branch id is unknown
    /// - [`SchemaError::DuplicateMatch`] if the ordered pair is registered
    /// - [`SchemaError::DuplicateDataBranch`] if the derived name is taken
    pub fn add_match(&mut self, matching: &Matching) -> Result<String, SchemaError> {
        let branch1 = self.branch_config(matching.branch1_id())?.name().to_string();
        let branch2 = self.branch_config(matching.branch2_id())?.name().to_string();
        let data_branch = data_branch_name(&branch1, &branch2);
        self.add_match_config(MatchingConfig::new(branch1, branch2, data_branch.clone()))?;
        Ok(data_branch)
    }

    /// Register a correspondence from a persisted record
    ///
    /// # Errors
    /// Returns [`SchemaError::DuplicateMatch`] or
    /// [`SchemaError::DuplicateDataBranch`]; the existing entry is kept
    pub fn add_match_config(&mut self, record: MatchingConfig) -> Result<(), SchemaError> {
        insert_match(
            &mut self.matches_index,
            record.key(),
            record.data_branch().to_string(),
        )?;
        tracing::debug!(
            branch1 = record.first_branch(),
            branch2 = record.second_branch(),
            data_branch = record.data_branch(),
            "match registered"
        );
        Ok(())
    }

    /// Data branch linking `br1` and `br2`, in either order
    ///
    /// Returns `(name, false)` if `(br1, br2)` is stored, `(name, true)` if
    /// only `(br2, br1)` is: the stored correspondence must then be read in
    /// the inverted direction. Returns `None` if neither is stored.
    #[must_use]
    pub fn match_info(&self, br1: &str, br2: &str) -> Option<(&str, bool)> {
        let direct: BranchPair = (br1.to_string(), br2.to_string());
        if let Some(name) = self.matches_index.get(&direct) {
            return Some((name.as_str(), false));
        }
        let swapped: BranchPair = (br2.to_string(), br1.to_string());
        self.matches_index
            .get(&swapped)
            .map(|name| (name.as_str(), true))
    }

    /// Data branch name linking `br1` and `br2`, in either order
    ///
    /// # Errors
    /// Returns [`SchemaError::MatchNotFound`]
    pub fn match_name(&self, br1: &str, br2: &str) -> Result<&str, SchemaError> {
        self.match_info(br1, br2)
            .map(|(name, _)| name)
            .ok_or_else(|| SchemaError::MatchNotFound {
                branch1: br1.to_string(),
                branch2: br2.to_string(),
            })
    }

    /// Runtime matching index
    #[inline]
    #[must_use]
    pub fn matches(&self) -> &MatchingIndex {
        &self.matches_index
    }

    /// Matching index as persisted records
    #[inline]
    #[must_use]
    pub fn match_configs(&self) -> Vec<MatchingConfig> {
        make_match_configs_from_index(&self.matches_index)
    }

    /// Parse from JSON (either schema version)
    ///
    /// # Errors
    /// Returns error if JSON is invalid or the content fails validation
    pub fn from_json(json: &str) -> Result<Self, SchemaError> {
        serde_json::from_str::<PersistedConfiguration>(json)?.into_configuration()
    }

    /// Serialize to pretty JSON (current schema version)
    ///
    /// # Errors
    /// Returns error if serialization fails
    pub fn to_json(&self) -> Result<String, SchemaError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse from YAML (either schema version)
    ///
    /// # Errors
    /// Returns error if YAML is invalid or the content fails validation
    pub fn from_yaml(yaml: &str) -> Result<Self, SchemaError> {
        serde_yaml::from_str::<PersistedConfiguration>(yaml)?.into_configuration()
    }

    /// Serialize to YAML (current schema version)
    ///
    /// # Errors
    /// Returns error if serialization fails
    pub fn to_yaml(&self) -> Result<String, SchemaError> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub(crate) fn into_parts(self) -> (String, BTreeMap<usize, BranchConfig>, MatchingIndex) {
        (self.name, self.branches, self.matches_index)
    }
}

impl Display for Configuration {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "Configuration '{}'", self.name)?;
        for branch in self.branches.values() {
            write!(f, "{branch}")?;
        }
        if !self.matches_index.is_empty() {
            writeln!(f, "Matches:")?;
            for ((branch1, branch2), data_branch) in &self.matches_index {
                writeln!(f, "  {branch1} -> {branch2}: {data_branch}")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::branch_config::BranchKind;

    fn session() -> Configuration {
        let mut config = Configuration::new("test");
        config
            .add_branch_config(BranchConfig::new("event", 0, BranchKind::EventHeader))
            .unwrap();
        config
            .add_branch_config(BranchConfig::new("track", 1, BranchKind::Track))
            .unwrap();
        config
            .add_branch_config(BranchConfig::new("sim", 2, BranchKind::Particle))
            .unwrap();
        config
    }

    #[test]
    fn duplicate_branch_id_rejected() {
        let mut config = session();
        let err = config
            .add_branch_config(BranchConfig::new("other", 1, BranchKind::Hit))
            .unwrap_err();
        assert!(matches!(err, SchemaError::DuplicateBranch { .. }));
        assert_eq!(config.branch_config(1).unwrap().name(), "track");
    }

    #[test]
    fn duplicate_branch_name_rejected() {
        let mut config = session();
        let err = config
            .add_branch_config(BranchConfig::new("track", 9, BranchKind::Track))
            .unwrap_err();
        assert!(matches!(err, SchemaError::DuplicateBranch { .. }));
        assert_eq!(config.number_of_branches(), 3);
    }

    #[test]
    fn lookup_by_name_and_id() {
        let config = session();
        assert_eq!(config.branch_config_by_name("sim").unwrap().id(), 2);
        assert!(matches!(
            config.branch_config(42),
            Err(SchemaError::BranchNotFound(_))
        ));
        assert!(config.branch_config_by_name("nope").unwrap_err().is_not_found());
    }

    #[test]
    fn add_match_derives_names() {
        let mut config = session();
        let name = config.add_match(&Matching::new(1, 2)).unwrap();
        assert_eq!(name, "track2sim");
        assert_eq!(config.match_info("track", "sim"), Some(("track2sim", false)));
        assert_eq!(config.match_info("sim", "track"), Some(("track2sim", true)));
        assert_eq!(config.match_info("event", "sim"), None);
    }

    #[test]
    fn add_match_unknown_branch() {
        let mut config = session();
        let err = config.add_match(&Matching::new(1, 7)).unwrap_err();
        assert!(matches!(err, SchemaError::BranchNotFound(_)));
        assert!(config.matches().is_empty());
    }

    #[test]
    fn match_name_either_direction() {
        let mut config = session();
        config
            .add_match_config(MatchingConfig::new("event", "track", "event2track"))
            .unwrap();
        assert_eq!(config.match_name("event", "track").unwrap(), "event2track");
        assert_eq!(config.match_name("track", "event").unwrap(), "event2track");
        assert!(matches!(
            config.match_name("event", "sim"),
            Err(SchemaError::MatchNotFound { .. })
        ));
    }

    #[test]
    fn display_lists_branches_and_matches() {
        let mut config = session();
        config.add_match(&Matching::new(0, 1)).unwrap();
        let text = config.to_string();
        assert!(text.contains("Configuration 'test'"));
        assert!(text.contains("Branch track (id=1, kind=Track)"));
        assert!(text.contains("event -> track: event2track"));
    }

    #[derive(Clone, Default)]
    struct LogBuffer(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn rejected_match_is_not_logged() {
        let logs = LogBuffer::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();

        let mut config = session();
        tracing::subscriber::with_default(subscriber, || {
            config
                .add_match_config(MatchingConfig::new("event", "track", "event2track"))
                .unwrap();
            config
                .add_match_config(MatchingConfig::new("event", "track", "rejected"))
                .unwrap_err();
            config
                .add_match_config(MatchingConfig::new("track", "sim", "event2track"))
                .unwrap_err();
        });

        let output = String::from_utf8(logs.0.lock().unwrap().clone()).unwrap();
        assert_eq!(output.matches("match registered").count(), 1);
        assert!(!output.contains("rejected"));
        assert!(!output.contains("sim"));
    }
}
