//! Session: one configuration, its branches and matchings
//!
//! The [`Session`] owns the [`Configuration`]. Branches created through it
//! record the session's [`ConfigHandle`] instead of pointing back at the
//! configuration.

use std::collections::HashMap;
use std::fmt::{self, Display};
use std::sync::atomic::{AtomicU64, Ordering};

use atree_core::{BranchConfig, Configuration, Matching, SchemaError};
use indexmap::IndexMap;

use crate::branch::Branch;
use crate::error::BranchError;
use crate::store::{TreeReader, TreeWriter};

static NEXT_HANDLE: AtomicU64 = AtomicU64::new(1);

/// Identity of the session a branch belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConfigHandle(u64);

impl ConfigHandle {
    fn next() -> Self {
        Self(NEXT_HANDLE.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw handle value
    #[inline]
    #[must_use]
    pub fn get(self) -> u64 {
        self.0
    }
}

impl Display for ConfigHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "config#{}", self.0)
    }
}

/// Configuration registry and branch owner
#[derive(Debug)]
pub struct Session {
    handle: ConfigHandle,
    configuration: Configuration,
    branches: IndexMap<String, Branch>,
    matchings: HashMap<String, Matching>,
}

impl Session {
    /// Create an empty session
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_configuration(Configuration::new(name))
    }

    fn with_configuration(configuration: Configuration) -> Self {
        Self {
            handle: ConfigHandle::next(),
            configuration,
            branches: IndexMap::new(),
            matchings: HashMap::new(),
        }
    }

    /// Create a session with an empty branch for every schema in
    /// `configuration`, in id order
    ///
    /// Matchings are not restored; only their index entries are.
    #[must_use]
    pub fn from_configuration(configuration: Configuration) -> Self {
        let configs: Vec<BranchConfig> = configuration.branch_configs().values().cloned().collect();
        let mut session = Self::with_configuration(configuration);
        for config in configs {
            let mut branch = Branch::new(config);
            branch.set_parent_config(session.handle);
            session.branches.insert(branch.name().to_string(), branch);
        }
        session
    }

    /// Session identity
    #[inline]
    #[must_use]
    pub fn handle(&self) -> ConfigHandle {
        self.handle
    }

    /// Owned configuration
    #[inline]
    #[must_use]
    pub fn configuration(&self) -> &Configuration {
        &self.configuration
    }

    /* Branches */

    /// Register a schema and create its branch
    ///
    /// # Errors
    /// Returns [`SchemaError::DuplicateBranch`] if the id or name is taken
    pub fn add_branch(&mut self, config: BranchConfig) -> Result<&mut Branch, BranchError> {
        self.configuration.add_branch_config(config.clone())?;
        let mut branch = Branch::new(config);
        branch.set_parent_config(self.handle);
        Ok(self
            .branches
            .entry(branch.name().to_string())
            .or_insert(branch))
    }

    /// Branch called `name`
    ///
    /// # Errors
    /// Returns [`SchemaError::BranchNotFound`]
    pub fn branch(&self, name: &str) -> Result<&Branch, BranchError> {
        self.branches
            .get(name)
            .ok_or_else(|| SchemaError::BranchNotFound(name.to_string()).into())
    }

    /// Mutable branch called `name`
    ///
    /// # Errors
    /// Returns [`SchemaError::BranchNotFound`]
    pub fn branch_mut(&mut self, name: &str) -> Result<&mut Branch, BranchError> {
        self.branches
            .get_mut(name)
            .ok_or_else(|| SchemaError::BranchNotFound(name.to_string()).into())
    }

    /// Two distinct branches, the first mutable, for cross-branch copies
    ///
    /// # Errors
    /// Returns [`SchemaError::BranchNotFound`], or [`BranchError::SelfCopy`]
    /// if both names are equal
    pub fn branch_pair_mut(&mut self, target: &str, source: &str) -> Result<(&mut Branch, &Branch), BranchError> {
        if target == source {
            return Err(BranchError::SelfCopy(target.to_string()));
        }
        let target_index = self
            .branches
            .get_index_of(target)
            .ok_or_else(|| SchemaError::BranchNotFound(target.to_string()))?;
        let source_index = self
            .branches
            .get_index_of(source)
            .ok_or_else(|| SchemaError::BranchNotFound(source.to_string()))?;
        let (target, source) = if target_index < source_index {
            let (head, tail) = self.branches.as_mut_slice().split_at_mut(source_index);
            (&mut head[target_index], &tail[0])
        } else {
            let (head, tail) = self.branches.as_mut_slice().split_at_mut(target_index);
            (&mut tail[0], &head[source_index])
        };
        Ok((target, source))
    }

    /// All branches, in creation order
    pub fn branches(&self) -> impl Iterator<Item = &Branch> {
        self.branches.values()
    }

    /// Freeze a branch and record its final schema in the configuration
    ///
    /// # Errors
    /// Returns [`SchemaError::BranchNotFound`]
    pub fn freeze_branch(&mut self, name: &str) -> Result<(), BranchError> {
        let branch = self
            .branches
            .get_mut(name)
            .ok_or_else(|| SchemaError::BranchNotFound(name.to_string()))?;
        branch.freeze(true);
        *self.configuration.branch_config_by_name_mut(name)? = branch.config().clone();
        Ok(())
    }

    /* Matchings */

    /// Register a matching; returns its data branch name
    ///
    /// # Errors
    /// - [`SchemaError::BranchNotFound`] if a branch id is unknown
    /// - [`SchemaError::DuplicateMatch`] if the pair is registered
    /// - [`SchemaError::DuplicateDataBranch`] if another pair derives the
    ///   same data branch name
    ///
    /// Nothing is registered on error.
    pub fn add_matching(&mut self, matching: Matching) -> Result<String, BranchError> {
        let name = self.configuration.add_match(&matching)?;
        self.matchings.insert(name.clone(), matching);
        Ok(name)
    }

    /// Matching between two branches, in either order
    ///
    /// The flag is true when the pair was registered as `(br2, br1)`; the
    /// matching's inverted map then answers lookups from `br1`.
    ///
    /// # Errors
    /// Returns [`SchemaError::MatchNotFound`]
    pub fn matching(&self, br1: &str, br2: &str) -> Result<(&Matching, bool), BranchError> {
        let (name, reversed) = self.match_info(br1, br2)?;
        self.matchings
            .get(name)
            .map(|m| (m, reversed))
            .ok_or_else(|| not_matched(br1, br2))
    }

    /// Mutable matching between two branches, in either order
    ///
    /// # Errors
    /// Returns [`SchemaError::MatchNotFound`]
    pub fn matching_mut(&mut self, br1: &str, br2: &str) -> Result<(&mut Matching, bool), BranchError> {
        let (name, reversed) = self.match_info(br1, br2)?;
        let name = name.to_string();
        self.matchings
            .get_mut(&name)
            .map(|m| (m, reversed))
            .ok_or_else(|| not_matched(br1, br2))
    }

    /// Entry of `br2` matched to entry `index` of `br1`
    ///
    /// # Errors
    /// Returns [`SchemaError::MatchNotFound`] if the branches are not matched
    pub fn matched_index(&self, br1: &str, br2: &str, index: usize) -> Result<Option<usize>, BranchError> {
        let (matching, reversed) = self.matching(br1, br2)?;
        Ok(matching.match_for(index, reversed))
    }

    fn match_info(&self, br1: &str, br2: &str) -> Result<(&str, bool), BranchError> {
        self.configuration
            .match_info(br1, br2)
            .ok_or_else(|| not_matched(br1, br2))
    }

    /* Store connection */

    /// Attach every branch to an output store
    ///
    /// # Errors
    /// Returns the first store error
    pub fn connect_output(&mut self, tree: &mut dyn TreeWriter) -> Result<(), BranchError> {
        for branch in self.branches.values_mut() {
            branch.connect_output_tree(tree)?;
        }
        Ok(())
    }

    /// Write one entry for every branch
    ///
    /// # Errors
    /// Returns error if a branch is not connected to an output
    pub fn fill(&self, tree: &mut dyn TreeWriter) -> Result<(), BranchError> {
        for branch in self.branches.values() {
            branch.fill(tree)?;
        }
        Ok(())
    }

    /// Attach every branch the store holds; returns how many were attached
    ///
    /// # Errors
    /// Returns [`BranchError::KindMismatch`] if a stored kind differs
    pub fn connect_input(&mut self, tree: &dyn TreeReader) -> Result<usize, BranchError> {
        let mut connected = 0;
        for branch in self.branches.values_mut() {
            if !tree.has_branch(branch.name()) {
                tracing::debug!(branch = branch.name(), "not in input tree");
                continue;
            }
            branch.connect_input_tree(tree)?;
            connected += 1;
        }
        Ok(connected)
    }

    /// Load store entry `entry` into every input-connected branch
    ///
    /// # Errors
    /// Returns the first store error
    pub fn read_entry(&mut self, tree: &dyn TreeReader, entry: usize) -> Result<(), BranchError> {
        for branch in self.branches.values_mut() {
            if branch.is_connected_to_input() {
                branch.read_entry(tree, entry)?;
            }
        }
        Ok(())
    }
}

fn not_matched(br1: &str, br2: &str) -> BranchError {
    SchemaError::MatchNotFound {
        branch1: br1.to_string(),
        branch2: br2.to_string(),
    }
    .into()
}
