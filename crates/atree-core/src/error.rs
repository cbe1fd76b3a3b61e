//! Error types for schema and configuration handling

/// Errors raised while building, querying or persisting a configuration
///
/// All variants are reported at the call that triggers them. None of them is
/// retryable without changing the schema first.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    /// A branch with the same id or name is already registered
    #[error("duplicate branch: {what}")]
    DuplicateBranch {
        /// Human readable identity of the clashing branch
        what: String,
    },

    /// The ordered branch pair already has a registered correspondence
    #[error("match between '{branch1}' and '{branch2}' already registered")]
    DuplicateMatch {
        /// First branch of the pair
        branch1: String,
        /// Second branch of the pair
        branch2: String,
    },

    /// Another pair already stores its correspondence in this data branch
    #[error("data branch '{data_branch}' already used by match '{branch1}' -> '{branch2}'")]
    DuplicateDataBranch {
        /// Clashing data branch name
        data_branch: String,
        /// First branch of the pair that owns the name
        branch1: String,
        /// Second branch of the pair that owns the name
        branch2: String,
    },

    /// No correspondence exists in either direction
    #[error("no match between '{branch1}' and '{branch2}'")]
    MatchNotFound {
        /// First branch of the query
        branch1: String,
        /// Second branch of the query
        branch2: String,
    },

    /// Branch lookup failed
    #[error("branch not found: {0}")]
    BranchNotFound(String),

    /// Field name already declared in the branch schema
    #[error("field '{field}' already exists in branch '{branch}'")]
    DuplicateField {
        /// Branch whose schema was being extended
        branch: String,
        /// Clashing field name
        field: String,
    },

    /// Field name absent from the branch schema
    #[error("field '{field}' not found in branch '{branch}'")]
    FieldNotFound {
        /// Branch that was searched
        branch: String,
        /// Missing field name
        field: String,
    },

    /// The per-type field id range of a branch is exhausted
    #[error("too many {field_type} fields in branch '{branch}'")]
    TooManyFields {
        /// Branch whose schema was being extended
        branch: String,
        /// Type whose id range ran out
        field_type: crate::FieldType,
    },

    /// Reading or writing a persisted configuration failed
    #[error("persistence error: {0}")]
    Persistence(String),
}

impl SchemaError {
    /// Check if error is a failed lookup (as opposed to a conflicting insert)
    #[inline]
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::MatchNotFound { .. } | Self::BranchNotFound(_) | Self::FieldNotFound { .. }
        )
    }

    pub(crate) fn duplicate_match(pair: &(String, String)) -> Self {
        Self::DuplicateMatch {
            branch1: pair.0.clone(),
            branch2: pair.1.clone(),
        }
    }
}

impl From<serde_json::Error> for SchemaError {
    fn from(err: serde_json::Error) -> Self {
        Self::Persistence(err.to_string())
    }
}

impl From<serde_yaml::Error> for SchemaError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Persistence(err.to_string())
    }
}
