//! Error types for runtime branch operations

use atree_core::{BranchKind, FieldType, SchemaError};

use crate::store::StoreError;

/// Errors raised by branches, channels, sessions and tasks
#[derive(Debug, thiserror::Error)]
pub enum BranchError {
    /// Schema or configuration error
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// Operation forbidden in the branch's current frozen/mutable/connected state
    #[error("branch '{branch}': {message}")]
    BranchState {
        /// Branch name
        branch: String,
        /// What was violated
        message: String,
    },

    /// Field used before being resolved against a schema
    #[error("field '{field}' of branch '{branch}' is not resolved")]
    UnresolvedField {
        /// Branch the field names
        branch: String,
        /// Field name
        field: String,
    },

    /// Field resolved for another branch
    #[error("field '{field}' belongs to branch '{field_branch}', not '{branch}'")]
    ForeignField {
        /// Field name
        field: String,
        /// Branch the field was created for
        field_branch: String,
        /// Branch it was used on
        branch: String,
    },

    /// Value type does not match the field type
    #[error("field '{field}' has type {expected}, got {actual}")]
    TypeMismatch {
        /// Field name
        field: String,
        /// Declared type
        expected: FieldType,
        /// Supplied type
        actual: FieldType,
    },

    /// Collection kind does not match the branch kind
    #[error("branch '{branch}' stores {expected}, got {actual}")]
    KindMismatch {
        /// Branch name
        branch: String,
        /// Expected kind
        expected: BranchKind,
        /// Supplied kind
        actual: BranchKind,
    },

    /// Schemas differ where identical schemas are required
    #[error("schema of '{other}' differs from schema of '{branch}'")]
    SchemaMismatch {
        /// Destination branch
        branch: String,
        /// Source branch
        other: String,
    },

    /// A branch was asked to copy from itself
    #[error("branch '{0}' cannot copy its own contents")]
    SelfCopy(String),

    /// Entry index past the end of the collection
    #[error("branch '{branch}' has {len} entries, index {index} out of range")]
    ChannelOutOfRange {
        /// Branch name
        branch: String,
        /// Requested index
        index: usize,
        /// Number of entries
        len: usize,
    },

    /// Tree store error
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Pipeline task failure
    #[error("task '{task}' failed: {message}")]
    Task {
        /// Task name
        task: String,
        /// Failure description
        message: String,
    },
}

impl BranchError {
    pub(crate) fn state(branch: &str, message: impl Into<String>) -> Self {
        Self::BranchState {
            branch: branch.to_string(),
            message: message.into(),
        }
    }

    /// Check if error is a failed lookup
    #[inline]
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Schema(e) if e.is_not_found())
    }
}
