//! ATree Core
//!
//! Branch schemas, the session configuration and the cross-branch matching
//! index.
//!
//! # Core Concepts
//!
//! - [`BranchConfig`]: schema of one branch (name, id, entity kind, fields)
//! - [`SchemaHash`]: Blake3 summary of a schema for compatibility checks
//! - [`Configuration`]: all branch schemas of a session plus the matching index
//! - [`MatchingIndex`] / [`MatchingConfig`]: runtime map and persisted list
//!   forms of the branch-pair index
//! - [`Matching`]: entry-to-entry correspondence between two branches
//!
//! # Example
//!
//! ```rust
//! use atree_core::{BranchConfig, BranchKind, Configuration, Matching};
//!
//! let mut config = Configuration::new("session");
//! config.add_branch_config(BranchConfig::new("event", 0, BranchKind::EventHeader)).unwrap();
//! config.add_branch_config(BranchConfig::new("track", 1, BranchKind::Track)).unwrap();
//!
//! let name = config.add_match(&Matching::new(0, 1)).unwrap();
//! assert_eq!(name, "event2track");
//! assert_eq!(config.match_info("track", "event"), Some(("event2track", true)));
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod branch_config;
mod configuration;
mod error;
mod field_type;
mod hash;
mod matching;
mod matching_index;
mod persist;

// Re-exports
pub use branch_config::{BranchConfig, BranchKind, BuiltinField, FieldSpec};
pub use configuration::Configuration;
pub use error::SchemaError;
pub use field_type::{FieldType, FieldValue};
pub use hash::{name_hash, SchemaHash};
pub use matching::Matching;
pub use matching_index::{
    data_branch_name, insert_match, make_match_configs_from_index, make_matching_index, BranchPair,
    MatchingConfig, MatchingIndex,
};
pub use persist::{ConfigurationRecord, ConfigurationV3, PersistedConfiguration, CURRENT_SCHEMA_VERSION};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
