//! ATree Infra
//!
//! Runtime branches over [`atree_core`] schemas: entity collections, typed
//! field access through channels, cross-branch copies and the session that
//! owns a configuration.
//!
//! # Core Concepts
//!
//! - [`BranchData`]: closed set of entity collections, reached generically
//!   through [`BranchVisitor`] / [`BranchVisitorMut`]
//! - [`Field`]: name resolved once against a schema to a type and id
//! - [`Branch`]: schema plus collection, with frozen/mutable gating
//! - [`BranchChannel`] / [`BranchChannelMut`]: views of one entry
//! - [`FieldsMapping`]: cached name-matched field pairs for copies
//! - [`Session`]: owner of the configuration, branches and matchings
//! - [`TreeWriter`] / [`TreeReader`]: store collaborators, [`MemoryTree`]
//! - [`Task`] / [`run_tasks`]: event loop over a store
//!
//! # Example
//!
//! ```rust
//! use atree_core::{BranchConfig, BranchKind, FieldType};
//! use atree_infra::Session;
//!
//! let mut session = Session::new("reco");
//! let tracks = session
//!     .add_branch(BranchConfig::new("tracks", 1, BranchKind::Track))
//!     .unwrap();
//! let chi2 = tracks.new_variable("chi2", FieldType::Float).unwrap();
//! tracks.set_mutable(true);
//! tracks.new_channel().unwrap().set_value(&chi2, 1.5).unwrap();
//!
//! let tracks = session.branch("tracks").unwrap();
//! assert_eq!(tracks.channel(0).unwrap().value(&chi2).unwrap(), 1.5);
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod branch;
mod channel;
mod data;
mod detector;
mod entity;
mod error;
mod field;
mod session;
mod store;
mod task;

// Re-exports
pub use branch::{Branch, FieldsMapping};
pub use channel::{BranchChannel, BranchChannelMut};
pub use data::{BranchData, BranchVisitor, BranchVisitorMut};
pub use detector::{Detector, EntityCollection};
pub use entity::{Container, Entity, EventHeader, Hit, Module, Particle, Track};
pub use error::BranchError;
pub use field::{Field, FieldBinding};
pub use session::{ConfigHandle, Session};
pub use store::{MemoryTree, StoreError, TreeReader, TreeWriter};
pub use task::{run_tasks, run_tasks_to, Task};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
