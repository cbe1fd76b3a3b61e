//! Testing utilities for ATree workspace
//!
//! Shared fixtures: schemas, populated branches, sessions and stores.

#![allow(missing_docs)]

use atree_core::{BranchConfig, BranchKind, Configuration, FieldType, Matching};
use atree_infra::{Branch, MemoryTree, Session};

/// Install a test-writer subscriber filtered by `RUST_LOG`; repeated calls are ignored
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn track_config(name: &str, id: usize, floats: &[&str], ints: &[&str]) -> BranchConfig {
    let mut config = BranchConfig::new(name, id, BranchKind::Track);
    config.add_fields(FieldType::Float, floats).unwrap();
    config.add_fields(FieldType::Integer, ints).unwrap();
    config
}

/// `event` (id 0, header) and `tracks` (id 1, `chi2`, `nhits`)
pub fn event_track_configuration() -> Configuration {
    let mut config = Configuration::new("test");
    config
        .add_branch_config(BranchConfig::new("event", 0, BranchKind::EventHeader))
        .unwrap();
    config
        .add_branch_config(track_config("tracks", 1, &["chi2"], &["nhits"]))
        .unwrap();
    config
}

/// Mutable branch with `entries` channels; field `k` of entry `i` holds `i * 10 + k`
pub fn populated_branch(config: BranchConfig, entries: usize) -> Branch {
    let mut branch = Branch::new(config);
    branch.set_mutable(true);
    let fields: Vec<_> = branch
        .field_names()
        .into_iter()
        .map(|name| branch.field(name).unwrap())
        .collect();
    for i in 0..entries {
        let mut channel = branch.new_channel().unwrap();
        for (k, field) in fields.iter().enumerate() {
            channel.set_value(field, (i * 10 + k) as f64).unwrap();
        }
    }
    branch
}

/// Session over [`event_track_configuration`] with `tracks` matched from `event`
pub fn event_track_session() -> Session {
    let mut session = Session::from_configuration(event_track_configuration());
    session.add_matching(Matching::new(0, 1)).unwrap();
    session
}

/// Store with `entries` entries of `event` and `tracks`, `tracks` holding
/// `entry + 1` tracks whose `chi2` is the track index
pub fn event_track_tree(entries: usize) -> MemoryTree {
    let mut session = Session::from_configuration(event_track_configuration());
    let mut tree = MemoryTree::new();
    session.connect_output(&mut tree).unwrap();
    let chi2 = session.branch("tracks").unwrap().field("chi2").unwrap();
    for entry in 0..entries {
        let tracks = session.branch_mut("tracks").unwrap();
        tracks.set_mutable(true);
        tracks.clear_channels().unwrap();
        for index in 0..=entry {
            tracks.new_channel().unwrap().set_value(&chi2, index as f64).unwrap();
        }
        session.fill(&mut tree).unwrap();
    }
    tree
}

/// Compare two branches entry by entry on the named fields
pub fn assert_same_values(a: &Branch, b: &Branch, fields: &[&str]) {
    assert_eq!(a.len(), b.len(), "entry counts differ");
    for name in fields {
        let fa = a.field(name).unwrap();
        let fb = b.field(name).unwrap();
        for (ca, cb) in a.channels().zip(b.channels()) {
            assert_eq!(
                ca.typed_value(&fa).unwrap(),
                cb.typed_value(&fb).unwrap(),
                "field '{name}' differs at entry {}",
                ca.index()
            );
        }
    }
}
