//! Cross-branch copy tests
//!
//! Run with: cargo test --package atree-infra --test copy_tests

use atree_core::{BranchConfig, BranchKind, FieldType, FieldValue};
use atree_infra::{Branch, BranchError};
use atree_test_utils::{assert_same_values, init_test_tracing, populated_branch, track_config};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

#[test]
fn partial_schema_copies_common_fields_only() {
    init_test_tracing();
    let src = populated_branch(track_config("src", 1, &["a", "c", "d"], &[]), 3);
    let mut dst = populated_branch(track_config("dst", 2, &["a", "b", "c"], &[]), 2);

    let b = dst.field("b").unwrap();
    let b_before: Vec<f64> = dst.channels().map(|ch| ch.value(&b).unwrap()).collect();

    let user_pairs: Vec<&str> = dst
        .create_mapping(&src)
        .unwrap()
        .field_pairs()
        .iter()
        .map(|(from, _)| from.name())
        .filter(|name| !src.config().field(name).unwrap().is_builtin())
        .collect();
    assert_eq!(user_pairs, vec!["a", "c"]);

    dst.copy_contents(&src).unwrap();
    assert_eq!(dst.len(), 3);
    assert!(!dst.has_field("d"));

    for name in ["a", "c", "px", "q"] {
        let from = src.field(name).unwrap();
        let to = dst.field(name).unwrap();
        for index in 0..3 {
            assert_eq!(
                dst.channel(index).unwrap().value(&to).unwrap(),
                src.channel(index).unwrap().value(&from).unwrap()
            );
        }
    }

    // b existed only in the destination: old entries keep their values,
    // the appended entry holds the default
    assert_eq!(dst.channel(0).unwrap().value(&b).unwrap(), b_before[0]);
    assert_eq!(dst.channel(1).unwrap().value(&b).unwrap(), b_before[1]);
    assert_eq!(dst.channel(2).unwrap().value(&b).unwrap(), 0.0);
}

#[test]
fn copy_shrinks_destination() {
    let src = populated_branch(track_config("src", 1, &["a"], &[]), 1);
    let mut dst = populated_branch(track_config("dst", 2, &["a"], &[]), 4);
    dst.copy_contents(&src).unwrap();
    assert_eq!(dst.len(), 1);
}

#[test]
fn copy_converts_to_destination_type() {
    let mut src = Branch::new(track_config("src", 1, &["n"], &["m"]));
    src.set_mutable(true);
    let [n, m] = src.vars(["n", "m"]).unwrap();
    {
        let mut ch = src.new_channel().unwrap();
        ch.set_value(&n, 2.7).unwrap();
        ch.set_value(&m, 5.0).unwrap();
    }

    let mut dst = Branch::new(track_config("dst", 2, &["m"], &["n"]));
    dst.set_mutable(true);
    dst.copy_contents(&src).unwrap();

    let [dn, dm] = dst.vars(["n", "m"]).unwrap();
    let ch = dst.channel(0).unwrap();
    assert_eq!(ch.typed_value(&dn).unwrap(), FieldValue::Integer(2));
    assert_eq!(ch.typed_value(&dm).unwrap(), FieldValue::Float(5.0));
}

#[test]
fn copy_requires_mutable_destination() {
    let src = populated_branch(track_config("src", 1, &["a"], &[]), 1);
    let mut dst = Branch::new(track_config("dst", 2, &["a"], &[]));
    assert!(matches!(dst.copy_contents(&src), Err(BranchError::BranchState { .. })));
    assert!(matches!(dst.copy_contents_raw(&src), Err(BranchError::BranchState { .. })));
    assert!(dst.is_empty());
}

#[test]
fn raw_copy_detects_schema_drift() {
    let src = populated_branch(track_config("src", 1, &["a"], &[]), 2);
    let mut dst = populated_branch(track_config("dst", 2, &["a"], &[]), 0);
    dst.copy_contents_raw(&src).unwrap();
    assert_same_values(&dst, &src, &["a", "px", "q"]);

    dst.new_variable("extra", FieldType::Boolean).unwrap();
    let err = dst.copy_contents_raw(&src).unwrap_err();
    assert!(matches!(err, BranchError::SchemaMismatch { .. }));
}

#[test]
fn header_copies_between_headers() {
    let mut src = Branch::new(BranchConfig::new("event", 0, BranchKind::EventHeader));
    src.set_mutable(true);
    let vtx_z = src.field("vtx_z").unwrap();
    src.channel_mut(0).unwrap().set_value(&vtx_z, -3.5).unwrap();

    let mut dst = Branch::new(BranchConfig::new("event_copy", 1, BranchKind::EventHeader));
    dst.set_mutable(true);
    dst.copy_contents(&src).unwrap();
    assert_eq!(dst.len(), 1);
    assert_eq!(
        dst.channel(0)
            .unwrap()
            .value(&dst.field("vtx_z").unwrap())
            .unwrap(),
        -3.5
    );
}

proptest! {
    #[test]
    fn mapped_copy_matches_raw_copy(values in prop::collection::vec((-1.0e6f32..1.0e6, any::<i32>(), any::<bool>()), 0..16)) {
        let mut config = track_config("src", 1, &["chi2"], &["nhits"]);
        config.add_field("good", FieldType::Boolean, "").unwrap();
        let mut src = Branch::new(config);
        src.set_mutable(true);
        let [chi2, nhits, good] = src.vars(["chi2", "nhits", "good"]).unwrap();
        for (x, n, g) in &values {
            let mut ch = src.new_channel().unwrap();
            ch.set_typed(&chi2, FieldValue::Float(*x)).unwrap();
            ch.set_typed(&nhits, FieldValue::Integer(*n)).unwrap();
            ch.set_typed(&good, FieldValue::Boolean(*g)).unwrap();
        }

        let make = |name: &str, id: usize| {
            let mut c = track_config(name, id, &["chi2"], &["nhits"]);
            c.add_field("good", FieldType::Boolean, "").unwrap();
            let mut b = Branch::new(c);
            b.set_mutable(true);
            b
        };
        let mut mapped = make("mapped", 2);
        let mut raw = make("raw", 3);
        mapped.copy_contents(&src).unwrap();
        raw.copy_contents_raw(&src).unwrap();

        prop_assert_eq!(mapped.len(), values.len());
        assert_same_values(&mapped, &raw, &["chi2", "nhits", "good", "px", "py", "pz", "q"]);
    }

    #[test]
    fn field_resolution_is_deterministic(names in prop::collection::btree_set("[a-z]{1,8}", 1..6)) {
        let names: Vec<String> = names
            .into_iter()
            .filter(|n| !["px", "py", "pz", "q"].contains(&n.as_str()))
            .collect();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        let branch = Branch::new(track_config("t", 0, &refs, &[]));
        for name in &refs {
            prop_assert_eq!(branch.field(name).unwrap(), branch.field(name).unwrap());
        }
    }
}
