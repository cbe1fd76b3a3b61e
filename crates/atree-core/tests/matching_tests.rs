use atree_core::{
    make_match_configs_from_index, make_matching_index, BranchConfig, BranchKind, Configuration,
    MatchingConfig, SchemaError,
};
use proptest::prelude::*;

fn event_track_config() -> Configuration {
    let mut config = Configuration::new("analysis");
    config
        .add_branch_config(BranchConfig::new("event", 0, BranchKind::EventHeader))
        .unwrap();
    config
        .add_branch_config(BranchConfig::new("track", 1, BranchKind::Track))
        .unwrap();
    config
}

#[test]
fn test_event_track_scenario() {
    let mut config = event_track_config();
    config
        .add_match_config(MatchingConfig::new("event", "track", "event2track"))
        .unwrap();

    assert_eq!(config.match_name("event", "track").unwrap(), "event2track");
    assert_eq!(config.match_name("track", "event").unwrap(), "event2track");
    assert_eq!(config.match_info("track", "event"), Some(("event2track", true)));

    let err = config
        .add_match_config(MatchingConfig::new("event", "track", "dup"))
        .unwrap_err();
    assert!(matches!(err, SchemaError::DuplicateMatch { .. }));
    assert_eq!(config.match_name("event", "track").unwrap(), "event2track");
}

#[test]
fn test_lookup_without_registration() {
    let config = event_track_config();
    assert_eq!(config.match_info("event", "track"), None);
    assert!(config.match_name("event", "track").is_err());
}

#[test]
fn test_legacy_document_migrates_to_current() {
    let legacy = r#"{
        "schema_version": "3",
        "name": "old",
        "branches": {
            "0": {"name": "event", "id": 0, "kind": "EventHeader", "fields": {
                "vtx_x": {"id": -1, "field_type": "float"},
                "vtx_y": {"id": -2, "field_type": "float"},
                "vtx_z": {"id": -3, "field_type": "float"}
            }},
            "1": {"name": "track", "id": 1, "kind": "Track", "fields": {
                "px": {"id": -1, "field_type": "float"},
                "py": {"id": -2, "field_type": "float"},
                "pz": {"id": -3, "field_type": "float"},
                "q": {"id": -1, "field_type": "integer"},
                "chi2": {"id": 0, "field_type": "float", "title": "fit quality"}
            }}
        },
        "matches": [[["event", "track"], "event2track"]]
    }"#;

    let config = Configuration::from_json(legacy).unwrap();
    assert_eq!(config.number_of_branches(), 2);
    assert!(config.branch_config_by_name("track").unwrap().has_field("chi2"));
    assert_eq!(config.match_info("event", "track"), Some(("event2track", false)));

    let current = config.to_json().unwrap();
    assert!(current.contains("\"schema_version\": \"4\""));
    let reloaded = Configuration::from_json(&current).unwrap();
    assert_eq!(reloaded, config);
    assert_eq!(reloaded.matches(), config.matches());
}

fn arb_records() -> impl Strategy<Value = Vec<MatchingConfig>> {
    proptest::collection::vec(("[a-d]", "[a-d]", "[a-z]{1,6}"), 0..24).prop_map(|raw| {
        let mut seen = std::collections::BTreeSet::new();
        let mut names = std::collections::BTreeSet::new();
        raw.into_iter()
            .filter(|(a, b, d)| seen.insert((a.clone(), b.clone())) && names.insert(d.clone()))
            .map(|(a, b, d)| MatchingConfig::new(a, b, d))
            .collect()
    })
}

proptest! {
    #[test]
    fn prop_list_roundtrip_is_permutation(records in arb_records()) {
        let index = make_matching_index(&records).unwrap();
        let mut back = make_match_configs_from_index(&index);
        let mut expected = records.clone();
        back.sort();
        expected.sort();
        prop_assert_eq!(back, expected);
    }

    #[test]
    fn prop_duplicate_detected_and_index_unchanged(records in arb_records(), pick in any::<prop::sample::Index>()) {
        prop_assume!(!records.is_empty());
        let mut config = Configuration::new("p");
        for record in &records {
            config.add_match_config(record.clone()).unwrap();
        }
        let before = config.matches().clone();

        let victim = &records[pick.index(records.len())];
        let dup = MatchingConfig::new(victim.first_branch(), victim.second_branch(), "duplicate");
        let is_duplicate = matches!(
            config.add_match_config(dup),
            Err(SchemaError::DuplicateMatch { .. })
        );
        prop_assert!(is_duplicate);
        prop_assert_eq!(config.matches(), &before);

        let mut with_dup = records.clone();
        with_dup.push(MatchingConfig::new(victim.first_branch(), victim.second_branch(), "x"));
        prop_assert!(make_matching_index(&with_dup).is_err());
    }

    #[test]
    fn prop_bidirectional_lookup(records in arb_records()) {
        let index = make_matching_index(&records).unwrap();
        let mut config = Configuration::new("p");
        for record in make_match_configs_from_index(&index) {
            config.add_match_config(record).unwrap();
        }
        for record in &records {
            let (a, b) = (record.first_branch(), record.second_branch());
            prop_assert_eq!(config.match_info(a, b), Some((record.data_branch(), false)));
            if !index.contains_key(&(b.to_string(), a.to_string())) {
                prop_assert_eq!(config.match_info(b, a), Some((record.data_branch(), true)));
            }
        }
    }
}
