use serde_json::json;
use thingsearch::{
    MapperConfig, ThingMapper, Update, Value, compile_update, doc,
    diff::{DiffOptions, compile, minus, minus_thing_docs},
};

use crate::helpers::*;

#[test]
fn test_unchanged_thing() {
    let old = map_thing(&sample_thing(), &sample_policy());
    let new = map_thing(&sample_thing(), &sample_policy());
    assert!(minus_thing_docs(&new, &old).is_empty());
    assert_eq!(compile_update(&new, Some(&old), MODERN_STORE), Update::Unchanged);
}

#[test]
fn test_first_write_is_replacement() {
    let new = map_thing(&sample_thing(), &sample_policy());
    assert_eq!(compile_update(&new, None, MODERN_STORE), Update::Replace(new));
}

#[test]
fn test_revision_bump_is_flat() {
    let mapper = ThingMapper::new(MapperConfig {
        include_internal: false,
        ..MapperConfig::default()
    });
    let old = mapper
        .map(&sample_thing(), &sample_policy(), None, None)
        .unwrap()
        .document;
    let mut thing = sample_thing();
    thing["revision"] = 4.into();
    let new = mapper
        .map(&thing, &sample_policy(), None, None)
        .unwrap()
        .document;

    let update = compile_update(&new, Some(&old), MODERN_STORE);
    let Update::Flat(flat) = &update else {
        panic!("expected flat update, got {}", update.kind());
    };
    let paths: Vec<&str> = flat.set.iter().map(|(path, _)| path.as_str()).collect();
    assert!(paths.contains(&"_revision"));
    assert!(paths.contains(&"t.revision"));
    assert!(flat.unset.is_empty());
    assert_round_trip(&old, &new, &update);
}

#[test]
fn test_single_change_in_wide_attributes_is_flat() {
    let mapper = ThingMapper::new(MapperConfig {
        include_internal: false,
        ..MapperConfig::default()
    });
    let thing = wide_thing(20_000);
    let old = mapper
        .map(&thing, &sample_policy(), None, None)
        .unwrap()
        .document;
    let mut changed = thing.clone();
    changed["attributes"]["attr_12345"] = json!("changed");
    let new = mapper
        .map(&changed, &sample_policy(), None, None)
        .unwrap()
        .document;

    let update = compile_update(&new, Some(&old), MODERN_STORE);
    let Update::Flat(flat) = &update else {
        panic!("expected flat update, got {}", update.kind());
    };
    assert_eq!(
        flat.set,
        vec![(
            "t.attributes.attr_12345".to_string(),
            Value::from("changed")
        )]
    );
    assert!(flat.unset.is_empty());
    assert_round_trip(&old, &new, &update);
}

#[test]
fn test_feature_property_change_round_trips() {
    let old = map_thing(&sample_thing(), &sample_policy());
    let mut thing = sample_thing();
    thing["features"]["temp"]["properties"]["value"] = 23.into();
    let new = map_thing(&thing, &sample_policy());

    let update = compile_update(&new, Some(&old), MODERN_STORE);
    assert!(!update.is_replace(), "got {update:?}");
    assert_round_trip(&old, &new, &update);
}

#[test]
fn test_added_feature_round_trips() {
    let old = map_thing(&sample_thing(), &sample_policy());
    let mut thing = sample_thing();
    thing["features"]["light"] = json!({"properties": {"on": true}});
    let new = map_thing(&thing, &sample_policy());

    let update = compile_update(&new, Some(&old), MODERN_STORE);
    assert_round_trip(&old, &new, &update);
    assert_round_trip(&old, &new, &compile_update(&new, Some(&old), LEGACY_STORE));
}

#[test]
fn test_removed_attribute_round_trips_on_both_stores() {
    let old = map_thing(&sample_thing(), &sample_policy());
    let mut thing = sample_thing();
    thing["attributes"]
        .as_object_mut()
        .unwrap()
        .remove("location");
    let new = map_thing(&thing, &sample_policy());

    for store in [MODERN_STORE, LEGACY_STORE] {
        let update = compile_update(&new, Some(&old), store);
        assert_round_trip(&old, &new, &update);
    }
}

#[test]
fn test_nested_removal_in_pipeline_requires_unset_field() {
    let long = "padding that makes the document large enough to patch";
    let old = doc! {
        "t" => doc! { "a" => long, "b" => 1, "gone" => 2 },
        "list" => vec![Value::from(long), Value::from(long), Value::from(long)],
    };
    let new = doc! {
        "t" => doc! { "a" => long, "b" => 1 },
        "list" => vec![
            Value::from(long),
            Value::from(long),
            Value::from(long),
            Value::from("tail"),
        ],
    };
    let diff = minus(&new, &old, &DiffOptions::positional());
    assert!(diff.requires_pipeline());

    let modern = compile(diff.clone(), &new, MODERN_STORE);
    assert!(matches!(modern, Update::Pipeline(_)), "got {modern:?}");
    assert_round_trip(&old, &new, &modern);

    assert_eq!(compile(diff, &new, LEGACY_STORE), Update::Replace(new));
}

#[test]
fn test_top_level_removal_in_pipeline_works_without_unset_field() {
    let long = "padding that makes the document large enough to patch";
    let old = doc! {
        "gone" => 1,
        "list" => vec![Value::from(long), Value::from(long), Value::from(long)],
    };
    let new = doc! {
        "list" => vec![
            Value::from(long),
            Value::from(long),
            Value::from(long),
            Value::from("tail"),
        ],
    };
    let diff = minus(&new, &old, &DiffOptions::positional());
    let update = compile(diff, &new, LEGACY_STORE);
    let Update::Pipeline(stages) = &update else {
        panic!("expected pipeline, got {update:?}");
    };
    assert_eq!(stages.last(), Some(&doc! { "$unset" => vec![Value::from("gone")] }));
    assert_round_trip(&old, &new, &update);
}

#[test]
fn test_dollar_strings_are_not_field_references() {
    let old = doc! { "t" => doc! { "note" => "plain", "other" => "unchanged value here" } };
    let new = doc! { "t" => doc! { "note" => "$price", "other" => "unchanged value here" } };
    let update = compile(minus(&new, &old, &DiffOptions::default()), &new, MODERN_STORE);
    let Update::Flat(flat) = &update else {
        panic!("expected flat update, got {update:?}");
    };
    assert_eq!(flat.set, vec![("t.note".to_string(), Value::from("$price"))]);
    assert_round_trip(&old, &new, &update);
}
