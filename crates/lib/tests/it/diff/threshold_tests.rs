use thingsearch::{
    Update, compile_update, doc,
    diff::{DiffOptions, compile, minus},
};

use crate::helpers::*;

#[test]
fn test_small_deep_change_is_incremental() {
    let old = map_thing(&sample_thing(), &sample_policy());
    let mut thing = sample_thing();
    thing["attributes"]["model"]["version"] = 3.into();
    let new = map_thing(&thing, &sample_policy());

    let update = compile_update(&new, Some(&old), MODERN_STORE);
    assert!(
        matches!(update, Update::Flat(_) | Update::Pipeline(_)),
        "expected an incremental update, got {}",
        update.kind()
    );
    assert_round_trip(&old, &new, &update);
}

#[test]
fn test_pervasive_change_is_replacement() {
    let old = doc! {
        "name" => "sensor",
        "count" => 10,
        "tags" => strings(&["a", "b"]),
        "nested" => doc! { "x" => 1, "y" => 2 },
        "legacy" => true,
    };
    let new = doc! {
        "name" => "actuator",
        "count" => 11,
        "tags" => strings(&["c"]),
        "nested" => doc! { "x" => 5, "y" => 6 },
    };
    let diff = minus(&new, &old, &DiffOptions::default());
    assert!(!diff.is_diff_smaller());
    assert_eq!(compile(diff, &new, MODERN_STORE), Update::Replace(new));
}

#[test]
fn test_threshold_is_strict() {
    // One scalar field: patching costs exactly as much as rewriting.
    let old = doc! { "v" => 1 };
    let new = doc! { "v" => 2 };
    let diff = minus(&new, &old, &DiffOptions::default());
    assert_eq!(diff.diff_size(), diff.replacement_size());
    assert!(compile(diff, &new, MODERN_STORE).is_replace());
}

#[test]
fn test_removals_count_against_diff() {
    let old = doc! {
        "keep" => "a value that stays",
        "x1" => 1, "x2" => 2, "x3" => 3, "x4" => 4,
    };
    let only_removed = doc! { "keep" => "a value that stays" };
    let diff = minus(&only_removed, &old, &DiffOptions::default());
    assert_eq!(diff.unset().len(), 4);
    assert_eq!(diff.diff_size(), 8);
    let update = compile(diff, &only_removed, MODERN_STORE);
    assert!(matches!(update, Update::Flat(_)));
    assert_round_trip(&old, &only_removed, &update);
}
