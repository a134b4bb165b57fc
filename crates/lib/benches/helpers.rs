//! Shared helpers for benchmark tests

use serde_json::{Map, Value as JsonValue, json};
use thingsearch::{
    Policy,
    policy::{Permission, Resource},
};

/// Creates a Thing with `feature_count` features of `properties_per_feature` properties each.
pub fn large_thing(feature_count: usize, properties_per_feature: usize) -> JsonValue {
    let features: Map<String, JsonValue> = (0..feature_count)
        .map(|f| {
            let properties: Map<String, JsonValue> = (0..properties_per_feature)
                .map(|p| (format!("property_{p}"), json!(f * 1000 + p)))
                .collect();
            (format!("feature_{f}"), json!({ "properties": properties }))
        })
        .collect();
    json!({
        "id": "bench:thing",
        "revision": 1,
        "policyId": "bench:policy",
        "attributes": {"location": "lab", "serial": "SN-000001"},
        "features": features
    })
}

/// Creates a Thing without features whose attributes object has `width` entries.
pub fn wide_thing(width: usize) -> JsonValue {
    let attributes: Map<String, JsonValue> = (0..width)
        .map(|i| (format!("attr_{i}"), json!(i)))
        .collect();
    json!({
        "id": "bench:wide",
        "revision": 1,
        "policyId": "bench:policy",
        "attributes": attributes
    })
}

/// Returns `thing` with one property of one feature changed.
pub fn with_one_change(thing: &JsonValue) -> JsonValue {
    let mut changed = thing.clone();
    changed["features"]["feature_0"]["properties"]["property_0"] = json!(-1);
    changed["revision"] = json!(2);
    changed
}

/// A policy granting READ on the whole Thing and revoking it on one feature.
pub fn bench_policy() -> Policy {
    Policy::new("bench:policy")
        .with_entry(
            "all",
            &["reader", "auditor"],
            vec![Resource::thing("/", vec![Permission::Read], vec![])],
        )
        .with_entry(
            "restricted",
            &["auditor"],
            vec![Resource::thing("/features/feature_0", vec![], vec![Permission::Read])],
        )
}
