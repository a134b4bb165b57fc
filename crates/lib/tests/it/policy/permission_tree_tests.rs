use serde_json::json;
use thingsearch::{
    EvaluatedPolicy, Policy, Value, doc,
    policy::{Permission, Resource},
};

use crate::helpers::*;

#[test]
fn test_end_to_end_permissions() {
    let thing = json!({
        "id": "ns:thing1",
        "revision": 5,
        "features": {"temp": {"properties": {"value": 21}}}
    });
    let policy = Policy::new("ns:policy")
        .with_entry(
            "root",
            &["user1"],
            vec![Resource::thing("/", vec![Permission::Read], vec![])],
        )
        .with_entry(
            "temp",
            &["user2"],
            vec![Resource::thing("/features/temp", vec![], vec![Permission::Read])],
        );
    let evaluated = EvaluatedPolicy::evaluate(&policy, &thing);

    assert_eq!(
        evaluated.for_thing(),
        doc! {
            "__g" => strings(&["user1"]),
            "features" => doc! {
                "temp" => doc! { "__r" => strings(&["user2"]) },
            },
        }
    );

    let temp = evaluated.for_feature("temp");
    assert_eq!(temp.get("__g"), Some(&strings(&["user1"])));
    let temp_node = temp
        .get_document("features")
        .and_then(|features| features.get_document("temp"))
        .unwrap();
    assert_eq!(temp_node.get("__r"), Some(&strings(&["user2"])));
}

#[test]
fn test_nested_paths_share_prefix_nodes() {
    let thing = sample_thing();
    let evaluated = EvaluatedPolicy::evaluate(&sample_policy(), &thing);
    let tree = evaluated.for_thing();

    assert_eq!(tree.get("__g"), Some(&strings(&["user1", "user2"])));
    let features = tree.get_document("features").unwrap();
    assert_eq!(features.keys().collect::<Vec<_>>(), vec!["temp"]);
    assert_eq!(
        features.get_document("temp").unwrap(),
        &doc! { "__r" => strings(&["user2"]) }
    );
}

#[test]
fn test_feature_view_excludes_other_features() {
    let thing = json!({
        "features": {
            "a": {"properties": {"x": 1}},
            "b": {"properties": {"y": 2}}
        }
    });
    let policy = Policy::new("ns:p")
        .with_entry(
            "a",
            &["sa"],
            vec![Resource::thing(
                "/features/a/properties",
                vec![Permission::Read],
                vec![],
            )],
        )
        .with_entry(
            "b",
            &["sb"],
            vec![Resource::thing(
                "/features/b",
                vec![Permission::Read],
                vec![],
            )],
        );
    let evaluated = EvaluatedPolicy::evaluate(&policy, &thing);

    assert_eq!(
        evaluated.for_feature("a"),
        doc! {
            "features" => doc! {
                "a" => doc! { "properties" => doc! { "__g" => strings(&["sa"]) } },
            },
        }
    );
    assert_eq!(
        evaluated.for_feature("b"),
        doc! { "features" => doc! { "b" => doc! { "__g" => strings(&["sb"]) } } }
    );
    assert!(evaluated.for_feature("unknown").is_empty());
}

#[test]
fn test_empty_policy_renders_empty_tree() {
    let evaluated = EvaluatedPolicy::evaluate(&Policy::default(), &sample_thing());
    assert!(evaluated.for_thing().is_empty());
    assert_eq!(evaluated.global_read_value(), Value::Array(vec![]));
}
