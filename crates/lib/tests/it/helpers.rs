use serde_json::{Value as JsonValue, json};
use thingsearch::{
    Document, Policy, Value,
    diff::{FlatUpdate, StoreCapabilities, Update},
    mapper::{MapperConfig, ThingMapper},
    policy::{Permission, Resource},
};

// ==========================
// FIXTURES
// ==========================

/// Store that evaluates every pipeline operator the compiler emits.
pub const MODERN_STORE: StoreCapabilities = StoreCapabilities {
    max_wire_version: 17,
};

/// Store without `$unsetField`.
pub const LEGACY_STORE: StoreCapabilities = StoreCapabilities {
    max_wire_version: 8,
};

/// A Thing with attributes and two features.
pub fn sample_thing() -> JsonValue {
    json!({
        "id": "org.example:sensor-1",
        "revision": 3,
        "policyId": "org.example:policy",
        "attributes": {
            "location": "kitchen",
            "model": {"vendor": "acme", "version": 2}
        },
        "features": {
            "humidity": {"properties": {"value": 40}},
            "temp": {"properties": {"value": 21, "unit": "C"}}
        }
    })
}

/// A Thing whose attributes object has `width` flat entries `attr_<i>: i`.
pub fn wide_thing(width: usize) -> JsonValue {
    let attributes: serde_json::Map<String, JsonValue> = (0..width)
        .map(|i| (format!("attr_{i}"), json!(i)))
        .collect();
    json!({
        "id": "org.example:wide",
        "revision": 1,
        "policyId": "org.example:policy",
        "attributes": attributes
    })
}

/// Grants READ on everything to `user1` and revokes it below `/features/temp` for `user2`.
pub fn sample_policy() -> Policy {
    Policy::new("org.example:policy")
        .with_entry(
            "owner",
            &["user1", "user2"],
            vec![Resource::thing("/", vec![Permission::Read], vec![])],
        )
        .with_entry(
            "restricted",
            &["user2"],
            vec![Resource::thing("/features/temp", vec![], vec![Permission::Read])],
        )
}

/// Maps a Thing with the default configuration.
pub fn map_thing(thing: &JsonValue, policy: &Policy) -> Document {
    ThingMapper::new(MapperConfig::default())
        .map(thing, policy, Some(1), None)
        .expect("thing should map")
        .document
}

/// Builds an array of string values.
pub fn strings(items: &[&str]) -> Value {
    Value::Array(items.iter().map(|s| Value::from(*s)).collect())
}

// ==========================
// UPDATE APPLICATION
// ==========================
// A minimal evaluator for the update shapes the compiler emits, so tests can
// check that an update brings the old document to the new one.

/// Applies `update` to `old` the way the store would.
pub fn apply_update(old: &Document, update: &Update) -> Document {
    match update {
        Update::Unchanged => old.clone(),
        Update::Replace(new) => new.clone(),
        Update::Flat(flat) => apply_flat(old, flat),
        Update::Pipeline(stages) => stages
            .iter()
            .fold(old.clone(), |doc, stage| apply_stage(&doc, stage)),
    }
}

fn apply_flat(old: &Document, flat: &FlatUpdate) -> Document {
    let mut doc = old.clone();
    for (path, value) in &flat.set {
        let segments: Vec<&str> = path.split('.').collect();
        set_dotted(&mut doc, &segments, value.clone());
    }
    for path in &flat.unset {
        let segments: Vec<&str> = path.split('.').collect();
        unset_dotted(&mut doc, &segments);
    }
    doc
}

fn set_dotted(doc: &mut Document, segments: &[&str], value: Value) {
    match segments {
        [] => {}
        [last] => {
            doc.insert(*last, value);
        }
        [first, rest @ ..] => {
            if doc.get_document(first).is_none() {
                doc.insert(*first, Document::new());
            }
            let child = doc
                .get_mut(first)
                .and_then(Value::as_document_mut)
                .expect("parent was just made a document");
            set_dotted(child, rest, value);
        }
    }
}

fn unset_dotted(doc: &mut Document, segments: &[&str]) {
    match segments {
        [] => {}
        [last] => {
            doc.remove(last);
        }
        [first, rest @ ..] => {
            if let Some(child) = doc.get_mut(first).and_then(Value::as_document_mut) {
                unset_dotted(child, rest);
            }
        }
    }
}

fn apply_stage(doc: &Document, stage: &Document) -> Document {
    let mut out = doc.clone();
    if let Some(assignments) = stage.get_document("$set") {
        for (key, expression) in assignments.iter() {
            match eval(expression, doc) {
                Some(value) => {
                    out.insert(key, value);
                }
                None => {
                    out.remove(key);
                }
            }
        }
    }
    if let Some(removed) = stage.get_array("$unset") {
        for key in removed.iter().filter_map(Value::as_str) {
            out.remove(key);
        }
    }
    out
}

/// Evaluates an aggregation expression against `root`; `None` is a missing value.
pub fn eval(expression: &Value, root: &Document) -> Option<Value> {
    match expression {
        Value::String(s) if s.starts_with('$') => resolve(root, &s[1..]),
        Value::Array(items) => Some(Value::Array(
            items
                .iter()
                .map(|item| eval(item, root).unwrap_or(Value::Null))
                .collect(),
        )),
        Value::Document(doc) => match doc.iter().next() {
            Some((op, argument)) if doc.len() == 1 && op.starts_with('$') => {
                eval_operator(op, argument, root)
            }
            _ => Some(Value::Document(
                doc.iter()
                    .filter_map(|(key, item)| eval(item, root).map(|value| (key, value)))
                    .collect(),
            )),
        },
        other => Some(other.clone()),
    }
}

fn resolve(root: &Document, dotted: &str) -> Option<Value> {
    let mut segments = dotted.split('.');
    let mut current = root.get(segments.next()?)?;
    for segment in segments {
        current = current.as_document()?.get(segment)?;
    }
    Some(current.clone())
}

fn eval_args(argument: &Value, root: &Document) -> Vec<Option<Value>> {
    argument
        .as_array()
        .expect("operator arguments are an array")
        .iter()
        .map(|arg| eval(arg, root))
        .collect()
}

fn as_index(value: &Option<Value>) -> usize {
    let index = value
        .as_ref()
        .and_then(Value::as_i64)
        .expect("index is an integer");
    usize::try_from(index).expect("index is not negative")
}

fn eval_operator(op: &str, argument: &Value, root: &Document) -> Option<Value> {
    match op {
        "$literal" => Some(argument.clone()),
        "$arrayElemAt" => {
            let args = eval_args(argument, root);
            let array = args[0].as_ref()?.as_array()?.to_vec();
            array.get(as_index(&args[1])).cloned()
        }
        "$slice" => {
            let args = eval_args(argument, root);
            let array = args[0].as_ref()?.as_array()?.to_vec();
            let start = as_index(&args[1]).min(array.len());
            let end = (start + as_index(&args[2])).min(array.len());
            Some(Value::Array(array[start..end].to_vec()))
        }
        "$concatArrays" => {
            let mut out = Vec::new();
            for part in eval_args(argument, root) {
                out.extend(part?.as_array()?.iter().cloned());
            }
            Some(Value::Array(out))
        }
        "$mergeObjects" => {
            let mut out = Document::new();
            for part in eval_args(argument, root).into_iter().flatten() {
                if let Value::Document(doc) = part {
                    for (key, value) in doc {
                        out.insert(key, value);
                    }
                }
            }
            Some(Value::Document(out))
        }
        "$unsetField" => {
            let spec = argument.as_document().expect("$unsetField takes a document");
            let field = eval(spec.get("field")?, root)?;
            let Value::Document(mut input) = eval(spec.get("input")?, root)? else {
                return None;
            };
            input.remove(field.as_str()?);
            Some(Value::Document(input))
        }
        other => panic!("unsupported operator {other}"),
    }
}

// ==========================
// COMPARISON
// ==========================

/// Structural equality ignoring the order of document keys.
pub fn logically_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Document(x), Value::Document(y)) => documents_logically_equal(x, y),
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| logically_equal(x, y))
        }
        _ => a == b,
    }
}

pub fn documents_logically_equal(x: &Document, y: &Document) -> bool {
    x.len() == y.len()
        && x
            .iter()
            .all(|(key, value)| y.get(key).is_some_and(|other| logically_equal(value, other)))
}

/// Asserts that applying `update` to `old` yields a document logically equal to `new`.
pub fn assert_round_trip(old: &Document, new: &Document, update: &Update) {
    let applied = apply_update(old, update);
    assert!(
        documents_logically_equal(&applied, new),
        "{} update did not reproduce the new document\nupdate: {update:?}\napplied: {applied:?}\nexpected: {new:?}",
        update.kind()
    );
}
