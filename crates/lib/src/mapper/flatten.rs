//! Legacy flat representation of a Thing.
//!
//! Every primitive leaf of the Thing becomes one record `{k, v, g, r}`: its
//! JSON-pointer key, its value, and the subjects granted and revoked READ for
//! that path. Leaves below `/features/<id>` are emitted a second time under
//! `/features/*` so that one query can match the same property across all
//! features.

use serde_json::Value as JsonValue;

use crate::{
    constants::{
        FEATURE_WILDCARD, FIELD_INTERNAL_GRANTED, FIELD_INTERNAL_KEY, FIELD_INTERNAL_REVOKED,
        FIELD_INTERNAL_VALUE, THING_FEATURES,
    },
    path::FieldPath,
    policy::{EvaluatedPolicy, PathGrants},
    value::{Document, Value, estimated_size},
    visitor::JsonVisitor,
};

/// Per-field length enforcement applied to flattened leaves.
///
/// Returning `None` drops the leaf from the flat representation. The primary
/// document is never affected.
pub trait FieldLengthRestriction {
    /// Returns the value to store for `key`, possibly adjusted, or `None` to drop it.
    fn enforce(&self, key: &str, value: Value) -> Option<Value>;
}

/// Keeps every leaf as is.
#[derive(Debug, Default, Clone, Copy)]
pub struct Unrestricted;

impl FieldLengthRestriction for Unrestricted {
    fn enforce(&self, _key: &str, value: Value) -> Option<Value> {
        Some(value)
    }
}

/// Drops leaves whose key and value together exceed a byte budget.
#[derive(Debug, Clone, Copy)]
pub struct MaxLeafSize {
    max_bytes: usize,
}

impl MaxLeafSize {
    pub fn new(max_bytes: usize) -> Self {
        Self { max_bytes }
    }
}

impl FieldLengthRestriction for MaxLeafSize {
    fn enforce(&self, key: &str, value: Value) -> Option<Value> {
        (key.len() + estimated_size(&value) <= self.max_bytes).then_some(value)
    }
}

/// One flattened leaf.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatLeaf {
    pub path: FieldPath,
    pub key: String,
    pub value: Value,
    pub grants: PathGrants,
}

impl FlatLeaf {
    /// The same leaf under `/features/*/...`, if it belongs to a feature.
    fn feature_alias(&self) -> Option<FlatLeaf> {
        if self.path.get(0) != Some(THING_FEATURES) || self.path.len() < 2 {
            return None;
        }
        let path = FieldPath::root()
            .push(THING_FEATURES)
            .push(FEATURE_WILDCARD)
            .join(&self.path.sub_path(2, self.path.len()));
        Some(FlatLeaf {
            key: path.to_pointer(),
            path,
            value: self.value.clone(),
            grants: self.grants.clone(),
        })
    }

    /// Renders the leaf as `{k, v, g, r}`.
    pub fn to_document(&self) -> Document {
        let mut doc = Document::with_capacity(4);
        doc.insert(FIELD_INTERNAL_KEY, self.key.as_str());
        doc.insert(FIELD_INTERNAL_VALUE, self.value.clone());
        doc.insert(FIELD_INTERNAL_GRANTED, self.grants.granted_value());
        doc.insert(FIELD_INTERNAL_REVOKED, self.grants.revoked_value());
        doc
    }
}

/// Flattens Things against one evaluated policy.
pub struct ThingFlattener<'a, R: FieldLengthRestriction + ?Sized> {
    policy: &'a EvaluatedPolicy,
    restriction: &'a R,
    max_array_size: i64,
}

impl<'a, R: FieldLengthRestriction + ?Sized> ThingFlattener<'a, R> {
    /// `max_array_size` caps the leaves flattened below any array; negative means unbounded.
    pub fn new(policy: &'a EvaluatedPolicy, restriction: &'a R, max_array_size: i64) -> Self {
        Self {
            policy,
            restriction,
            max_array_size,
        }
    }

    /// Flattens `thing`, including the cross-feature aliases.
    pub fn flatten(&mut self, thing: &JsonValue) -> Vec<FlatLeaf> {
        self.eval(thing)
            .into_iter()
            .flat_map(|leaf| {
                let alias = leaf.feature_alias();
                std::iter::once(leaf).chain(alias)
            })
            .collect()
    }

    /// Flattens `thing` into the array stored under `_internal`.
    pub fn flatten_to_value(&mut self, thing: &JsonValue) -> Value {
        Value::Array(
            self.flatten(thing)
                .iter()
                .map(|leaf| Value::Document(leaf.to_document()))
                .collect(),
        )
    }
}

impl<R: FieldLengthRestriction + ?Sized> JsonVisitor for ThingFlattener<'_, R> {
    type Output = Vec<FlatLeaf>;

    fn primitive(&mut self, path: &FieldPath, value: &JsonValue) -> Vec<FlatLeaf> {
        let key = path.to_pointer();
        match self.restriction.enforce(&key, Value::from_json_scalar(value)) {
            Some(value) => vec![FlatLeaf {
                path: path.clone(),
                key,
                value,
                grants: self.policy.effective_at(path),
            }],
            None => {
                tracing::trace!(key = %key, "Dropping flattened leaf exceeding length restriction");
                Vec::new()
            }
        }
    }

    fn array(&mut self, _path: &FieldPath, elements: Vec<Vec<FlatLeaf>>) -> Vec<FlatLeaf> {
        let leaves = elements.into_iter().flatten();
        match usize::try_from(self.max_array_size) {
            Ok(max) => leaves.take(max).collect(),
            Err(_) => leaves.collect(),
        }
    }

    fn object(&mut self, _path: &FieldPath, fields: Vec<(String, Vec<FlatLeaf>)>) -> Vec<FlatLeaf> {
        fields.into_iter().flat_map(|(_, leaves)| leaves).collect()
    }
}
