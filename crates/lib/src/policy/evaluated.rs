//! Projection of a Policy onto the paths present in a Thing.
//!
//! The evaluated form is transient: the mapper builds one per mapping call and
//! drops it once the index document is assembled.

use std::collections::{BTreeMap, BTreeSet};

use serde_json::Value as JsonValue;

use crate::{
    constants::{PERMISSION_GRANTED, PERMISSION_REVOKED, THING_FEATURES},
    path::FieldPath,
    policy::{Policy, ResourceType},
    value::{Document, Value},
};

/// Subjects granted and revoked READ at one path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathGrants {
    granted: BTreeSet<String>,
    revoked: BTreeSet<String>,
}

impl PathGrants {
    /// Subjects granted READ, in sorted order.
    pub fn granted(&self) -> &BTreeSet<String> {
        &self.granted
    }

    /// Subjects revoked READ, in sorted order.
    pub fn revoked(&self) -> &BTreeSet<String> {
        &self.revoked
    }

    /// True if neither set has a subject.
    pub fn is_empty(&self) -> bool {
        self.granted.is_empty() && self.revoked.is_empty()
    }

    /// Grants to every subject not already revoked here.
    fn grant(&mut self, subjects: &[String]) {
        for subject in subjects {
            if !self.revoked.contains(subject) {
                self.granted.insert(subject.clone());
            }
        }
    }

    /// Revokes from every subject, retracting any earlier grant.
    fn revoke(&mut self, subjects: &[String]) {
        for subject in subjects {
            self.granted.remove(subject);
            self.revoked.insert(subject.clone());
        }
    }

    /// Renders the granted subjects as an array value.
    pub fn granted_value(&self) -> Value {
        subjects_value(&self.granted)
    }

    /// Renders the revoked subjects as an array value.
    pub fn revoked_value(&self) -> Value {
        subjects_value(&self.revoked)
    }
}

fn subjects_value(subjects: &BTreeSet<String>) -> Value {
    Value::Array(subjects.iter().map(|s| Value::from(s.as_str())).collect())
}

/// READ grants and revokes of a Policy, restricted to paths existing in a Thing.
///
/// # Evaluation Order
///
/// Entries and resources are applied in policy order, grants before revokes
/// within a resource:
/// - a grant adds subjects to the path's granted set, except subjects already
///   revoked at that path;
/// - a revoke adds subjects to the revoked set and removes them from the
///   granted set, whatever came first.
///
/// So grant-then-revoke leaves a subject revoked, while revoke-then-grant also
/// leaves it revoked and never granted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EvaluatedPolicy {
    grants: BTreeMap<FieldPath, PathGrants>,
    /// Feature id to the paths at or below `/features/<id>`
    features: BTreeMap<String, Vec<FieldPath>>,
    global_read: BTreeSet<String>,
}

impl EvaluatedPolicy {
    /// Evaluates `policy` against `thing`.
    ///
    /// Resources whose path does not exist in the Thing are dropped, except the
    /// root, which always applies.
    pub fn evaluate(policy: &Policy, thing: &JsonValue) -> Self {
        let mut grants: BTreeMap<FieldPath, PathGrants> = BTreeMap::new();

        for entry in &policy.entries {
            for resource in &entry.resources {
                if resource.resource_type != ResourceType::Thing {
                    continue;
                }
                let (grant, revoke) = (resource.grants_read(), resource.revokes_read());
                if !grant && !revoke {
                    continue;
                }

                let path = FieldPath::from(resource.path.as_str());
                if !path.is_empty() && !json_path_exists(thing, &path) {
                    tracing::trace!(label = %entry.label, path = %path, "Skipping policy resource absent from thing");
                    continue;
                }

                let node = grants.entry(path).or_default();
                if grant {
                    node.grant(&entry.subjects);
                }
                if revoke {
                    node.revoke(&entry.subjects);
                }
            }
        }

        let mut features: BTreeMap<String, Vec<FieldPath>> = BTreeMap::new();
        for path in grants.keys() {
            if path.get(0) == Some(THING_FEATURES)
                && let Some(feature_id) = path.get(1)
            {
                features
                    .entry(feature_id.to_string())
                    .or_default()
                    .push(path.clone());
            }
        }

        let global_read = grants
            .values()
            .flat_map(|g| g.granted.iter().cloned())
            .collect();

        tracing::debug!(
            paths = grants.len(),
            features = features.len(),
            "Evaluated policy against thing"
        );

        Self {
            grants,
            features,
            global_read,
        }
    }

    /// Grants recorded exactly at `path`.
    pub fn grants_at(&self, path: &FieldPath) -> Option<&PathGrants> {
        self.grants.get(path)
    }

    /// Every path with recorded grants, in path order.
    pub fn paths(&self) -> impl Iterator<Item = &FieldPath> {
        self.grants.keys()
    }

    /// Union of every granted subject set.
    pub fn global_read(&self) -> &BTreeSet<String> {
        &self.global_read
    }

    /// The global-read subjects as an array value.
    pub fn global_read_value(&self) -> Value {
        subjects_value(&self.global_read)
    }

    /// Resolves READ for `path` along its root-to-path chain.
    ///
    /// Revokes anywhere on the chain win over grants anywhere on the chain.
    pub fn effective_at(&self, path: &FieldPath) -> PathGrants {
        let mut resolved = PathGrants::default();
        for prefix in path.ancestors_and_self() {
            if let Some(grants) = self.grants.get(&prefix) {
                resolved.granted.extend(grants.granted.iter().cloned());
                resolved.revoked.extend(grants.revoked.iter().cloned());
            }
        }
        let revoked = &resolved.revoked;
        resolved.granted.retain(|subject| !revoked.contains(subject));
        resolved
    }

    /// Renders the whole permission tree.
    ///
    /// Every recorded path becomes a node carrying non-empty `__g`/`__r` arrays;
    /// paths sharing a prefix share the nodes of that prefix.
    pub fn for_thing(&self) -> Document {
        render(self.grants.iter())
    }

    /// Renders the permission tree relevant to one feature.
    ///
    /// The tree holds the root and `/features` entries plus every entry at or
    /// below `/features/<feature_id>`, so a feature array entry can answer
    /// permission queries on its own.
    pub fn for_feature(&self, feature_id: &str) -> Document {
        let features_path = FieldPath::root().push(THING_FEATURES);
        let shared = [FieldPath::root(), features_path]
            .into_iter()
            .filter_map(|path| self.grants.get_key_value(&path));
        let own = self
            .features
            .get(feature_id)
            .into_iter()
            .flatten()
            .filter_map(|path| self.grants.get_key_value(path));
        render(shared.chain(own))
    }
}

/// True if `path` names an existing field, walking objects only.
fn json_path_exists(json: &JsonValue, path: &FieldPath) -> bool {
    path.components()
        .try_fold(json, |node, segment| node.as_object()?.get(segment))
        .is_some()
}

#[derive(Default)]
struct PermissionNode<'a> {
    grants: Option<&'a PathGrants>,
    children: BTreeMap<&'a str, PermissionNode<'a>>,
}

impl PermissionNode<'_> {
    fn into_document(self) -> Document {
        let mut doc = Document::new();
        if let Some(grants) = self.grants {
            if !grants.granted.is_empty() {
                doc.insert(PERMISSION_GRANTED, grants.granted_value());
            }
            if !grants.revoked.is_empty() {
                doc.insert(PERMISSION_REVOKED, grants.revoked_value());
            }
        }
        for (key, child) in self.children {
            doc.insert(key, child.into_document());
        }
        doc
    }
}

fn render<'a>(entries: impl Iterator<Item = (&'a FieldPath, &'a PathGrants)>) -> Document {
    let mut root = PermissionNode::default();
    for (path, grants) in entries {
        if grants.is_empty() {
            continue;
        }
        let mut node = &mut root;
        for segment in path.components() {
            node = node.children.entry(segment).or_default();
        }
        node.grants = Some(grants);
    }
    root.into_document()
}
