//! Compilation of diffs into store updates.
//!
//! A [`Diff`] compiles to one of four updates, cheapest first:
//!
//! - [`Update::Unchanged`] when there is nothing to write,
//! - [`Update::Flat`] when every assignment is a plain value,
//! - [`Update::Pipeline`] when some assignment is an aggregation expression,
//! - [`Update::Replace`] when patching is not cheaper than rewriting, or the
//!   patch cannot be expressed against this store.

use serde::{Deserialize, Serialize};

use crate::{
    constants::EXPRESSION_SIGIL,
    diff::{Assignment, Diff, expr, minus_thing_docs},
    path::FieldPath,
    value::{Document, Value},
};

/// Wire version from which the store evaluates `$unsetField`.
pub const UNSET_FIELD_WIRE_VERSION: u32 = 13;

/// What the target store can evaluate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreCapabilities {
    pub max_wire_version: u32,
}

impl StoreCapabilities {
    pub fn new(max_wire_version: u32) -> Self {
        Self { max_wire_version }
    }

    /// True if nested fields can be removed inside a pipeline.
    pub fn supports_unset_field(&self) -> bool {
        self.max_wire_version >= UNSET_FIELD_WIRE_VERSION
    }
}

/// Field-wise update with plain values, keyed by dotted path.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlatUpdate {
    pub set: Vec<(String, Value)>,
    pub unset: Vec<String>,
}

impl FlatUpdate {
    /// Renders `{$set: {path: value}, $unset: {path: ""}}`, omitting empty operators.
    pub fn to_document(&self) -> Document {
        let mut update = Document::new();
        if !self.set.is_empty() {
            update.insert(
                expr::SET,
                self.set
                    .iter()
                    .map(|(path, value)| (path.clone(), value.clone()))
                    .collect::<Document>(),
            );
        }
        if !self.unset.is_empty() {
            update.insert(
                expr::UNSET,
                self.unset
                    .iter()
                    .map(|path| (path.clone(), Value::from("")))
                    .collect::<Document>(),
            );
        }
        update
    }
}

/// An update ready to send to the store.
#[derive(Debug, Clone, PartialEq)]
pub enum Update {
    /// Stored document is already current
    Unchanged,
    /// Write the whole document
    Replace(Document),
    /// Assign and remove plain values by dotted path
    Flat(FlatUpdate),
    /// Aggregation pipeline evaluated against the stored document
    Pipeline(Vec<Document>),
}

impl Update {
    pub fn is_unchanged(&self) -> bool {
        matches!(self, Update::Unchanged)
    }

    pub fn is_replace(&self) -> bool {
        matches!(self, Update::Replace(_))
    }

    /// Short name of the variant, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Update::Unchanged => "unchanged",
            Update::Replace(_) => "replace",
            Update::Flat(_) => "flat",
            Update::Pipeline(_) => "pipeline",
        }
    }
}

/// Computes the update bringing `previous` up to `new`.
///
/// Without a previous document the new one is written wholesale.
pub fn compile_update(
    new: &Document,
    previous: Option<&Document>,
    capabilities: StoreCapabilities,
) -> Update {
    match previous {
        Some(old) => compile(minus_thing_docs(new, old), new, capabilities),
        None => Update::Replace(new.clone()),
    }
}

/// Compiles `diff`, computed against `new`, into the cheapest update.
pub fn compile(diff: Diff, new: &Document, capabilities: StoreCapabilities) -> Update {
    if diff.is_empty() {
        return Update::Unchanged;
    }
    if !diff.is_diff_smaller() {
        tracing::debug!(
            diff_size = diff.diff_size(),
            replacement_size = diff.replacement_size(),
            "Replacing document: diff is not smaller than replacement"
        );
        return Update::Replace(new.clone());
    }
    if let Some(path) = unaddressable_path(&diff) {
        tracing::debug!(path = %path, "Replacing document: field cannot be addressed by path");
        return Update::Replace(new.clone());
    }

    let pipeline = diff.requires_pipeline();
    let (set, unset) = diff.into_parts();
    if !pipeline {
        return Update::Flat(flat_update(set, unset));
    }
    match pipeline_update(set, unset, capabilities) {
        Some(stages) => Update::Pipeline(stages),
        None => {
            tracing::debug!(
                max_wire_version = capabilities.max_wire_version,
                "Replacing document: diff cannot be expressed as a pipeline"
            );
            Update::Replace(new.clone())
        }
    }
}

/// The first changed path the store cannot address: the root, or a segment
/// that is empty, contains a dot or starts with `$`.
fn unaddressable_path(diff: &Diff) -> Option<&FieldPath> {
    diff.set()
        .iter()
        .map(|(path, _)| path)
        .chain(diff.unset())
        .find(|path| {
            path.is_empty()
                || path.components().any(|segment| {
                    segment.is_empty()
                        || segment.contains('.')
                        || segment.starts_with(EXPRESSION_SIGIL)
                })
        })
}

fn flat_update(set: Vec<(FieldPath, Assignment)>, unset: Vec<FieldPath>) -> FlatUpdate {
    FlatUpdate {
        set: set
            .into_iter()
            .filter_map(|(path, assignment)| match assignment {
                Assignment::Literal(value) | Assignment::Value(value) => {
                    Some((path.to_dotted(), value))
                }
                Assignment::Expression(_) => None,
            })
            .collect(),
        unset: unset.iter().map(FieldPath::to_dotted).collect(),
    }
}

/// Changes below one document, by key in first-touched order.
#[derive(Debug, Default)]
struct PatchTree {
    entries: Vec<(String, Patch)>,
}

#[derive(Debug)]
enum Patch {
    Assign(Value),
    Remove,
    Nested(PatchTree),
}

impl PatchTree {
    /// Records `patch` at `segments`; `None` if it overlaps an earlier change.
    fn insert(&mut self, segments: &[&str], patch: Patch) -> Option<()> {
        let (first, rest) = segments.split_first()?;
        let position = self.entries.iter().position(|(key, _)| key == first);
        if rest.is_empty() {
            return match position {
                Some(_) => None,
                None => {
                    self.entries.push((first.to_string(), patch));
                    Some(())
                }
            };
        }
        let index = match position {
            Some(index) => index,
            None => {
                self.entries
                    .push((first.to_string(), Patch::Nested(PatchTree::default())));
                self.entries.len() - 1
            }
        };
        match &mut self.entries[index].1 {
            Patch::Nested(tree) => tree.insert(rest, patch),
            Patch::Assign(_) | Patch::Remove => None,
        }
    }

    /// Expression for the document at `path` with this tree's changes applied.
    ///
    /// Assignments merge over the stored document; removals wrap the result in
    /// `$unsetField`, which needs store support.
    fn render(self, path: &FieldPath, capabilities: StoreCapabilities) -> Option<Value> {
        let mut overlay = Document::new();
        let mut removed = Vec::new();
        for (key, patch) in self.entries {
            match patch {
                Patch::Assign(value) => {
                    overlay.insert(key, value);
                }
                Patch::Nested(tree) => {
                    let value = tree.render(&path.child(&key), capabilities)?;
                    overlay.insert(key, value);
                }
                Patch::Remove => removed.push(key),
            }
        }
        if !removed.is_empty() && !capabilities.supports_unset_field() {
            return None;
        }

        let base = expr::field_ref(path);
        let merged = if overlay.is_empty() {
            base
        } else {
            expr::merge_objects(base, overlay)
        };
        Some(
            removed
                .iter()
                .fold(merged, |input, key| expr::unset_field(key, input)),
        )
    }
}

/// Builds `[{$set: {...}}, {$unset: [...]}]`, omitting empty stages.
fn pipeline_update(
    set: Vec<(FieldPath, Assignment)>,
    unset: Vec<FieldPath>,
    capabilities: StoreCapabilities,
) -> Option<Vec<Document>> {
    let mut tree = PatchTree::default();
    for (path, assignment) in set {
        let segments: Vec<&str> = path.components().collect();
        tree.insert(&segments, Patch::Assign(assignment.to_expression()))?;
    }
    for path in &unset {
        let segments: Vec<&str> = path.components().collect();
        tree.insert(&segments, Patch::Remove)?;
    }

    let mut assignments = Document::new();
    let mut removed = Vec::new();
    for (key, patch) in tree.entries {
        match patch {
            Patch::Assign(value) => {
                assignments.insert(key, value);
            }
            Patch::Nested(subtree) => {
                let value = subtree.render(&FieldPath::root().push(key.as_str()), capabilities)?;
                assignments.insert(key, value);
            }
            Patch::Remove => removed.push(Value::String(key)),
        }
    }

    let mut stages = Vec::with_capacity(2);
    if !assignments.is_empty() {
        stages.push(Document::new().append(expr::SET, assignments));
    }
    if !removed.is_empty() {
        stages.push(Document::new().append(expr::UNSET, removed));
    }
    Some(stages)
}
