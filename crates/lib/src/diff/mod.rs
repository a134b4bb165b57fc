//! Structural diff between index documents.
//!
//! [`minus`] compares a new document against the stored one and produces a
//! [`Diff`]: an ordered list of field assignments and removals together with
//! two cost estimates, the size of writing the new document wholesale and the
//! size of the patch. [`update::compile`] turns a diff into the cheapest
//! update the store accepts.
//!
//! Sub-diffs that cost more than rewriting their field are collapsed into a
//! single assignment on the way up, so the patch never grows past what
//! replacing each changed field would cost.

use std::iter::Sum;

use crate::{
    constants::{FIELD_FEATURE_ID, FIELD_FEATURES, FIELD_INTERNAL},
    path::FieldPath,
    value::{Document, Value, estimated_document_size, estimated_size},
};

pub mod array;
pub mod expr;
pub mod update;

pub use array::ArrayMatching;
pub use update::{FlatUpdate, StoreCapabilities, Update, compile, compile_update};

/// Right-hand side of one field assignment.
#[derive(Debug, Clone, PartialEq)]
pub enum Assignment {
    /// Plain value the store would misread as an expression unless wrapped
    Literal(Value),
    /// Plain value that can be written as is
    Value(Value),
    /// Aggregation expression evaluated against the stored document
    Expression(Value),
}

impl Assignment {
    /// Wraps a plain value, marking it literal if the store could misread it.
    pub fn for_value(value: Value) -> Self {
        if expr::needs_literal(&value) {
            Assignment::Literal(value)
        } else {
            Assignment::Value(value)
        }
    }

    /// The plain value, if this is not an expression.
    pub fn value(&self) -> Option<&Value> {
        match self {
            Assignment::Literal(value) | Assignment::Value(value) => Some(value),
            Assignment::Expression(_) => None,
        }
    }

    pub fn is_expression(&self) -> bool {
        matches!(self, Assignment::Expression(_))
    }

    /// Renders the assignment as a pipeline expression.
    pub fn to_expression(&self) -> Value {
        match self {
            Assignment::Literal(value) => expr::literal(value.clone()),
            Assignment::Value(value) | Assignment::Expression(value) => value.clone(),
        }
    }
}

/// Changes turning one document into another, with their estimated cost.
///
/// `replacement_size` is the cost of writing the new value wholesale,
/// `diff_size` the cost of the assignments and removals. Assignments and
/// removals keep the order in which the documents were walked.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Diff {
    replacement_size: usize,
    diff_size: usize,
    set: Vec<(FieldPath, Assignment)>,
    unset: Vec<FieldPath>,
}

impl Diff {
    /// A diff with no changes for a value of the given size.
    pub fn empty(replacement_size: usize) -> Self {
        Self {
            replacement_size,
            ..Self::default()
        }
    }

    /// A diff assigning `assignment` at `path` wholesale.
    pub fn replace(path: FieldPath, assignment: Assignment, replacement_size: usize) -> Self {
        Self {
            replacement_size,
            diff_size: path.byte_len() + replacement_size,
            set: vec![(path, assignment)],
            unset: Vec::new(),
        }
    }

    /// A diff removing the field at `path`.
    pub fn remove(path: FieldPath) -> Self {
        Self {
            replacement_size: 0,
            diff_size: path.byte_len(),
            set: Vec::new(),
            unset: vec![path],
        }
    }

    /// Appends `other`, summing sizes.
    pub fn concat(mut self, other: Diff) -> Self {
        self.replacement_size += other.replacement_size;
        self.diff_size += other.diff_size;
        self.set.extend(other.set);
        self.unset.extend(other.unset);
        self
    }

    /// True if the diff changes nothing.
    pub fn is_empty(&self) -> bool {
        self.set.is_empty() && self.unset.is_empty()
    }

    pub fn replacement_size(&self) -> usize {
        self.replacement_size
    }

    pub fn diff_size(&self) -> usize {
        self.diff_size
    }

    pub fn set(&self) -> &[(FieldPath, Assignment)] {
        &self.set
    }

    pub fn unset(&self) -> &[FieldPath] {
        &self.unset
    }

    /// True if patching is strictly cheaper than replacing.
    pub fn is_diff_smaller(&self) -> bool {
        self.diff_size < self.replacement_size
    }

    /// True if any assignment is an aggregation expression.
    pub fn requires_pipeline(&self) -> bool {
        self.set.iter().any(|(_, assignment)| assignment.is_expression())
    }

    /// Consumes the diff, yielding its assignments and removals.
    pub fn into_parts(self) -> (Vec<(FieldPath, Assignment)>, Vec<FieldPath>) {
        (self.set, self.unset)
    }
}

impl Sum for Diff {
    fn sum<I: Iterator<Item = Diff>>(iter: I) -> Self {
        iter.fold(Diff::default(), Diff::concat)
    }
}

/// How [`minus`] treats arrays whose content changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffOptions {
    /// Diff changed arrays element-wise instead of replacing them
    pub array_recursion: bool,
    /// Match array elements by this key field instead of by value
    pub key_matcher: Option<String>,
}

impl DiffOptions {
    /// Changed arrays are replaced wholesale.
    pub fn replace_arrays() -> Self {
        Self::default()
    }

    /// Changed arrays are rebuilt from identical old elements.
    pub fn positional() -> Self {
        Self {
            array_recursion: true,
            key_matcher: None,
        }
    }

    /// Changed arrays of documents are rebuilt from old elements with the same `key`.
    pub fn keyed(key: impl Into<String>) -> Self {
        Self {
            array_recursion: true,
            key_matcher: Some(key.into()),
        }
    }

    fn matching(&self) -> Option<ArrayMatching> {
        if !self.array_recursion {
            return None;
        }
        Some(match &self.key_matcher {
            Some(key) => ArrayMatching::Keyed { key: key.clone() },
            None => ArrayMatching::Positional,
        })
    }
}

/// Computes the changes turning `old` into `new`.
///
/// ```
/// # use thingsearch::{doc, diff::{minus, DiffOptions}};
/// let old = doc! { "a" => 1, "b" => "x" };
/// let new = doc! { "a" => 2, "b" => "x" };
/// let diff = minus(&new, &old, &DiffOptions::default());
/// assert_eq!(diff.set().len(), 1);
/// assert_eq!(diff.set()[0].0.to_dotted(), "a");
/// ```
pub fn minus(new: &Document, old: &Document, options: &DiffOptions) -> Diff {
    if new == old {
        return Diff::empty(estimated_document_size(new));
    }
    let root = FieldPath::root();
    if new.is_empty() {
        return Diff::replace(
            root,
            Assignment::Literal(Value::Document(Document::new())),
            0,
        );
    }
    diff_document(&root, new, old, options)
}

/// Diffs two index documents.
///
/// The top-level fields are diffed with arrays replaced wholesale, the flat
/// leaf array element by element, and the feature array by feature id.
pub fn minus_thing_docs(new: &Document, old: &Document) -> Diff {
    let separate = [FIELD_FEATURES, FIELD_INTERNAL];
    let root = FieldPath::root();

    let body = minus(
        &new.without(&separate),
        &old.without(&separate),
        &DiffOptions::replace_arrays(),
    );
    let internal = diff_field(
        &root,
        FIELD_INTERNAL,
        new.get(FIELD_INTERNAL),
        old.get(FIELD_INTERNAL),
        &DiffOptions::positional(),
    );
    let features = diff_field(
        &root,
        FIELD_FEATURES,
        new.get(FIELD_FEATURES),
        old.get(FIELD_FEATURES),
        &DiffOptions::keyed(FIELD_FEATURE_ID),
    );
    [body, internal, features].into_iter().sum()
}

fn diff_document(path: &FieldPath, new: &Document, old: &Document, options: &DiffOptions) -> Diff {
    let added_or_changed: Diff = new
        .iter()
        .map(|(key, value)| diff_field(path, key, Some(value), old.get(key), options))
        .sum();
    let removed: Diff = old
        .keys()
        .filter(|key| !new.contains_key(key))
        .map(|key| Diff::remove(path.child(key)))
        .sum();
    added_or_changed.concat(removed)
}

/// Diffs the field `key` below `parent`, where either side may be absent.
///
/// The replacement size includes the key, so the parent can sum it directly.
fn diff_field(
    parent: &FieldPath,
    key: &str,
    new: Option<&Value>,
    old: Option<&Value>,
    options: &DiffOptions,
) -> Diff {
    let child = parent.child(key);
    let (new, old) = match (new, old) {
        (None, None) => return Diff::empty(0),
        (None, Some(_)) => return Diff::remove(child),
        (Some(new), None) => {
            let size = estimated_size(new);
            let mut diff = Diff::replace(child, Assignment::for_value(new.clone()), size);
            diff.replacement_size += key.len();
            return diff;
        }
        (Some(new), Some(old)) => (new, old),
    };

    let size = estimated_size(new);
    if new == old {
        return Diff::empty(key.len() + size);
    }
    let sub = diff_value(&child, new, old, options);
    let mut diff = if sub.diff_size <= sub.replacement_size + key.len() {
        sub
    } else {
        Diff::replace(child, Assignment::for_value(new.clone()), size)
    };
    diff.replacement_size = key.len() + size;
    diff
}

/// Diffs two values at `path`; the replacement size excludes the key.
fn diff_value(path: &FieldPath, new: &Value, old: &Value, options: &DiffOptions) -> Diff {
    let size = estimated_size(new);
    if new == old {
        return Diff::empty(size);
    }
    match (new, old) {
        (Value::Document(new_doc), Value::Document(old_doc)) if !new_doc.is_empty() => {
            diff_document(path, new_doc, old_doc, options)
        }
        (Value::Array(new_items), Value::Array(old_items)) if !path.is_empty() => {
            match options.matching() {
                Some(matching) => {
                    let expression = array::diff_array(path, new_items, old_items, &matching);
                    let cost = path.byte_len() + estimated_size(&expression);
                    if cost <= size {
                        Diff {
                            replacement_size: size,
                            diff_size: cost,
                            set: vec![(path.clone(), Assignment::Expression(expression))],
                            unset: Vec::new(),
                        }
                    } else {
                        Diff::replace(path.clone(), Assignment::for_value(new.clone()), size)
                    }
                }
                None => Diff::replace(path.clone(), Assignment::for_value(new.clone()), size),
            }
        }
        _ => Diff::replace(path.clone(), Assignment::for_value(new.clone()), size),
    }
}
