//! Array diff: rebuilding a new array out of slices of the old one.
//!
//! Every element of the new array becomes a token: a pointer to an identical
//! element of the old array, or a replacement carrying the new value. Runs of
//! tokens are then merged into groups and encoded as one aggregation
//! expression evaluated against the old array.

use std::{
    collections::HashMap,
    hash::{Hash, Hasher},
};

use crate::{
    diff::expr,
    path::FieldPath,
    value::{Document, Value},
};

/// How elements of the new array find their counterpart in the old array.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArrayMatching {
    /// Match by identical value, first occurrence wins.
    Positional,
    /// Match documents by the value of one key field.
    ///
    /// A new element whose key is absent from the old array is compared with
    /// the element at index 0.
    Keyed { key: String },
}

/// Where one element of the new array comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Identical to the old element at this index
    Pointer(usize),
    /// New value written literally
    Replace(Value),
}

/// A run of tokens sharing one encoding.
#[derive(Debug, Clone, PartialEq)]
pub enum Group {
    /// Contiguous old elements `start..start + len`
    SubArray { start: usize, len: usize },
    /// Consecutive literal values
    ReplaceGroup(Vec<Value>),
}

/// Computes the expression that turns `old` into `new`.
///
/// The expression reads the old array through the field at `array`.
pub fn diff_array(
    array: &FieldPath,
    new: &[Value],
    old: &[Value],
    matching: &ArrayMatching,
) -> Value {
    let tokens = match matching {
        ArrayMatching::Positional => positional_tokens(new, old),
        ArrayMatching::Keyed { key } => keyed_tokens(new, old, key),
    };
    let groups = aggregate(&tokens);
    encode(array, tokens, groups)
}

/// Tokens matching elements by identical value.
pub fn positional_tokens(new: &[Value], old: &[Value]) -> Vec<Token> {
    let mut first_index: HashMap<IdenticalValue<'_>, usize> = HashMap::with_capacity(old.len());
    for (index, value) in old.iter().enumerate() {
        first_index.entry(IdenticalValue(value)).or_insert(index);
    }
    new.iter()
        .map(|value| match first_index.get(&IdenticalValue(value)) {
            Some(&index) => Token::Pointer(index),
            None => Token::Replace(value.clone()),
        })
        .collect()
}

/// Tokens matching document elements by the value of `key`.
///
/// Unmatched keys fall back to the old element at index 0, which yields a
/// pointer only if that element happens to be identical.
pub fn keyed_tokens(new: &[Value], old: &[Value], key: &str) -> Vec<Token> {
    let mut index_by_key: HashMap<IdenticalValue<'_>, usize> = HashMap::with_capacity(old.len());
    for (index, value) in old.iter().enumerate() {
        if let Some(k) = element_key(value, key) {
            index_by_key.entry(IdenticalValue(k)).or_insert(index);
        }
    }
    new.iter()
        .map(|value| {
            let index = element_key(value, key)
                .and_then(|k| index_by_key.get(&IdenticalValue(k)).copied())
                .unwrap_or(0);
            match old.get(index) {
                Some(candidate) if candidate == value => Token::Pointer(index),
                _ => Token::Replace(value.clone()),
            }
        })
        .collect()
}

fn element_key<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    value.as_document().and_then(|doc| doc.get(key))
}

/// Merges runs of contiguous pointers and of replacements, left to right.
pub fn aggregate(tokens: &[Token]) -> Vec<Group> {
    let mut groups: Vec<Group> = Vec::new();
    for token in tokens {
        match (groups.last_mut(), token) {
            (Some(Group::SubArray { start, len }), Token::Pointer(index))
                if *start + *len == *index =>
            {
                *len += 1;
            }
            (Some(Group::ReplaceGroup(values)), Token::Replace(value)) => {
                values.push(value.clone());
            }
            (_, Token::Pointer(index)) => groups.push(Group::SubArray {
                start: *index,
                len: 1,
            }),
            (_, Token::Replace(value)) => groups.push(Group::ReplaceGroup(vec![value.clone()])),
        }
    }
    groups
}

/// Encodes the groups as a concatenation when grouping paid off, the raw tokens otherwise.
fn encode(array: &FieldPath, tokens: Vec<Token>, groups: Vec<Group>) -> Value {
    let saved = tokens.len().saturating_sub(groups.len());
    if saved > 1 && groups.len() > 1 {
        expr::concat_arrays(
            groups
                .into_iter()
                .map(|group| match group {
                    Group::SubArray { start, len } => expr::slice(array, start, len),
                    Group::ReplaceGroup(values) => expr::literal(Value::Array(values)),
                })
                .collect(),
        )
    } else {
        Value::Array(
            tokens
                .into_iter()
                .map(|token| match token {
                    Token::Pointer(index) => expr::array_elem_at(array, index),
                    Token::Replace(value) => expr::literal(value),
                })
                .collect(),
        )
    }
}

/// Hash-map key comparing values bit for bit.
///
/// Doubles compare by their bit pattern, so the relation is a true
/// equivalence and hashing stays consistent with it.
struct IdenticalValue<'a>(&'a Value);

impl PartialEq for IdenticalValue<'_> {
    fn eq(&self, other: &Self) -> bool {
        identical(self.0, other.0)
    }
}

impl Eq for IdenticalValue<'_> {}

impl Hash for IdenticalValue<'_> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        hash_value(self.0, state);
    }
}

fn identical(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Double(x), Value::Double(y)) => x.to_bits() == y.to_bits(),
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| identical(x, y))
        }
        (Value::Document(x), Value::Document(y)) => identical_documents(x, y),
        (
            Value::JavaScriptWithScope { code: c1, scope: s1 },
            Value::JavaScriptWithScope { code: c2, scope: s2 },
        ) => c1 == c2 && identical_documents(s1, s2),
        _ => a == b,
    }
}

fn identical_documents(x: &Document, y: &Document) -> bool {
    x.len() == y.len()
        && x
            .iter()
            .zip(y.iter())
            .all(|((k1, v1), (k2, v2))| k1 == k2 && identical(v1, v2))
}

fn hash_value<H: Hasher>(value: &Value, state: &mut H) {
    std::mem::discriminant(value).hash(state);
    match value {
        Value::Binary { subtype, bytes } => {
            subtype.hash(state);
            bytes.hash(state);
        }
        Value::Bool(b) => b.hash(state),
        Value::DateTime(millis) => millis.hash(state),
        Value::DbPointer { namespace, id } => {
            namespace.hash(state);
            id.hash(state);
        }
        Value::Decimal128(bytes) => bytes.hash(state),
        Value::Double(d) => d.to_bits().hash(state),
        Value::Int32(n) => n.hash(state),
        Value::Int64(n) => n.hash(state),
        Value::JavaScript(code) | Value::String(code) | Value::Symbol(code) => code.hash(state),
        Value::JavaScriptWithScope { code, scope } => {
            code.hash(state);
            hash_document(scope, state);
        }
        Value::ObjectId(id) => id.hash(state),
        Value::Regex { pattern, options } => {
            pattern.hash(state);
            options.hash(state);
        }
        Value::Timestamp { time, increment } => {
            time.hash(state);
            increment.hash(state);
        }
        Value::MaxKey | Value::MinKey | Value::Null | Value::Undefined => {}
        Value::Array(items) => {
            items.len().hash(state);
            for item in items {
                hash_value(item, state);
            }
        }
        Value::Document(doc) => hash_document(doc, state),
    }
}

fn hash_document<H: Hasher>(doc: &Document, state: &mut H) {
    doc.len().hash(state);
    for (key, value) in doc.iter() {
        key.hash(state);
        hash_value(value, state);
    }
}
