//! Typed values for index documents.
//!
//! This module provides the [`Value`] enum covering every primitive kind the
//! target document store can hold, plus [`Document`], an object whose keys keep
//! their insertion order. Index documents are built from these types and the
//! diff engine compares them structurally.
//!
//! JSON input (Things and Policies) is converted with [`Value::from_json`].
//! Both types implement `Serialize` in document shape: a [`Document`] is a map
//! in field order and scalars without a JSON counterpart use `$`-prefixed
//! wrappers such as `{"$oid": "..."}`.

use std::{collections::HashMap, fmt};

mod ser;
pub mod size;

pub use size::{SizeEstimator, estimated_document_size, estimated_size};

/// A 12-byte object identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectId([u8; 12]);

impl ObjectId {
    /// Wraps raw identifier bytes.
    pub fn from_bytes(bytes: [u8; 12]) -> Self {
        Self(bytes)
    }

    /// Returns the raw identifier bytes.
    pub fn bytes(&self) -> [u8; 12] {
        self.0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

/// Values that can be stored in index documents.
///
/// # Value Kinds
///
/// ## Scalars
/// - fixed width: [`Value::Bool`], [`Value::Int32`], [`Value::Int64`], [`Value::Double`],
///   [`Value::DateTime`], [`Value::Timestamp`], [`Value::Decimal128`], [`Value::ObjectId`],
///   [`Value::Null`], [`Value::Undefined`], [`Value::MinKey`], [`Value::MaxKey`]
/// - length based: [`Value::String`], [`Value::Symbol`], [`Value::Binary`],
///   [`Value::Regex`], [`Value::JavaScript`], [`Value::JavaScriptWithScope`],
///   [`Value::DbPointer`]
///
/// ## Containers
/// - [`Value::Array`] - ordered list of values
/// - [`Value::Document`] - object with ordered, unique keys
///
/// Equality is structural: two values are equal when they have the same kind
/// and the same content, recursively.
///
/// ```
/// # use thingsearch::value::{Document, Value};
/// let a = Value::from(Document::new().append("x", 1));
/// let b = Value::from(Document::new().append("x", 1));
/// assert_eq!(a, b);
/// assert_ne!(Value::Int32(1), Value::Int64(1));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Binary data with its subtype byte
    Binary { subtype: u8, bytes: Vec<u8> },
    /// Boolean value
    Bool(bool),
    /// UTC datetime in milliseconds since the epoch
    DateTime(i64),
    /// Legacy pointer to a document in another collection
    DbPointer { namespace: String, id: ObjectId },
    /// IEEE 754-2008 decimal in its 16-byte encoding
    Decimal128([u8; 16]),
    /// 64-bit floating point
    Double(f64),
    /// 32-bit signed integer
    Int32(i32),
    /// 64-bit signed integer
    Int64(i64),
    /// JavaScript code
    JavaScript(String),
    /// JavaScript code with a scope document
    JavaScriptWithScope { code: String, scope: Document },
    /// Compares greater than every other value
    MaxKey,
    /// Compares less than every other value
    MinKey,
    /// Null value
    Null,
    /// Object identifier
    ObjectId(ObjectId),
    /// Regular expression with its option flags
    Regex { pattern: String, options: String },
    /// UTF-8 string
    String(String),
    /// Deprecated symbol type
    Symbol(String),
    /// Internal replication timestamp
    Timestamp { time: u32, increment: u32 },
    /// Deprecated undefined value
    Undefined,
    /// Ordered collection of values
    Array(Vec<Value>),
    /// Nested document
    Document(Document),
}

impl Value {
    /// Converts a JSON value into a document value.
    ///
    /// Integers become [`Value::Int32`] when they fit, [`Value::Int64`] otherwise;
    /// other numbers become [`Value::Double`]. Object keys keep the JSON map's
    /// iteration order.
    pub fn from_json(json: &serde_json::Value) -> Value {
        use crate::visitor::JsonVisitor;
        crate::visitor::JsonToValue.eval(json)
    }

    /// Converts a JSON scalar into a document value.
    ///
    /// Containers map to empty containers; use [`Value::from_json`] for trees.
    pub fn from_json_scalar(json: &serde_json::Value) -> Value {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    i32::try_from(i).map_or(Value::Int64(i), Value::Int32)
                } else {
                    // u64 beyond i64::MAX or a float
                    Value::Double(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            serde_json::Value::String(s) => Value::String(s.clone()),
            serde_json::Value::Array(_) => Value::Array(Vec::new()),
            serde_json::Value::Object(_) => Value::Document(Document::new()),
        }
    }

    /// Returns the kind name as a string
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Binary { .. } => "binary",
            Value::Bool(_) => "bool",
            Value::DateTime(_) => "datetime",
            Value::DbPointer { .. } => "dbPointer",
            Value::Decimal128(_) => "decimal128",
            Value::Double(_) => "double",
            Value::Int32(_) => "int32",
            Value::Int64(_) => "int64",
            Value::JavaScript(_) => "javascript",
            Value::JavaScriptWithScope { .. } => "javascriptWithScope",
            Value::MaxKey => "maxKey",
            Value::MinKey => "minKey",
            Value::Null => "null",
            Value::ObjectId(_) => "objectId",
            Value::Regex { .. } => "regex",
            Value::String(_) => "string",
            Value::Symbol(_) => "symbol",
            Value::Timestamp { .. } => "timestamp",
            Value::Undefined => "undefined",
            Value::Array(_) => "array",
            Value::Document(_) => "document",
        }
    }

    /// Attempts to convert to a string slice
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Attempts to read an integer of either width
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int32(n) => Some(i64::from(*n)),
            Value::Int64(n) => Some(*n),
            _ => None,
        }
    }

    /// Attempts to convert to an array
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Attempts to convert to a document
    pub fn as_document(&self) -> Option<&Document> {
        match self {
            Value::Document(doc) => Some(doc),
            _ => None,
        }
    }

    /// Attempts to convert to a mutable document reference
    pub fn as_document_mut(&mut self) -> Option<&mut Document> {
        match self {
            Value::Document(doc) => Some(doc),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int32(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int64(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Double(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<Document> for Value {
    fn from(value: Document) -> Self {
        Value::Document(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Value::Array(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

/// An object with unique keys kept in insertion order.
///
/// Inserting an existing key replaces its value in place, so the key keeps
/// its original position. Equality compares keys, values and order.
///
/// Fields live in a `Vec` for ordered iteration; a key-to-position map keeps
/// lookups and inserts constant-time so wide objects stay linear to build and
/// diff. Removal shifts later fields and is linear.
#[derive(Clone, Default)]
pub struct Document {
    fields: Vec<(String, Value)>,
    positions: HashMap<String, usize>,
}

impl Document {
    /// Creates an empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty document with room for `capacity` fields.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            fields: Vec::with_capacity(capacity),
            positions: HashMap::with_capacity(capacity),
        }
    }

    /// Inserts a field, returning the previous value for that key.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        let key = key.into();
        let value = value.into();
        match self.positions.get(&key) {
            Some(&index) => Some(std::mem::replace(&mut self.fields[index].1, value)),
            None => {
                self.positions.insert(key.clone(), self.fields.len());
                self.fields.push((key, value));
                None
            }
        }
    }

    /// Builder-style insert.
    pub fn append(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Returns the value stored under `key`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.positions.get(key).map(|&index| &self.fields[index].1)
    }

    /// Returns a mutable reference to the value stored under `key`.
    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        let index = *self.positions.get(key)?;
        Some(&mut self.fields[index].1)
    }

    /// Returns the nested document stored under `key`.
    pub fn get_document(&self, key: &str) -> Option<&Document> {
        self.get(key).and_then(Value::as_document)
    }

    /// Returns the array stored under `key`.
    pub fn get_array(&self, key: &str) -> Option<&[Value]> {
        self.get(key).and_then(Value::as_array)
    }

    /// Returns the string stored under `key`.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    /// Returns true if `key` is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.positions.contains_key(key)
    }

    /// Removes `key`, returning its value.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        let index = self.positions.remove(key)?;
        let (_, value) = self.fields.remove(index);
        for (shifted, _) in &self.fields[index..] {
            if let Some(position) = self.positions.get_mut(shifted) {
                *position -= 1;
            }
        }
        Some(value)
    }

    /// Returns a copy of this document without the given keys.
    pub fn without(&self, keys: &[&str]) -> Document {
        self.fields
            .iter()
            .filter(|(k, _)| !keys.contains(&k.as_str()))
            .cloned()
            .collect()
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if the document has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterates over fields in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Iterates over keys in order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(k, _)| k.as_str())
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl PartialEq for Document {
    fn eq(&self, other: &Self) -> bool {
        self.fields == other.fields
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Document {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let iter = iter.into_iter();
        let mut doc = Document::with_capacity(iter.size_hint().0);
        for (key, value) in iter {
            doc.insert(key, value);
        }
        doc
    }
}

impl IntoIterator for Document {
    type Item = (String, Value);
    type IntoIter = std::vec::IntoIter<(String, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}

/// Builds a [`Document`] from `key => value` pairs.
///
/// ```
/// # use thingsearch::doc;
/// let d = doc! { "id" => "temp", "x" => 1 };
/// assert_eq!(d.len(), 2);
/// assert_eq!(d.get_str("id"), Some("temp"));
/// ```
#[macro_export]
macro_rules! doc {
    () => {
        $crate::value::Document::new()
    };

    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut doc = $crate::value::Document::new();
        $(
            doc.insert($key, $value);
        )+
        doc
    }};
}
