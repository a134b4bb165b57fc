//! Path-threaded folds over JSON trees and document-value trees.
//!
//! Both visitors recurse the same way: objects recurse into each field and pair
//! the key with the recursive result, arrays recurse into each element, and
//! primitives call the leaf handler. The path of every node is threaded
//! through the fold. Array elements receive the path of their array, since
//! index documents never address array elements by position.
//!
//! Two traits exist because the document model has more primitive kinds than
//! JSON.

use serde_json::Value as JsonValue;

use crate::{
    path::FieldPath,
    value::{Document, Value},
};

/// A fold over a JSON tree.
pub trait JsonVisitor {
    /// Result of visiting one node.
    type Output;

    /// Handles null, bool, number and string nodes.
    fn primitive(&mut self, path: &FieldPath, value: &JsonValue) -> Self::Output;

    /// Combines the results of an array's elements.
    fn array(&mut self, path: &FieldPath, elements: Vec<Self::Output>) -> Self::Output;

    /// Combines the results of an object's fields.
    fn object(&mut self, path: &FieldPath, fields: Vec<(String, Self::Output)>) -> Self::Output;

    /// Visits `value` as the root.
    fn eval(&mut self, value: &JsonValue) -> Self::Output {
        self.eval_at(&FieldPath::root(), value)
    }

    /// Visits `value` located at `path`.
    fn eval_at(&mut self, path: &FieldPath, value: &JsonValue) -> Self::Output {
        match value {
            JsonValue::Array(items) => {
                let elements = items.iter().map(|item| self.eval_at(path, item)).collect();
                self.array(path, elements)
            }
            JsonValue::Object(map) => {
                let fields = map
                    .iter()
                    .map(|(key, item)| (key.clone(), self.eval_at(&path.child(key), item)))
                    .collect();
                self.object(path, fields)
            }
            _ => self.primitive(path, value),
        }
    }
}

/// A fold over a document-value tree.
pub trait DocVisitor {
    /// Result of visiting one node.
    type Output;

    /// Handles every kind other than arrays and documents.
    fn primitive(&mut self, path: &FieldPath, value: &Value) -> Self::Output;

    /// Combines the results of an array's elements.
    fn array(&mut self, path: &FieldPath, elements: Vec<Self::Output>) -> Self::Output;

    /// Combines the results of a document's fields.
    fn object(&mut self, path: &FieldPath, fields: Vec<(String, Self::Output)>) -> Self::Output;

    /// Visits `value` as the root.
    fn eval(&mut self, value: &Value) -> Self::Output {
        self.eval_at(&FieldPath::root(), value)
    }

    /// Visits a document as the root.
    fn eval_document(&mut self, doc: &Document) -> Self::Output {
        self.eval_document_at(&FieldPath::root(), doc)
    }

    /// Visits `value` located at `path`.
    fn eval_at(&mut self, path: &FieldPath, value: &Value) -> Self::Output {
        match value {
            Value::Array(items) => {
                let elements = items.iter().map(|item| self.eval_at(path, item)).collect();
                self.array(path, elements)
            }
            Value::Document(doc) => self.eval_document_at(path, doc),
            _ => self.primitive(path, value),
        }
    }

    /// Visits a document located at `path`.
    fn eval_document_at(&mut self, path: &FieldPath, doc: &Document) -> Self::Output {
        let fields = doc
            .iter()
            .map(|(key, item)| (key.to_string(), self.eval_at(&path.child(key), item)))
            .collect();
        self.object(path, fields)
    }
}

/// Re-encodes a JSON tree as a document value.
pub(crate) struct JsonToValue;

impl JsonVisitor for JsonToValue {
    type Output = Value;

    fn primitive(&mut self, _path: &FieldPath, value: &JsonValue) -> Value {
        Value::from_json_scalar(value)
    }

    fn array(&mut self, _path: &FieldPath, elements: Vec<Value>) -> Value {
        Value::Array(elements)
    }

    fn object(&mut self, _path: &FieldPath, fields: Vec<(String, Value)>) -> Value {
        Value::Document(fields.into_iter().collect())
    }
}
