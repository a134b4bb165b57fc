//! Relative byte-cost of document values.
//!
//! The estimate approximates the encoded size of a value closely enough to
//! compare the cost of replacing a document with the cost of patching it. Only
//! consistency matters; it is not meant to match the wire size exactly.

use crate::{
    path::FieldPath,
    value::{Document, Value},
    visitor::DocVisitor,
};

/// Cost of bool, int32, null, min-key, max-key and undefined.
pub const SMALL_SCALAR_SIZE: usize = 4;
/// Cost of double, int64, datetime and timestamp.
pub const WIDE_SCALAR_SIZE: usize = 8;
/// Cost of decimal128.
pub const DECIMAL128_SIZE: usize = 16;
/// Cost of an object-id.
pub const OBJECT_ID_SIZE: usize = 12;

/// Estimates the cost of a value and everything below it.
///
/// ```
/// # use thingsearch::{doc, value::{estimated_size, Value}};
/// // key "x" (1) + int32 (4)
/// assert_eq!(estimated_size(&Value::from(doc! { "x" => 1 })), 5);
/// ```
pub fn estimated_size(value: &Value) -> usize {
    SizeEstimator.eval(value)
}

/// Estimates the cost of a document: the sum of key lengths and value costs.
pub fn estimated_document_size(doc: &Document) -> usize {
    SizeEstimator.eval_document(doc)
}

/// Visitor computing [`estimated_size`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SizeEstimator;

impl DocVisitor for SizeEstimator {
    type Output = usize;

    fn primitive(&mut self, _path: &FieldPath, value: &Value) -> usize {
        match value {
            Value::Bool(_)
            | Value::Int32(_)
            | Value::Null
            | Value::MinKey
            | Value::MaxKey
            | Value::Undefined => SMALL_SCALAR_SIZE,
            Value::Double(_) | Value::Int64(_) | Value::DateTime(_) | Value::Timestamp { .. } => {
                WIDE_SCALAR_SIZE
            }
            Value::Decimal128(_) => DECIMAL128_SIZE,
            Value::ObjectId(_) => OBJECT_ID_SIZE,
            Value::DbPointer { namespace, .. } => namespace.len() + OBJECT_ID_SIZE,
            Value::String(s) | Value::Symbol(s) | Value::JavaScript(s) => s.len(),
            Value::Binary { bytes, .. } => bytes.len() + 1,
            Value::Regex { pattern, options } => pattern.len() + options.len(),
            Value::JavaScriptWithScope { code, scope } => code.len() + self.eval_document(scope),
            Value::Array(_) | Value::Document(_) => {
                unreachable!("containers are folded by the visitor, not the leaf handler")
            }
        }
    }

    fn array(&mut self, _path: &FieldPath, elements: Vec<usize>) -> usize {
        elements.into_iter().sum()
    }

    fn object(&mut self, _path: &FieldPath, fields: Vec<(String, usize)>) -> usize {
        fields.into_iter().map(|(key, size)| key.len() + size).sum()
    }
}
