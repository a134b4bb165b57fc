//! Aggregation expressions emitted by the diff engine.

use crate::{
    constants::EXPRESSION_SIGIL,
    path::FieldPath,
    value::{Document, Value},
};

pub const LITERAL: &str = "$literal";
pub const ARRAY_ELEM_AT: &str = "$arrayElemAt";
pub const SLICE: &str = "$slice";
pub const CONCAT_ARRAYS: &str = "$concatArrays";
pub const MERGE_OBJECTS: &str = "$mergeObjects";
pub const UNSET_FIELD: &str = "$unsetField";
pub const SET: &str = "$set";
pub const UNSET: &str = "$unset";

fn operator(name: &str, argument: impl Into<Value>) -> Value {
    Value::Document(Document::new().append(name, argument))
}

fn index_value(index: usize) -> Value {
    match i32::try_from(index) {
        Ok(i) => Value::Int32(i),
        Err(_) => Value::Int64(i64::try_from(index).unwrap_or(i64::MAX)),
    }
}

/// True if the store could read `value` as an expression rather than data.
///
/// Strings starting with `$` are field references, documents are expression
/// objects, and arrays are evaluated element by element.
pub fn needs_literal(value: &Value) -> bool {
    match value {
        Value::String(s) => s.starts_with(EXPRESSION_SIGIL),
        Value::Document(_) => true,
        Value::Array(items) => items.iter().any(needs_literal),
        _ => false,
    }
}

/// `{$literal: value}`
pub fn literal(value: Value) -> Value {
    operator(LITERAL, value)
}

/// Reference to the current value of the field at `path`.
pub fn field_ref(path: &FieldPath) -> Value {
    Value::String(path.to_field_ref())
}

/// `{$arrayElemAt: ["$path", index]}`
pub fn array_elem_at(array: &FieldPath, index: usize) -> Value {
    operator(
        ARRAY_ELEM_AT,
        vec![field_ref(array), index_value(index)],
    )
}

/// `{$slice: ["$path", start, len]}`
pub fn slice(array: &FieldPath, start: usize, len: usize) -> Value {
    operator(
        SLICE,
        vec![field_ref(array), index_value(start), index_value(len)],
    )
}

/// `{$concatArrays: [...]}`
pub fn concat_arrays(arrays: Vec<Value>) -> Value {
    operator(CONCAT_ARRAYS, arrays)
}

/// `{$mergeObjects: [base, overlay]}`
pub fn merge_objects(base: Value, overlay: Document) -> Value {
    operator(MERGE_OBJECTS, vec![base, Value::Document(overlay)])
}

/// `{$unsetField: {field: name, input: input}}`
pub fn unset_field(name: &str, input: Value) -> Value {
    let field = if name.starts_with(EXPRESSION_SIGIL) {
        literal(Value::from(name))
    } else {
        Value::from(name)
    };
    operator(
        UNSET_FIELD,
        Document::new().append("field", field).append("input", input),
    )
}
