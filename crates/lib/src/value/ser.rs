//! Document-shaped serialization of values.
//!
//! Kinds with a JSON counterpart serialize as themselves. The rest use the
//! relaxed extended-JSON wrappers the document store understands, so output
//! reads like the stored document rather than like the Rust enum.

use chrono::{DateTime, SecondsFormat};
use serde::{
    Serialize, Serializer,
    ser::{SerializeMap, SerializeSeq},
};

use crate::value::{Document, ObjectId, Value};

/// Serializes a single-entry map `{key: value}`.
fn wrapped<S, T>(serializer: S, key: &str, value: &T) -> Result<S::Ok, S::Error>
where
    S: Serializer,
    T: Serialize + ?Sized,
{
    let mut map = serializer.serialize_map(Some(1))?;
    map.serialize_entry(key, value)?;
    map.end()
}

#[derive(Serialize)]
struct BinaryRepr<'a> {
    #[serde(with = "serde_bytes")]
    bytes: &'a [u8],
    #[serde(rename = "subType")]
    subtype: u8,
}

#[derive(Serialize)]
struct DbPointerRepr<'a> {
    #[serde(rename = "$ref")]
    namespace: &'a str,
    #[serde(rename = "$id")]
    id: &'a ObjectId,
}

#[derive(Serialize)]
struct RegexRepr<'a> {
    pattern: &'a str,
    options: &'a str,
}

#[derive(Serialize)]
struct TimestampRepr {
    t: u32,
    i: u32,
}

impl Serialize for ObjectId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        wrapped(serializer, "$oid", &self.to_string())
    }
}

impl Serialize for Document {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (key, value) in self.iter() {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Value::Binary { subtype, bytes } => wrapped(
                serializer,
                "$binary",
                &BinaryRepr {
                    bytes,
                    subtype: *subtype,
                },
            ),
            Value::Bool(b) => serializer.serialize_bool(*b),
            // Out-of-range instants keep their raw millisecond count
            Value::DateTime(millis) => match DateTime::from_timestamp_millis(*millis) {
                Some(instant) => wrapped(
                    serializer,
                    "$date",
                    &instant.to_rfc3339_opts(SecondsFormat::Millis, true),
                ),
                None => wrapped(serializer, "$date", millis),
            },
            Value::DbPointer { namespace, id } => {
                wrapped(serializer, "$dbPointer", &DbPointerRepr { namespace, id })
            }
            Value::Decimal128(bytes) => {
                wrapped(serializer, "$numberDecimalBytes", &hex::encode(bytes))
            }
            Value::Double(d) => serializer.serialize_f64(*d),
            Value::Int32(n) => serializer.serialize_i32(*n),
            Value::Int64(n) => serializer.serialize_i64(*n),
            Value::JavaScript(code) => wrapped(serializer, "$code", code),
            Value::JavaScriptWithScope { code, scope } => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("$code", code)?;
                map.serialize_entry("$scope", scope)?;
                map.end()
            }
            Value::MaxKey => wrapped(serializer, "$maxKey", &1),
            Value::MinKey => wrapped(serializer, "$minKey", &1),
            Value::Null => serializer.serialize_unit(),
            Value::ObjectId(id) => id.serialize(serializer),
            Value::Regex { pattern, options } => {
                wrapped(serializer, "$regularExpression", &RegexRepr { pattern, options })
            }
            Value::String(s) => serializer.serialize_str(s),
            Value::Symbol(s) => wrapped(serializer, "$symbol", s),
            Value::Timestamp { time, increment } => wrapped(
                serializer,
                "$timestamp",
                &TimestampRepr {
                    t: *time,
                    i: *increment,
                },
            ),
            Value::Undefined => wrapped(serializer, "$undefined", &true),
            Value::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Document(doc) => doc.serialize(serializer),
        }
    }
}
