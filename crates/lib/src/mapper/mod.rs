//! Mapping of Things and Policies to index documents.
//!
//! [`ThingMapper::map`] is the entry point: it derives [`Metadata`], evaluates
//! the Policy against the Thing, and assembles the index document with a fixed
//! field set and order:
//!
//! | Field | Content |
//! |---|---|
//! | `_id` | Thing id |
//! | `_namespace` | namespace part of the id |
//! | `gr` | subjects granted READ anywhere |
//! | `_revision` | Thing revision |
//! | `policyId` | policy id enforced |
//! | `_policyRevision` | policy revision enforced |
//! | `t` | the Thing body |
//! | `p` | permission tree |
//! | `f` | feature array |
//! | `_internal` | flat leaf array (optional) |

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::{
    constants::{
        FIELD_FEATURE_ID, FIELD_FEATURES, FIELD_GLOBAL_READ, FIELD_ID, FIELD_INTERNAL,
        FIELD_NAMESPACE, FIELD_PERMISSIONS, FIELD_POLICY_ID, FIELD_POLICY_REVISION,
        FIELD_REVISION, FIELD_THING, THING_FEATURES,
    },
    policy::{EvaluatedPolicy, Policy},
    value::{Document, Value},
};

pub mod errors;
pub mod flatten;
pub mod metadata;

pub use errors::MappingError;
pub use flatten::{FieldLengthRestriction, FlatLeaf, MaxLeafSize, ThingFlattener, Unrestricted};
pub use metadata::{Metadata, UpdateReason};

/// Mapper configuration.
///
/// # Example
///
/// ```
/// # use thingsearch::mapper::MapperConfig;
/// let config = MapperConfig::from_json_str(r#"{"maxArraySize": 10}"#)?;
/// assert_eq!(config.max_array_size, 10);
/// assert!(config.include_internal);
/// # Ok::<(), thingsearch::Error>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MapperConfig {
    /// Maximum leaves flattened below any array; negative means unbounded.
    pub max_array_size: i64,
    /// Whether to emit the legacy `_internal` array.
    pub include_internal: bool,
}

impl Default for MapperConfig {
    fn default() -> Self {
        Self {
            max_array_size: -1,
            include_internal: true,
        }
    }
}

impl MapperConfig {
    /// Parses a configuration from JSON; absent fields take their defaults.
    pub fn from_json_str(json: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Output of one mapping call.
#[derive(Debug, Clone, PartialEq)]
pub struct MappedThing {
    pub metadata: Metadata,
    pub document: Document,
}

/// Maps Things to index documents.
///
/// The mapper holds no state between calls: it can be shared across threads
/// and every call builds its own evaluated policy.
#[derive(Debug, Clone)]
pub struct ThingMapper<R = Unrestricted> {
    config: MapperConfig,
    restriction: R,
}

impl ThingMapper<Unrestricted> {
    /// Creates a mapper that does not restrict field lengths.
    pub fn new(config: MapperConfig) -> Self {
        Self::with_restriction(config, Unrestricted)
    }
}

impl Default for ThingMapper<Unrestricted> {
    fn default() -> Self {
        Self::new(MapperConfig::default())
    }
}

impl<R: FieldLengthRestriction> ThingMapper<R> {
    /// Creates a mapper enforcing `restriction` on flattened leaves.
    pub fn with_restriction(config: MapperConfig, restriction: R) -> Self {
        Self {
            config,
            restriction,
        }
    }

    /// Returns the mapper configuration.
    pub fn config(&self) -> &MapperConfig {
        &self.config
    }

    /// Maps `thing` enforced by `policy` to an index document.
    ///
    /// # Errors
    ///
    /// Returns [`MappingError`] if the Thing has no string `id` with a
    /// namespace, no integer `revision`, or a non-object `features` field.
    pub fn map(
        &self,
        thing: &JsonValue,
        policy: &Policy,
        policy_revision: Option<i64>,
        previous: Option<&Metadata>,
    ) -> crate::Result<MappedThing> {
        let metadata = Metadata::derive(
            thing,
            policy.policy_id.as_deref(),
            policy_revision,
            previous,
        )?;
        let features = features_of(thing)?;
        let evaluated = EvaluatedPolicy::evaluate(policy, thing);

        let mut document = Document::with_capacity(10);
        document.insert(FIELD_ID, metadata.thing_id.as_str());
        document.insert(FIELD_NAMESPACE, metadata.namespace());
        document.insert(FIELD_GLOBAL_READ, evaluated.global_read_value());
        document.insert(FIELD_REVISION, metadata.thing_revision);
        document.insert(FIELD_POLICY_ID, metadata.policy_id.as_deref());
        document.insert(FIELD_POLICY_REVISION, metadata.policy_revision);
        document.insert(FIELD_THING, Value::from_json(thing));
        document.insert(FIELD_PERMISSIONS, evaluated.for_thing());
        document.insert(
            FIELD_FEATURES,
            Value::Array(
                features
                    .iter()
                    .map(|(id, feature)| Value::Document(feature_entry(id, feature, &evaluated)))
                    .collect(),
            ),
        );
        if self.config.include_internal {
            let mut flattener =
                ThingFlattener::new(&evaluated, &self.restriction, self.config.max_array_size);
            document.insert(FIELD_INTERNAL, flattener.flatten_to_value(thing));
        }

        tracing::debug!(
            thing_id = %metadata.thing_id,
            revision = metadata.thing_revision,
            features = features.len(),
            "Mapped thing to index document"
        );

        Ok(MappedThing { metadata, document })
    }
}

/// The Thing's features in key order; a missing or null `features` field means none.
fn features_of(thing: &JsonValue) -> Result<Vec<(&String, &JsonValue)>, MappingError> {
    match thing.get(THING_FEATURES) {
        None | Some(JsonValue::Null) => Ok(Vec::new()),
        Some(JsonValue::Object(features)) => Ok(features.iter().collect()),
        Some(_) => Err(MappingError::invalid(THING_FEATURES, "expected an object")),
    }
}

/// Builds one feature array entry: the id, the feature's own fields, and its permissions.
///
/// The feature's fields are copied one level deep; reserved entry fields win
/// over feature fields of the same name.
fn feature_entry(id: &str, feature: &JsonValue, evaluated: &EvaluatedPolicy) -> Document {
    let mut entry = Document::new();
    entry.insert(FIELD_FEATURE_ID, id);
    if let JsonValue::Object(fields) = feature {
        for (key, value) in fields {
            if key != FIELD_FEATURE_ID && key != FIELD_PERMISSIONS {
                entry.insert(key.as_str(), Value::from_json(value));
            }
        }
    }
    entry.insert(FIELD_PERMISSIONS, evaluated.for_feature(id));
    entry
}
