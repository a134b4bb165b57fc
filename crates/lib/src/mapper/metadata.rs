//! Bookkeeping that travels with an index document through the write pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::{
    constants::{THING_ID, THING_POLICY_ID, THING_REVISION},
    mapper::MappingError,
};

/// Why an index entry is being rewritten.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UpdateReason {
    ThingUpdate,
    PolicyUpdate,
    BackgroundSync,
    ManualReindexing,
    Unknown,
}

/// Identity and revisions of an indexed Thing, plus caller-owned bookkeeping.
///
/// The mapper derives the identity fields from the Thing and copies the
/// bookkeeping fields from the previous metadata without interpreting them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    pub thing_id: String,
    pub thing_revision: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy_revision: Option<i64>,
    /// When the Thing was last modified, as reported upstream
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified: Option<DateTime<Utc>>,
    #[serde(default)]
    pub update_reasons: Vec<UpdateReason>,
    /// Caller asks for the cached Thing to be reloaded
    #[serde(default)]
    pub invalidate_thing: bool,
    /// Caller asks for the cached Policy to be reloaded
    #[serde(default)]
    pub invalidate_policy: bool,
}

impl Metadata {
    /// Creates metadata with only the identity fields set.
    pub fn new(thing_id: impl Into<String>, thing_revision: i64) -> Self {
        Self {
            thing_id: thing_id.into(),
            thing_revision,
            policy_id: None,
            policy_revision: None,
            modified: None,
            update_reasons: Vec::new(),
            invalidate_thing: false,
            invalidate_policy: false,
        }
    }

    /// Derives metadata for `thing`.
    ///
    /// The policy id is the Thing's `policyId`, falling back to
    /// `fallback_policy_id`. Bookkeeping fields come from `previous` unchanged.
    pub fn derive(
        thing: &JsonValue,
        fallback_policy_id: Option<&str>,
        policy_revision: Option<i64>,
        previous: Option<&Metadata>,
    ) -> Result<Self, MappingError> {
        let thing_id = thing_id(thing)?;
        let thing_revision = thing_revision(thing)?;
        let policy_id = match thing.get(THING_POLICY_ID) {
            None | Some(JsonValue::Null) => fallback_policy_id.map(str::to_string),
            Some(JsonValue::String(id)) => Some(id.clone()),
            Some(_) => return Err(MappingError::invalid(THING_POLICY_ID, "expected a string")),
        };

        let mut metadata = match previous {
            Some(previous) => Metadata {
                thing_id: thing_id.to_string(),
                thing_revision,
                ..previous.clone()
            },
            None => Metadata::new(thing_id, thing_revision),
        };
        metadata.policy_id = policy_id;
        metadata.policy_revision = policy_revision;
        Ok(metadata)
    }

    /// Namespace part of the Thing id (text before the first `:`).
    pub fn namespace(&self) -> &str {
        namespace_of(&self.thing_id).unwrap_or_default()
    }
}

pub(crate) fn namespace_of(thing_id: &str) -> Option<&str> {
    thing_id
        .split_once(crate::constants::NAMESPACE_SEPARATOR)
        .map(|(namespace, _)| namespace)
}

fn thing_id(thing: &JsonValue) -> Result<&str, MappingError> {
    let id = match thing.get(THING_ID) {
        None | Some(JsonValue::Null) => return Err(MappingError::missing(THING_ID)),
        Some(JsonValue::String(id)) => id.as_str(),
        Some(_) => return Err(MappingError::invalid(THING_ID, "expected a string")),
    };
    if namespace_of(id).is_none() {
        return Err(MappingError::invalid(
            THING_ID,
            format!("'{id}' has no namespace"),
        ));
    }
    Ok(id)
}

fn thing_revision(thing: &JsonValue) -> Result<i64, MappingError> {
    match thing.get(THING_REVISION) {
        None | Some(JsonValue::Null) => Err(MappingError::missing(THING_REVISION)),
        Some(revision) => revision
            .as_i64()
            .ok_or_else(|| MappingError::invalid(THING_REVISION, "expected an integer")),
    }
}
