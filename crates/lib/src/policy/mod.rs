//! Access-control Policies and their projection onto Things.
//!
//! A [`Policy`] is owned and mutated elsewhere; this crate only reads it. The
//! [`EvaluatedPolicy`] built from a Policy and a Thing is what the mapper
//! embeds into index documents.

use serde::{Deserialize, Serialize};

pub mod evaluated;

pub use evaluated::{EvaluatedPolicy, PathGrants};

/// Kind of resource a policy entry refers to.
///
/// Only [`ResourceType::Thing`] is consulted by the evaluator.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    /// Paths inside the Thing
    Thing,
    /// Paths inside the Policy itself
    Policy,
    /// Message topics
    Message,
    /// Any resource type this crate does not know about
    #[serde(other)]
    Other,
}

/// Permissions a policy entry can grant or revoke.
///
/// Only [`Permission::Read`] is consulted by the evaluator.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum Permission {
    /// Read access
    Read,
    /// Write access
    Write,
    /// Permission to send or receive messages
    Execute,
    /// Any permission this crate does not know about
    #[serde(other)]
    Other,
}

/// A resource of a policy entry: a path plus the permissions granted and revoked there.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    pub resource_type: ResourceType,
    /// JSON pointer into the resource, `/` for the root
    pub path: String,
    #[serde(default)]
    pub granted_permissions: Vec<Permission>,
    #[serde(default)]
    pub revoked_permissions: Vec<Permission>,
}

impl Resource {
    /// Creates a Thing resource at `path`.
    pub fn thing(
        path: impl Into<String>,
        granted_permissions: Vec<Permission>,
        revoked_permissions: Vec<Permission>,
    ) -> Self {
        Self {
            resource_type: ResourceType::Thing,
            path: path.into(),
            granted_permissions,
            revoked_permissions,
        }
    }

    /// True if this resource grants READ.
    pub fn grants_read(&self) -> bool {
        self.granted_permissions.contains(&Permission::Read)
    }

    /// True if this resource revokes READ.
    pub fn revokes_read(&self) -> bool {
        self.revoked_permissions.contains(&Permission::Read)
    }
}

/// One entry of a policy: a set of subjects and the resources they are given.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PolicyEntry {
    #[serde(default)]
    pub label: String,
    pub subjects: Vec<String>,
    #[serde(default)]
    pub resources: Vec<Resource>,
}

/// An ordered collection of policy entries.
///
/// Entry order matters: see [`EvaluatedPolicy::evaluate`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Policy {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy_id: Option<String>,
    #[serde(default)]
    pub entries: Vec<PolicyEntry>,
}

impl Policy {
    /// Creates an empty policy with the given id.
    pub fn new(policy_id: impl Into<String>) -> Self {
        Self {
            policy_id: Some(policy_id.into()),
            entries: Vec::new(),
        }
    }

    /// Parses a policy from its JSON representation.
    pub fn from_json_str(json: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Appends an entry, builder style.
    pub fn with_entry(
        mut self,
        label: impl Into<String>,
        subjects: &[&str],
        resources: Vec<Resource>,
    ) -> Self {
        self.entries.push(PolicyEntry {
            label: label.into(),
            subjects: subjects.iter().map(|s| s.to_string()).collect(),
            resources,
        });
        self
    }
}
