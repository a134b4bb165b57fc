//! Constants used throughout the thingsearch library.
//!
//! This module provides central definitions for the field names of index
//! documents and for the reserved keys of the Thing model. Downstream queries
//! depend on these names, so they never change.

/// Index document id (the Thing id).
pub const FIELD_ID: &str = "_id";

/// Namespace part of the Thing id.
pub const FIELD_NAMESPACE: &str = "_namespace";

/// Subjects granted READ anywhere in the Thing.
pub const FIELD_GLOBAL_READ: &str = "gr";

/// Thing revision.
pub const FIELD_REVISION: &str = "_revision";

/// Policy id the document was enforced with.
pub const FIELD_POLICY_ID: &str = "policyId";

/// Policy revision the document was enforced with.
pub const FIELD_POLICY_REVISION: &str = "_policyRevision";

/// Thing body.
pub const FIELD_THING: &str = "t";

/// Permission tree mirroring the Thing's shape.
pub const FIELD_PERMISSIONS: &str = "p";

/// Feature array, one entry per feature.
pub const FIELD_FEATURES: &str = "f";

/// Id field of a feature array entry.
pub const FIELD_FEATURE_ID: &str = "id";

/// Legacy flat array of annotated leaves.
pub const FIELD_INTERNAL: &str = "_internal";

/// Key of a flattened leaf.
pub const FIELD_INTERNAL_KEY: &str = "k";

/// Value of a flattened leaf.
pub const FIELD_INTERNAL_VALUE: &str = "v";

/// Granted subjects of a flattened leaf.
pub const FIELD_INTERNAL_GRANTED: &str = "g";

/// Revoked subjects of a flattened leaf.
pub const FIELD_INTERNAL_REVOKED: &str = "r";

/// Granted subjects of a permission tree node.
pub const PERMISSION_GRANTED: &str = "__g";

/// Revoked subjects of a permission tree node.
pub const PERMISSION_REVOKED: &str = "__r";

/// Thing field holding the id.
pub const THING_ID: &str = "id";

/// Thing field holding the revision.
pub const THING_REVISION: &str = "revision";

/// Thing field holding the policy id.
pub const THING_POLICY_ID: &str = "policyId";

/// Thing field holding the features object.
pub const THING_FEATURES: &str = "features";

/// Stand-in for the feature id in cross-feature leaf keys.
pub const FEATURE_WILDCARD: &str = "*";

/// Separator between namespace and name in a Thing id.
pub const NAMESPACE_SEPARATOR: char = ':';

/// Prefix marking a string as a field reference or operator in the store.
pub const EXPRESSION_SIGIL: char = '$';
