//!
//! thingsearch: search-index documents for Things, kept current with minimal updates.
//! This library maps a Thing and the Policy governing it to an index document, and
//! computes the cheapest update that brings a stored index document up to date.
//!
//! ## Core Concepts
//!
//! * **Things and Policies**: JSON inputs. A Thing carries an `id` of the form
//!   `namespace:name`, a `revision`, optional `attributes` and `features`. A Policy
//!   grants and revokes READ on Thing paths to subjects (`policy::Policy`).
//! * **Evaluated policy (`policy::EvaluatedPolicy`)**: the grant and revoke sets of one
//!   Policy resolved against one Thing, rendered as permission trees for the document.
//! * **Index document (`value::Document`)**: an ordered document built by
//!   `mapper::ThingMapper` with a fixed field layout.
//! * **Diff (`diff::Diff`)**: field assignments and removals turning a stored document
//!   into a new one, with cost estimates for patching and for replacing.
//! * **Update (`diff::Update`)**: the compiled diff. A flat field-wise update, an
//!   aggregation pipeline, a full replacement, or nothing at all.
//!
//! Everything here is synchronous and free of I/O; the caller owns storage.

pub mod constants;
pub mod diff;
pub mod mapper;
pub mod path;
pub mod policy;
pub mod value;
pub mod visitor;

pub use diff::{
    Diff, DiffOptions, StoreCapabilities, Update, compile_update, minus, minus_thing_docs,
};
pub use mapper::{MappedThing, MapperConfig, Metadata, ThingMapper};
pub use path::FieldPath;
pub use policy::{EvaluatedPolicy, Policy};
pub use value::{Document, Value};

/// Result type used throughout the thingsearch library.
pub type Result<T> = std::result::Result<T, Error>;

/// Common error type for the thingsearch library.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Structured mapping errors from the mapper module
    #[error(transparent)]
    Mapping(mapper::MappingError),
}

impl Error {
    /// Get the originating module for this error.
    pub fn module(&self) -> &'static str {
        match self {
            Error::Serialize(_) => "serialize",
            Error::Mapping(_) => "mapper",
        }
    }

    /// Check if this error is mapping-related.
    pub fn is_mapping_error(&self) -> bool {
        matches!(self, Error::Mapping(_))
    }

    /// Check if this error indicates a required Thing field is absent.
    pub fn is_missing_field(&self) -> bool {
        match self {
            Error::Mapping(mapping_err) => mapping_err.is_missing_field(),
            _ => false,
        }
    }

    /// Check if this error is serialization-related.
    pub fn is_serialization_error(&self) -> bool {
        matches!(self, Error::Serialize(_))
    }

    /// Check if retrying with the same input could succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Mapping(mapping_err) => mapping_err.is_retryable(),
            Error::Serialize(_) => false,
        }
    }
}
