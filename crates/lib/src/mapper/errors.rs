//! Error types for mapping Things to index documents.

use thiserror::Error;

/// Errors raised while reading a Thing.
///
/// Every variant describes malformed input: retrying the same Thing can never
/// succeed.
#[non_exhaustive]
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MappingError {
    /// A required Thing field is absent.
    #[error("Thing is missing required field '{field}'")]
    MissingField {
        /// Name of the missing field
        field: String,
    },

    /// A Thing field is present but has the wrong shape.
    #[error("Invalid Thing field '{field}': {reason}")]
    InvalidField {
        /// Name of the offending field
        field: String,
        /// Description of what is wrong
        reason: String,
    },
}

impl MappingError {
    pub(crate) fn missing(field: &str) -> Self {
        MappingError::MissingField {
            field: field.to_string(),
        }
    }

    pub(crate) fn invalid(field: &str, reason: impl Into<String>) -> Self {
        MappingError::InvalidField {
            field: field.to_string(),
            reason: reason.into(),
        }
    }

    /// Check if this error indicates a missing field
    pub fn is_missing_field(&self) -> bool {
        matches!(self, MappingError::MissingField { .. })
    }

    /// Malformed input never becomes valid on retry
    pub fn is_retryable(&self) -> bool {
        false
    }

    /// Get the field name the error refers to
    pub fn field(&self) -> &str {
        match self {
            MappingError::MissingField { field } | MappingError::InvalidField { field, .. } => {
                field
            }
        }
    }
}

impl From<MappingError> for crate::Error {
    fn from(err: MappingError) -> Self {
        crate::Error::Mapping(err)
    }
}
