//! Error types for the access evaluation engine.

use thiserror::Error;

/// Errors raised by the engine before any computation takes place.
///
/// The engine never returns partial results: every precondition is checked
/// up front and the first violation is reported with the offending field.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AccessError {
    /// A coordinate, parameter or collection failed validation.
    #[error("invalid input for `{field}`: {message}")]
    InvalidInput { field: String, message: String },
}

impl AccessError {
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        AccessError::InvalidInput {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Name of the field that failed validation
    pub fn field(&self) -> &str {
        match self {
            AccessError::InvalidInput { field, .. } => field,
        }
    }
}
