//! Error types for the portal core

use thiserror::Error;

use crate::session::{SessionState, ValidationReport};

/// Errors raised by the form service port.
///
/// Implementations map their transport failures onto these variants so
/// sessions can treat every backend the same way.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ServiceError {
    /// Request never produced a response
    #[error("transport error: {0}")]
    Transport(String),

    /// Service answered with a non-success status
    #[error("service returned {status}: {body}")]
    Status { status: u16, body: String },

    /// Response body did not match the expected shape
    #[error("decode error: {0}")]
    Decode(String),

    /// Option endpoint declared a method we do not issue
    #[error("unsupported method: {0}")]
    UnsupportedMethod(String),
}

/// Portal core error type
#[derive(Error, Debug)]
pub enum FormError {
    /// No form with this id in the fetched list
    #[error("form not found: {0}")]
    FormNotFound(String),

    /// Value targeted an id that is not a leaf of the schema
    #[error("unknown field: {0}")]
    UnknownField(String),

    /// Raw input could not be converted for the field's kind
    #[error("invalid input for {field}: {reason}")]
    InvalidInput { field: String, reason: String },

    /// Local validation rejected the submission
    #[error("validation failed for {} field(s)", .0.len())]
    Validation(ValidationReport),

    /// Option endpoint declared an unsupported method
    #[error("unsupported options method {method} for field {field}")]
    UnsupportedMethod { field: String, method: String },

    /// The form service failed while submitting
    #[error("submission failed: {0}")]
    Submit(ServiceError),

    /// Any other form service failure
    #[error(transparent)]
    Service(#[from] ServiceError),

    /// Operation not allowed in the current session state
    #[error("cannot {action} while {state:?}")]
    InvalidState { state: SessionState, action: &'static str },

    /// Table operation named a column the page does not have
    #[error("unknown column: {0}")]
    UnknownColumn(String),
}

/// Result type for the portal core
pub type Result<T> = std::result::Result<T, FormError>;
