/// Error handling for the CrewDesk services
///
/// This module provides the unified error type every service action returns.
/// Synchronous action failures carry a machine-readable kind plus a human
/// message; the gateway (out of scope here) maps kinds onto HTTP statuses.
///
/// # Taxonomy
///
/// - `Validation` (422): malformed input, fails closed before any side effect
/// - `NotFound` (404): a referenced entity is absent
/// - `Conflict` (409): uniqueness violation
/// - `Forbidden` (403): role check failed or ownership mismatch
/// - `Unauthorized` (401): missing/invalid credential
/// - `Unavailable` (503): a required peer service did not answer
/// - `Internal` (500): everything else
///
/// # Example
///
/// ```
/// use crewdesk_shared::error::ServiceError;
///
/// let err = ServiceError::not_found("task", "no such task");
/// assert_eq!(err.kind(), "not_found");
/// ```
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Service result type alias
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Unified error type for all service actions
#[derive(Debug, Clone, Error)]
pub enum ServiceError {
    /// Malformed input; rejected before any side effect
    #[error("Validation failed: {0:?}")]
    Validation(Vec<ValidationErrorDetail>),

    /// Referenced entity does not exist
    #[error("{entity} not found: {message}")]
    NotFound { entity: String, message: String },

    /// Uniqueness violation (e.g., duplicate email)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Role check failed or ownership mismatch
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Missing or invalid credential
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// A required peer service is unreachable or timed out
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Validation error detail
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationErrorDetail {
    /// Field that failed validation
    pub field: String,

    /// Error message
    pub message: String,
}

impl ServiceError {
    /// Machine-readable error kind
    ///
    /// Stable identifiers suitable for wire transport and for mapping to
    /// HTTP statuses at the gateway.
    pub fn kind(&self) -> &'static str {
        match self {
            ServiceError::Validation(_) => "validation",
            ServiceError::NotFound { .. } => "not_found",
            ServiceError::Conflict(_) => "conflict",
            ServiceError::Forbidden(_) => "forbidden",
            ServiceError::Unauthorized(_) => "unauthorized",
            ServiceError::Unavailable(_) => "unavailable",
            ServiceError::Internal(_) => "internal",
        }
    }

    /// Builds a `NotFound` error for a named entity type
    pub fn not_found(entity: impl Into<String>, message: impl Into<String>) -> Self {
        ServiceError::NotFound {
            entity: entity.into(),
            message: message.into(),
        }
    }

    /// Builds a single-field `Validation` error
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        ServiceError::Validation(vec![ValidationErrorDetail {
            field: field.into(),
            message: message.into(),
        }])
    }
}

/// Converts `validator` derive output into the service taxonomy
///
/// Every Create/Update input struct derives `validator::Validate`; a failed
/// `validate()` call maps field-by-field into `ServiceError::Validation`.
impl From<validator::ValidationErrors> for ServiceError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let details = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| ValidationErrorDetail {
                    field: field.to_string(),
                    message: e
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| e.code.to_string()),
                })
            })
            .collect();
        ServiceError::Validation(details)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(ServiceError::invalid("email", "bad").kind(), "validation");
        assert_eq!(ServiceError::not_found("user", "gone").kind(), "not_found");
        assert_eq!(ServiceError::Conflict("dup".into()).kind(), "conflict");
        assert_eq!(ServiceError::Forbidden("nope".into()).kind(), "forbidden");
        assert_eq!(
            ServiceError::Unauthorized("who".into()).kind(),
            "unauthorized"
        );
        assert_eq!(
            ServiceError::Unavailable("down".into()).kind(),
            "unavailable"
        );
    }

    #[test]
    fn test_not_found_display() {
        let err = ServiceError::not_found("project", "no project with that id");
        assert!(err.to_string().contains("project"));
        assert!(err.to_string().contains("no project with that id"));
    }

    #[test]
    fn test_validation_detail_carries_field() {
        let err = ServiceError::invalid("email", "not an email address");
        match err {
            ServiceError::Validation(details) => {
                assert_eq!(details.len(), 1);
                assert_eq!(details[0].field, "email");
            }
            other => panic!("expected Validation, got {:?}", other),
        }
    }
}
