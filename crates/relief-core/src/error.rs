//! # Error Types
//!
//! Domain-specific error types for relief-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  relief-core errors (this file)                                        │
//! │  ├── CoreError        - Workflow rule violations                       │
//! │  └── ValidationError  - Form input failures                            │
//! │                                                                         │
//! │  relief-db errors                                                      │
//! │  └── DbError          - Database failures (wraps CoreError)            │
//! │                                                                         │
//! │  CLI errors                                                            │
//! │  └── ApiError         - What the operator sees                         │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → ApiError → stderr       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Workflow rule violations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Not enough units in a stock record.
    ///
    /// ## When This Occurs
    /// ```text
    /// allocate 50 from stock S (quantity 30)
    ///      │
    ///      ▼
    /// InsufficientStock { stock_id: S, available: 30, requested: 50 }
    ///      │
    ///      ▼
    /// "Insufficient resources in stock S: available 30, requested 50"
    /// ```
    #[error("Insufficient resources in stock {stock_id}: available {available}, requested {requested}")]
    InsufficientStock {
        stock_id: String,
        available: i64,
        requested: i64,
    },

    /// A status change the lifecycle does not allow.
    #[error("{entity} cannot move from {from} to {to}")]
    InvalidTransition {
        entity: String,
        from: String,
        to: String,
    },

    /// Volunteer is busy or inactive.
    #[error("Volunteer {volunteer_id} is {status}, not available")]
    VolunteerUnavailable {
        volunteer_id: String,
        status: String,
    },

    /// The session's role may not perform the action.
    #[error("Permission denied: {action}")]
    PermissionDenied { action: String },

    /// Unknown email or wrong password.
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// Organization or account has not been verified yet.
    #[error("{what} is not verified")]
    NotVerified { what: String },

    /// Password hashing backend failed.
    #[error("Password hashing failed: {0}")]
    PasswordHash(String),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Shorthand for [`CoreError::PermissionDenied`].
    pub fn denied(action: impl Into<String>) -> Self {
        CoreError::PermissionDenied {
            action: action.into(),
        }
    }

    /// Shorthand for [`CoreError::InvalidTransition`].
    pub fn transition(
        entity: impl Into<String>,
        from: impl ToString,
        to: impl ToString,
    ) -> Self {
        CoreError::InvalidTransition {
            entity: entity.into(),
            from: from.to_string(),
            to: to.to_string(),
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors raised before anything is written.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too short.
    #[error("{field} must be at least {min} characters")]
    TooShort { field: String, min: usize },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must be zero or more.
    #[error("{field} cannot be negative")]
    Negative { field: String },

    /// Invalid format (e.g., invalid UUID, malformed email).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },

    /// Duplicate value (e.g., second feedback for one request).
    #[error("{field} '{value}' already exists")]
    Duplicate { field: String, value: String },
}

impl ValidationError {
    /// Shorthand for [`ValidationError::Required`].
    pub fn required(field: impl Into<String>) -> Self {
        ValidationError::Required {
            field: field.into(),
        }
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InsufficientStock {
            stock_id: "s-1".to_string(),
            available: 3,
            requested: 5,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient resources in stock s-1: available 3, requested 5"
        );

        let err = CoreError::transition("Task", "completed", "assigned");
        assert_eq!(err.to_string(), "Task cannot move from completed to assigned");
    }

    #[test]
    fn test_validation_error_messages() {
        assert_eq!(
            ValidationError::required("location").to_string(),
            "location is required"
        );

        let err = ValidationError::OutOfRange {
            field: "rating".to_string(),
            min: 1,
            max: 5,
        };
        assert_eq!(err.to_string(), "rating must be between 1 and 5");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let core_err: CoreError = ValidationError::required("message").into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
