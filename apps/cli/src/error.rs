//! # API Error Type
//!
//! Unified error type for command handlers.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in relief                                 │
//! │                                                                         │
//! │  relief sos send ...                                                    │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │  Command Handler                                                 │  │
//! │  │  ApiResult<T>                                                    │  │
//! │  │         │                                                        │  │
//! │  │         ▼                                                        │  │
//! │  │  Database Error? ─── DbError::QueryFailed("...") ──┐            │  │
//! │  │         │                                          │            │  │
//! │  │         ▼                                          ▼            │  │
//! │  │  Rule broken? ────── CoreError::PermissionDenied ─ ApiError ───►│  │
//! │  │         │                                                        │  │
//! │  │         ▼                                                        │  │
//! │  │  Success ──────────────────────────────────────────────────────►│  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! │                                                                         │
//! │  stderr: Error [FORBIDDEN]: Permission denied: ...     exit status 1   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Internal failures (SQL, I/O) are logged with their detail and shown to
//! the operator as a generic message.

use serde::Serialize;
use thiserror::Error;

use relief_core::{CoreError, ValidationError};
use relief_db::DbError;

/// Error returned from command handlers.
///
/// ## Serialization
/// With `--json` this is what lands on stderr:
/// ```json
/// {
///   "code": "NOT_FOUND",
///   "message": "Task not found: 4f1c..."
/// }
/// ```
#[derive(Debug, Clone, Serialize, Error)]
#[serde(rename_all = "camelCase")]
#[error("{message}")]
pub struct ApiError {
    /// Machine-readable error code
    pub code: ErrorCode,

    /// Human-readable error message
    pub message: String,
}

/// Error codes, printed as `Error [CODE]: message`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    NotFound,

    /// Input validation failed
    ValidationError,

    DatabaseError,

    /// A workflow rule refused the operation
    BusinessLogic,

    Internal,

    InsufficientStock,

    /// Session role may not run the command
    Forbidden,

    /// No session, or wrong credentials
    Unauthenticated,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::ValidationError => "VALIDATION_ERROR",
            ErrorCode::DatabaseError => "DATABASE_ERROR",
            ErrorCode::BusinessLogic => "BUSINESS_LOGIC",
            ErrorCode::Internal => "INTERNAL",
            ErrorCode::InsufficientStock => "INSUFFICIENT_STOCK",
            ErrorCode::Forbidden => "FORBIDDEN",
            ErrorCode::Unauthenticated => "UNAUTHENTICATED",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
        }
    }

    pub fn not_found(resource: &str, id: &str) -> Self {
        ApiError::new(ErrorCode::NotFound, format!("{} not found: {}", resource, id))
    }

    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::ValidationError, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Internal, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Forbidden, message)
    }

    pub fn unauthenticated(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Unauthenticated, message)
    }

    /// Line written to stderr before exiting.
    pub fn render(&self) -> String {
        format!("Error [{}]: {}", self.code, self.message)
    }
}

/// Converts database errors to API errors.
impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => ApiError::not_found(&entity, &id),
            DbError::UniqueViolation { field, value } => ApiError::new(
                ErrorCode::ValidationError,
                format!("{} '{}' already exists", field, value),
            ),
            DbError::Domain(e) => e.into(),
            DbError::ConnectionFailed(e) => {
                tracing::error!("Database connection failed: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database connection failed")
            }
            DbError::MigrationFailed(e) => {
                tracing::error!("Migration failed: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database migration failed")
            }
            DbError::QueryFailed(e) => {
                tracing::error!("Database query failed: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
            DbError::TransactionFailed(e) => {
                tracing::error!("Transaction failed: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database transaction failed")
            }
            DbError::ForeignKeyViolation { message } => {
                tracing::error!("Foreign key violation: {}", message);
                ApiError::new(ErrorCode::ValidationError, "Invalid reference")
            }
            DbError::PoolExhausted => {
                ApiError::new(ErrorCode::DatabaseError, "Database pool exhausted")
            }
            DbError::Internal(e) => {
                tracing::error!("Internal database error: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
        }
    }
}

/// Converts core errors to API errors.
impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        let code = match &err {
            CoreError::InsufficientStock { .. } => ErrorCode::InsufficientStock,
            CoreError::InvalidTransition { .. } | CoreError::VolunteerUnavailable { .. } => {
                ErrorCode::BusinessLogic
            }
            CoreError::PermissionDenied { .. } | CoreError::NotVerified { .. } => {
                ErrorCode::Forbidden
            }
            CoreError::InvalidCredentials => ErrorCode::Unauthenticated,
            CoreError::PasswordHash(e) => {
                tracing::error!("Password hashing failed: {}", e);
                return ApiError::internal("Password could not be processed");
            }
            CoreError::Validation(e) => return e.clone().into(),
        };
        ApiError::new(code, err.to_string())
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::validation(err.to_string())
    }
}

impl From<std::io::Error> for ApiError {
    fn from(err: std::io::Error) -> Self {
        tracing::error!("I/O failed: {}", err);
        ApiError::internal(format!("File operation failed: {}", err.kind()))
    }
}

impl From<csv::Error> for ApiError {
    fn from(err: csv::Error) -> Self {
        tracing::error!("CSV export failed: {}", err);
        ApiError::internal("Report could not be written")
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        tracing::error!("JSON encoding failed: {}", err);
        ApiError::internal("Output could not be encoded")
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_keeps_entity_and_id() {
        let err: ApiError = DbError::not_found("Task", "t-1").into();
        assert_eq!(err.code, ErrorCode::NotFound);
        assert_eq!(err.render(), "Error [NOT_FOUND]: Task not found: t-1");
    }

    #[test]
    fn test_domain_codes() {
        let err: ApiError = DbError::Domain(CoreError::InsufficientStock {
            stock_id: "s".to_string(),
            available: 1,
            requested: 2,
        })
        .into();
        assert_eq!(err.code, ErrorCode::InsufficientStock);

        let err: ApiError = CoreError::denied("verify NGO requires role admin").into();
        assert_eq!(err.code, ErrorCode::Forbidden);

        let err: ApiError = CoreError::InvalidCredentials.into();
        assert_eq!(err.code, ErrorCode::Unauthenticated);

        let err: ApiError = DbError::from(ValidationError::required("title")).into();
        assert_eq!(err.code, ErrorCode::ValidationError);
        assert_eq!(err.message, "title is required");
    }

    #[test]
    fn test_query_failures_hide_detail() {
        let err: ApiError = DbError::QueryFailed("no such column: secret".to_string()).into();
        assert_eq!(err.code, ErrorCode::DatabaseError);
        assert!(!err.message.contains("secret"));
    }
}
