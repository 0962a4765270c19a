use crate::db::errors::DbError;
use crate::types::Operation;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error as ThisError;
use utoipa::ToSchema;

/// Message returned whenever a protected route is reached without a usable bearer token.
pub const MISSING_TOKEN_MESSAGE: &str = "You must provide a valid token to access this resource.";

#[derive(ThisError, Debug)]
pub enum Error {
    /// Authentication required but not provided, or credentials rejected
    #[error("Not authenticated")]
    Unauthenticated { message: Option<String> },

    /// Caller is authenticated but lacks the authority or ownership the operation needs
    #[error("Insufficient permissions to {action} {resource}")]
    InsufficientPermissions { action: Operation, resource: String },

    /// Request payload failed field-level validation
    #[error("{message}")]
    Validation { message: String, errors: Vec<FieldError> },

    /// Invalid request data or business rule violation
    #[error("{message}")]
    BadRequest { message: String },

    /// Requested resource not found
    #[error("{resource} not found with {field}: {value}")]
    NotFound { resource: String, field: String, value: String },

    /// Unique constraint hit on create or rename
    #[error("{message}")]
    Conflict { message: String },

    /// Attempted update or delete of a seeded record
    #[error("{message}")]
    Immutable { message: String },

    /// Generic internal service error
    #[error("Failed to {operation}")]
    Internal { operation: String },

    /// Database operation error
    #[error(transparent)]
    Database(#[from] DbError),

    /// Unexpected error with full context chain
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// A single failed field check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// JSON body of every error response.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Error category, e.g. "Resource Not Found"
    pub error: String,
    pub message: String,
    /// Epoch milliseconds, only set on 401 responses
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
    /// Field-level failures, only set on validation errors
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<FieldError>>,
}

impl Error {
    /// Shorthand for the common "<resource> not found with ID: <id>" case.
    pub fn not_found(resource: &str, id: impl ToString) -> Self {
        Error::NotFound {
            resource: resource.to_string(),
            field: "ID".to_string(),
            value: id.to_string(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::Unauthenticated { .. } => StatusCode::UNAUTHORIZED,
            Error::InsufficientPermissions { .. } => StatusCode::FORBIDDEN,
            Error::Validation { .. } => StatusCode::BAD_REQUEST,
            Error::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Error::NotFound { .. } => StatusCode::NOT_FOUND,
            Error::Conflict { .. } => StatusCode::CONFLICT,
            Error::Immutable { .. } => StatusCode::FORBIDDEN,
            Error::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Error::Database(db_err) => match db_err {
                DbError::NotFound => StatusCode::NOT_FOUND,
                DbError::UniqueViolation { .. } => StatusCode::CONFLICT,
                DbError::ForeignKeyViolation { .. } => StatusCode::BAD_REQUEST,
                DbError::CheckViolation { .. } => StatusCode::BAD_REQUEST,
                DbError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Error::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The `error` field of the response body
    pub fn category(&self) -> &'static str {
        match self {
            Error::Unauthenticated { .. } => "Unauthorized",
            Error::InsufficientPermissions { .. } => "Access Denied",
            Error::Validation { .. } => "Validation Error",
            Error::BadRequest { .. } => "Bad Request",
            Error::NotFound { .. } => "Resource Not Found",
            Error::Conflict { .. } => "Duplicate Resource",
            Error::Immutable { .. } => "Immutable Resource",
            Error::Database(db_err) => match db_err {
                DbError::NotFound => "Resource Not Found",
                DbError::UniqueViolation { .. } => "Duplicate Resource",
                DbError::ForeignKeyViolation { .. } | DbError::CheckViolation { .. } => "Bad Request",
                DbError::Other(_) => "Internal Server Error",
            },
            Error::Internal { .. } | Error::Other(_) => "Internal Server Error",
        }
    }

    /// Returns a user-safe error message, without leaking internal implementation details
    pub fn user_message(&self) -> String {
        match self {
            Error::Unauthenticated { message } => message.clone().unwrap_or_else(|| MISSING_TOKEN_MESSAGE.to_string()),
            Error::InsufficientPermissions { action, resource } => {
                format!("Insufficient permissions to {action} {resource}")
            }
            Error::Validation { message, .. } => message.clone(),
            Error::BadRequest { message } => message.clone(),
            Error::NotFound { resource, field, value } => {
                format!("{resource} not found with {field}: {value}")
            }
            Error::Conflict { message } => message.clone(),
            Error::Immutable { message } => message.clone(),
            Error::Internal { .. } => "Internal server error".to_string(),
            Error::Database(db_err) => match db_err {
                DbError::NotFound => "Resource not found".to_string(),
                DbError::UniqueViolation { table, .. } => match table.as_deref() {
                    Some("users") => "Email already exists".to_string(),
                    Some("roles") => "Role already exists".to_string(),
                    Some("permissions") => "Permission already exists".to_string(),
                    _ => "Resource already exists".to_string(),
                },
                DbError::ForeignKeyViolation { .. } => "Invalid reference to related resource".to_string(),
                DbError::CheckViolation { .. } => "Invalid data provided".to_string(),
                DbError::Other(_) => "Database error occurred".to_string(),
            },
            Error::Other(_) => "Internal server error".to_string(),
        }
    }

    pub fn body(&self) -> ErrorBody {
        ErrorBody {
            error: self.category().to_string(),
            message: self.user_message(),
            timestamp: matches!(self, Error::Unauthenticated { .. }).then(|| chrono::Utc::now().timestamp_millis()),
            errors: match self {
                Error::Validation { errors, .. } => Some(errors.clone()),
                _ => None,
            },
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        // Log full error details for debugging - different log levels based on severity
        match &self {
            Error::Database(DbError::Other(_)) | Error::Internal { .. } | Error::Other(_) => {
                tracing::error!("Internal service error: {:#}", self);
            }
            Error::Database(_) => {
                tracing::warn!("Database constraint error: {}", self);
            }
            Error::Unauthenticated { .. } | Error::InsufficientPermissions { .. } | Error::Immutable { .. } => {
                tracing::info!("Authorization error: {}", self);
            }
            Error::Validation { .. } | Error::BadRequest { .. } | Error::NotFound { .. } => {
                tracing::debug!("Client error: {}", self);
            }
            Error::Conflict { .. } => {
                tracing::warn!("Conflict error: {}", self);
            }
        }

        (self.status_code(), Json(self.body())).into_response()
    }
}

/// Convert from String errors (e.g., from external functions)
impl From<String> for Error {
    fn from(msg: String) -> Self {
        Error::Internal { operation: msg }
    }
}

/// Type alias for service operation results
pub type Result<T> = std::result::Result<T, Error>;
