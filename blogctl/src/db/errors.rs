//! Storage errors shared by the PostgreSQL and in-memory stores.

use sqlx::error::ErrorKind;
use thiserror::Error;

/// What went wrong in a store call, classified so handlers can map it to a status
#[derive(Error, Debug)]
pub enum DbError {
    /// Update or delete target is gone
    #[error("Entity not found")]
    NotFound,

    /// Unique constraint violation
    #[error("Unique constraint violation")]
    UniqueViolation {
        constraint: Option<String>,
        table: Option<String>,
        message: String,
    },

    /// Foreign key constraint violation
    #[error("Foreign key constraint violation")]
    ForeignKeyViolation {
        constraint: Option<String>,
        table: Option<String>,
        message: String,
    },

    /// Check constraint violation
    #[error("Check constraint violation")]
    CheckViolation {
        constraint: Option<String>,
        table: Option<String>,
        message: String,
    },

    /// Connection, protocol and other unclassified failures
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl DbError {
    /// Build a unique violation the way postgres would report it. Used by the in-memory store so
    /// both backends surface identical errors.
    pub fn unique(table: &str, constraint: &str, message: impl Into<String>) -> Self {
        DbError::UniqueViolation {
            constraint: Some(constraint.to_string()),
            table: Some(table.to_string()),
            message: message.into(),
        }
    }

    /// Build a foreign key violation against `table`.
    pub fn foreign_key(table: &str, constraint: &str, message: impl Into<String>) -> Self {
        DbError::ForeignKeyViolation {
            constraint: Some(constraint.to_string()),
            table: Some(table.to_string()),
            message: message.into(),
        }
    }

    pub fn is_unique_violation(&self) -> bool {
        matches!(self, DbError::UniqueViolation { .. })
    }
}

/// Constraint name, table and message of a database-reported violation.
fn violation_parts(err: &dyn sqlx::error::DatabaseError) -> (Option<String>, Option<String>, String) {
    (err.constraint().map(str::to_string), err.table().map(str::to_string), err.message().to_string())
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        let sqlx::Error::Database(db_err) = &err else {
            return match err {
                sqlx::Error::RowNotFound => DbError::NotFound,
                other => DbError::Other(other.into()),
            };
        };

        match db_err.kind() {
            ErrorKind::UniqueViolation => {
                let (constraint, table, message) = violation_parts(&**db_err);
                DbError::UniqueViolation { constraint, table, message }
            }
            ErrorKind::ForeignKeyViolation => {
                let (constraint, table, message) = violation_parts(&**db_err);
                DbError::ForeignKeyViolation { constraint, table, message }
            }
            ErrorKind::CheckViolation => {
                let (constraint, table, message) = violation_parts(&**db_err);
                DbError::CheckViolation { constraint, table, message }
            }
            _ => DbError::Other(err.into()),
        }
    }
}

pub type Result<T> = std::result::Result<T, DbError>;
