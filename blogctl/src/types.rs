//! Common type definitions.
//!
//! Entity IDs are the surrogate `BIGSERIAL` keys of their tables, wrapped in type aliases so
//! signatures say which table they point into:
//!
//! - [`UserId`], [`RoleId`], [`PermissionId`]: the credential graph
//! - [`CategoryId`], [`SeriesId`], [`BlogId`]: published content
//!
//! [`Operation`] names the kind of change a request attempts. It is used when reporting denied or
//! protected operations back to the caller.

use axum::http::Method;
use std::fmt;

// Type aliases for IDs
pub type UserId = i64;
pub type RoleId = i64;
pub type PermissionId = i64;
pub type CategoryId = i64;
pub type SeriesId = i64;
pub type BlogId = i64;

/// Operations that can be performed on a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Create,
    Read,
    Update,
    Delete,
}

impl Operation {
    /// Map an HTTP method onto the operation it performs. Anything that isn't a write is a read.
    pub fn from_method(method: &Method) -> Self {
        match *method {
            Method::POST => Operation::Create,
            Method::PUT | Method::PATCH => Operation::Update,
            Method::DELETE => Operation::Delete,
            _ => Operation::Read,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Create => write!(f, "create"),
            Operation::Read => write!(f, "read"),
            Operation::Update => write!(f, "update"),
            Operation::Delete => write!(f, "delete"),
        }
    }
}
