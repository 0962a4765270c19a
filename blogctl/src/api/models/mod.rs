//! API request and response data models.
//!
//! Request bodies reject unknown fields and implement [`crate::api::validation::Validate`].
//! Required string fields default to empty so a missing field is reported alongside every other
//! failing field instead of aborting deserialization. Update bodies treat an absent field as
//! "leave unchanged".
//!
//! Responses are built from store records with explicit `From` impls; password hashes and
//! immutability flags of users never leave the server.

pub mod auth;
pub mod blogs;
pub mod categories;
pub mod permissions;
pub mod roles;
pub mod series;
pub mod users;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Body of successful deletes.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    #[schema(example = "Blog deleted successfully")]
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}
