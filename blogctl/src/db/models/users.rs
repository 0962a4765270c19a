//! Database models for users.

use crate::db::models::Protected;
use crate::types::{RoleId, UserId};
use chrono::{DateTime, Utc};

/// Database request for creating a new user
#[derive(Debug, Clone)]
pub struct UserCreateDBRequest {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub about: Option<String>,
    pub immutable: bool,
    pub role_ids: Vec<RoleId>,
}

/// Database request for updating a user. `None` leaves the column untouched.
#[derive(Debug, Clone, Default)]
pub struct UserUpdateDBRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub about: Option<String>,
    /// Replaces the full role set when present
    pub role_ids: Option<Vec<RoleId>>,
}

/// Database response for a user
#[derive(Debug, Clone)]
pub struct UserDBResponse {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub about: Option<String>,
    pub immutable: bool,
    pub role_ids: Vec<RoleId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Protected for UserDBResponse {
    const ENTITY: &'static str = "user";

    fn is_immutable(&self) -> bool {
        self.immutable
    }
}
