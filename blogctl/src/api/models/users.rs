//! API request/response models for users.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::api::validation::{Checks, Validate};
use crate::config::PasswordConfig;
use crate::db::models::users::UserDBResponse;
use crate::errors::FieldError;
use crate::types::{RoleId, UserId};

/// Request body for creating a user as an administrator.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct UserCreate {
    #[serde(default)]
    #[schema(example = "Grace Hopper")]
    pub name: String,
    #[serde(default)]
    #[schema(example = "grace@example.com")]
    pub email: String,
    #[serde(default)]
    pub password: String,
    pub about: Option<String>,
    #[serde(default)]
    pub role_ids: Vec<RoleId>,
}

impl Validate for UserCreate {
    fn validate(&self, rules: &PasswordConfig) -> Vec<FieldError> {
        Checks::new()
            .required("name", &self.name)
            .length("name", &self.name, 3, 100)
            .required("email", &self.email)
            .email("email", &self.email)
            .required("password", &self.password)
            .password("password", &self.password, rules)
            .max_length("about", self.about.as_deref(), 500)
            .finish()
    }
}

/// Request body for updating a user. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct UserUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub about: Option<String>,
    /// Replaces the user's roles when present
    pub role_ids: Option<Vec<RoleId>>,
}

impl Validate for UserUpdate {
    fn validate(&self, rules: &PasswordConfig) -> Vec<FieldError> {
        let mut checks = Checks::new();
        if let Some(name) = &self.name {
            checks.required("name", name).length("name", name, 3, 100);
        }
        if let Some(email) = &self.email {
            checks.required("email", email).email("email", email);
        }
        if let Some(password) = &self.password {
            checks.required("password", password).password("password", password, rules);
        }
        checks.max_length("about", self.about.as_deref(), 500).finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub about: Option<String>,
    pub role_ids: Vec<RoleId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<UserDBResponse> for UserResponse {
    fn from(db: UserDBResponse) -> Self {
        Self {
            id: db.id,
            name: db.name,
            email: db.email,
            about: db.about,
            role_ids: db.role_ids,
            created_at: db.created_at,
            updated_at: db.updated_at,
        }
    }
}
