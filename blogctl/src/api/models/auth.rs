//! Registration, login and "who am I" payloads.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::api::validation::{Checks, Validate};
use crate::auth::identity::Identity;
use crate::config::PasswordConfig;
use crate::errors::FieldError;
use crate::types::UserId;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    #[serde(default)]
    #[schema(example = "Ada Lovelace")]
    pub name: String,
    #[serde(default)]
    #[schema(example = "ada@example.com")]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

impl Validate for RegisterRequest {
    fn validate(&self, rules: &PasswordConfig) -> Vec<FieldError> {
        Checks::new()
            .required("name", &self.name)
            .length("name", &self.name, 1, 100)
            .required("email", &self.email)
            .email("email", &self.email)
            .required("password", &self.password)
            .password("password", &self.password, rules)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    #[serde(default)]
    #[schema(example = "ada@example.com")]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

impl Validate for LoginRequest {
    fn validate(&self, _rules: &PasswordConfig) -> Vec<FieldError> {
        Checks::new()
            .required("email", &self.email)
            .required("password", &self.password)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RegisterResponse {
    pub id: UserId,
    pub name: String,
    pub email: String,
    #[schema(example = "User registered successfully!")]
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    /// Bearer token for the `Authorization` header
    pub token: String,
    pub email: String,
}

/// The caller as the authorization gate sees them.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MeResponse {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub roles: Vec<String>,
    pub authorities: Vec<String>,
}

impl From<Identity> for MeResponse {
    fn from(identity: Identity) -> Self {
        Self {
            id: identity.id,
            name: identity.name,
            email: identity.email,
            roles: identity.roles.into_iter().collect(),
            authorities: identity.authorities.into_iter().collect(),
        }
    }
}
