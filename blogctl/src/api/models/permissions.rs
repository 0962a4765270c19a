//! API request/response models for permissions.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::api::validation::{Checks, Validate};
use crate::config::PasswordConfig;
use crate::db::models::permissions::PermissionDBResponse;
use crate::errors::FieldError;
use crate::types::PermissionId;

/// Used for both creating and renaming a permission.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct PermissionRequest {
    #[serde(default)]
    #[schema(example = "PUBLISH_BLOG")]
    pub name: String,
}

impl Validate for PermissionRequest {
    fn validate(&self, _rules: &PasswordConfig) -> Vec<FieldError> {
        Checks::new()
            .required("name", &self.name)
            .length("name", &self.name, 1, 50)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PermissionResponse {
    pub id: PermissionId,
    pub name: String,
    pub immutable: bool,
}

impl From<PermissionDBResponse> for PermissionResponse {
    fn from(db: PermissionDBResponse) -> Self {
        Self {
            id: db.id,
            name: db.name,
            immutable: db.immutable,
        }
    }
}
