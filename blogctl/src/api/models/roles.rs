//! API request/response models for roles.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::api::validation::{Checks, Validate};
use crate::config::PasswordConfig;
use crate::db::models::roles::RoleDBResponse;
use crate::errors::FieldError;
use crate::types::{PermissionId, RoleId};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct RoleCreate {
    #[serde(default)]
    #[schema(example = "EDITOR")]
    pub name: String,
    #[serde(default)]
    pub permission_ids: Vec<PermissionId>,
}

impl Validate for RoleCreate {
    fn validate(&self, _rules: &PasswordConfig) -> Vec<FieldError> {
        Checks::new()
            .required("name", &self.name)
            .length("name", &self.name, 1, 50)
            .finish()
    }
}

/// Absent fields are left unchanged; `permission_ids` replaces the whole set.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct RoleUpdate {
    pub name: Option<String>,
    pub permission_ids: Option<Vec<PermissionId>>,
}

impl Validate for RoleUpdate {
    fn validate(&self, _rules: &PasswordConfig) -> Vec<FieldError> {
        let mut checks = Checks::new();
        if let Some(name) = &self.name {
            checks.required("name", name).length("name", name, 1, 50);
        }
        checks.finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RoleResponse {
    pub id: RoleId,
    pub name: String,
    /// Seeded roles cannot be renamed or deleted
    pub immutable: bool,
    pub permission_ids: Vec<PermissionId>,
}

impl From<RoleDBResponse> for RoleResponse {
    fn from(db: RoleDBResponse) -> Self {
        Self {
            id: db.id,
            name: db.name,
            immutable: db.immutable,
            permission_ids: db.permission_ids,
        }
    }
}
