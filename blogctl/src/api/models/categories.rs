//! API request/response models for categories.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::api::validation::{Checks, Validate};
use crate::config::PasswordConfig;
use crate::db::models::categories::CategoryDBResponse;
use crate::errors::FieldError;
use crate::types::CategoryId;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct CategoryCreate {
    #[serde(default)]
    #[schema(example = "Rust")]
    pub title: String,
    pub description: Option<String>,
}

impl Validate for CategoryCreate {
    fn validate(&self, _rules: &PasswordConfig) -> Vec<FieldError> {
        Checks::new()
            .required("title", &self.title)
            .length("title", &self.title, 1, 100)
            .max_length("description", self.description.as_deref(), 500)
            .finish()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct CategoryUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
}

impl Validate for CategoryUpdate {
    fn validate(&self, _rules: &PasswordConfig) -> Vec<FieldError> {
        let mut checks = Checks::new();
        if let Some(title) = &self.title {
            checks.required("title", title).length("title", title, 1, 100);
        }
        checks.max_length("description", self.description.as_deref(), 500).finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CategoryResponse {
    pub id: CategoryId,
    pub title: String,
    pub description: Option<String>,
}

impl From<CategoryDBResponse> for CategoryResponse {
    fn from(db: CategoryDBResponse) -> Self {
        Self {
            id: db.id,
            title: db.title,
            description: db.description,
        }
    }
}
