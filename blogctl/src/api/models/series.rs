//! API request/response models for series.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::api::validation::{Checks, Validate};
use crate::config::PasswordConfig;
use crate::db::models::series::SeriesDBResponse;
use crate::errors::FieldError;
use crate::types::{SeriesId, UserId};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct SeriesCreate {
    #[serde(default)]
    #[schema(example = "Learning Rust")]
    pub title: String,
    pub description: Option<String>,
    /// Only administrators may create a series on someone else's behalf
    pub author_id: Option<UserId>,
}

impl Validate for SeriesCreate {
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
pub struct SeriesUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
}

impl Validate for SeriesUpdate {
    fn validate(&self, _rules: &PasswordConfig) -> Vec<FieldError> {
        let mut checks = Checks::new();
        if let Some(title) = &self.title {
            checks.required("title", title).length("title", title, 1, 100);
        }
        checks.max_length("description", self.description.as_deref(), 500).finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SeriesResponse {
    pub id: SeriesId,
    pub title: String,
    pub description: Option<String>,
    pub author_id: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<SeriesDBResponse> for SeriesResponse {
    fn from(db: SeriesDBResponse) -> Self {
        Self {
            id: db.id,
            title: db.title,
            description: db.description,
            author_id: db.author_id,
            created_at: db.created_at,
            updated_at: db.updated_at,
        }
    }
}
