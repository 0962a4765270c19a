//! API request/response models for blogs.
//!
//! Blog content is an arbitrary JSON object (the editor's document format); the server stores it
//! verbatim and only checks that it is an object.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use crate::api::validation::{Checks, Validate};
use crate::config::PasswordConfig;
use crate::db::models::blogs::BlogDBResponse;
use crate::errors::FieldError;
use crate::types::{BlogId, CategoryId, SeriesId, UserId};

fn check_content(checks: &mut Checks, content: &Value) {
    if content.is_null() {
        checks.fail("content", "must not be null");
    } else if !content.is_object() {
        checks.fail("content", "must be a JSON object");
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct BlogCreate {
    #[serde(default)]
    #[schema(example = "Ownership in five minutes")]
    pub title: String,
    #[serde(default)]
    #[schema(value_type = Object)]
    pub content: Value,
    /// Only administrators may publish on someone else's behalf
    pub author_id: Option<UserId>,
    #[serde(default)]
    pub category_ids: Vec<CategoryId>,
    pub series_id: Option<SeriesId>,
}

impl Validate for BlogCreate {
    fn validate(&self, _rules: &PasswordConfig) -> Vec<FieldError> {
        let mut checks = Checks::new();
        checks.required("title", &self.title).length("title", &self.title, 1, 100);
        check_content(&mut checks, &self.content);
        checks.finish()
    }
}

/// Absent fields are left unchanged; `category_ids` replaces the whole set when present.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct BlogUpdate {
    pub title: Option<String>,
    #[schema(value_type = Option<Object>)]
    pub content: Option<Value>,
    pub category_ids: Option<Vec<CategoryId>>,
    pub series_id: Option<SeriesId>,
}

impl Validate for BlogUpdate {
    fn validate(&self, _rules: &PasswordConfig) -> Vec<FieldError> {
        let mut checks = Checks::new();
        if let Some(title) = &self.title {
            checks.required("title", title).length("title", title, 1, 100);
        }
        if let Some(content) = &self.content {
            check_content(&mut checks, content);
        }
        checks.finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BlogResponse {
    pub id: BlogId,
    pub title: String,
    #[schema(value_type = Object)]
    pub content: Value,
    pub author_id: UserId,
    pub category_ids: Vec<CategoryId>,
    pub series_id: Option<SeriesId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<BlogDBResponse> for BlogResponse {
    fn from(db: BlogDBResponse) -> Self {
        Self {
            id: db.id,
            title: db.title,
            content: db.content,
            author_id: db.author_id,
            category_ids: db.category_ids,
            series_id: db.series_id,
            created_at: db.created_at,
            updated_at: db.updated_at,
        }
    }
}
