//! Database models for categories.

use crate::api::models::categories::{CategoryCreate, CategoryUpdate};
use crate::types::CategoryId;

#[derive(Debug, Clone)]
pub struct CategoryCreateDBRequest {
    pub title: String,
    pub description: Option<String>,
}

impl From<CategoryCreate> for CategoryCreateDBRequest {
    fn from(api: CategoryCreate) -> Self {
        Self {
            title: api.title,
            description: api.description,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CategoryUpdateDBRequest {
    pub title: Option<String>,
    pub description: Option<String>,
}

impl From<CategoryUpdate> for CategoryUpdateDBRequest {
    fn from(api: CategoryUpdate) -> Self {
        Self {
            title: api.title,
            description: api.description,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CategoryDBResponse {
    pub id: CategoryId,
    pub title: String,
    pub description: Option<String>,
}
