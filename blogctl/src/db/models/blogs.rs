//! Database models for blogs.

use crate::types::{BlogId, CategoryId, SeriesId, UserId};
use chrono::{DateTime, Utc};
use serde_json::Value;

#[derive(Debug, Clone)]
pub struct BlogCreateDBRequest {
    pub title: String,
    pub content: Value,
    pub author_id: UserId,
    pub category_ids: Vec<CategoryId>,
    pub series_id: Option<SeriesId>,
}

/// `None` leaves a field untouched; `category_ids` replaces the whole set when present.
#[derive(Debug, Clone, Default)]
pub struct BlogUpdateDBRequest {
    pub title: Option<String>,
    pub content: Option<Value>,
    pub category_ids: Option<Vec<CategoryId>>,
    pub series_id: Option<SeriesId>,
}

/// Filter for listing blogs. All set fields must match.
#[derive(Debug, Clone, Default)]
pub struct BlogFilter {
    pub author_id: Option<UserId>,
    pub series_id: Option<SeriesId>,
    pub category_id: Option<CategoryId>,
}

#[derive(Debug, Clone)]
pub struct BlogDBResponse {
    pub id: BlogId,
    pub title: String,
    pub content: Value,
    pub author_id: UserId,
    pub category_ids: Vec<CategoryId>,
    pub series_id: Option<SeriesId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
