//! Database models for series.

use crate::types::{SeriesId, UserId};
use chrono::{DateTime, Utc};

#[derive(Debug, Clone)]
pub struct SeriesCreateDBRequest {
    pub title: String,
    pub description: Option<String>,
    pub author_id: UserId,
}

#[derive(Debug, Clone, Default)]
pub struct SeriesUpdateDBRequest {
    pub title: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SeriesDBResponse {
    pub id: SeriesId,
    pub title: String,
    pub description: Option<String>,
    pub author_id: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
