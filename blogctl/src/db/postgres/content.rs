use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::FromRow;
use tracing::instrument;

use super::PgStore;
use crate::db::errors::{DbError, Result};
use crate::db::models::{
    blogs::{BlogCreateDBRequest, BlogDBResponse, BlogFilter, BlogUpdateDBRequest},
    categories::{CategoryCreateDBRequest, CategoryDBResponse, CategoryUpdateDBRequest},
    series::{SeriesCreateDBRequest, SeriesDBResponse, SeriesUpdateDBRequest},
};
use crate::db::store::{BlogStore, CategoryStore, SeriesStore};
use crate::types::{BlogId, CategoryId, SeriesId, UserId};

#[derive(Debug, FromRow)]
struct Category {
    id: CategoryId,
    title: String,
    description: Option<String>,
}

impl From<Category> for CategoryDBResponse {
    fn from(c: Category) -> Self {
        Self {
            id: c.id,
            title: c.title,
            description: c.description,
        }
    }
}

#[derive(Debug, FromRow)]
struct Series {
    id: SeriesId,
    title: String,
    description: Option<String>,
    author_id: UserId,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<Series> for SeriesDBResponse {
    fn from(s: Series) -> Self {
        Self {
            id: s.id,
            title: s.title,
            description: s.description,
            author_id: s.author_id,
            created_at: s.created_at,
            updated_at: s.updated_at,
        }
    }
}

const SERIES_COLUMNS: &str = "id, title, description, author_id, created_at, updated_at";

const SELECT_BLOGS: &str = r#"
    SELECT b.id, b.title, b.content, b.author_id, b.series_id, b.created_at, b.updated_at,
           COALESCE(ARRAY_AGG(bc.category_id ORDER BY bc.category_id) FILTER (WHERE bc.category_id IS NOT NULL), '{}') AS category_ids
    FROM blogs b
    LEFT JOIN blog_categories bc ON bc.blog_id = b.id
"#;

#[derive(Debug, FromRow)]
struct Blog {
    id: BlogId,
    title: String,
    content: Value,
    author_id: UserId,
    series_id: Option<SeriesId>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    category_ids: Vec<CategoryId>,
}

impl From<Blog> for BlogDBResponse {
    fn from(b: Blog) -> Self {
        Self {
            id: b.id,
            title: b.title,
            content: b.content,
            author_id: b.author_id,
            category_ids: b.category_ids,
            series_id: b.series_id,
            created_at: b.created_at,
            updated_at: b.updated_at,
        }
    }
}

async fn fetch_blog<'e, E>(executor: E, id: BlogId) -> Result<Option<BlogDBResponse>>
where
    E: sqlx::PgExecutor<'e>,
{
    let blog = sqlx::query_as::<_, Blog>(&format!("{SELECT_BLOGS} WHERE b.id = $1 GROUP BY b.id"))
        .bind(id)
        .fetch_optional(executor)
        .await?;
    Ok(blog.map(BlogDBResponse::from))
}

async fn replace_categories(conn: &mut sqlx::PgConnection, blog_id: BlogId, category_ids: &[CategoryId]) -> Result<()> {
    sqlx::query("DELETE FROM blog_categories WHERE blog_id = $1")
        .bind(blog_id)
        .execute(&mut *conn)
        .await?;
    sqlx::query("INSERT INTO blog_categories (blog_id, category_id) SELECT $1, UNNEST($2::BIGINT[]) ON CONFLICT DO NOTHING")
        .bind(blog_id)
        .bind(category_ids)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

#[async_trait]
impl CategoryStore for PgStore {
    #[instrument(skip(self, request), err)]
    async fn create_category(&self, request: &CategoryCreateDBRequest) -> Result<CategoryDBResponse> {
        let category = sqlx::query_as::<_, Category>(
            "INSERT INTO categories (title, description) VALUES ($1, $2) RETURNING id, title, description",
        )
        .bind(&request.title)
        .bind(&request.description)
        .fetch_one(&self.pool)
        .await?;
        Ok(category.into())
    }

    #[instrument(skip(self), err)]
    async fn get_category(&self, id: CategoryId) -> Result<Option<CategoryDBResponse>> {
        let category = sqlx::query_as::<_, Category>("SELECT id, title, description FROM categories WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(category.map(CategoryDBResponse::from))
    }

    #[instrument(skip(self), err)]
    async fn get_categories(&self, ids: &[CategoryId]) -> Result<Vec<CategoryDBResponse>> {
        let categories =
            sqlx::query_as::<_, Category>("SELECT id, title, description FROM categories WHERE id = ANY($1) ORDER BY id")
                .bind(ids)
                .fetch_all(&self.pool)
                .await?;
        Ok(categories.into_iter().map(CategoryDBResponse::from).collect())
    }

    #[instrument(skip(self), err)]
    async fn list_categories(&self) -> Result<Vec<CategoryDBResponse>> {
        let categories = sqlx::query_as::<_, Category>("SELECT id, title, description FROM categories ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(categories.into_iter().map(CategoryDBResponse::from).collect())
    }

    #[instrument(skip(self, request), err)]
    async fn update_category(&self, id: CategoryId, request: &CategoryUpdateDBRequest) -> Result<CategoryDBResponse> {
        let category = sqlx::query_as::<_, Category>(
            r#"
            UPDATE categories SET
                title = COALESCE($2, title),
                description = COALESCE($3, description)
            WHERE id = $1
            RETURNING id, title, description
            "#,
        )
        .bind(id)
        .bind(&request.title)
        .bind(&request.description)
        .fetch_optional(&self.pool)
        .await?;
        category.map(CategoryDBResponse::from).ok_or(DbError::NotFound)
    }

    #[instrument(skip(self), err)]
    async fn delete_category(&self, id: CategoryId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl SeriesStore for PgStore {
    #[instrument(skip(self, request), fields(author_id = request.author_id), err)]
    async fn create_series(&self, request: &SeriesCreateDBRequest) -> Result<SeriesDBResponse> {
        let series = sqlx::query_as::<_, Series>(&format!(
            "INSERT INTO series (title, description, author_id) VALUES ($1, $2, $3) RETURNING {SERIES_COLUMNS}"
        ))
        .bind(&request.title)
        .bind(&request.description)
        .bind(request.author_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(series.into())
    }

    #[instrument(skip(self), err)]
    async fn get_series(&self, id: SeriesId) -> Result<Option<SeriesDBResponse>> {
        let series = sqlx::query_as::<_, Series>(&format!("SELECT {SERIES_COLUMNS} FROM series WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(series.map(SeriesDBResponse::from))
    }

    #[instrument(skip(self), err)]
    async fn list_series(&self, author_id: Option<UserId>) -> Result<Vec<SeriesDBResponse>> {
        let series = sqlx::query_as::<_, Series>(&format!(
            "SELECT {SERIES_COLUMNS} FROM series WHERE ($1::BIGINT IS NULL OR author_id = $1) ORDER BY id"
        ))
        .bind(author_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(series.into_iter().map(SeriesDBResponse::from).collect())
    }

    #[instrument(skip(self, request), err)]
    async fn update_series(&self, id: SeriesId, request: &SeriesUpdateDBRequest) -> Result<SeriesDBResponse> {
        let series = sqlx::query_as::<_, Series>(&format!(
            r#"
            UPDATE series SET
                title = COALESCE($2, title),
                description = COALESCE($3, description),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {SERIES_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&request.title)
        .bind(&request.description)
        .fetch_optional(&self.pool)
        .await?;
        series.map(SeriesDBResponse::from).ok_or(DbError::NotFound)
    }

    #[instrument(skip(self), err)]
    async fn delete_series(&self, id: SeriesId) -> Result<bool> {
        // blogs.series_id is ON DELETE SET NULL
        let result = sqlx::query("DELETE FROM series WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl BlogStore for PgStore {
    #[instrument(skip(self, request), fields(author_id = request.author_id), err)]
    async fn create_blog(&self, request: &BlogCreateDBRequest) -> Result<BlogDBResponse> {
        let mut tx = self.pool.begin().await?;

        let id: BlogId = sqlx::query_scalar(
            r#"
            INSERT INTO blogs (title, content, author_id, series_id)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(&request.title)
        .bind(&request.content)
        .bind(request.author_id)
        .bind(request.series_id)
        .fetch_one(&mut *tx)
        .await?;
        replace_categories(&mut tx, id, &request.category_ids).await?;

        let blog = fetch_blog(&mut *tx, id).await?.ok_or(DbError::NotFound)?;
        tx.commit().await?;
        Ok(blog)
    }

    #[instrument(skip(self), err)]
    async fn get_blog(&self, id: BlogId) -> Result<Option<BlogDBResponse>> {
        fetch_blog(&self.pool, id).await
    }

    #[instrument(skip(self), err)]
    async fn list_blogs(&self, filter: &BlogFilter) -> Result<Vec<BlogDBResponse>> {
        let blogs = sqlx::query_as::<_, Blog>(&format!(
            r#"{SELECT_BLOGS}
            WHERE ($1::BIGINT IS NULL OR b.author_id = $1)
              AND ($2::BIGINT IS NULL OR b.series_id = $2)
              AND ($3::BIGINT IS NULL OR EXISTS (
                  SELECT 1 FROM blog_categories f WHERE f.blog_id = b.id AND f.category_id = $3
              ))
            GROUP BY b.id
            ORDER BY b.id
            "#
        ))
        .bind(filter.author_id)
        .bind(filter.series_id)
        .bind(filter.category_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(blogs.into_iter().map(BlogDBResponse::from).collect())
    }

    #[instrument(skip(self, request), err)]
    async fn update_blog(&self, id: BlogId, request: &BlogUpdateDBRequest) -> Result<BlogDBResponse> {
        let mut tx = self.pool.begin().await?;

        let updated: Option<BlogId> = sqlx::query_scalar(
            r#"
            UPDATE blogs SET
                title = COALESCE($2, title),
                content = COALESCE($3, content),
                series_id = COALESCE($4, series_id),
                updated_at = NOW()
            WHERE id = $1
            RETURNING id
            "#,
        )
        .bind(id)
        .bind(&request.title)
        .bind(&request.content)
        .bind(request.series_id)
        .fetch_optional(&mut *tx)
        .await?;
        if updated.is_none() {
            return Err(DbError::NotFound);
        }

        if let Some(category_ids) = &request.category_ids {
            replace_categories(&mut tx, id, category_ids).await?;
        }

        let blog = fetch_blog(&mut *tx, id).await?.ok_or(DbError::NotFound)?;
        tx.commit().await?;
        Ok(blog)
    }

    #[instrument(skip(self), err)]
    async fn delete_blog(&self, id: BlogId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM blogs WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
