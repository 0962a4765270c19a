use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use tracing::info;

use crate::{
    AppState,
    api::{
        handlers::{ensure_categories_exist, ensure_owner, resolve_author, series::get_series_or_404},
        models::{
            MessageResponse,
            blogs::{BlogCreate, BlogResponse, BlogUpdate},
        },
        validation::ValidatedJson,
    },
    auth::identity::Identity,
    db::{
        models::blogs::{BlogCreateDBRequest, BlogDBResponse, BlogFilter, BlogUpdateDBRequest},
        store::{BlogStore, CategoryStore, Store, UserStore},
    },
    errors::{Error, Result},
    types::{BlogId, CategoryId, Operation, SeriesId, UserId},
};

async fn get_blog_or_404(store: &dyn Store, id: BlogId) -> Result<BlogDBResponse> {
    store.get_blog(id).await?.ok_or_else(|| Error::not_found("Blog", id))
}

async fn list(store: &dyn Store, filter: BlogFilter) -> Result<Json<Vec<BlogResponse>>> {
    let blogs = store.list_blogs(&filter).await?;
    Ok(Json(blogs.into_iter().map(BlogResponse::from).collect()))
}

/// Publish a blog. The caller is the author unless an admin names someone else.
#[utoipa::path(
    post,
    path = "/api/blogs",
    request_body = BlogCreate,
    tag = "blogs",
    responses(
        (status = 201, description = "Blog created", body = BlogResponse),
        (status = 400, description = "Invalid input", body = crate::errors::ErrorBody),
        (status = 403, description = "Not permitted to publish for that author", body = crate::errors::ErrorBody),
        (status = 404, description = "Author, category or series not found", body = crate::errors::ErrorBody),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn create_blog(
    State(state): State<AppState>,
    caller: Identity,
    ValidatedJson(request): ValidatedJson<BlogCreate>,
) -> Result<(StatusCode, Json<BlogResponse>)> {
    let store = state.store.as_ref();
    let author_id = resolve_author(store, &caller, request.author_id, "blog").await?;

    ensure_categories_exist(store, &request.category_ids).await?;
    if let Some(series_id) = request.series_id {
        get_series_or_404(store, series_id).await?;
    }

    let blog = store
        .create_blog(&BlogCreateDBRequest {
            title: request.title,
            content: request.content,
            author_id,
            category_ids: request.category_ids,
            series_id: request.series_id,
        })
        .await?;

    info!("Created blog {} for user {author_id}", blog.id);
    Ok((StatusCode::CREATED, Json(BlogResponse::from(blog))))
}

#[utoipa::path(
    get,
    path = "/api/blogs",
    tag = "blogs",
    responses((status = 200, description = "All blogs", body = Vec<BlogResponse>))
)]
#[tracing::instrument(skip_all)]
pub async fn list_blogs(State(state): State<AppState>) -> Result<Json<Vec<BlogResponse>>> {
    list(state.store.as_ref(), BlogFilter::default()).await
}

#[utoipa::path(
    get,
    path = "/api/blogs/{id}",
    tag = "blogs",
    params(("id" = i64, Path, description = "Blog ID")),
    responses(
        (status = 200, description = "The blog", body = BlogResponse),
        (status = 404, description = "Blog not found", body = crate::errors::ErrorBody),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn get_blog(State(state): State<AppState>, Path(id): Path<BlogId>) -> Result<Json<BlogResponse>> {
    let blog = get_blog_or_404(state.store.as_ref(), id).await?;
    Ok(Json(BlogResponse::from(blog)))
}

#[utoipa::path(
    get,
    path = "/api/blogs/users/{user_id}",
    tag = "blogs",
    params(("user_id" = i64, Path, description = "Author's user ID")),
    responses(
        (status = 200, description = "Blogs by the author", body = Vec<BlogResponse>),
        (status = 404, description = "User not found", body = crate::errors::ErrorBody),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_blogs_by_user(State(state): State<AppState>, Path(user_id): Path<UserId>) -> Result<Json<Vec<BlogResponse>>> {
    let store = state.store.as_ref();
    store.get_user(user_id).await?.ok_or_else(|| Error::not_found("User", user_id))?;
    list(
        store,
        BlogFilter {
            author_id: Some(user_id),
            ..Default::default()
        },
    )
    .await
}

#[utoipa::path(
    get,
    path = "/api/blogs/series/{series_id}",
    tag = "blogs",
    params(("series_id" = i64, Path, description = "Series ID")),
    responses(
        (status = 200, description = "Blogs in the series", body = Vec<BlogResponse>),
        (status = 404, description = "Series not found", body = crate::errors::ErrorBody),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_blogs_by_series(State(state): State<AppState>, Path(series_id): Path<SeriesId>) -> Result<Json<Vec<BlogResponse>>> {
    let store = state.store.as_ref();
    get_series_or_404(store, series_id).await?;
    list(
        store,
        BlogFilter {
            series_id: Some(series_id),
            ..Default::default()
        },
    )
    .await
}

#[utoipa::path(
    get,
    path = "/api/blogs/categories/{category_id}",
    tag = "blogs",
    params(("category_id" = i64, Path, description = "Category ID")),
    responses(
        (status = 200, description = "Blogs in the category", body = Vec<BlogResponse>),
        (status = 404, description = "Category not found", body = crate::errors::ErrorBody),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_blogs_by_category(
    State(state): State<AppState>,
    Path(category_id): Path<CategoryId>,
) -> Result<Json<Vec<BlogResponse>>> {
    let store = state.store.as_ref();
    store
        .get_category(category_id)
        .await?
        .ok_or_else(|| Error::not_found("Category", category_id))?;
    list(
        store,
        BlogFilter {
            category_id: Some(category_id),
            ..Default::default()
        },
    )
    .await
}

#[utoipa::path(
    put,
    path = "/api/blogs/{id}",
    request_body = BlogUpdate,
    tag = "blogs",
    params(("id" = i64, Path, description = "Blog ID")),
    responses(
        (status = 200, description = "Blog updated", body = BlogResponse),
        (status = 403, description = "Not the author", body = crate::errors::ErrorBody),
        (status = 404, description = "Blog, category or series not found", body = crate::errors::ErrorBody),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn update_blog(
    State(state): State<AppState>,
    caller: Identity,
    Path(id): Path<BlogId>,
    ValidatedJson(request): ValidatedJson<BlogUpdate>,
) -> Result<Json<BlogResponse>> {
    let store = state.store.as_ref();
    let blog = get_blog_or_404(store, id).await?;
    ensure_owner(&caller, blog.author_id, Operation::Update, format!("blog {id}"))?;

    if let Some(category_ids) = &request.category_ids {
        ensure_categories_exist(store, category_ids).await?;
    }
    if let Some(series_id) = request.series_id {
        get_series_or_404(store, series_id).await?;
    }

    let updated = store
        .update_blog(
            id,
            &BlogUpdateDBRequest {
                title: request.title,
                content: request.content,
                category_ids: request.category_ids,
                series_id: request.series_id,
            },
        )
        .await?;
    Ok(Json(BlogResponse::from(updated)))
}

#[utoipa::path(
    delete,
    path = "/api/blogs/{id}",
    tag = "blogs",
    params(("id" = i64, Path, description = "Blog ID")),
    responses(
        (status = 200, description = "Blog deleted", body = MessageResponse),
        (status = 403, description = "Not the author", body = crate::errors::ErrorBody),
        (status = 404, description = "Blog not found", body = crate::errors::ErrorBody),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn delete_blog(State(state): State<AppState>, caller: Identity, Path(id): Path<BlogId>) -> Result<Json<MessageResponse>> {
    let store = state.store.as_ref();
    let blog = get_blog_or_404(store, id).await?;
    ensure_owner(&caller, blog.author_id, Operation::Delete, format!("blog {id}"))?;

    if !store.delete_blog(id).await? {
        return Err(Error::not_found("Blog", id));
    }
    info!("Deleted blog {id}");
    Ok(Json(MessageResponse::new("Blog deleted successfully")))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use axum_test::TestServer;
    use serde_json::{Value, json};

    use crate::api::models::{blogs::BlogResponse, categories::CategoryResponse, series::SeriesResponse};
    use crate::db::store::UserStore;
    use crate::test_utils::{ADMIN_EMAIL, ADMIN_PASSWORD, create_test_app, login, register};

    async fn category(server: &TestServer, token: &str, title: &str) -> CategoryResponse {
        server
            .post("/api/categories")
            .authorization_bearer(token)
            .json(&json!({"title": title}))
            .await
            .json()
    }

    #[test_log::test(tokio::test)]
    async fn test_publish_and_filter_blogs() {
        let (server, state) = create_test_app().await;
        let token = register(&server, "Author", "author@example.com", "secret123").await;
        let author = state.store.find_user_by_email("author@example.com").await.unwrap().unwrap();
        let rust = category(&server, &token, "Rust").await;
        let go = category(&server, &token, "Go").await;
        let series: SeriesResponse = server
            .post("/api/series")
            .authorization_bearer(&token)
            .json(&json!({"title": "Ownership"}))
            .await
            .json();

        let response = server
            .post("/api/blogs")
            .authorization_bearer(&token)
            .json(&json!({
                "title": "Borrowing",
                "content": {"blocks": [{"type": "paragraph", "text": "Hello"}]},
                "category_ids": [rust.id],
                "series_id": series.id,
            }))
            .await;
        response.assert_status(StatusCode::CREATED);
        let blog: BlogResponse = response.json();
        assert_eq!(blog.author_id, author.id);
        assert_eq!(blog.category_ids, vec![rust.id]);
        assert_eq!(blog.series_id, Some(series.id));
        assert_eq!(blog.content["blocks"][0]["text"], "Hello");

        let by_category: Vec<BlogResponse> = server.get(&format!("/api/blogs/categories/{}", rust.id)).await.json();
        assert_eq!(by_category.len(), 1);
        let by_other: Vec<BlogResponse> = server.get(&format!("/api/blogs/categories/{}", go.id)).await.json();
        assert!(by_other.is_empty());
        let by_series: Vec<BlogResponse> = server.get(&format!("/api/blogs/series/{}", series.id)).await.json();
        assert_eq!(by_series.len(), 1);
        let by_user: Vec<BlogResponse> = server.get(&format!("/api/blogs/users/{}", author.id)).await.json();
        assert_eq!(by_user.len(), 1);
    }

    #[test_log::test(tokio::test)]
    async fn test_unknown_categories_are_listed() {
        let (server, _) = create_test_app().await;
        let token = register(&server, "Author", "author@example.com", "secret123").await;

        let response = server
            .post("/api/blogs")
            .authorization_bearer(&token)
            .json(&json!({"title": "Lost", "content": {}, "category_ids": [41, 42]}))
            .await;
        response.assert_status(StatusCode::NOT_FOUND);
        assert_eq!(response.json::<Value>()["message"], "Categories not found with IDs: [41, 42]");
    }

    #[test_log::test(tokio::test)]
    async fn test_content_must_be_an_object() {
        let (server, _) = create_test_app().await;
        let token = register(&server, "Author", "author@example.com", "secret123").await;

        let response = server
            .post("/api/blogs")
            .authorization_bearer(&token)
            .json(&json!({"title": "Flat", "content": "just a string"}))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(body["errors"][0]["field"], "content");
    }

    #[test_log::test(tokio::test)]
    async fn test_ownership_rules() {
        let (server, _) = create_test_app().await;
        let owner_token = register(&server, "Owner", "owner@example.com", "secret123").await;
        let intruder_token = register(&server, "Intruder", "intruder@example.com", "secret123").await;
        let admin_token = login(&server, ADMIN_EMAIL, ADMIN_PASSWORD).await;

        let blog: BlogResponse = server
            .post("/api/blogs")
            .authorization_bearer(&owner_token)
            .json(&json!({"title": "Mine", "content": {}}))
            .await
            .json();
        let path = format!("/api/blogs/{}", blog.id);

        server
            .put(&path)
            .authorization_bearer(&intruder_token)
            .json(&json!({"title": "Defaced"}))
            .await
            .assert_status(StatusCode::FORBIDDEN);
        server
            .delete(&path)
            .authorization_bearer(&intruder_token)
            .await
            .assert_status(StatusCode::FORBIDDEN);

        let response = server
            .put(&path)
            .authorization_bearer(&admin_token)
            .json(&json!({"title": "Moderated"}))
            .await;
        response.assert_status_ok();
        assert_eq!(response.json::<BlogResponse>().title, "Moderated");

        let response = server.delete(&path).authorization_bearer(&owner_token).await;
        response.assert_status_ok();
        assert_eq!(response.json::<Value>()["message"], "Blog deleted successfully");
        server.get(&path).await.assert_status(StatusCode::NOT_FOUND);
    }

    #[test_log::test(tokio::test)]
    async fn test_deleting_series_detaches_blogs() {
        let (server, _) = create_test_app().await;
        let token = register(&server, "Author", "author@example.com", "secret123").await;
        let series: SeriesResponse = server
            .post("/api/series")
            .authorization_bearer(&token)
            .json(&json!({"title": "Short lived"}))
            .await
            .json();
        let blog: BlogResponse = server
            .post("/api/blogs")
            .authorization_bearer(&token)
            .json(&json!({"title": "Survivor", "content": {}, "series_id": series.id}))
            .await
            .json();

        server
            .delete(&format!("/api/series/{}", series.id))
            .authorization_bearer(&token)
            .await
            .assert_status_ok();

        let after: BlogResponse = server.get(&format!("/api/blogs/{}", blog.id)).await.json();
        assert_eq!(after.series_id, None);
    }

    #[test_log::test(tokio::test)]
    async fn test_missing_series_is_not_found() {
        let (server, _) = create_test_app().await;
        let token = register(&server, "Author", "author@example.com", "secret123").await;

        let response = server
            .post("/api/blogs")
            .authorization_bearer(&token)
            .json(&json!({"title": "Orphan", "content": {}, "series_id": 999}))
            .await;
        response.assert_status(StatusCode::NOT_FOUND);
        assert_eq!(response.json::<Value>()["message"], "Series not found with ID: 999");
    }
}
