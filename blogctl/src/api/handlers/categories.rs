use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use tracing::info;

use crate::{
    AppState,
    api::{
        models::{
            MessageResponse,
            categories::{CategoryCreate, CategoryResponse, CategoryUpdate},
        },
        validation::ValidatedJson,
    },
    db::store::CategoryStore,
    errors::{Error, Result},
    types::CategoryId,
};

#[utoipa::path(
    post,
    path = "/api/categories",
    request_body = CategoryCreate,
    tag = "categories",
    responses(
        (status = 201, description = "Category created", body = CategoryResponse),
        (status = 400, description = "Invalid input", body = crate::errors::ErrorBody),
        (status = 403, description = "Missing CREATE_CATEGORY", body = crate::errors::ErrorBody),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn create_category(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<CategoryCreate>,
) -> Result<(StatusCode, Json<CategoryResponse>)> {
    let category = state.store.create_category(&request.into()).await?;
    info!("Created category {} ({})", category.title, category.id);
    Ok((StatusCode::CREATED, Json(CategoryResponse::from(category))))
}

#[utoipa::path(
    get,
    path = "/api/categories",
    tag = "categories",
    responses((status = 200, description = "All categories", body = Vec<CategoryResponse>))
)]
#[tracing::instrument(skip_all)]
pub async fn list_categories(State(state): State<AppState>) -> Result<Json<Vec<CategoryResponse>>> {
    let categories = state.store.list_categories().await?;
    Ok(Json(categories.into_iter().map(CategoryResponse::from).collect()))
}

#[utoipa::path(
    get,
    path = "/api/categories/{id}",
    tag = "categories",
    params(("id" = i64, Path, description = "Category ID")),
    responses(
        (status = 200, description = "The category", body = CategoryResponse),
        (status = 404, description = "Category not found", body = crate::errors::ErrorBody),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn get_category(State(state): State<AppState>, Path(id): Path<CategoryId>) -> Result<Json<CategoryResponse>> {
    let category = state.store.get_category(id).await?.ok_or_else(|| Error::not_found("Category", id))?;
    Ok(Json(CategoryResponse::from(category)))
}

#[utoipa::path(
    put,
    path = "/api/categories/{id}",
    request_body = CategoryUpdate,
    tag = "categories",
    params(("id" = i64, Path, description = "Category ID")),
    responses(
        (status = 200, description = "Category updated", body = CategoryResponse),
        (status = 404, description = "Category not found", body = crate::errors::ErrorBody),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn update_category(
    State(state): State<AppState>,
    Path(id): Path<CategoryId>,
    ValidatedJson(request): ValidatedJson<CategoryUpdate>,
) -> Result<Json<CategoryResponse>> {
    let store = state.store.as_ref();
    store.get_category(id).await?.ok_or_else(|| Error::not_found("Category", id))?;
    let category = store.update_category(id, &request.into()).await?;
    Ok(Json(CategoryResponse::from(category)))
}

#[utoipa::path(
    delete,
    path = "/api/categories/{id}",
    tag = "categories",
    params(("id" = i64, Path, description = "Category ID")),
    responses(
        (status = 200, description = "Category deleted", body = MessageResponse),
        (status = 404, description = "Category not found", body = crate::errors::ErrorBody),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn delete_category(State(state): State<AppState>, Path(id): Path<CategoryId>) -> Result<Json<MessageResponse>> {
    if !state.store.delete_category(id).await? {
        return Err(Error::not_found("Category", id));
    }
    info!("Deleted category {id}");
    Ok(Json(MessageResponse::new("Category deleted successfully")))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::{Value, json};

    use crate::api::models::categories::CategoryResponse;
    use crate::test_utils::{create_test_app, register};

    #[test_log::test(tokio::test)]
    async fn test_category_crud() {
        let (server, _) = create_test_app().await;
        let token = register(&server, "Writer", "writer@example.com", "secret123").await;

        let response = server
            .post("/api/categories")
            .authorization_bearer(&token)
            .json(&json!({"title": "Rust", "description": "Systems programming"}))
            .await;
        response.assert_status(StatusCode::CREATED);
        let created: CategoryResponse = response.json();

        let fetched: CategoryResponse = server.get(&format!("/api/categories/{}", created.id)).await.json();
        assert_eq!(fetched.title, "Rust");

        let response = server
            .put(&format!("/api/categories/{}", created.id))
            .authorization_bearer(&token)
            .json(&json!({"title": "Rust 2024"}))
            .await;
        response.assert_status_ok();
        let updated: CategoryResponse = response.json();
        assert_eq!(updated.title, "Rust 2024");
        assert_eq!(updated.description.as_deref(), Some("Systems programming"));

        let response = server
            .delete(&format!("/api/categories/{}", created.id))
            .authorization_bearer(&token)
            .await;
        response.assert_status_ok();
        assert_eq!(response.json::<Value>()["message"], "Category deleted successfully");

        server
            .get(&format!("/api/categories/{}", created.id))
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }

    #[test_log::test(tokio::test)]
    async fn test_writes_need_a_token() {
        let (server, _) = create_test_app().await;

        server
            .post("/api/categories")
            .json(&json!({"title": "Anonymous"}))
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
    }

    #[test_log::test(tokio::test)]
    async fn test_missing_title_is_validation_error() {
        let (server, _) = create_test_app().await;
        let token = register(&server, "Writer", "writer@example.com", "secret123").await;

        let response = server
            .post("/api/categories")
            .authorization_bearer(&token)
            .json(&json!({"description": "no title"}))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(body["error"], "Validation Error");
        assert_eq!(body["errors"][0]["field"], "title");
    }

    #[test_log::test(tokio::test)]
    async fn test_unknown_category_is_not_found() {
        let (server, _) = create_test_app().await;

        let response = server.get("/api/categories/777").await;
        response.assert_status(StatusCode::NOT_FOUND);
        assert_eq!(response.json::<Value>()["message"], "Category not found with ID: 777");
    }
}
