//! Permissions are addressed by name, the same string the authorization gate matches on.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use tracing::info;

use crate::{
    AppState,
    api::{
        handlers::conflict_on_unique,
        models::{
            MessageResponse,
            permissions::{PermissionRequest, PermissionResponse},
        },
        validation::ValidatedJson,
    },
    db::{
        models::{
            Protected,
            permissions::{PermissionCreateDBRequest, PermissionDBResponse},
        },
        store::{PermissionStore, Store},
    },
    errors::{Error, Result},
    types::Operation,
};

pub(crate) async fn get_permission_by_name_or_404(store: &dyn Store, name: &str) -> Result<PermissionDBResponse> {
    store.find_permission_by_name(name).await?.ok_or_else(|| Error::NotFound {
        resource: "Permission".to_string(),
        field: "name".to_string(),
        value: name.to_string(),
    })
}

fn permission_exists(name: &str) -> Error {
    Error::Conflict {
        message: format!("Permission already exists: {name}"),
    }
}

#[utoipa::path(
    post,
    path = "/api/permissions",
    request_body = PermissionRequest,
    tag = "permissions",
    responses(
        (status = 201, description = "Permission created", body = PermissionResponse),
        (status = 400, description = "Invalid input", body = crate::errors::ErrorBody),
        (status = 409, description = "Permission already exists", body = crate::errors::ErrorBody),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn create_permission(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<PermissionRequest>,
) -> Result<(StatusCode, Json<PermissionResponse>)> {
    let store = state.store.as_ref();

    if store.find_permission_by_name(&request.name).await?.is_some() {
        return Err(permission_exists(&request.name));
    }

    let permission = store
        .create_permission(&PermissionCreateDBRequest {
            name: request.name.clone(),
            immutable: false,
        })
        .await
        .map_err(|e| conflict_on_unique(e, || format!("Permission already exists: {}", request.name)))?;

    info!("Created permission {}", permission.name);
    Ok((StatusCode::CREATED, Json(PermissionResponse::from(permission))))
}

#[utoipa::path(
    get,
    path = "/api/permissions",
    tag = "permissions",
    responses((status = 200, description = "All permissions", body = Vec<PermissionResponse>)),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn list_permissions(State(state): State<AppState>) -> Result<Json<Vec<PermissionResponse>>> {
    let permissions = state.store.list_permissions().await?;
    Ok(Json(permissions.into_iter().map(PermissionResponse::from).collect()))
}

#[utoipa::path(
    get,
    path = "/api/permissions/{name}",
    tag = "permissions",
    params(("name" = String, Path, description = "Permission name")),
    responses(
        (status = 200, description = "The permission", body = PermissionResponse),
        (status = 404, description = "Permission not found", body = crate::errors::ErrorBody),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn get_permission(State(state): State<AppState>, Path(name): Path<String>) -> Result<Json<PermissionResponse>> {
    let permission = get_permission_by_name_or_404(state.store.as_ref(), &name).await?;
    Ok(Json(PermissionResponse::from(permission)))
}

/// Rename a permission. Catalog permissions are rejected.
#[utoipa::path(
    put,
    path = "/api/permissions/{name}",
    request_body = PermissionRequest,
    tag = "permissions",
    params(("name" = String, Path, description = "Current permission name")),
    responses(
        (status = 200, description = "Permission renamed", body = PermissionResponse),
        (status = 403, description = "Permission is immutable", body = crate::errors::ErrorBody),
        (status = 404, description = "Permission not found", body = crate::errors::ErrorBody),
        (status = 409, description = "Permission already exists", body = crate::errors::ErrorBody),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn update_permission(
    State(state): State<AppState>,
    Path(name): Path<String>,
    ValidatedJson(request): ValidatedJson<PermissionRequest>,
) -> Result<Json<PermissionResponse>> {
    let store = state.store.as_ref();
    let permission = get_permission_by_name_or_404(store, &name).await?;
    permission.ensure_mutable(Operation::Update)?;

    if request.name != permission.name && store.find_permission_by_name(&request.name).await?.is_some() {
        return Err(permission_exists(&request.name));
    }

    let renamed = store
        .rename_permission(permission.id, &request.name)
        .await
        .map_err(|e| conflict_on_unique(e, || format!("Permission already exists: {}", request.name)))?;

    info!("Renamed permission {name} to {}", renamed.name);
    Ok(Json(PermissionResponse::from(renamed)))
}

#[utoipa::path(
    delete,
    path = "/api/permissions/{name}",
    tag = "permissions",
    params(("name" = String, Path, description = "Permission name")),
    responses(
        (status = 200, description = "Permission deleted", body = MessageResponse),
        (status = 403, description = "Permission is immutable", body = crate::errors::ErrorBody),
        (status = 404, description = "Permission not found", body = crate::errors::ErrorBody),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn delete_permission(State(state): State<AppState>, Path(name): Path<String>) -> Result<Json<MessageResponse>> {
    let store = state.store.as_ref();
    let permission = get_permission_by_name_or_404(store, &name).await?;
    permission.ensure_mutable(Operation::Delete)?;

    if !store.delete_permission(permission.id).await? {
        return Err(Error::NotFound {
            resource: "Permission".to_string(),
            field: "name".to_string(),
            value: name,
        });
    }
    info!("Deleted permission {name}");
    Ok(Json(MessageResponse::new("Permission deleted successfully")))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::{Value, json};

    use crate::api::models::permissions::PermissionResponse;
    use crate::auth::permissions::{CATALOG, CREATE_BLOG};
    use crate::db::store::PermissionStore;
    use crate::test_utils::{ADMIN_EMAIL, ADMIN_PASSWORD, create_test_app, login};

    #[test_log::test(tokio::test)]
    async fn test_catalog_is_listed_and_immutable() {
        let (server, _) = create_test_app().await;
        let token = login(&server, ADMIN_EMAIL, ADMIN_PASSWORD).await;

        let permissions: Vec<PermissionResponse> = server.get("/api/permissions").authorization_bearer(&token).await.json();
        for name in CATALOG {
            let found = permissions.iter().find(|p| p.name == name).unwrap();
            assert!(found.immutable, "{name} should be immutable");
        }
    }

    #[test_log::test(tokio::test)]
    async fn test_catalog_permission_cannot_be_deleted_or_renamed() {
        let (server, state) = create_test_app().await;
        let token = login(&server, ADMIN_EMAIL, ADMIN_PASSWORD).await;

        let response = server
            .delete(&format!("/api/permissions/{CREATE_BLOG}"))
            .authorization_bearer(&token)
            .await;
        response.assert_status(StatusCode::FORBIDDEN);
        assert_eq!(response.json::<Value>()["message"], "Can not remove default permission");

        let response = server
            .put(&format!("/api/permissions/{CREATE_BLOG}"))
            .authorization_bearer(&token)
            .json(&json!({"name": "MAKE_BLOG"}))
            .await;
        response.assert_status(StatusCode::FORBIDDEN);
        assert_eq!(response.json::<Value>()["message"], "Can not modify default permission");

        assert!(state.store.find_permission_by_name(CREATE_BLOG).await.unwrap().is_some());
        assert!(state.store.find_permission_by_name("MAKE_BLOG").await.unwrap().is_none());
    }

    #[test_log::test(tokio::test)]
    async fn test_custom_permission_lifecycle() {
        let (server, _) = create_test_app().await;
        let token = login(&server, ADMIN_EMAIL, ADMIN_PASSWORD).await;

        let response = server
            .post("/api/permissions")
            .authorization_bearer(&token)
            .json(&json!({"name": "PUBLISH_BLOG"}))
            .await;
        response.assert_status(StatusCode::CREATED);
        assert!(!response.json::<PermissionResponse>().immutable);

        let response = server
            .post("/api/permissions")
            .authorization_bearer(&token)
            .json(&json!({"name": "PUBLISH_BLOG"}))
            .await;
        response.assert_status(StatusCode::CONFLICT);
        assert_eq!(response.json::<Value>()["message"], "Permission already exists: PUBLISH_BLOG");

        let response = server
            .put("/api/permissions/PUBLISH_BLOG")
            .authorization_bearer(&token)
            .json(&json!({"name": "RELEASE_BLOG"}))
            .await;
        response.assert_status_ok();
        assert_eq!(response.json::<PermissionResponse>().name, "RELEASE_BLOG");

        server
            .get("/api/permissions/PUBLISH_BLOG")
            .authorization_bearer(&token)
            .await
            .assert_status(StatusCode::NOT_FOUND);

        let response = server.delete("/api/permissions/RELEASE_BLOG").authorization_bearer(&token).await;
        response.assert_status_ok();
        assert_eq!(response.json::<Value>()["message"], "Permission deleted successfully");
    }

    #[test_log::test(tokio::test)]
    async fn test_rename_onto_existing_name_is_conflict() {
        let (server, _) = create_test_app().await;
        let token = login(&server, ADMIN_EMAIL, ADMIN_PASSWORD).await;

        server
            .post("/api/permissions")
            .authorization_bearer(&token)
            .json(&json!({"name": "EXPORT_BLOG"}))
            .await
            .assert_status(StatusCode::CREATED);

        let response = server
            .put("/api/permissions/EXPORT_BLOG")
            .authorization_bearer(&token)
            .json(&json!({"name": CREATE_BLOG}))
            .await;
        response.assert_status(StatusCode::CONFLICT);
    }
}
