use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use tracing::info;

use crate::{
    AppState,
    api::{
        handlers::{conflict_on_unique, ensure_permissions_exist, permissions::get_permission_by_name_or_404},
        models::{
            MessageResponse,
            permissions::PermissionResponse,
            roles::{RoleCreate, RoleResponse, RoleUpdate},
        },
        validation::ValidatedJson,
    },
    db::{
        models::{
            Protected,
            roles::{RoleCreateDBRequest, RoleDBResponse, RoleUpdateDBRequest},
        },
        store::{RoleStore, Store},
    },
    errors::{Error, Result},
    types::{Operation, RoleId},
};

async fn get_role_or_404(store: &dyn Store, id: RoleId) -> Result<RoleDBResponse> {
    store.get_role(id).await?.ok_or_else(|| Error::not_found("Role", id))
}

fn role_exists(name: &str) -> Error {
    Error::Conflict {
        message: format!("Role already exists: {name}"),
    }
}

#[utoipa::path(
    post,
    path = "/api/roles",
    request_body = RoleCreate,
    tag = "roles",
    responses(
        (status = 201, description = "Role created", body = RoleResponse),
        (status = 400, description = "Invalid input", body = crate::errors::ErrorBody),
        (status = 404, description = "Unknown permission ids", body = crate::errors::ErrorBody),
        (status = 409, description = "Role already exists", body = crate::errors::ErrorBody),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn create_role(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<RoleCreate>,
) -> Result<(StatusCode, Json<RoleResponse>)> {
    let store = state.store.as_ref();

    if store.find_role_by_name(&request.name).await?.is_some() {
        return Err(role_exists(&request.name));
    }
    ensure_permissions_exist(store, &request.permission_ids).await?;

    let role = store
        .create_role(&RoleCreateDBRequest {
            name: request.name.clone(),
            immutable: false,
            permission_ids: request.permission_ids,
        })
        .await
        .map_err(|e| conflict_on_unique(e, || format!("Role already exists: {}", request.name)))?;

    info!("Created role {} ({})", role.name, role.id);
    Ok((StatusCode::CREATED, Json(RoleResponse::from(role))))
}

#[utoipa::path(
    get,
    path = "/api/roles",
    tag = "roles",
    responses((status = 200, description = "All roles", body = Vec<RoleResponse>)),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn list_roles(State(state): State<AppState>) -> Result<Json<Vec<RoleResponse>>> {
    let roles = state.store.list_roles().await?;
    Ok(Json(roles.into_iter().map(RoleResponse::from).collect()))
}

#[utoipa::path(
    get,
    path = "/api/roles/{id}",
    tag = "roles",
    params(("id" = i64, Path, description = "Role ID")),
    responses(
        (status = 200, description = "The role", body = RoleResponse),
        (status = 404, description = "Role not found", body = crate::errors::ErrorBody),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn get_role(State(state): State<AppState>, Path(id): Path<RoleId>) -> Result<Json<RoleResponse>> {
    let role = get_role_or_404(state.store.as_ref(), id).await?;
    Ok(Json(RoleResponse::from(role)))
}

#[utoipa::path(
    get,
    path = "/api/roles/{id}/permissions",
    tag = "roles",
    params(("id" = i64, Path, description = "Role ID")),
    responses(
        (status = 200, description = "Permissions granted by the role", body = Vec<PermissionResponse>),
        (status = 404, description = "Role not found", body = crate::errors::ErrorBody),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn get_role_permissions(State(state): State<AppState>, Path(id): Path<RoleId>) -> Result<Json<Vec<PermissionResponse>>> {
    let store = state.store.as_ref();
    let role = get_role_or_404(store, id).await?;
    let permissions = store.get_role_permissions(role.id).await?;
    Ok(Json(permissions.into_iter().map(PermissionResponse::from).collect()))
}

/// Rename a role or replace its permission set. Seeded roles are rejected.
#[utoipa::path(
    put,
    path = "/api/roles/{id}",
    request_body = RoleUpdate,
    tag = "roles",
    params(("id" = i64, Path, description = "Role ID")),
    responses(
        (status = 200, description = "Role updated", body = RoleResponse),
        (status = 403, description = "Role is immutable", body = crate::errors::ErrorBody),
        (status = 404, description = "Role or permission not found", body = crate::errors::ErrorBody),
        (status = 409, description = "Role already exists", body = crate::errors::ErrorBody),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn update_role(
    State(state): State<AppState>,
    Path(id): Path<RoleId>,
    ValidatedJson(request): ValidatedJson<RoleUpdate>,
) -> Result<Json<RoleResponse>> {
    let store = state.store.as_ref();
    let role = get_role_or_404(store, id).await?;
    role.ensure_mutable(Operation::Update)?;

    if let Some(name) = &request.name
        && let Some(existing) = store.find_role_by_name(name).await?
        && existing.id != id
    {
        return Err(role_exists(name));
    }
    if let Some(permission_ids) = &request.permission_ids {
        ensure_permissions_exist(store, permission_ids).await?;
    }

    let name = request.name.clone().unwrap_or_default();
    let updated = store
        .update_role(
            id,
            &RoleUpdateDBRequest {
                name: request.name,
                permission_ids: request.permission_ids,
            },
        )
        .await
        .map_err(|e| conflict_on_unique(e, || format!("Role already exists: {name}")))?;

    Ok(Json(RoleResponse::from(updated)))
}

#[utoipa::path(
    delete,
    path = "/api/roles/{id}",
    tag = "roles",
    params(("id" = i64, Path, description = "Role ID")),
    responses(
        (status = 200, description = "Role deleted", body = MessageResponse),
        (status = 403, description = "Role is immutable", body = crate::errors::ErrorBody),
        (status = 404, description = "Role not found", body = crate::errors::ErrorBody),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn delete_role(State(state): State<AppState>, Path(id): Path<RoleId>) -> Result<Json<MessageResponse>> {
    let store = state.store.as_ref();
    let role = get_role_or_404(store, id).await?;
    role.ensure_mutable(Operation::Delete)?;

    if !store.delete_role(id).await? {
        return Err(Error::not_found("Role", id));
    }
    info!("Deleted role {} ({id})", role.name);
    Ok(Json(MessageResponse::new("Role deleted successfully")))
}

/// Grant a permission, by name, to a role. Allowed on seeded roles too; the next bootstrap run
/// restores their default grants.
#[utoipa::path(
    post,
    path = "/api/roles/{id}/permissions/{permission_name}",
    tag = "roles",
    params(
        ("id" = i64, Path, description = "Role ID"),
        ("permission_name" = String, Path, description = "Permission name"),
    ),
    responses(
        (status = 200, description = "Permission granted", body = RoleResponse),
        (status = 404, description = "Role or permission not found", body = crate::errors::ErrorBody),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn add_role_permission(
    State(state): State<AppState>,
    Path((id, permission_name)): Path<(RoleId, String)>,
) -> Result<Json<RoleResponse>> {
    let store = state.store.as_ref();
    get_role_or_404(store, id).await?;
    let permission = get_permission_by_name_or_404(store, &permission_name).await?;

    store.add_role_permission(id, permission.id).await?;
    info!("Granted {} to role {id}", permission.name);

    Ok(Json(RoleResponse::from(get_role_or_404(store, id).await?)))
}

#[utoipa::path(
    delete,
    path = "/api/roles/{id}/permissions/{permission_name}",
    tag = "roles",
    params(
        ("id" = i64, Path, description = "Role ID"),
        ("permission_name" = String, Path, description = "Permission name"),
    ),
    responses(
        (status = 200, description = "Permission revoked", body = RoleResponse),
        (status = 404, description = "Role or permission not found", body = crate::errors::ErrorBody),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn remove_role_permission(
    State(state): State<AppState>,
    Path((id, permission_name)): Path<(RoleId, String)>,
) -> Result<Json<RoleResponse>> {
    let store = state.store.as_ref();
    get_role_or_404(store, id).await?;
    let permission = get_permission_by_name_or_404(store, &permission_name).await?;

    store.remove_role_permission(id, permission.id).await?;
    info!("Revoked {} from role {id}", permission.name);

    Ok(Json(RoleResponse::from(get_role_or_404(store, id).await?)))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::{Value, json};

    use crate::api::models::roles::RoleResponse;
    use crate::auth::permissions::{USER_PERMISSIONS, VIEW_USER};
    use crate::db::store::{PermissionStore, RoleStore};
    use crate::test_utils::{ADMIN_EMAIL, ADMIN_PASSWORD, create_test_app, login, register};

    #[test_log::test(tokio::test)]
    async fn test_role_management_requires_administrator() {
        let (server, _) = create_test_app().await;
        let token = register(&server, "Plain", "plain@example.com", "secret123").await;

        server.get("/api/roles").authorization_bearer(&token).await.assert_status(StatusCode::FORBIDDEN);
        server
            .post("/api/roles")
            .authorization_bearer(&token)
            .json(&json!({"name": "SNEAKY"}))
            .await
            .assert_status(StatusCode::FORBIDDEN);
    }

    #[test_log::test(tokio::test)]
    async fn test_create_update_delete_custom_role() {
        let (server, state) = create_test_app().await;
        let token = login(&server, ADMIN_EMAIL, ADMIN_PASSWORD).await;
        let view_user = state.store.find_permission_by_name(VIEW_USER).await.unwrap().unwrap();

        let response = server
            .post("/api/roles")
            .authorization_bearer(&token)
            .json(&json!({"name": "AUDITOR", "permission_ids": [view_user.id]}))
            .await;
        response.assert_status(StatusCode::CREATED);
        let role: RoleResponse = response.json();
        assert!(!role.immutable);
        assert_eq!(role.permission_ids, vec![view_user.id]);

        let response = server
            .put(&format!("/api/roles/{}", role.id))
            .authorization_bearer(&token)
            .json(&json!({"name": "INSPECTOR"}))
            .await;
        response.assert_status_ok();
        let renamed: RoleResponse = response.json();
        assert_eq!(renamed.name, "INSPECTOR");
        assert_eq!(renamed.permission_ids, vec![view_user.id]);

        let response = server.delete(&format!("/api/roles/{}", role.id)).authorization_bearer(&token).await;
        response.assert_status_ok();
        assert_eq!(response.json::<Value>()["message"], "Role deleted successfully");
        assert!(state.store.get_role(role.id).await.unwrap().is_none());
    }

    #[test_log::test(tokio::test)]
    async fn test_duplicate_role_is_conflict() {
        let (server, _) = create_test_app().await;
        let token = login(&server, ADMIN_EMAIL, ADMIN_PASSWORD).await;

        let response = server
            .post("/api/roles")
            .authorization_bearer(&token)
            .json(&json!({"name": "USER"}))
            .await;
        response.assert_status(StatusCode::CONFLICT);
        assert_eq!(response.json::<Value>()["message"], "Role already exists: USER");
    }

    #[test_log::test(tokio::test)]
    async fn test_seeded_roles_are_immutable() {
        let (server, state) = create_test_app().await;
        let token = login(&server, ADMIN_EMAIL, ADMIN_PASSWORD).await;
        let user_role = state.store.find_role_by_name("USER").await.unwrap().unwrap();

        let response = server
            .delete(&format!("/api/roles/{}", user_role.id))
            .authorization_bearer(&token)
            .await;
        response.assert_status(StatusCode::FORBIDDEN);
        assert_eq!(response.json::<Value>()["message"], "Can not remove default role");

        let response = server
            .put(&format!("/api/roles/{}", user_role.id))
            .authorization_bearer(&token)
            .json(&json!({"name": "MEMBER"}))
            .await;
        response.assert_status(StatusCode::FORBIDDEN);
        assert_eq!(response.json::<Value>()["message"], "Can not modify default role");

        assert_eq!(state.store.get_role(user_role.id).await.unwrap().unwrap().name, "USER");
    }

    #[test_log::test(tokio::test)]
    async fn test_permission_grant_on_seeded_role_applies_to_members() {
        let (server, state) = create_test_app().await;
        let admin_token = login(&server, ADMIN_EMAIL, ADMIN_PASSWORD).await;
        let user_token = register(&server, "Reader", "reader@example.com", "secret123").await;
        let user_role = state.store.find_role_by_name("USER").await.unwrap().unwrap();
        assert_eq!(user_role.permission_ids.len(), USER_PERMISSIONS.len());

        server
            .get("/api/users")
            .authorization_bearer(&user_token)
            .await
            .assert_status(StatusCode::FORBIDDEN);

        let response = server
            .post(&format!("/api/roles/{}/permissions/{VIEW_USER}", user_role.id))
            .authorization_bearer(&admin_token)
            .await;
        response.assert_status_ok();
        let role: RoleResponse = response.json();
        assert_eq!(role.permission_ids.len(), USER_PERMISSIONS.len() + 1);

        server.get("/api/users").authorization_bearer(&user_token).await.assert_status_ok();

        server
            .delete(&format!("/api/roles/{}/permissions/{VIEW_USER}", user_role.id))
            .authorization_bearer(&admin_token)
            .await
            .assert_status_ok();
        server
            .get("/api/users")
            .authorization_bearer(&user_token)
            .await
            .assert_status(StatusCode::FORBIDDEN);
    }

    #[test_log::test(tokio::test)]
    async fn test_unknown_permission_ids_are_listed() {
        let (server, _) = create_test_app().await;
        let token = login(&server, ADMIN_EMAIL, ADMIN_PASSWORD).await;

        let response = server
            .post("/api/roles")
            .authorization_bearer(&token)
            .json(&json!({"name": "GHOST", "permission_ids": [4040]}))
            .await;
        response.assert_status(StatusCode::NOT_FOUND);
        assert_eq!(response.json::<Value>()["message"], "Permissions not found with IDs: [4040]");
    }
}
