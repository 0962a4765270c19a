use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use tracing::info;

use crate::{
    AppState,
    api::{
        handlers::{conflict_on_unique, ensure_owner, ensure_roles_exist},
        models::{
            MessageResponse,
            roles::RoleResponse,
            users::{UserCreate, UserResponse, UserUpdate},
        },
        validation::ValidatedJson,
    },
    auth::{
        identity::Identity,
        password::{self, Argon2Params},
        permissions::USER_ROLE,
    },
    db::{
        models::{
            Protected,
            roles::RoleDBResponse,
            users::{UserCreateDBRequest, UserDBResponse, UserUpdateDBRequest},
        },
        store::{RoleStore, Store, UserStore},
    },
    errors::{Error, Result},
    types::{Operation, UserId},
};

async fn get_user_or_404(store: &dyn Store, id: UserId) -> Result<UserDBResponse> {
    store.get_user(id).await?.ok_or_else(|| Error::not_found("User", id))
}

async fn get_role_by_name_or_404(store: &dyn Store, name: &str) -> Result<RoleDBResponse> {
    store.find_role_by_name(name).await?.ok_or_else(|| Error::NotFound {
        resource: "Role".to_string(),
        field: "name".to_string(),
        value: name.to_string(),
    })
}

/// Create a user. Without explicit roles the user gets the USER role.
#[utoipa::path(
    post,
    path = "/api/users",
    request_body = UserCreate,
    tag = "users",
    responses(
        (status = 201, description = "User created", body = UserResponse),
        (status = 400, description = "Invalid input", body = crate::errors::ErrorBody),
        (status = 403, description = "Missing CREATE_USER", body = crate::errors::ErrorBody),
        (status = 404, description = "Unknown role ids", body = crate::errors::ErrorBody),
        (status = 409, description = "Email already exists", body = crate::errors::ErrorBody),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn create_user(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<UserCreate>,
) -> Result<(StatusCode, Json<UserResponse>)> {
    let store = state.store.as_ref();
    let email = request.email;

    if store.find_user_by_email(&email).await?.is_some() {
        return Err(Error::Conflict {
            message: format!("Email already exists: {email}"),
        });
    }

    let role_ids = if request.role_ids.is_empty() {
        vec![get_role_by_name_or_404(store, USER_ROLE).await?.id]
    } else {
        ensure_roles_exist(store, &request.role_ids).await?;
        request.role_ids
    };

    let password_hash = password::hash_password(request.password, Argon2Params::from(&state.config.auth.password)).await?;

    let user = store
        .create_user(&UserCreateDBRequest {
            name: request.name,
            email: email.clone(),
            password_hash,
            about: request.about,
            immutable: false,
            role_ids,
        })
        .await
        .map_err(|e| conflict_on_unique(e, || format!("Email already exists: {email}")))?;

    info!("Created user {} ({})", user.id, user.email);
    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

#[utoipa::path(
    get,
    path = "/api/users",
    tag = "users",
    responses(
        (status = 200, description = "All users", body = Vec<UserResponse>),
        (status = 403, description = "Missing VIEW_USER", body = crate::errors::ErrorBody),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn list_users(State(state): State<AppState>) -> Result<Json<Vec<UserResponse>>> {
    let users = state.store.list_users().await?;
    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}

#[utoipa::path(
    get,
    path = "/api/users/{id}",
    tag = "users",
    params(("id" = i64, Path, description = "User ID")),
    responses(
        (status = 200, description = "The user", body = UserResponse),
        (status = 404, description = "User not found", body = crate::errors::ErrorBody),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn get_user(State(state): State<AppState>, Path(id): Path<UserId>) -> Result<Json<UserResponse>> {
    let user = get_user_or_404(state.store.as_ref(), id).await?;
    Ok(Json(UserResponse::from(user)))
}

#[utoipa::path(
    get,
    path = "/api/users/{id}/roles",
    tag = "users",
    params(("id" = i64, Path, description = "User ID")),
    responses(
        (status = 200, description = "Roles held by the user", body = Vec<RoleResponse>),
        (status = 404, description = "User not found", body = crate::errors::ErrorBody),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn get_user_roles(State(state): State<AppState>, Path(id): Path<UserId>) -> Result<Json<Vec<RoleResponse>>> {
    let store = state.store.as_ref();
    let user = get_user_or_404(store, id).await?;
    let roles = store.get_roles(&user.role_ids).await?;
    Ok(Json(roles.into_iter().map(RoleResponse::from).collect()))
}

/// Update a user. Non-admins may only edit themselves and never their own roles.
#[utoipa::path(
    put,
    path = "/api/users/{id}",
    request_body = UserUpdate,
    tag = "users",
    params(("id" = i64, Path, description = "User ID")),
    responses(
        (status = 200, description = "User updated", body = UserResponse),
        (status = 400, description = "Invalid input", body = crate::errors::ErrorBody),
        (status = 403, description = "Not permitted, or the user is immutable", body = crate::errors::ErrorBody),
        (status = 404, description = "User or role not found", body = crate::errors::ErrorBody),
        (status = 409, description = "Email already exists", body = crate::errors::ErrorBody),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn update_user(
    State(state): State<AppState>,
    caller: Identity,
    Path(id): Path<UserId>,
    ValidatedJson(request): ValidatedJson<UserUpdate>,
) -> Result<Json<UserResponse>> {
    let store = state.store.as_ref();
    let user = get_user_or_404(store, id).await?;

    ensure_owner(&caller, user.id, Operation::Update, format!("user {id}"))?;
    if request.role_ids.is_some() && !caller.is_admin() {
        return Err(Error::InsufficientPermissions {
            action: Operation::Update,
            resource: format!("roles of user {id}"),
        });
    }
    user.ensure_mutable(Operation::Update)?;

    if let Some(email) = &request.email
        && let Some(existing) = store.find_user_by_email(email).await?
        && existing.id != id
    {
        return Err(Error::Conflict {
            message: format!("Email already exists: {email}"),
        });
    }
    if let Some(role_ids) = &request.role_ids {
        ensure_roles_exist(store, role_ids).await?;
    }

    let password_hash = match request.password {
        Some(password) => Some(password::hash_password(password, Argon2Params::from(&state.config.auth.password)).await?),
        None => None,
    };

    let email = request.email.clone();
    let updated = store
        .update_user(
            id,
            &UserUpdateDBRequest {
                name: request.name,
                email: request.email,
                password_hash,
                about: request.about,
                role_ids: request.role_ids,
            },
        )
        .await
        .map_err(|e| conflict_on_unique(e, || format!("Email already exists: {}", email.unwrap_or_default())))?;

    Ok(Json(UserResponse::from(updated)))
}

#[utoipa::path(
    delete,
    path = "/api/users/{id}",
    tag = "users",
    params(("id" = i64, Path, description = "User ID")),
    responses(
        (status = 200, description = "User deleted", body = MessageResponse),
        (status = 403, description = "Missing DELETE_USER, or the user is immutable", body = crate::errors::ErrorBody),
        (status = 404, description = "User not found", body = crate::errors::ErrorBody),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn delete_user(State(state): State<AppState>, Path(id): Path<UserId>) -> Result<Json<MessageResponse>> {
    let store = state.store.as_ref();
    let user = get_user_or_404(store, id).await?;
    user.ensure_mutable(Operation::Delete)?;

    if !store.delete_user(id).await? {
        return Err(Error::not_found("User", id));
    }
    info!("Deleted user {id}");
    Ok(Json(MessageResponse::new("User deleted successfully")))
}

/// Grant a role, by name, to a user
#[utoipa::path(
    post,
    path = "/api/users/{id}/roles/{role_name}",
    tag = "users",
    params(
        ("id" = i64, Path, description = "User ID"),
        ("role_name" = String, Path, description = "Role name"),
    ),
    responses(
        (status = 200, description = "Role granted", body = UserResponse),
        (status = 403, description = "Missing CREATE_USER, or the user is immutable", body = crate::errors::ErrorBody),
        (status = 404, description = "User or role not found", body = crate::errors::ErrorBody),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn add_user_role(
    State(state): State<AppState>,
    Path((id, role_name)): Path<(UserId, String)>,
) -> Result<Json<UserResponse>> {
    let store = state.store.as_ref();
    let user = get_user_or_404(store, id).await?;
    user.ensure_mutable(Operation::Update)?;
    let role = get_role_by_name_or_404(store, &role_name).await?;

    store.add_user_role(id, role.id).await?;
    info!("Granted role {} to user {id}", role.name);

    Ok(Json(UserResponse::from(get_user_or_404(store, id).await?)))
}

/// Revoke a role, by name, from a user
#[utoipa::path(
    delete,
    path = "/api/users/{id}/roles/{role_name}",
    tag = "users",
    params(
        ("id" = i64, Path, description = "User ID"),
        ("role_name" = String, Path, description = "Role name"),
    ),
    responses(
        (status = 200, description = "Role revoked", body = UserResponse),
        (status = 403, description = "Missing DELETE_USER, or the user is immutable", body = crate::errors::ErrorBody),
        (status = 404, description = "User or role not found", body = crate::errors::ErrorBody),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn remove_user_role(
    State(state): State<AppState>,
    Path((id, role_name)): Path<(UserId, String)>,
) -> Result<Json<UserResponse>> {
    let store = state.store.as_ref();
    let user = get_user_or_404(store, id).await?;
    user.ensure_mutable(Operation::Update)?;
    let role = get_role_by_name_or_404(store, &role_name).await?;

    store.remove_user_role(id, role.id).await?;
    info!("Revoked role {} from user {id}", role.name);

    Ok(Json(UserResponse::from(get_user_or_404(store, id).await?)))
}
