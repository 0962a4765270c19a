use axum::{Json, extract::State, http::StatusCode};
use tracing::info;

use crate::{
    AppState,
    api::{
        handlers::conflict_on_unique,
        models::auth::{LoginRequest, LoginResponse, MeResponse, RegisterRequest, RegisterResponse},
        validation::ValidatedJson,
    },
    auth::{
        identity::Identity,
        password::{self, Argon2Params},
        permissions::USER_ROLE,
    },
    db::{
        models::users::UserCreateDBRequest,
        store::{RoleStore, UserStore},
    },
    errors::{Error, Result},
};

const INVALID_CREDENTIALS: &str = "Invalid email or password";

fn invalid_credentials() -> Error {
    Error::Unauthenticated {
        message: Some(INVALID_CREDENTIALS.to_string()),
    }
}

/// Register a new user account with the USER role
#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterRequest,
    tag = "authentication",
    responses(
        (status = 201, description = "User registered successfully", body = RegisterResponse),
        (status = 400, description = "Invalid input", body = crate::errors::ErrorBody),
        (status = 409, description = "Email already exists", body = crate::errors::ErrorBody),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn register(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>)> {
    let store = state.store.as_ref();
    let email = request.email;

    if store.find_user_by_email(&email).await?.is_some() {
        return Err(Error::Conflict {
            message: format!("Email already exists: {email}"),
        });
    }

    let user_role = store.find_role_by_name(USER_ROLE).await?.ok_or_else(|| Error::NotFound {
        resource: "Role".to_string(),
        field: "name".to_string(),
        value: USER_ROLE.to_string(),
    })?;

    let password_hash = password::hash_password(request.password, Argon2Params::from(&state.config.auth.password)).await?;

    // The lookup above is only a fast path; the store's unique index settles concurrent
    // registrations with the same email.
    let user = store
        .create_user(&UserCreateDBRequest {
            name: request.name,
            email: email.clone(),
            password_hash,
            about: None,
            immutable: false,
            role_ids: vec![user_role.id],
        })
        .await
        .map_err(|e| conflict_on_unique(e, || format!("Email already exists: {email}")))?;

    info!("Registered user {} ({})", user.id, user.email);

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            id: user.id,
            name: user.name,
            email: user.email,
            message: "User registered successfully!".to_string(),
        }),
    ))
}

/// Exchange email and password for a bearer token
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    tag = "authentication",
    responses(
        (status = 201, description = "Login successful", body = LoginResponse),
        (status = 400, description = "Invalid input", body = crate::errors::ErrorBody),
        (status = 401, description = "Invalid credentials", body = crate::errors::ErrorBody),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<LoginRequest>,
) -> Result<(StatusCode, Json<LoginResponse>)> {
    // Unknown emails and wrong passwords are indistinguishable to the caller
    let user = state
        .store
        .find_user_by_email(&request.email)
        .await?
        .ok_or_else(invalid_credentials)?;

    if !password::verify_password(request.password, user.password_hash.clone()).await? {
        info!("Failed login for {}", user.email);
        return Err(invalid_credentials());
    }

    let token = state.tokens.issue(&user)?;
    Ok((StatusCode::CREATED, Json(LoginResponse { token, email: user.email })))
}

/// The authenticated caller with their roles and flattened authorities
#[utoipa::path(
    get,
    path = "/api/auth/me",
    tag = "authentication",
    responses(
        (status = 200, description = "Current identity", body = MeResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorBody),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn me(identity: Identity) -> Json<MeResponse> {
    Json(MeResponse::from(identity))
}
