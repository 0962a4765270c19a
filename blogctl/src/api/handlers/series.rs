use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use tracing::info;

use crate::{
    AppState,
    api::{
        handlers::{ensure_owner, resolve_author},
        models::{
            MessageResponse,
            series::{SeriesCreate, SeriesResponse, SeriesUpdate},
        },
        validation::ValidatedJson,
    },
    auth::identity::Identity,
    db::{
        models::series::{SeriesCreateDBRequest, SeriesDBResponse, SeriesUpdateDBRequest},
        store::{SeriesStore, Store, UserStore},
    },
    errors::{Error, Result},
    types::{Operation, SeriesId, UserId},
};

pub(crate) async fn get_series_or_404(store: &dyn Store, id: SeriesId) -> Result<SeriesDBResponse> {
    store.get_series(id).await?.ok_or_else(|| Error::not_found("Series", id))
}

/// Start a series. The caller is the author unless an admin names someone else.
#[utoipa::path(
    post,
    path = "/api/series",
    request_body = SeriesCreate,
    tag = "series",
    responses(
        (status = 201, description = "Series created", body = SeriesResponse),
        (status = 400, description = "Invalid input", body = crate::errors::ErrorBody),
        (status = 403, description = "Not permitted to publish for that author", body = crate::errors::ErrorBody),
        (status = 404, description = "Author not found", body = crate::errors::ErrorBody),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn create_series(
    State(state): State<AppState>,
    caller: Identity,
    ValidatedJson(request): ValidatedJson<SeriesCreate>,
) -> Result<(StatusCode, Json<SeriesResponse>)> {
    let store = state.store.as_ref();
    let author_id = resolve_author(store, &caller, request.author_id, "series").await?;

    let series = store
        .create_series(&SeriesCreateDBRequest {
            title: request.title,
            description: request.description,
            author_id,
        })
        .await?;

    info!("Created series {} for user {author_id}", series.id);
    Ok((StatusCode::CREATED, Json(SeriesResponse::from(series))))
}

#[utoipa::path(
    get,
    path = "/api/series",
    tag = "series",
    responses((status = 200, description = "All series", body = Vec<SeriesResponse>))
)]
#[tracing::instrument(skip_all)]
pub async fn list_series(State(state): State<AppState>) -> Result<Json<Vec<SeriesResponse>>> {
    let series = state.store.list_series(None).await?;
    Ok(Json(series.into_iter().map(SeriesResponse::from).collect()))
}

#[utoipa::path(
    get,
    path = "/api/series/users/{user_id}",
    tag = "series",
    params(("user_id" = i64, Path, description = "Author's user ID")),
    responses(
        (status = 200, description = "Series by the author", body = Vec<SeriesResponse>),
        (status = 404, description = "User not found", body = crate::errors::ErrorBody),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_series_by_user(State(state): State<AppState>, Path(user_id): Path<UserId>) -> Result<Json<Vec<SeriesResponse>>> {
    let store = state.store.as_ref();
    store.get_user(user_id).await?.ok_or_else(|| Error::not_found("User", user_id))?;
    let series = store.list_series(Some(user_id)).await?;
    Ok(Json(series.into_iter().map(SeriesResponse::from).collect()))
}

#[utoipa::path(
    get,
    path = "/api/series/{id}",
    tag = "series",
    params(("id" = i64, Path, description = "Series ID")),
    responses(
        (status = 200, description = "The series", body = SeriesResponse),
        (status = 404, description = "Series not found", body = crate::errors::ErrorBody),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn get_series(State(state): State<AppState>, Path(id): Path<SeriesId>) -> Result<Json<SeriesResponse>> {
    let series = get_series_or_404(state.store.as_ref(), id).await?;
    Ok(Json(SeriesResponse::from(series)))
}

#[utoipa::path(
    put,
    path = "/api/series/{id}",
    request_body = SeriesUpdate,
    tag = "series",
    params(("id" = i64, Path, description = "Series ID")),
    responses(
        (status = 200, description = "Series updated", body = SeriesResponse),
        (status = 403, description = "Not the author", body = crate::errors::ErrorBody),
        (status = 404, description = "Series not found", body = crate::errors::ErrorBody),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn update_series(
    State(state): State<AppState>,
    caller: Identity,
    Path(id): Path<SeriesId>,
    ValidatedJson(request): ValidatedJson<SeriesUpdate>,
) -> Result<Json<SeriesResponse>> {
    let store = state.store.as_ref();
    let series = get_series_or_404(store, id).await?;
    ensure_owner(&caller, series.author_id, Operation::Update, format!("series {id}"))?;

    let updated = store
        .update_series(
            id,
            &SeriesUpdateDBRequest {
                title: request.title,
                description: request.description,
            },
        )
        .await?;
    Ok(Json(SeriesResponse::from(updated)))
}

/// Delete a series. Its blogs stay published, detached from the series.
#[utoipa::path(
    delete,
    path = "/api/series/{id}",
    tag = "series",
    params(("id" = i64, Path, description = "Series ID")),
    responses(
        (status = 200, description = "Series deleted", body = MessageResponse),
        (status = 403, description = "Not the author", body = crate::errors::ErrorBody),
        (status = 404, description = "Series not found", body = crate::errors::ErrorBody),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn delete_series(State(state): State<AppState>, caller: Identity, Path(id): Path<SeriesId>) -> Result<Json<MessageResponse>> {
    let store = state.store.as_ref();
    let series = get_series_or_404(store, id).await?;
    ensure_owner(&caller, series.author_id, Operation::Delete, format!("series {id}"))?;

    if !store.delete_series(id).await? {
        return Err(Error::not_found("Series", id));
    }
    info!("Deleted series {id}");
    Ok(Json(MessageResponse::new("Series deleted successfully")))
}
