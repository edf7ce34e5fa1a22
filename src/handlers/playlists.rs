// src/handlers/playlists.rs

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::{error::AppError, response::ApiResponse},
    config::AppState,
    middleware::auth::{AuthenticatedUser, MaybeUser},
    models::playlists::{
        AddPlaylistBeatPayload, CreatePlaylistPayload, Playlist, PlaylistDetail, UpdatePlaylistPayload,
    },
};

#[utoipa::path(
    get,
    path = "/api/playlists",
    tag = "Playlists",
    responses((status = 200, description = "The caller's playlists", body = Vec<Playlist>)),
    security(("api_jwt" = []))
)]
pub async fn list_playlists(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<impl IntoResponse, AppError> {
    let playlists = app_state.playlist_service.list(user.id).await?;
    Ok(ApiResponse::ok(playlists, "Playlists loaded"))
}

#[utoipa::path(
    post,
    path = "/api/playlists",
    tag = "Playlists",
    request_body = CreatePlaylistPayload,
    responses(
        (status = 201, description = "Playlist created", body = PlaylistDetail),
        (status = 400, description = "Invalid payload")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_playlist(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(payload): Json<CreatePlaylistPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let playlist = app_state.playlist_service.create(user.id, &payload).await?;
    Ok(ApiResponse::created(playlist, "Playlist created"))
}

#[utoipa::path(
    get,
    path = "/api/playlists/{id}",
    tag = "Playlists",
    params(("id" = Uuid, Path, description = "Playlist id")),
    responses(
        (status = 200, description = "Playlist with its beats", body = PlaylistDetail),
        (status = 403, description = "Private playlist"),
        (status = 404, description = "Playlist not found")
    )
)]
pub async fn get_playlist(
    State(app_state): State<AppState>,
    MaybeUser(viewer): MaybeUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let playlist = app_state
        .playlist_service
        .get(id, viewer.map(|u| u.id))
        .await?;
    Ok(ApiResponse::ok(playlist, "Playlist loaded"))
}

#[utoipa::path(
    patch,
    path = "/api/playlists/{id}",
    tag = "Playlists",
    request_body = UpdatePlaylistPayload,
    params(("id" = Uuid, Path, description = "Playlist id")),
    responses(
        (status = 200, description = "Playlist updated", body = PlaylistDetail),
        (status = 404, description = "Not found or not yours")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_playlist(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdatePlaylistPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let playlist = app_state.playlist_service.update(id, user.id, &payload).await?;
    Ok(ApiResponse::ok(playlist, "Playlist updated"))
}

#[utoipa::path(
    delete,
    path = "/api/playlists/{id}",
    tag = "Playlists",
    params(("id" = Uuid, Path, description = "Playlist id")),
    responses(
        (status = 200, description = "Playlist deleted"),
        (status = 404, description = "Not found or not yours")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_playlist(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    app_state.playlist_service.delete(id, user.id).await?;
    Ok(ApiResponse::empty("Playlist deleted"))
}

#[utoipa::path(
    post,
    path = "/api/playlists/{id}/beats",
    tag = "Playlists",
    request_body = AddPlaylistBeatPayload,
    params(("id" = Uuid, Path, description = "Playlist id")),
    responses(
        (status = 200, description = "Beat appended", body = PlaylistDetail),
        (status = 404, description = "Playlist or beat not found"),
        (status = 409, description = "Beat already in the playlist")
    ),
    security(("api_jwt" = []))
)]
pub async fn add_playlist_beat(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<AddPlaylistBeatPayload>,
) -> Result<impl IntoResponse, AppError> {
    let playlist = app_state
        .playlist_service
        .add_beat(id, user.id, payload.beat_id)
        .await?;
    Ok(ApiResponse::ok(playlist, "Beat added to playlist"))
}

#[utoipa::path(
    delete,
    path = "/api/playlists/{id}/beats/{beat_id}",
    tag = "Playlists",
    params(
        ("id" = Uuid, Path, description = "Playlist id"),
        ("beat_id" = Uuid, Path, description = "Beat id")
    ),
    responses(
        (status = 200, description = "Beat removed", body = PlaylistDetail),
        (status = 404, description = "Playlist not found or beat not in it")
    ),
    security(("api_jwt" = []))
)]
pub async fn remove_playlist_beat(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path((id, beat_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, AppError> {
    let playlist = app_state
        .playlist_service
        .remove_beat(id, user.id, beat_id)
        .await?;
    Ok(ApiResponse::ok(playlist, "Beat removed from playlist"))
}
