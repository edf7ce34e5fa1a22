// src/handlers/activity.rs

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::{
        error::AppError,
        response::{ApiResponse, PageQuery, PageRequest, Pagination},
    },
    config::AppState,
    middleware::{auth::AuthenticatedUser, session::ListenerSession},
    models::{
        activity::{LikeState, PlayHistoryEntry, RecordPlayQuery},
        catalog::BeatSummary,
    },
};

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PlayCount {
    pub plays_count: i64,
}

#[utoipa::path(
    post,
    path = "/api/beats/{id}/like",
    tag = "Activity",
    params(("id" = Uuid, Path, description = "Beat id")),
    responses(
        (status = 200, description = "Like added or removed", body = LikeState),
        (status = 404, description = "Beat not found or not on sale")
    ),
    security(("api_jwt" = []))
)]
pub async fn toggle_like(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let state = app_state.activity_service.toggle_like(user.id, id).await?;
    let message = if state.liked { "Beat liked" } else { "Like removed" };
    Ok(ApiResponse::ok(state, message))
}

#[utoipa::path(
    get,
    path = "/api/users/me/likes",
    tag = "Activity",
    params(PageQuery),
    responses((status = 200, description = "Liked beats, newest like first", body = Vec<BeatSummary>)),
    security(("api_jwt" = []))
)]
pub async fn liked_beats(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse, AppError> {
    let page = PageRequest::from(query);
    let (beats, total) = app_state.activity_service.liked_beats(user.id, page).await?;
    Ok(ApiResponse::paginated(beats, Pagination::new(page, total), "Liked beats loaded"))
}

#[utoipa::path(
    post,
    path = "/api/beats/{id}/play",
    tag = "Activity",
    params(("id" = Uuid, Path, description = "Beat id"), RecordPlayQuery),
    responses(
        (status = 200, description = "Play recorded", body = PlayCount),
        (status = 404, description = "Beat not found")
    )
)]
pub async fn record_play(
    State(app_state): State<AppState>,
    ListenerSession(listener): ListenerSession,
    Path(id): Path<Uuid>,
    Query(query): Query<RecordPlayQuery>,
) -> Result<impl IntoResponse, AppError> {
    query.validate()?;
    let plays_count = app_state
        .activity_service
        .record_play(id, &listener, query.duration.unwrap_or(0))
        .await?;
    Ok(ApiResponse::ok(PlayCount { plays_count }, "Play recorded"))
}

#[utoipa::path(
    get,
    path = "/api/users/me/plays",
    tag = "Activity",
    params(PageQuery),
    responses((status = 200, description = "Listening history, most recent first", body = Vec<PlayHistoryEntry>)),
    security(("api_jwt" = []))
)]
pub async fn play_history(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse, AppError> {
    let page = PageRequest::from(query);
    let (entries, total) = app_state.activity_service.play_history(user.id, page).await?;
    Ok(ApiResponse::paginated(entries, Pagination::new(page, total), "Play history loaded"))
}
