// src/handlers/catalog.rs

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::{
        error::AppError,
        response::{ApiResponse, PageQuery, PageRequest, Pagination},
    },
    config::AppState,
    db::catalog_repo::BeatSort,
    middleware::{
        auth::MaybeUser,
        rbac::{AdminUser, ProducerUser},
    },
    models::{
        auth::ProducerProfile,
        catalog::{
            BeatDetail, BeatSummary, CreateBeatPayload, CreateGenrePayload, Genre, LicenseTier,
            UpdateBeatPayload, UpsertTiersPayload,
        },
    },
    services::catalog_service::BeatSearch,
};

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct BeatListQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub genre_id: Option<Uuid>,
    pub producer_id: Option<Uuid>,
    pub bpm_min: Option<i32>,
    pub bpm_max: Option<i32>,
    /// Comma separated musical keys, e.g. `Am,F#m`.
    pub keys: Option<String>,
    pub search: Option<String>,
    pub sort: Option<BeatSort>,
}

impl BeatListQuery {
    fn search(&self) -> BeatSearch {
        BeatSearch {
            genre_id: self.genre_id,
            producer_id: self.producer_id,
            bpm_min: self.bpm_min,
            bpm_max: self.bpm_max,
            keys: self
                .keys
                .as_deref()
                .map(|raw| {
                    raw.split(',')
                        .map(str::trim)
                        .filter(|k| !k.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
            search: self.search.clone(),
        }
    }
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TrendingQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProducerBeats {
    pub producer: ProducerProfile,
    pub beats: Vec<BeatSummary>,
}

// --- GENRES ---

#[utoipa::path(
    get,
    path = "/api/genres",
    tag = "Catalog",
    responses((status = 200, description = "Active genres", body = Vec<Genre>))
)]
pub async fn list_genres(State(app_state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let genres = app_state.catalog_service.list_genres().await?;
    Ok(ApiResponse::ok(genres, "Genres loaded"))
}

#[utoipa::path(
    post,
    path = "/api/genres",
    tag = "Admin",
    request_body = CreateGenrePayload,
    responses(
        (status = 201, description = "Genre created", body = Genre),
        (status = 409, description = "Genre already exists")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_genre(
    State(app_state): State<AppState>,
    _admin: AdminUser,
    Json(payload): Json<CreateGenrePayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let genre = app_state.catalog_service.create_genre(&payload).await?;
    Ok(ApiResponse::created(genre, "Genre created"))
}

// --- PUBLIC CATALOG ---

#[utoipa::path(
    get,
    path = "/api/beats",
    tag = "Catalog",
    params(BeatListQuery),
    responses(
        (status = 200, description = "Beats on sale", body = Vec<BeatSummary>),
        (status = 400, description = "Invalid filter")
    )
)]
pub async fn list_beats(
    State(app_state): State<AppState>,
    Query(query): Query<BeatListQuery>,
) -> Result<impl IntoResponse, AppError> {
    let page = PageRequest::new(query.page, query.limit);
    let (beats, total) = app_state
        .catalog_service
        .list_beats(&query.search(), query.sort.unwrap_or_default(), page)
        .await?;
    Ok(ApiResponse::paginated(beats, Pagination::new(page, total), "Beats loaded"))
}

#[utoipa::path(
    get,
    path = "/api/beats/trending",
    tag = "Catalog",
    params(TrendingQuery),
    responses((status = 200, description = "Most played beats", body = Vec<BeatSummary>))
)]
pub async fn trending_beats(
    State(app_state): State<AppState>,
    Query(query): Query<TrendingQuery>,
) -> Result<impl IntoResponse, AppError> {
    let beats = app_state.catalog_service.trending(query.limit).await?;
    Ok(ApiResponse::ok(beats, "Trending beats loaded"))
}

#[utoipa::path(
    get,
    path = "/api/beats/{id}",
    tag = "Catalog",
    params(("id" = Uuid, Path, description = "Beat id")),
    responses(
        (status = 200, description = "Beat with its license tiers", body = BeatDetail),
        (status = 404, description = "Beat not found or no longer available")
    )
)]
pub async fn get_beat(
    State(app_state): State<AppState>,
    MaybeUser(viewer): MaybeUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let beat = app_state
        .catalog_service
        .get_beat(id, viewer.map(|u| u.id))
        .await?;
    Ok(ApiResponse::ok(beat, "Beat loaded"))
}

#[utoipa::path(
    get,
    path = "/api/producers/{username}/beats",
    tag = "Catalog",
    params(("username" = String, Path, description = "Producer username"), PageQuery),
    responses(
        (status = 200, description = "The producer and their beats on sale", body = ProducerBeats),
        (status = 404, description = "Producer not found")
    )
)]
pub async fn producer_beats(
    State(app_state): State<AppState>,
    Path(username): Path<String>,
    Query(page): Query<PageQuery>,
) -> Result<impl IntoResponse, AppError> {
    let page = PageRequest::from(page);
    let (producer, beats, total) = app_state.catalog_service.producer_beats(&username, page).await?;
    Ok(ApiResponse::paginated(
        ProducerBeats { producer, beats },
        Pagination::new(page, total),
        "Producer beats loaded",
    ))
}

// --- PRODUCER MANAGEMENT ---

#[utoipa::path(
    post,
    path = "/api/beats",
    tag = "Producer",
    request_body = CreateBeatPayload,
    responses(
        (status = 201, description = "Beat created with its tiers", body = BeatDetail),
        (status = 400, description = "Invalid payload or duplicate tier types"),
        (status = 403, description = "Producer role required")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_beat(
    State(app_state): State<AppState>,
    producer: ProducerUser,
    Json(payload): Json<CreateBeatPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let beat = app_state
        .catalog_service
        .create_beat(producer.user().id, &payload)
        .await?;
    Ok(ApiResponse::created(beat, "Beat created"))
}

#[utoipa::path(
    patch,
    path = "/api/beats/{id}",
    tag = "Producer",
    request_body = UpdateBeatPayload,
    params(("id" = Uuid, Path, description = "Beat id")),
    responses(
        (status = 200, description = "Beat updated", body = BeatDetail),
        (status = 403, description = "Not the owner"),
        (status = 409, description = "Beat already sold exclusively")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_beat(
    State(app_state): State<AppState>,
    producer: ProducerUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateBeatPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let beat = app_state
        .catalog_service
        .update_beat(producer.user().id, id, &payload)
        .await?;
    Ok(ApiResponse::ok(beat, "Beat updated"))
}

#[utoipa::path(
    put,
    path = "/api/beats/{id}/tiers",
    tag = "Producer",
    request_body = UpsertTiersPayload,
    params(("id" = Uuid, Path, description = "Beat id")),
    responses(
        (status = 200, description = "All tiers of the beat", body = Vec<LicenseTier>),
        (status = 403, description = "Not the owner")
    ),
    security(("api_jwt" = []))
)]
pub async fn replace_tiers(
    State(app_state): State<AppState>,
    producer: ProducerUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpsertTiersPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let tiers = app_state
        .catalog_service
        .replace_tiers(producer.user().id, id, &payload.tiers)
        .await?;
    Ok(ApiResponse::ok(tiers, "License tiers saved"))
}

#[utoipa::path(
    delete,
    path = "/api/beats/{id}",
    tag = "Producer",
    params(("id" = Uuid, Path, description = "Beat id")),
    responses(
        (status = 200, description = "Beat deleted"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Beat not found")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_beat(
    State(app_state): State<AppState>,
    producer: ProducerUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    app_state.catalog_service.delete_beat(producer.user().id, id).await?;
    Ok(ApiResponse::empty("Beat deleted"))
}
