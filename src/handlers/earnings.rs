// src/handlers/earnings.rs

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::{
    common::{
        error::AppError,
        response::{ApiResponse, PageQuery, PageRequest, Pagination},
    },
    config::AppState,
    middleware::rbac::{AdminUser, ProducerUser},
    models::earnings::{
        CompletePayoutPayload, EarningStatus, EarningsSummary, FailPayoutPayload, Payout,
        ProducerEarning,
    },
    services::earnings_service::EarningsFilter,
};

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct EarningsQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub status: Option<EarningStatus>,
    /// RFC 3339, inclusive.
    pub from: Option<DateTime<Utc>>,
    /// RFC 3339, inclusive.
    pub to: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReleasedEarnings {
    pub released: u64,
}

#[utoipa::path(
    get,
    path = "/api/producer/earnings",
    tag = "Producer",
    params(EarningsQuery),
    responses(
        (status = 200, description = "Ledger rows, newest first", body = Vec<ProducerEarning>),
        (status = 403, description = "Producer role required")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_earnings(
    State(app_state): State<AppState>,
    producer: ProducerUser,
    Query(query): Query<EarningsQuery>,
) -> Result<impl IntoResponse, AppError> {
    let page = PageRequest::new(query.page, query.limit);
    let filter = EarningsFilter {
        status: query.status,
        from: query.from,
        to: query.to,
    };
    let (earnings, total) = app_state
        .earnings_service
        .list(producer.user().id, &filter, page)
        .await?;
    Ok(ApiResponse::paginated(earnings, Pagination::new(page, total), "Earnings loaded"))
}

#[utoipa::path(
    get,
    path = "/api/producer/earnings/summary",
    tag = "Producer",
    responses((status = 200, description = "Balances per status", body = EarningsSummary)),
    security(("api_jwt" = []))
)]
pub async fn earnings_summary(
    State(app_state): State<AppState>,
    producer: ProducerUser,
) -> Result<impl IntoResponse, AppError> {
    let summary = app_state.earnings_service.summary(producer.user().id).await?;
    Ok(ApiResponse::ok(summary, "Earnings summary loaded"))
}

#[utoipa::path(
    post,
    path = "/api/producer/payouts",
    tag = "Producer",
    responses(
        (status = 201, description = "Payout requested", body = Payout),
        (status = 400, description = "Balance below the minimum payout")
    ),
    security(("api_jwt" = []))
)]
pub async fn request_payout(
    State(app_state): State<AppState>,
    producer: ProducerUser,
) -> Result<impl IntoResponse, AppError> {
    let payout = app_state.earnings_service.request_payout(producer.user().id).await?;
    Ok(ApiResponse::created(payout, "Payout requested"))
}

#[utoipa::path(
    get,
    path = "/api/producer/payouts",
    tag = "Producer",
    params(PageQuery),
    responses((status = 200, description = "Payout history", body = Vec<Payout>)),
    security(("api_jwt" = []))
)]
pub async fn list_payouts(
    State(app_state): State<AppState>,
    producer: ProducerUser,
    Query(page): Query<PageQuery>,
) -> Result<impl IntoResponse, AppError> {
    let page = PageRequest::from(page);
    let (payouts, total) = app_state
        .earnings_service
        .list_payouts(producer.user().id, page)
        .await?;
    Ok(ApiResponse::paginated(payouts, Pagination::new(page, total), "Payouts loaded"))
}

// --- ADMIN ---

#[utoipa::path(
    post,
    path = "/api/admin/earnings/release",
    tag = "Admin",
    responses((status = 200, description = "Matured earnings made available", body = ReleasedEarnings)),
    security(("api_jwt" = []))
)]
pub async fn release_earnings(
    State(app_state): State<AppState>,
    _admin: AdminUser,
) -> Result<impl IntoResponse, AppError> {
    let released = app_state.earnings_service.release_matured().await?;
    Ok(ApiResponse::ok(ReleasedEarnings { released }, "Earnings released"))
}

#[utoipa::path(
    post,
    path = "/api/admin/payouts/{id}/complete",
    tag = "Admin",
    request_body = CompletePayoutPayload,
    params(("id" = Uuid, Path, description = "Payout id")),
    responses(
        (status = 200, description = "Payout completed, earnings paid", body = Payout),
        (status = 404, description = "Payout not found"),
        (status = 409, description = "Payout already finished")
    ),
    security(("api_jwt" = []))
)]
pub async fn complete_payout(
    State(app_state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<CompletePayoutPayload>,
) -> Result<impl IntoResponse, AppError> {
    let payout = app_state
        .earnings_service
        .complete_payout(id, payload.transaction_reference.as_deref())
        .await?;
    Ok(ApiResponse::ok(payout, "Payout completed"))
}

#[utoipa::path(
    post,
    path = "/api/admin/payouts/{id}/fail",
    tag = "Admin",
    request_body = FailPayoutPayload,
    params(("id" = Uuid, Path, description = "Payout id")),
    responses(
        (status = 200, description = "Payout failed, earnings available again", body = Payout),
        (status = 404, description = "Payout not found"),
        (status = 409, description = "Payout already finished")
    ),
    security(("api_jwt" = []))
)]
pub async fn fail_payout(
    State(app_state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<FailPayoutPayload>,
) -> Result<impl IntoResponse, AppError> {
    if payload.reason.trim().is_empty() {
        return Err(AppError::BadRequest("A failure reason is required".into()));
    }
    let payout = app_state.earnings_service.fail_payout(id, payload.reason.trim()).await?;
    Ok(ApiResponse::ok(payout, "Payout marked as failed"))
}
