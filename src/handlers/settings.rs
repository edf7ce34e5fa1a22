// src/handlers/settings.rs

use std::str::FromStr;

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::IntoParams;
use validator::Validate;

use crate::{
    common::{error::AppError, response::ApiResponse},
    config::AppState,
    middleware::rbac::AdminUser,
    models::settings::{
        CreateSettingPayload, FeeBreakdown, FeeSettings, PlatformSetting, SettingValue,
        UpdateSettingPayload,
    },
};

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct QuoteQuery {
    /// Decimal amount, e.g. `29.99`.
    pub subtotal: String,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CategoryQuery {
    pub category: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/settings/fees",
    tag = "Settings",
    responses((status = 200, description = "Current fee settings", body = FeeSettings))
)]
pub async fn get_fee_settings(State(app_state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let fees = app_state.settings_service.get_fee_settings().await?;
    Ok(ApiResponse::ok(fees, "Fee settings loaded"))
}

#[utoipa::path(
    get,
    path = "/api/settings/fees/quote",
    tag = "Settings",
    params(QuoteQuery),
    responses(
        (status = 200, description = "Fees for the given subtotal", body = FeeBreakdown),
        (status = 400, description = "Subtotal missing, malformed or negative")
    )
)]
pub async fn quote_fees(
    State(app_state): State<AppState>,
    Query(query): Query<QuoteQuery>,
) -> Result<impl IntoResponse, AppError> {
    let subtotal = Decimal::from_str(query.subtotal.trim())
        .map_err(|_| AppError::BadRequest("subtotal must be a decimal number".into()))?;
    let quote = app_state.settings_service.quote(subtotal).await?;
    Ok(ApiResponse::ok(quote, "Fees calculated"))
}

// --- ADMIN ---

#[utoipa::path(
    get,
    path = "/api/admin/settings",
    tag = "Admin",
    params(CategoryQuery),
    responses((status = 200, description = "Platform settings", body = Vec<PlatformSetting>)),
    security(("api_jwt" = []))
)]
pub async fn list_settings(
    State(app_state): State<AppState>,
    _admin: AdminUser,
    Query(query): Query<CategoryQuery>,
) -> Result<impl IntoResponse, AppError> {
    let settings = match query.category.as_deref() {
        Some(category) => app_state.settings_service.get_by_category(category).await?,
        None => app_state.settings_service.get_all().await?,
    };
    Ok(ApiResponse::ok(settings, "Settings loaded"))
}

#[utoipa::path(
    get,
    path = "/api/admin/settings/{key}",
    tag = "Admin",
    params(("key" = String, Path, description = "Setting key")),
    responses(
        (status = 200, description = "Typed setting value", body = SettingValue),
        (status = 404, description = "Unknown key")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_setting(
    State(app_state): State<AppState>,
    _admin: AdminUser,
    Path(key): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let value = app_state.settings_service.get(&key).await?;
    Ok(ApiResponse::ok(value, "Setting loaded"))
}

#[utoipa::path(
    post,
    path = "/api/admin/settings",
    tag = "Admin",
    request_body = CreateSettingPayload,
    responses(
        (status = 201, description = "Setting created", body = PlatformSetting),
        (status = 400, description = "Value does not match its type"),
        (status = 409, description = "Key already exists")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_setting(
    State(app_state): State<AppState>,
    _admin: AdminUser,
    Json(payload): Json<CreateSettingPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let setting = app_state.settings_service.create(&payload).await?;
    Ok(ApiResponse::created(setting, "Setting created"))
}

#[utoipa::path(
    put,
    path = "/api/admin/settings/{key}",
    tag = "Admin",
    request_body = UpdateSettingPayload,
    params(("key" = String, Path, description = "Setting key")),
    responses(
        (status = 200, description = "Setting updated", body = PlatformSetting),
        (status = 400, description = "Value does not match its type"),
        (status = 404, description = "Unknown key")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_setting(
    State(app_state): State<AppState>,
    _admin: AdminUser,
    Path(key): Path<String>,
    Json(payload): Json<UpdateSettingPayload>,
) -> Result<impl IntoResponse, AppError> {
    let setting = app_state.settings_service.set(&key, &payload.value).await?;
    Ok(ApiResponse::ok(setting, "Setting updated"))
}

#[utoipa::path(
    delete,
    path = "/api/admin/settings/{key}",
    tag = "Admin",
    params(("key" = String, Path, description = "Setting key")),
    responses(
        (status = 200, description = "Setting deleted"),
        (status = 404, description = "Unknown key")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_setting(
    State(app_state): State<AppState>,
    _admin: AdminUser,
    Path(key): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    app_state.settings_service.delete(&key).await?;
    Ok(ApiResponse::empty("Setting deleted"))
}
