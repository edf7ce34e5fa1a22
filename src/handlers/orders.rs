// src/handlers/orders.rs

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::{
        error::AppError,
        response::{ApiResponse, PageQuery, PageRequest, Pagination},
    },
    config::AppState,
    middleware::{
        auth::{AuthenticatedUser, MaybeUser},
        rbac::AdminUser,
    },
    models::orders::{CreateOrderPayload, Order, OrderDetail, PurchaseSummary, UserPurchase},
    services::order_service::resolve_buyer,
};

#[utoipa::path(
    post,
    path = "/api/orders",
    tag = "Orders",
    request_body = CreateOrderPayload,
    responses(
        (status = 201, description = "Pending order created", body = OrderDetail),
        (status = 400, description = "Empty or repeated lines, or guest without email"),
        (status = 404, description = "Beat or tier not available"),
        (status = 409, description = "License already owned")
    ),
    security((), ("api_jwt" = []))
)]
pub async fn create_order(
    State(app_state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Json(payload): Json<CreateOrderPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let buyer = resolve_buyer(user.as_ref(), payload.email.as_deref())?;
    let order = app_state.order_service.create_order(&buyer, &payload).await?;
    Ok(ApiResponse::created(order, "Order created"))
}

#[utoipa::path(
    get,
    path = "/api/orders",
    tag = "Orders",
    params(PageQuery),
    responses((status = 200, description = "My orders, newest first", body = Vec<Order>)),
    security(("api_jwt" = []))
)]
pub async fn list_orders(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Query(page): Query<PageQuery>,
) -> Result<impl IntoResponse, AppError> {
    let page = PageRequest::from(page);
    let (orders, total) = app_state.order_service.list_orders(user.id, page).await?;
    Ok(ApiResponse::paginated(orders, Pagination::new(page, total), "Orders loaded"))
}

#[utoipa::path(
    get,
    path = "/api/orders/{id}",
    tag = "Orders",
    params(("id" = Uuid, Path, description = "Order id")),
    responses(
        (status = 200, description = "Order with its items", body = OrderDetail),
        (status = 404, description = "Order not found")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_order(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let order = app_state.order_service.get_order(user.id, id).await?;
    Ok(ApiResponse::ok(order, "Order loaded"))
}

#[utoipa::path(
    get,
    path = "/api/orders/purchases",
    tag = "Orders",
    responses((status = 200, description = "Every license I own", body = Vec<PurchaseSummary>)),
    security(("api_jwt" = []))
)]
pub async fn list_purchases(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<impl IntoResponse, AppError> {
    let purchases = app_state.order_service.purchases(user.id).await?;
    Ok(ApiResponse::ok(purchases, "Purchases loaded"))
}

#[utoipa::path(
    get,
    path = "/api/orders/purchases/beat/{beat_id}",
    tag = "Orders",
    params(("beat_id" = Uuid, Path, description = "Beat id")),
    responses((status = 200, description = "Licenses I own for one beat", body = Vec<UserPurchase>)),
    security(("api_jwt" = []))
)]
pub async fn purchases_for_beat(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(beat_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let purchases = app_state.order_service.purchases_for_beat(user.id, beat_id).await?;
    Ok(ApiResponse::ok(purchases, "Purchases loaded"))
}

#[utoipa::path(
    post,
    path = "/api/admin/orders/{id}/refund",
    tag = "Admin",
    params(("id" = Uuid, Path, description = "Order id")),
    responses(
        (status = 200, description = "Order refunded", body = Order),
        (status = 400, description = "Order is not completed"),
        (status = 404, description = "Order not found")
    ),
    security(("api_jwt" = []))
)]
pub async fn refund_order(
    State(app_state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let order = app_state.order_service.refund_order(id).await?;
    Ok(ApiResponse::ok(order, "Order refunded"))
}
