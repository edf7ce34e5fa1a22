// src/handlers/cart.rs

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::{error::AppError, response::ApiResponse},
    config::AppState,
    middleware::{
        auth::AuthenticatedUser,
        session::{CartSession, GuestSession},
    },
    models::cart::{AddToCartPayload, CartView, UpdateCartTierPayload},
};

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClearedCart {
    pub removed: u64,
}

#[utoipa::path(
    get,
    path = "/api/cart",
    tag = "Cart",
    params(("x-session-id" = Option<String>, Header, description = "Guest session id when signed out")),
    responses(
        (status = 200, description = "Cart lines with fees and totals", body = CartView),
        (status = 400, description = "Neither a user nor a session id")
    )
)]
pub async fn get_cart(
    State(app_state): State<AppState>,
    CartSession(owner): CartSession,
) -> Result<impl IntoResponse, AppError> {
    let cart = app_state.cart_service.get_cart(&owner).await?;
    Ok(ApiResponse::ok(cart, "Cart loaded"))
}

#[utoipa::path(
    post,
    path = "/api/cart/items",
    tag = "Cart",
    request_body = AddToCartPayload,
    params(("x-session-id" = Option<String>, Header, description = "Guest session id when signed out")),
    responses(
        (status = 201, description = "Beat added", body = CartView),
        (status = 404, description = "Beat or tier not available"),
        (status = 409, description = "License already owned")
    )
)]
pub async fn add_item(
    State(app_state): State<AppState>,
    CartSession(owner): CartSession,
    Json(payload): Json<AddToCartPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let cart = app_state
        .cart_service
        .add(&owner, payload.beat_id, payload.license_tier_id)
        .await?;
    Ok(ApiResponse::created(cart, "Added to cart"))
}

#[utoipa::path(
    patch,
    path = "/api/cart/items/{beat_id}",
    tag = "Cart",
    request_body = UpdateCartTierPayload,
    params(
        ("beat_id" = Uuid, Path, description = "Beat id"),
        ("x-session-id" = Option<String>, Header, description = "Guest session id when signed out")
    ),
    responses(
        (status = 200, description = "Tier switched", body = CartView),
        (status = 404, description = "Line or tier not found")
    )
)]
pub async fn update_item(
    State(app_state): State<AppState>,
    CartSession(owner): CartSession,
    Path(beat_id): Path<Uuid>,
    Json(payload): Json<UpdateCartTierPayload>,
) -> Result<impl IntoResponse, AppError> {
    let cart = app_state
        .cart_service
        .update_tier(&owner, beat_id, payload.license_tier_id)
        .await?;
    Ok(ApiResponse::ok(cart, "Cart updated"))
}

#[utoipa::path(
    delete,
    path = "/api/cart/items/{beat_id}",
    tag = "Cart",
    params(
        ("beat_id" = Uuid, Path, description = "Beat id"),
        ("x-session-id" = Option<String>, Header, description = "Guest session id when signed out")
    ),
    responses(
        (status = 200, description = "Beat removed", body = CartView),
        (status = 404, description = "Line not found")
    )
)]
pub async fn remove_item(
    State(app_state): State<AppState>,
    CartSession(owner): CartSession,
    Path(beat_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let cart = app_state.cart_service.remove(&owner, beat_id).await?;
    Ok(ApiResponse::ok(cart, "Removed from cart"))
}

#[utoipa::path(
    delete,
    path = "/api/cart",
    tag = "Cart",
    params(("x-session-id" = Option<String>, Header, description = "Guest session id when signed out")),
    responses((status = 200, description = "Cart emptied", body = ClearedCart))
)]
pub async fn clear_cart(
    State(app_state): State<AppState>,
    CartSession(owner): CartSession,
) -> Result<impl IntoResponse, AppError> {
    let removed = app_state.cart_service.clear(&owner).await?;
    Ok(ApiResponse::ok(ClearedCart { removed }, "Cart cleared"))
}

#[utoipa::path(
    post,
    path = "/api/cart/merge",
    tag = "Cart",
    params(("x-session-id" = String, Header, description = "Guest session to merge from")),
    responses(
        (status = 200, description = "Guest lines moved into the user's cart", body = CartView),
        (status = 400, description = "Missing session id")
    ),
    security(("api_jwt" = []))
)]
pub async fn merge_cart(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    GuestSession(session_id): GuestSession,
) -> Result<impl IntoResponse, AppError> {
    let cart = app_state.cart_service.merge(user.id, &session_id).await?;
    Ok(ApiResponse::ok(cart, "Cart merged"))
}
