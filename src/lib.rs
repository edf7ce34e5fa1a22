// src/lib.rs

use axum::{
    middleware as axum_middleware,
    routing::{delete, get, patch, post, put},
    Json, Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;

pub mod common;
pub mod config;
pub mod db;
pub mod docs;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;

use crate::config::AppState;
use crate::middleware::auth::{auth_guard, optional_auth};

/// Builds the whole HTTP surface. Public, optionally-authenticated and
/// authenticated routes live in separate routers so each gets its own
/// middleware; methods on a shared path are merged back together.
pub fn build_router(app_state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/api/health", get(|| async { "OK" }))
        .route("/api/auth/register", post(handlers::auth::register))
        .route("/api/auth/login", post(handlers::auth::login))
        .route("/api/auth/refresh", post(handlers::auth::refresh))
        .route("/api/auth/check-username", get(handlers::auth::check_username))
        .route("/api/genres", get(handlers::catalog::list_genres))
        .route("/api/beats", get(handlers::catalog::list_beats))
        .route("/api/beats/trending", get(handlers::catalog::trending_beats))
        .route("/api/producers/{username}/beats", get(handlers::catalog::producer_beats))
        .route("/api/settings/fees", get(handlers::settings::get_fee_settings))
        .route("/api/settings/fees/quote", get(handlers::settings::quote_fees))
        .route("/api/payments/webhook/paystack", post(handlers::payments::paystack_webhook));

    // Guests and signed-in users alike
    let open_routes = Router::new()
        .route("/api/beats/{id}", get(handlers::catalog::get_beat))
        .route("/api/beats/{id}/play", post(handlers::activity::record_play))
        .route("/api/playlists/{id}", get(handlers::playlists::get_playlist))
        .route(
            "/api/cart",
            get(handlers::cart::get_cart).delete(handlers::cart::clear_cart),
        )
        .route("/api/cart/items", post(handlers::cart::add_item))
        .route(
            "/api/cart/items/{beat_id}",
            patch(handlers::cart::update_item).delete(handlers::cart::remove_item),
        )
        .route("/api/orders", post(handlers::orders::create_order))
        .route_layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            optional_auth,
        ));

    let producer_routes = Router::new()
        .route("/earnings", get(handlers::earnings::list_earnings))
        .route("/earnings/summary", get(handlers::earnings::earnings_summary))
        .route(
            "/payouts",
            post(handlers::earnings::request_payout).get(handlers::earnings::list_payouts),
        );

    let admin_routes = Router::new()
        .route("/users/{id}/status", patch(handlers::auth::update_user_status))
        .route("/orders/{id}/refund", post(handlers::orders::refund_order))
        .route("/earnings/release", post(handlers::earnings::release_earnings))
        .route("/payouts/{id}/complete", post(handlers::earnings::complete_payout))
        .route("/payouts/{id}/fail", post(handlers::earnings::fail_payout))
        .route(
            "/settings",
            get(handlers::settings::list_settings).post(handlers::settings::create_setting),
        )
        .route(
            "/settings/{key}",
            get(handlers::settings::get_setting)
                .put(handlers::settings::update_setting)
                .delete(handlers::settings::delete_setting),
        );

    let protected_routes = Router::new()
        .route("/api/users/me", get(handlers::auth::get_me))
        .route("/api/users/me/likes", get(handlers::activity::liked_beats))
        .route("/api/users/me/plays", get(handlers::activity::play_history))
        .route("/api/auth/logout", post(handlers::auth::logout))
        .route("/api/auth/upgrade", post(handlers::auth::upgrade))
        .route("/api/genres", post(handlers::catalog::create_genre))
        .route("/api/beats", post(handlers::catalog::create_beat))
        .route(
            "/api/beats/{id}",
            patch(handlers::catalog::update_beat).delete(handlers::catalog::delete_beat),
        )
        .route("/api/beats/{id}/tiers", put(handlers::catalog::replace_tiers))
        .route("/api/beats/{id}/like", post(handlers::activity::toggle_like))
        .route(
            "/api/playlists",
            get(handlers::playlists::list_playlists).post(handlers::playlists::create_playlist),
        )
        .route(
            "/api/playlists/{id}",
            patch(handlers::playlists::update_playlist).delete(handlers::playlists::delete_playlist),
        )
        .route("/api/playlists/{id}/beats", post(handlers::playlists::add_playlist_beat))
        .route(
            "/api/playlists/{id}/beats/{beat_id}",
            delete(handlers::playlists::remove_playlist_beat),
        )
        .route("/api/cart/merge", post(handlers::cart::merge_cart))
        .route("/api/orders", get(handlers::orders::list_orders))
        .route("/api/orders/{id}", get(handlers::orders::get_order))
        .route("/api/orders/purchases", get(handlers::orders::list_purchases))
        .route(
            "/api/orders/purchases/beat/{beat_id}",
            get(handlers::orders::purchases_for_beat),
        )
        .route(
            "/api/payments/verify/paystack/{reference}",
            get(handlers::payments::verify_paystack),
        )
        .nest("/api/producer", producer_routes)
        .nest("/api/admin", admin_routes)
        .route_layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api-docs/openapi.json", get(|| async { Json(docs::ApiDoc::openapi()) }))
        .merge(public_routes)
        .merge(open_routes)
        .merge(protected_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(app_state)
}
