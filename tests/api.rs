// tests/api.rs

mod common;

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use beat_market::build_router;
use common::sign;
use serde_json::Value;
use tower::ServiceExt;

fn app() -> Router {
    build_router(common::lazy_state())
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_is_public() {
    let response = app()
        .oneshot(Request::get("/api/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn openapi_document_is_served() {
    let response = app()
        .oneshot(Request::get("/api-docs/openapi.json").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let doc = json_body(response).await;
    assert!(doc["paths"]["/api/orders"].is_object());
    assert!(doc["components"]["securitySchemes"]["api_jwt"].is_object());

    let webhook = &doc["paths"]["/api/payments/webhook/paystack"]["post"];
    assert!(webhook["requestBody"]["content"]["application/json"].is_object());
}

#[tokio::test]
async fn protected_routes_require_a_token() {
    for (method, uri) in [
        ("GET", "/api/users/me"),
        ("GET", "/api/orders"),
        ("GET", "/api/orders/purchases"),
        ("GET", "/api/producer/earnings"),
        ("POST", "/api/producer/payouts"),
        ("GET", "/api/admin/settings"),
        ("GET", "/api/users/me/likes"),
        ("GET", "/api/users/me/plays"),
        ("POST", "/api/auth/logout"),
        ("POST", "/api/auth/upgrade"),
        ("GET", "/api/playlists"),
        ("POST", "/api/beats/00000000-0000-0000-0000-000000000001/like"),
        ("DELETE", "/api/playlists/00000000-0000-0000-0000-000000000001"),
    ] {
        let response = app()
            .oneshot(Request::builder().method(method).uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{} {}", method, uri);

        let body = json_body(response).await;
        assert_eq!(body["success"], false);
    }
}

#[tokio::test]
async fn malformed_bearer_token_is_rejected() {
    let response = app()
        .oneshot(
            Request::get("/api/users/me")
                .header(header::AUTHORIZATION, "Bearer not-a-jwt")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn webhook_without_signature_is_rejected() {
    let response = app()
        .oneshot(
            Request::post("/api/payments/webhook/paystack")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"event":"charge.success","data":{"reference":"REF-1"}}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn webhook_with_forged_signature_is_rejected() {
    let body = r#"{"event":"charge.success","data":{"reference":"REF-1"}}"#;
    let forged = sign(br#"{"event":"charge.success","data":{"reference":"REF-2"}}"#);

    let response = app()
        .oneshot(
            Request::post("/api/payments/webhook/paystack")
                .header("x-paystack-signature", forged)
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn signed_unrelated_event_is_acknowledged() {
    let body = r#"{"event":"transfer.success","data":{"reference":"TRF-1"}}"#;

    let response = app()
        .oneshot(
            Request::post("/api/payments/webhook/paystack")
                .header("x-paystack-signature", sign(body.as_bytes()))
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["success"], true);
}

#[tokio::test]
async fn cart_needs_a_user_or_session() {
    let response = app()
        .oneshot(Request::get("/api/cart").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn fee_quote_rejects_non_numeric_subtotal() {
    let response = app()
        .oneshot(
            Request::get("/api/settings/fees/quote?subtotal=abc")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn guest_order_validation_runs_before_the_database() {
    let response = app()
        .oneshot(
            Request::post("/api/orders")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"items":[],"paymentProvider":"paystack"}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn short_usernames_are_rejected_before_lookup() {
    let response = app()
        .oneshot(
            Request::get("/api/auth/check-username?username=ab")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn play_durations_are_range_checked() {
    let response = app()
        .oneshot(
            Request::post("/api/beats/00000000-0000-0000-0000-000000000001/play?duration=-5")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
