// src/handlers/payments.rs

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::HeaderMap,
    response::IntoResponse,
};

use crate::{
    common::{error::AppError, response::ApiResponse},
    config::AppState,
    middleware::auth::AuthenticatedUser,
    services::payment_service::{PaymentVerification, PAYSTACK_SIGNATURE_HEADER},
};

/// The body is taken raw: the signature covers the exact bytes received.
#[utoipa::path(
    post,
    path = "/api/payments/webhook/paystack",
    tag = "Payments",
    request_body(content = String, content_type = "application/json", description = "Raw provider event"),
    params(("x-paystack-signature" = String, Header, description = "Hex HMAC-SHA512 of the body")),
    responses(
        (status = 200, description = "Event processed or acknowledged"),
        (status = 400, description = "Missing or invalid signature"),
        (status = 500, description = "Settlement failed; the provider should retry")
    )
)]
pub async fn paystack_webhook(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    let signature = headers
        .get(PAYSTACK_SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok());

    app_state
        .payment_service
        .handle_paystack_webhook(&body, signature)
        .await?;
    Ok(ApiResponse::empty("Webhook received"))
}

#[utoipa::path(
    get,
    path = "/api/payments/verify/paystack/{reference}",
    tag = "Payments",
    params(("reference" = String, Path, description = "Payment reference")),
    responses(
        (status = 200, description = "Provider status and the settled order, if any", body = PaymentVerification),
        (status = 404, description = "Transaction unknown to the provider"),
        (status = 502, description = "Provider unreachable")
    ),
    security(("api_jwt" = []))
)]
pub async fn verify_paystack(
    State(app_state): State<AppState>,
    AuthenticatedUser(_user): AuthenticatedUser,
    Path(reference): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let verification = app_state.payment_service.verify_paystack(&reference).await?;
    Ok(ApiResponse::ok(verification, "Payment verified"))
}
