// src/services/payment_service.rs

use hmac::{Hmac, Mac};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use sha2::Sha512;
use utoipa::ToSchema;

use crate::{
    common::error::AppError,
    models::orders::{Order, PaidCharge},
    services::order_service::{OrderService, SettlementOutcome},
};

type HmacSha512 = Hmac<Sha512>;

pub const PAYSTACK_SIGNATURE_HEADER: &str = "x-paystack-signature";
pub const CHARGE_SUCCESS: &str = "charge.success";

/// Checks the hex HMAC-SHA512 of the raw body against the header value in
/// constant time.
pub fn verify_webhook_signature(secret: &str, body: &[u8], signature: &str) -> Result<(), AppError> {
    let expected = hex::decode(signature.trim()).map_err(|_| AppError::InvalidSignature)?;
    let mut mac = HmacSha512::new_from_slice(secret.as_bytes())
        .map_err(|e| anyhow::anyhow!("invalid webhook secret: {}", e))?;
    mac.update(body);
    mac.verify_slice(&expected).map_err(|_| AppError::InvalidSignature)
}

#[derive(Debug, Deserialize)]
pub struct WebhookEvent {
    pub event: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

impl WebhookEvent {
    pub fn reference(&self) -> Option<&str> {
        self.data.get("reference").and_then(serde_json::Value::as_str)
    }
}

#[derive(Debug, Deserialize)]
struct PaystackEnvelope {
    status: bool,
    #[serde(default)]
    message: String,
    #[serde(default)]
    data: serde_json::Value,
}

/// Thin client over the provider's transaction verification API.
#[derive(Clone)]
pub struct PaystackClient {
    client: reqwest::Client,
    base_url: String,
    secret_key: Option<String>,
}

impl PaystackClient {
    pub fn new(base_url: &str, secret_key: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            secret_key,
        }
    }

    pub fn secret_key(&self) -> Result<&str, AppError> {
        self.secret_key
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("PAYSTACK_SECRET_KEY is not configured").into())
    }

    /// Returns the provider's transaction status and raw data.
    pub async fn verify_transaction(&self, reference: &str) -> Result<(String, serde_json::Value), AppError> {
        let url = format!("{}/transaction/verify/{}", self.base_url, reference);
        tracing::debug!(reference, "verifying transaction with provider");

        let response = self
            .client
            .get(&url)
            .bearer_auth(self.secret_key()?)
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(AppError::NotFound("Transaction not found at the payment provider".into()));
        }
        let envelope: PaystackEnvelope = response.error_for_status()?.json().await?;
        if !envelope.status {
            return Err(AppError::BadRequest(format!("Verification failed: {}", envelope.message)));
        }

        let status = envelope
            .data
            .get("status")
            .and_then(serde_json::Value::as_str)
            .unwrap_or("unknown")
            .to_string();
        Ok((status, envelope.data))
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentVerification {
    pub reference: String,
    /// Status reported by the provider, e.g. `success` or `abandoned`.
    pub provider_status: String,
    pub order: Option<Order>,
}

fn settled_order(outcome: SettlementOutcome) -> Option<Order> {
    match outcome {
        SettlementOutcome::UnknownReference | SettlementOutcome::AmountMismatch(_) => None,
        SettlementOutcome::AlreadySettled(order)
        | SettlementOutcome::NotSettleable(order)
        | SettlementOutcome::ExclusiveUnavailable(order)
        | SettlementOutcome::Settled(order) => Some(order),
    }
}

#[derive(Clone)]
pub struct PaymentService {
    paystack: PaystackClient,
    orders: OrderService,
}

impl PaymentService {
    pub fn new(paystack: PaystackClient, orders: OrderService) -> Self {
        Self { paystack, orders }
    }

    /// Authenticates and applies one webhook delivery. Unknown references and
    /// unrelated events are acknowledged without side effects.
    pub async fn handle_paystack_webhook(&self, body: &[u8], signature: Option<&str>) -> Result<(), AppError> {
        let signature = signature.ok_or(AppError::InvalidSignature)?;
        verify_webhook_signature(self.paystack.secret_key()?, body, signature)?;

        let event: WebhookEvent = serde_json::from_slice(body)
            .map_err(|e| AppError::BadRequest(format!("Malformed webhook payload: {}", e)))?;

        if event.event != CHARGE_SUCCESS {
            tracing::debug!(event = %event.event, "webhook event acknowledged");
            return Ok(());
        }
        let Some(reference) = event.reference() else {
            tracing::warn!("charge.success webhook without a reference");
            return Ok(());
        };

        let charge = PaidCharge::from_data(&event.data);
        self.orders
            .settle_charge(reference, charge.as_ref(), event.data.clone())
            .await?;
        Ok(())
    }

    pub async fn verify_paystack(&self, reference: &str) -> Result<PaymentVerification, AppError> {
        let (provider_status, data) = self.paystack.verify_transaction(reference).await?;

        let order = if provider_status == "success" {
            let charge = PaidCharge::from_data(&data);
            settled_order(self.orders.settle_charge(reference, charge.as_ref(), data).await?)
        } else {
            tracing::info!(reference, status = %provider_status, "transaction not successful yet");
            None
        };

        Ok(PaymentVerification {
            reference: reference.to_string(),
            provider_status,
            order,
        })
    }
}
