// src/models/orders.rs

use chrono::{DateTime, Utc};
use rust_decimal::{prelude::ToPrimitive, Decimal};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::models::catalog::TierType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "order_status", rename_all = "snake_case")]
#[serde(rename_all = "camelCase")]
pub enum OrderStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Refunded,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    #[schema(example = "BB-20260118-1A2B3C4D")]
    pub order_number: String,
    pub email: String,
    #[schema(example = "29.99")]
    pub subtotal: Decimal,
    #[schema(example = "1.17")]
    pub processing_fee: Decimal,
    #[schema(example = "31.16")]
    pub total: Decimal,
    pub currency: String,
    pub status: OrderStatus,
    #[schema(example = "paystack")]
    pub payment_provider: String,
    pub payment_reference: String,
    #[schema(value_type = Object)]
    pub payment_metadata: serde_json::Value,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Total in the currency's minor unit (kobo, cents).
    pub fn total_minor_units(&self) -> Option<i64> {
        (self.total * Decimal::ONE_HUNDRED).round().to_i64()
    }
}

/// Amount and currency a provider reports as actually charged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaidCharge {
    /// Minor units, as the provider reports them.
    pub amount: i64,
    pub currency: String,
}

impl PaidCharge {
    /// Reads `amount` and `currency` from provider transaction data.
    pub fn from_data(data: &serde_json::Value) -> Option<Self> {
        let amount = data.get("amount")?.as_i64()?;
        let currency = data.get("currency")?.as_str()?.to_string();
        Some(Self { amount, currency })
    }

    pub fn covers(&self, order: &Order) -> bool {
        order.total_minor_units() == Some(self.amount) && self.currency.eq_ignore_ascii_case(&order.currency)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub beat_id: Uuid,
    pub license_tier_id: Uuid,
    pub producer_id: Uuid,
    /// Title as it read when the order was placed.
    pub beat_title: String,
    pub license_name: String,
    pub license_type: TierType,
    pub price: Decimal,
    pub platform_fee: Decimal,
    pub producer_earnings: Decimal,
    pub is_exclusive: bool,
    pub created_at: DateTime<Utc>,
}

/// Line data captured at checkout, before the row exists.
#[derive(Debug, Clone, PartialEq)]
pub struct NewOrderItem {
    pub beat_id: Uuid,
    pub license_tier_id: Uuid,
    pub producer_id: Uuid,
    pub beat_title: String,
    pub license_name: String,
    pub license_type: TierType,
    pub price: Decimal,
    pub platform_fee: Decimal,
    pub producer_earnings: Decimal,
    pub is_exclusive: bool,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserPurchase {
    pub id: Uuid,
    pub user_id: Uuid,
    pub beat_id: Uuid,
    pub order_item_id: Uuid,
    pub license_tier_id: Uuid,
    pub license_type: TierType,
    pub purchased_at: DateTime<Utc>,
}

/// Purchase row joined with the beat a library page shows.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseSummary {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub purchase: UserPurchase,
    pub title: String,
    pub cover_image: Option<String>,
    pub preview_audio_url: Option<String>,
    pub producer_name: Option<String>,
    pub producer_username: Option<String>,
}

// ---
// Payloads
// ---

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderLineInput {
    pub beat_id: Uuid,
    pub license_tier_id: Uuid,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderPayload {
    #[validate(length(min = 1, message = "Order items are required."))]
    pub items: Vec<OrderLineInput>,

    #[validate(length(min = 1, max = 50))]
    #[schema(example = "paystack")]
    pub payment_provider: String,

    /// Provider transaction reference, when the client initialised the charge.
    #[validate(length(min = 1, max = 255))]
    pub payment_reference: Option<String>,

    /// Required for guest checkout.
    #[validate(email(message = "The email address is invalid."))]
    pub email: Option<String>,
}

/// Who pays for an order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Buyer {
    User { id: Uuid, email: String },
    Guest { email: String },
}

impl Buyer {
    pub fn user_id(&self) -> Option<Uuid> {
        match self {
            Buyer::User { id, .. } => Some(*id),
            Buyer::Guest { .. } => None,
        }
    }

    pub fn email(&self) -> &str {
        match self {
            Buyer::User { email, .. } | Buyer::Guest { email } => email,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::str::FromStr;

    fn order(total: &str, currency: &str) -> Order {
        Order {
            id: Uuid::new_v4(),
            user_id: None,
            order_number: "BB-20260118-1A2B3C4D".into(),
            email: "fan@example.com".into(),
            subtotal: Decimal::from_str(total).unwrap(),
            processing_fee: Decimal::ZERO,
            total: Decimal::from_str(total).unwrap(),
            currency: currency.into(),
            status: OrderStatus::Pending,
            payment_provider: "paystack".into(),
            payment_reference: "REF-1".into(),
            payment_metadata: json!({}),
            paid_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn charge_must_match_total_and_currency() {
        let order = order("31.16", "USD");
        assert_eq!(order.total_minor_units(), Some(3116));

        let exact = PaidCharge::from_data(&json!({ "amount": 3116, "currency": "usd" })).unwrap();
        assert!(exact.covers(&order));

        let short = PaidCharge { amount: 100, currency: "USD".into() };
        assert!(!short.covers(&order));
        let other_currency = PaidCharge { amount: 3116, currency: "NGN".into() };
        assert!(!other_currency.covers(&order));
    }

    #[test]
    fn charge_needs_amount_and_currency() {
        assert_eq!(PaidCharge::from_data(&json!({ "status": "success" })), None);
        assert_eq!(PaidCharge::from_data(&json!({ "amount": "3116", "currency": "USD" })), None);
        assert_eq!(PaidCharge::from_data(&json!({ "amount": 3116 })), None);
    }
}
