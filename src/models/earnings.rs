// src/models/earnings.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "earning_status", rename_all = "snake_case")]
#[serde(rename_all = "camelCase")]
pub enum EarningStatus {
    /// Sale settled, still inside the holding period.
    Pending,
    /// Cleared; can be withdrawn.
    Available,
    /// Attached to a payout in flight.
    Processing,
    Paid,
    Refunded,
}

impl EarningStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EarningStatus::Pending => "pending",
            EarningStatus::Available => "available",
            EarningStatus::Processing => "processing",
            EarningStatus::Paid => "paid",
            EarningStatus::Refunded => "refunded",
        }
    }

    /// Forward lifecycle is pending → available → processing → paid. A failed
    /// payout returns processing → available. Anything not yet paid can be
    /// refunded; paid and refunded are terminal.
    pub fn can_transition_to(self, next: EarningStatus) -> bool {
        use EarningStatus::*;
        matches!(
            (self, next),
            (Pending, Available)
                | (Available, Processing)
                | (Processing, Paid)
                | (Processing, Available)
                | (Pending, Refunded)
                | (Available, Refunded)
                | (Processing, Refunded)
        )
    }

    /// Every status that may move into `next`.
    pub fn sources_of(next: EarningStatus) -> Vec<EarningStatus> {
        ALL_EARNING_STATUSES
            .iter()
            .copied()
            .filter(|s| s.can_transition_to(next))
            .collect()
    }
}

pub const ALL_EARNING_STATUSES: [EarningStatus; 5] = [
    EarningStatus::Pending,
    EarningStatus::Available,
    EarningStatus::Processing,
    EarningStatus::Paid,
    EarningStatus::Refunded,
];

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProducerEarning {
    pub id: Uuid,
    pub producer_id: Uuid,
    pub order_id: Uuid,
    pub order_item_id: Uuid,
    pub beat_id: Option<Uuid>,
    #[schema(example = "29.99")]
    pub gross_amount: Decimal,
    #[schema(example = "4.50")]
    pub platform_fee: Decimal,
    #[schema(example = "25.49")]
    pub net_amount: Decimal,
    pub currency: String,
    pub status: EarningStatus,
    pub payout_id: Option<Uuid>,
    pub available_at: Option<DateTime<Utc>>,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Ledger row to be written when an order settles.
#[derive(Debug, Clone, PartialEq)]
pub struct NewEarning {
    pub producer_id: Uuid,
    pub order_id: Uuid,
    pub order_item_id: Uuid,
    pub beat_id: Uuid,
    pub gross_amount: Decimal,
    pub platform_fee: Decimal,
    pub net_amount: Decimal,
    pub currency: String,
    pub available_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EarningsSummary {
    pub total_sales: i64,
    pub total_gross: Decimal,
    pub total_net: Decimal,
    pub pending_balance: Decimal,
    pub available_balance: Decimal,
    pub processing_balance: Decimal,
    pub paid_out: Decimal,
    pub refunded: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "payout_status", rename_all = "snake_case")]
#[serde(rename_all = "camelCase")]
pub enum PayoutStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Payout {
    pub id: Uuid,
    pub producer_id: Uuid,
    #[schema(example = "BB-PO-20260125-9F8E7D6C")]
    pub payout_number: String,
    pub amount: Decimal,
    pub currency: String,
    pub status: PayoutStatus,
    pub transaction_reference: Option<String>,
    pub failure_reason: Option<String>,
    pub requested_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CompletePayoutPayload {
    pub transaction_reference: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FailPayoutPayload {
    pub reason: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use EarningStatus::*;

    #[test]
    fn forward_lifecycle_is_allowed() {
        assert!(Pending.can_transition_to(Available));
        assert!(Available.can_transition_to(Processing));
        assert!(Processing.can_transition_to(Paid));
    }

    #[test]
    fn skipping_or_reversing_is_rejected() {
        assert!(!Pending.can_transition_to(Processing));
        assert!(!Pending.can_transition_to(Paid));
        assert!(!Available.can_transition_to(Pending));
        assert!(!Paid.can_transition_to(Available));
    }

    #[test]
    fn refund_is_terminal_and_reachable_from_any_unpaid_state() {
        assert_eq!(EarningStatus::sources_of(Refunded), vec![Pending, Available, Processing]);
        for next in ALL_EARNING_STATUSES {
            assert!(!Refunded.can_transition_to(next));
            assert!(!Paid.can_transition_to(next));
        }
    }

    #[test]
    fn failed_payout_releases_back_to_available() {
        assert_eq!(EarningStatus::sources_of(Available), vec![Pending, Processing]);
    }
}
