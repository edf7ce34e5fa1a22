// src/models/cart.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::models::catalog::TierType;

/// Who a cart belongs to: a signed-in user or an anonymous browser session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartOwner {
    User(Uuid),
    Session(String),
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub session_id: Option<String>,
    pub beat_id: Uuid,
    pub license_tier_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A cart row joined with the beat and tier it prices.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub id: Uuid,
    pub beat_id: Uuid,
    pub license_tier_id: Uuid,
    pub title: String,
    pub cover_image: Option<String>,
    pub bpm: i32,
    pub musical_key: String,
    pub producer_id: Uuid,
    pub producer_name: String,
    pub producer_username: String,
    pub genre_name: Option<String>,
    pub tier_name: String,
    pub tier_type: TierType,
    pub is_exclusive: bool,
    pub price: Decimal,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CartView {
    pub items: Vec<CartLine>,
    pub count: usize,
    pub subtotal: Decimal,
    pub processing_fee: Decimal,
    pub platform_fee: Decimal,
    pub producer_earnings: Decimal,
    pub total: Decimal,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddToCartPayload {
    pub beat_id: Uuid,
    /// Defaults to the cheapest enabled tier.
    pub license_tier_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCartTierPayload {
    pub license_tier_id: Uuid,
}

/// What happens to one guest row when the guest signs in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeAction {
    /// The user already has this beat in their cart; drop the guest row.
    Discard(Uuid),
    /// Hand the guest row over to the user.
    Reassign(Uuid),
}

/// Decides the fate of each guest row: a beat the user's cart already holds is
/// discarded, anything else is reassigned. Duplicates inside the guest cart
/// itself collapse onto the first row.
pub fn plan_merge(guest_items: &[CartItem], user_beat_ids: &[Uuid]) -> Vec<MergeAction> {
    let mut taken: Vec<Uuid> = user_beat_ids.to_vec();
    guest_items
        .iter()
        .map(|item| {
            if taken.contains(&item.beat_id) {
                MergeAction::Discard(item.id)
            } else {
                taken.push(item.beat_id);
                MergeAction::Reassign(item.id)
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn guest_item(beat_id: Uuid) -> CartItem {
        let now = Utc::now();
        CartItem {
            id: Uuid::new_v4(),
            user_id: None,
            session_id: Some("guest-1".into()),
            beat_id,
            license_tier_id: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn merge_discards_beats_the_user_already_holds() {
        let shared = Uuid::new_v4();
        let fresh = Uuid::new_v4();
        let a = guest_item(shared);
        let b = guest_item(fresh);

        let plan = plan_merge(&[a.clone(), b.clone()], &[shared]);
        assert_eq!(plan, vec![MergeAction::Discard(a.id), MergeAction::Reassign(b.id)]);
    }

    #[test]
    fn merge_into_empty_cart_reassigns_everything() {
        let a = guest_item(Uuid::new_v4());
        let b = guest_item(Uuid::new_v4());
        let plan = plan_merge(&[a.clone(), b.clone()], &[]);
        assert_eq!(plan, vec![MergeAction::Reassign(a.id), MergeAction::Reassign(b.id)]);
    }

    #[test]
    fn merge_of_empty_guest_cart_is_a_no_op() {
        assert!(plan_merge(&[], &[Uuid::new_v4()]).is_empty());
    }
}
