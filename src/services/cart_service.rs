// src/services/cart_service.rs

use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{CartRepository, CatalogRepository, OrderRepository},
    models::{
        cart::{plan_merge, CartLine, CartOwner, CartView, MergeAction},
        catalog::{cheapest_enabled_tier, LicenseTier},
        settings::FeeSettings,
    },
    services::{fees, settings_service::SettingsService},
};

/// Prices a set of cart lines with the same calculator checkout uses.
pub fn price_lines(items: Vec<CartLine>, fee_settings: &FeeSettings) -> CartView {
    if items.is_empty() {
        return CartView {
            items,
            count: 0,
            subtotal: Decimal::ZERO,
            processing_fee: Decimal::ZERO,
            platform_fee: Decimal::ZERO,
            producer_earnings: Decimal::ZERO,
            total: Decimal::ZERO,
        };
    }

    let subtotal: Decimal = items.iter().map(|line| line.price).sum();
    let breakdown = fees::calculate(subtotal, fee_settings);
    CartView {
        count: items.len(),
        items,
        subtotal: breakdown.subtotal,
        processing_fee: breakdown.processing_fee,
        platform_fee: breakdown.platform_fee,
        producer_earnings: breakdown.producer_earnings,
        total: breakdown.total,
    }
}

#[derive(Clone)]
pub struct CartService {
    cart_repo: CartRepository,
    catalog_repo: CatalogRepository,
    order_repo: OrderRepository,
    settings: SettingsService,
    pool: PgPool,
}

impl CartService {
    pub fn new(
        cart_repo: CartRepository,
        catalog_repo: CatalogRepository,
        order_repo: OrderRepository,
        settings: SettingsService,
        pool: PgPool,
    ) -> Self {
        Self {
            cart_repo,
            catalog_repo,
            order_repo,
            settings,
            pool,
        }
    }

    pub async fn get_cart(&self, owner: &CartOwner) -> Result<CartView, AppError> {
        let lines = self.cart_repo.lines(owner).await?;
        let fee_settings = self.settings.get_fee_settings().await?;
        Ok(price_lines(lines, &fee_settings))
    }

    /// Resolves the tier a line should carry: the named one when it belongs
    /// to the beat and is on sale, otherwise the cheapest enabled tier.
    async fn resolve_tier(&self, beat_id: Uuid, tier_id: Option<Uuid>) -> Result<LicenseTier, AppError> {
        let beat = self
            .catalog_repo
            .find_beat(&self.pool, beat_id)
            .await?
            .filter(|b| b.is_purchasable())
            .ok_or_else(|| AppError::NotFound("Beat not found or no longer available".into()))?;

        match tier_id {
            Some(id) => self
                .catalog_repo
                .find_tier(&self.pool, id)
                .await?
                .filter(|t| t.beat_id == beat.id && t.is_enabled)
                .ok_or_else(|| AppError::not_found("License tier")),
            None => {
                let tiers = self.catalog_repo.list_tiers(&self.pool, beat.id, true).await?;
                cheapest_enabled_tier(&tiers)
                    .cloned()
                    .ok_or_else(|| AppError::NotFound("This beat has no license on sale".into()))
            }
        }
    }

    async fn ensure_not_owned(&self, owner: &CartOwner, tier: &LicenseTier) -> Result<(), AppError> {
        if let CartOwner::User(user_id) = owner {
            if self
                .order_repo
                .owns_tier(&self.pool, *user_id, tier.beat_id, tier.id)
                .await?
            {
                return Err(AppError::Conflict("You already own this license".into()));
            }
        }
        Ok(())
    }

    /// Adds a beat, or switches the tier of the line already holding it.
    pub async fn add(&self, owner: &CartOwner, beat_id: Uuid, tier_id: Option<Uuid>) -> Result<CartView, AppError> {
        let tier = self.resolve_tier(beat_id, tier_id).await?;
        self.ensure_not_owned(owner, &tier).await?;
        self.cart_repo.upsert(owner, beat_id, tier.id).await?;
        self.get_cart(owner).await
    }

    pub async fn update_tier(&self, owner: &CartOwner, beat_id: Uuid, tier_id: Uuid) -> Result<CartView, AppError> {
        let tier = self.resolve_tier(beat_id, Some(tier_id)).await?;
        self.ensure_not_owned(owner, &tier).await?;
        if self.cart_repo.update_tier(owner, beat_id, tier.id).await? == 0 {
            return Err(AppError::not_found("Cart item"));
        }
        self.get_cart(owner).await
    }

    pub async fn remove(&self, owner: &CartOwner, beat_id: Uuid) -> Result<CartView, AppError> {
        if self.cart_repo.remove(owner, beat_id).await? == 0 {
            return Err(AppError::not_found("Cart item"));
        }
        self.get_cart(owner).await
    }

    pub async fn clear(&self, owner: &CartOwner) -> Result<u64, AppError> {
        self.cart_repo.clear(&self.pool, owner).await
    }

    /// Moves a guest session's cart into the user's on sign-in.
    pub async fn merge(&self, user_id: Uuid, session_id: &str) -> Result<CartView, AppError> {
        let user_owner = CartOwner::User(user_id);
        let guest_owner = CartOwner::Session(session_id.to_string());

        let mut tx = self.pool.begin().await?;

        let guest_items = self.cart_repo.items(&mut *tx, &guest_owner).await?;
        let user_beats: Vec<Uuid> = self
            .cart_repo
            .items(&mut *tx, &user_owner)
            .await?
            .iter()
            .map(|item| item.beat_id)
            .collect();

        let plan = plan_merge(&guest_items, &user_beats);
        let mut moved = 0usize;
        for action in &plan {
            match *action {
                MergeAction::Discard(item_id) => self.cart_repo.delete_item(&mut *tx, item_id).await?,
                MergeAction::Reassign(item_id) => {
                    self.cart_repo.reassign_to_user(&mut *tx, item_id, user_id).await?;
                    moved += 1;
                }
            }
        }

        tx.commit().await?;
        tracing::info!(user_id = %user_id, moved, discarded = plan.len() - moved, "guest cart merged");

        self.get_cart(&user_owner).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    use crate::models::catalog::TierType;

    fn line(price: Decimal) -> CartLine {
        CartLine {
            id: Uuid::new_v4(),
            beat_id: Uuid::new_v4(),
            license_tier_id: Uuid::new_v4(),
            title: "Midnight Drive".into(),
            cover_image: None,
            bpm: 140,
            musical_key: "Am".into(),
            producer_id: Uuid::new_v4(),
            producer_name: "Metro".into(),
            producer_username: "metro".into(),
            genre_name: None,
            tier_name: "MP3 Lease".into(),
            tier_type: TierType::Mp3,
            is_exclusive: false,
            price,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn empty_cart_costs_nothing() {
        let view = price_lines(vec![], &FeeSettings::default());
        assert_eq!(view.count, 0);
        assert_eq!(view.total, Decimal::ZERO);
        assert_eq!(view.processing_fee, Decimal::ZERO);
    }

    #[test]
    fn cart_total_matches_the_checkout_calculator() {
        let settings = FeeSettings::default();
        let view = price_lines(vec![line(Decimal::new(2999, 2))], &settings);
        let expected = fees::calculate(Decimal::new(2999, 2), &settings);

        assert_eq!(view.count, 1);
        assert_eq!(view.subtotal, Decimal::new(2999, 2));
        assert_eq!(view.processing_fee, expected.processing_fee);
        assert_eq!(view.total, Decimal::new(3116, 2));
    }

    #[test]
    fn cart_sums_every_line_before_applying_fees() {
        let view = price_lines(
            vec![line(Decimal::new(2999, 2)), line(Decimal::new(4999, 2))],
            &FeeSettings::default(),
        );
        assert_eq!(view.subtotal, Decimal::new(7998, 2));
        assert_eq!(view.platform_fee + view.producer_earnings, view.subtotal);
        assert_eq!(view.total, view.subtotal + view.processing_fee);
    }
}
