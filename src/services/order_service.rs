// src/services/order_service.rs

use std::{collections::BTreeMap, sync::Arc};

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::{error::AppError, response::PageRequest},
    db::{
        order_repo::NewOrder, CartRepository, CatalogRepository, EarningsRepository,
        OrderRepository, UserRepository,
    },
    models::{
        auth::User,
        cart::CartOwner,
        catalog::{Beat, LicenseTier},
        earnings::NewEarning,
        orders::{
            Buyer, CreateOrderPayload, NewOrderItem, Order, OrderDetail, OrderItem, OrderLineInput,
            OrderStatus, PaidCharge, PurchaseSummary, UserPurchase,
        },
        settings::FeeSettings,
    },
    services::{fees, notification_service::PurchaseNotifier, settings_service::SettingsService},
};

/// Result of applying a payment confirmation.
#[derive(Debug, Clone)]
pub enum SettlementOutcome {
    /// No order carries the reference; nothing was written.
    UnknownReference,
    AlreadySettled(Order),
    /// Refunded orders are never revived by a late confirmation.
    NotSettleable(Order),
    /// The provider charged a different amount or currency; the order is
    /// left as it was.
    AmountMismatch(Order),
    /// An exclusive beat in the order was already sold to someone else; the
    /// order is marked failed without granting anything.
    ExclusiveUnavailable(Order),
    Settled(Order),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettlementAction {
    Settle,
    Skip,
    Reject,
}

pub fn settlement_action(status: OrderStatus) -> SettlementAction {
    match status {
        OrderStatus::Pending | OrderStatus::Processing | OrderStatus::Failed => SettlementAction::Settle,
        OrderStatus::Completed => SettlementAction::Skip,
        OrderStatus::Refunded => SettlementAction::Reject,
    }
}

/// Net amount to take back from each payout, from refunded `(payout, net)` rows.
pub fn payout_deductions(refunded: &[(Option<Uuid>, Decimal)]) -> BTreeMap<Uuid, Decimal> {
    let mut deductions = BTreeMap::new();
    for (payout_id, amount) in refunded {
        if let Some(id) = payout_id {
            *deductions.entry(*id).or_insert(Decimal::ZERO) += *amount;
        }
    }
    deductions
}

fn random_hex(len: usize) -> String {
    let mut hex = Uuid::new_v4().simple().to_string();
    hex.truncate(len);
    hex
}

/// `BB-YYYYMMDD-XXXXXXXX`
pub fn generate_order_number(now: DateTime<Utc>) -> String {
    format!("BB-{}-{}", now.format("%Y%m%d"), random_hex(8).to_uppercase())
}

/// `REF-<unix millis>-<8 hex>`
pub fn generate_payment_reference(now: DateTime<Utc>) -> String {
    format!("REF-{}-{}", now.timestamp_millis(), random_hex(8))
}

/// Picks who pays: the signed-in user, else the guest email from the payload.
pub fn resolve_buyer(user: Option<&User>, email: Option<&str>) -> Result<Buyer, AppError> {
    match (user, email.map(str::trim).filter(|e| !e.is_empty())) {
        (Some(user), _) => Ok(Buyer::User {
            id: user.id,
            email: user.email.clone(),
        }),
        (None, Some(email)) => Ok(Buyer::Guest {
            email: email.to_lowercase(),
        }),
        (None, None) => Err(AppError::BadRequest("An email address is required for guest checkout".into())),
    }
}

/// One beat per order.
pub fn ensure_distinct_lines(lines: &[OrderLineInput]) -> Result<(), AppError> {
    if lines.is_empty() {
        return Err(AppError::BadRequest("Order items are required".into()));
    }
    for (idx, line) in lines.iter().enumerate() {
        if lines[..idx].iter().any(|prev| prev.beat_id == line.beat_id) {
            return Err(AppError::BadRequest(format!(
                "Beat {} appears more than once in the order",
                line.beat_id
            )));
        }
    }
    Ok(())
}

/// Snapshot of a beat and tier as they read at checkout.
pub fn build_line(beat: &Beat, tier: &LicenseTier, fee_settings: &FeeSettings) -> NewOrderItem {
    let split = fees::split_line(tier.price, fee_settings);
    NewOrderItem {
        beat_id: beat.id,
        license_tier_id: tier.id,
        producer_id: beat.producer_id,
        beat_title: beat.title.clone(),
        license_name: tier.name.clone(),
        license_type: tier.tier_type,
        price: tier.price,
        platform_fee: split.platform_fee,
        producer_earnings: split.producer_earnings,
        is_exclusive: tier.is_exclusive,
    }
}

/// Earnings copy the amounts frozen on each item; nothing is recomputed.
pub fn plan_earnings(order: &Order, items: &[OrderItem], paid_at: DateTime<Utc>, hold_days: i64) -> Vec<NewEarning> {
    let available_at = paid_at + Duration::days(hold_days);
    items
        .iter()
        .map(|item| NewEarning {
            producer_id: item.producer_id,
            order_id: order.id,
            order_item_id: item.id,
            beat_id: item.beat_id,
            gross_amount: item.price,
            platform_fee: item.platform_fee,
            net_amount: item.producer_earnings,
            currency: order.currency.clone(),
            available_at,
        })
        .collect()
}

pub fn exclusive_beats(items: &[OrderItem]) -> Vec<Uuid> {
    let mut beats: Vec<Uuid> = Vec::new();
    for item in items.iter().filter(|i| i.is_exclusive) {
        if !beats.contains(&item.beat_id) {
            beats.push(item.beat_id);
        }
    }
    beats
}

#[derive(Clone)]
pub struct OrderService {
    order_repo: OrderRepository,
    catalog_repo: CatalogRepository,
    user_repo: UserRepository,
    earnings_repo: EarningsRepository,
    cart_repo: CartRepository,
    settings: SettingsService,
    notifier: Arc<dyn PurchaseNotifier>,
    pool: PgPool,
    hold_days: i64,
    currency: String,
}

impl OrderService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        order_repo: OrderRepository,
        catalog_repo: CatalogRepository,
        user_repo: UserRepository,
        earnings_repo: EarningsRepository,
        cart_repo: CartRepository,
        settings: SettingsService,
        notifier: Arc<dyn PurchaseNotifier>,
        pool: PgPool,
        hold_days: i64,
        currency: String,
    ) -> Self {
        Self {
            order_repo,
            catalog_repo,
            user_repo,
            earnings_repo,
            cart_repo,
            settings,
            notifier,
            pool,
            hold_days,
            currency,
        }
    }

    /// Writes a `pending` order with every line priced, or nothing at all.
    pub async fn create_order(&self, buyer: &Buyer, payload: &CreateOrderPayload) -> Result<OrderDetail, AppError> {
        ensure_distinct_lines(&payload.items)?;
        let fee_settings = self.settings.get_fee_settings().await?;

        let mut tx = self.pool.begin().await?;

        let mut lines = Vec::with_capacity(payload.items.len());
        for input in &payload.items {
            let beat = self
                .catalog_repo
                .find_beat(&mut *tx, input.beat_id)
                .await?
                .filter(Beat::is_purchasable)
                .ok_or_else(|| AppError::NotFound(format!("Beat {} not found or no longer available", input.beat_id)))?;

            let tier = self
                .catalog_repo
                .find_tier(&mut *tx, input.license_tier_id)
                .await?
                .filter(|t| t.beat_id == beat.id && t.is_enabled)
                .ok_or_else(|| {
                    AppError::NotFound(format!("License tier {} not found for this beat", input.license_tier_id))
                })?;

            if let Some(user_id) = buyer.user_id() {
                if self.order_repo.owns_tier(&mut *tx, user_id, beat.id, tier.id).await? {
                    return Err(AppError::Conflict(format!("You already own the {} license for {}", tier.name, beat.title)));
                }
            }

            lines.push(build_line(&beat, &tier, &fee_settings));
        }

        let subtotal: Decimal = lines.iter().map(|l| l.price).sum();
        let breakdown = fees::calculate(subtotal, &fee_settings);

        let now = Utc::now();
        let order_number = generate_order_number(now);
        let payment_reference = payload
            .payment_reference
            .clone()
            .unwrap_or_else(|| generate_payment_reference(now));

        let order = self
            .order_repo
            .insert_order(
                &mut *tx,
                &NewOrder {
                    user_id: buyer.user_id(),
                    order_number: &order_number,
                    email: buyer.email(),
                    subtotal: breakdown.subtotal,
                    processing_fee: breakdown.processing_fee,
                    total: breakdown.total,
                    currency: &self.currency,
                    payment_provider: &payload.payment_provider,
                    payment_reference: &payment_reference,
                },
            )
            .await?;

        let mut items = Vec::with_capacity(lines.len());
        for line in &lines {
            items.push(self.order_repo.insert_item(&mut *tx, order.id, line).await?);
        }

        tx.commit().await?;
        tracing::info!(
            order_id = %order.id,
            order_number = %order.order_number,
            reference = %order.payment_reference,
            items = items.len(),
            total = %order.total,
            "order created"
        );

        Ok(OrderDetail { order, items })
    }

    /// Turns a paid order into purchases and earnings. Safe to call any
    /// number of times for the same reference: the order row is locked for
    /// the whole transaction and a completed order is left untouched.
    pub async fn mark_order_as_paid(
        &self,
        reference: &str,
        metadata: serde_json::Value,
    ) -> Result<SettlementOutcome, AppError> {
        self.settle(reference, false, None, metadata).await
    }

    /// Settles only when the provider's charge covers the order total.
    pub async fn settle_charge(
        &self,
        reference: &str,
        charge: Option<&PaidCharge>,
        metadata: serde_json::Value,
    ) -> Result<SettlementOutcome, AppError> {
        self.settle(reference, true, charge, metadata).await
    }

    async fn settle(
        &self,
        reference: &str,
        check_charge: bool,
        charge: Option<&PaidCharge>,
        metadata: serde_json::Value,
    ) -> Result<SettlementOutcome, AppError> {
        let mut tx = self.pool.begin().await?;

        let Some(order) = self.order_repo.lock_by_reference(&mut *tx, reference).await? else {
            tracing::warn!(reference, "payment confirmation for unknown reference ignored");
            return Ok(SettlementOutcome::UnknownReference);
        };

        match settlement_action(order.status) {
            SettlementAction::Settle => {}
            SettlementAction::Skip => {
                tracing::info!(reference, order_id = %order.id, "order already settled");
                return Ok(SettlementOutcome::AlreadySettled(order));
            }
            SettlementAction::Reject => {
                tracing::warn!(reference, order_id = %order.id, status = ?order.status, "payment confirmation for refunded order ignored");
                return Ok(SettlementOutcome::NotSettleable(order));
            }
        }

        if check_charge && !charge.is_some_and(|c| c.covers(&order)) {
            tracing::warn!(
                reference,
                order_id = %order.id,
                expected = %order.total,
                currency = %order.currency,
                charged = ?charge,
                "payment confirmation does not match the order total"
            );
            return Ok(SettlementOutcome::AmountMismatch(order));
        }

        let items = self.order_repo.items_for_order(&mut *tx, order.id).await?;

        for beat_id in exclusive_beats(&items) {
            if self.catalog_repo.lock_exclusive_sold(&mut *tx, beat_id).await? == Some(true) {
                let order = self.order_repo.mark_failed(&mut *tx, order.id, &metadata).await?;
                tx.commit().await?;
                tracing::error!(
                    reference,
                    order_id = %order.id,
                    beat_id = %beat_id,
                    "exclusive rights already sold, order failed and needs a refund"
                );
                return Ok(SettlementOutcome::ExclusiveUnavailable(order));
            }
        }

        let order = self.order_repo.mark_completed(&mut *tx, order.id, &metadata).await?;
        let paid_at = order.paid_at.unwrap_or_else(Utc::now);

        let purchaser = match order.user_id {
            Some(id) => Some(id),
            None => self.user_repo.find_id_by_email(&mut *tx, &order.email).await?,
        };

        let mut purchases = 0usize;
        match purchaser {
            Some(user_id) => {
                for item in &items {
                    if self.order_repo.insert_purchase(&mut *tx, user_id, item).await? {
                        purchases += 1;
                    }
                }
            }
            None => {
                tracing::warn!(order_id = %order.id, "guest order has no matching account, purchases not recorded");
            }
        }

        let mut earnings = 0usize;
        for earning in plan_earnings(&order, &items, paid_at, self.hold_days) {
            if self.earnings_repo.insert_earning(&mut *tx, &earning).await? {
                earnings += 1;
            }
        }

        for beat_id in exclusive_beats(&items) {
            if self.catalog_repo.mark_exclusive_sold(&mut *tx, beat_id).await? == 0 {
                tracing::warn!(beat_id = %beat_id, order_id = %order.id, "exclusive beat no longer exists");
                continue;
            }
            tracing::info!(beat_id = %beat_id, order_id = %order.id, "exclusive rights sold");
        }

        tx.commit().await?;
        tracing::info!(
            reference,
            order_id = %order.id,
            items = items.len(),
            purchases,
            earnings,
            "order settled"
        );

        self.after_settlement(&order, &items, purchaser).await;
        Ok(SettlementOutcome::Settled(order))
    }

    /// Cart cleanup and confirmation. Errors are logged, never returned.
    async fn after_settlement(&self, order: &Order, items: &[OrderItem], purchaser: Option<Uuid>) {
        if let Some(user_id) = purchaser {
            if let Err(e) = self.cart_repo.clear(&self.pool, &CartOwner::User(user_id)).await {
                tracing::warn!(order_id = %order.id, error = %e, "failed to clear cart after settlement");
            }
        }
        if let Err(e) = self.notifier.purchase_confirmed(order, items).await {
            tracing::warn!(order_id = %order.id, error = %e, "purchase confirmation failed");
        }
    }

    pub async fn refund_order(&self, order_id: Uuid) -> Result<Order, AppError> {
        let mut tx = self.pool.begin().await?;

        let order = self
            .order_repo
            .lock_by_id(&mut *tx, order_id)
            .await?
            .ok_or_else(|| AppError::not_found("Order"))?;
        if order.status != OrderStatus::Completed {
            return Err(AppError::BadRequest("Only completed orders can be refunded".into()));
        }

        // Payouts first, the same order complete_payout locks in.
        for payout_id in self.earnings_repo.payouts_for_order(&mut *tx, order.id).await? {
            self.earnings_repo.lock_payout(&mut *tx, payout_id).await?;
        }

        let order = self.order_repo.mark_refunded(&mut *tx, order.id).await?;
        let refunded = self.earnings_repo.refund_for_order(&mut *tx, order.id).await?;

        for (payout_id, amount) in payout_deductions(&refunded) {
            let payout = self
                .earnings_repo
                .deduct_from_payout(&mut *tx, payout_id, amount)
                .await?;
            tracing::info!(
                payout_id = %payout.id,
                deducted = %amount,
                remaining = %payout.amount,
                status = ?payout.status,
                "refunded earnings removed from payout"
            );
        }

        tx.commit().await?;
        tracing::info!(order_id = %order.id, earnings = refunded.len(), "order refunded");
        Ok(order)
    }

    pub async fn list_orders(&self, user_id: Uuid, page: PageRequest) -> Result<(Vec<Order>, i64), AppError> {
        self.order_repo.list_for_user(user_id, page).await
    }

    pub async fn get_order(&self, user_id: Uuid, order_id: Uuid) -> Result<OrderDetail, AppError> {
        let order = self
            .order_repo
            .find_for_user(order_id, user_id)
            .await?
            .ok_or_else(|| AppError::not_found("Order"))?;
        let items = self.order_repo.items_for_order(&self.pool, order.id).await?;
        Ok(OrderDetail { order, items })
    }

    pub async fn purchases(&self, user_id: Uuid) -> Result<Vec<PurchaseSummary>, AppError> {
        self.order_repo.list_purchases(user_id).await
    }

    pub async fn purchases_for_beat(&self, user_id: Uuid, beat_id: Uuid) -> Result<Vec<UserPurchase>, AppError> {
        self.order_repo.purchases_for_beat(user_id, beat_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    use crate::models::{
        auth::{UserRole, UserStatus},
        catalog::{
            fixtures::{beat, tier},
            TierType,
        },
    };

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn order_for(items: &[OrderItem]) -> Order {
        let subtotal: Decimal = items.iter().map(|i| i.price).sum();
        let breakdown = fees::calculate(subtotal, &FeeSettings::default());
        Order {
            id: items.first().map(|i| i.order_id).unwrap_or_else(Uuid::new_v4),
            user_id: Some(Uuid::new_v4()),
            order_number: generate_order_number(Utc::now()),
            email: "buyer@example.com".into(),
            subtotal: breakdown.subtotal,
            processing_fee: breakdown.processing_fee,
            total: breakdown.total,
            currency: "USD".into(),
            status: OrderStatus::Pending,
            payment_provider: "paystack".into(),
            payment_reference: generate_payment_reference(Utc::now()),
            payment_metadata: serde_json::json!({}),
            paid_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn persisted(order_id: Uuid, line: NewOrderItem) -> OrderItem {
        OrderItem {
            id: Uuid::new_v4(),
            order_id,
            beat_id: line.beat_id,
            license_tier_id: line.license_tier_id,
            producer_id: line.producer_id,
            beat_title: line.beat_title,
            license_name: line.license_name,
            license_type: line.license_type,
            price: line.price,
            platform_fee: line.platform_fee,
            producer_earnings: line.producer_earnings,
            is_exclusive: line.is_exclusive,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn order_numbers_carry_the_date_and_a_hex_suffix() {
        let now = DateTime::parse_from_rfc3339("2026-01-18T10:00:00Z").unwrap().with_timezone(&Utc);
        let number = generate_order_number(now);
        assert!(number.starts_with("BB-20260118-"));
        let suffix = &number["BB-20260118-".len()..];
        assert_eq!(suffix.len(), 8);
        assert!(suffix.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_lowercase()));
        assert_ne!(generate_order_number(now), generate_order_number(now));
    }

    #[test]
    fn payment_references_embed_the_timestamp() {
        let now = Utc::now();
        let reference = generate_payment_reference(now);
        let prefix = format!("REF-{}-", now.timestamp_millis());
        assert!(reference.starts_with(&prefix));
        assert_eq!(reference.len(), prefix.len() + 8);
    }

    #[test]
    fn only_open_orders_settle() {
        assert_eq!(settlement_action(OrderStatus::Pending), SettlementAction::Settle);
        assert_eq!(settlement_action(OrderStatus::Processing), SettlementAction::Settle);
        assert_eq!(settlement_action(OrderStatus::Failed), SettlementAction::Settle);
        assert_eq!(settlement_action(OrderStatus::Completed), SettlementAction::Skip);
        assert_eq!(settlement_action(OrderStatus::Refunded), SettlementAction::Reject);
    }

    #[test]
    fn guests_need_an_email() {
        assert!(matches!(resolve_buyer(None, None), Err(AppError::BadRequest(_))));
        assert!(matches!(resolve_buyer(None, Some("  ")), Err(AppError::BadRequest(_))));
        assert_eq!(
            resolve_buyer(None, Some("Guest@Example.com")).unwrap(),
            Buyer::Guest {
                email: "guest@example.com".into()
            }
        );
    }

    #[test]
    fn signed_in_buyer_wins_over_payload_email() {
        let user = User {
            id: Uuid::new_v4(),
            name: "Artist".into(),
            email: "artist@example.com".into(),
            password_hash: String::new(),
            role: UserRole::Artist,
            status: UserStatus::Active,
            last_login_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let buyer = resolve_buyer(Some(&user), Some("other@example.com")).unwrap();
        assert_eq!(buyer.user_id(), Some(user.id));
        assert_eq!(buyer.email(), "artist@example.com");
    }

    #[test]
    fn empty_or_repeated_lines_are_rejected() {
        assert!(matches!(ensure_distinct_lines(&[]), Err(AppError::BadRequest(_))));

        let beat_id = Uuid::new_v4();
        let lines = vec![
            OrderLineInput { beat_id, license_tier_id: Uuid::new_v4() },
            OrderLineInput { beat_id, license_tier_id: Uuid::new_v4() },
        ];
        assert!(matches!(ensure_distinct_lines(&lines), Err(AppError::BadRequest(_))));

        let lines = vec![
            OrderLineInput { beat_id, license_tier_id: Uuid::new_v4() },
            OrderLineInput { beat_id: Uuid::new_v4(), license_tier_id: Uuid::new_v4() },
        ];
        assert!(ensure_distinct_lines(&lines).is_ok());
    }

    #[test]
    fn line_snapshot_freezes_title_tier_and_split() {
        let b = beat(Uuid::new_v4());
        let t = tier(b.id, TierType::Mp3, d("29.99"));
        let line = build_line(&b, &t, &FeeSettings::default());

        assert_eq!(line.beat_title, "Midnight Drive");
        assert_eq!(line.license_name, t.name);
        assert_eq!(line.license_type, TierType::Mp3);
        assert_eq!(line.producer_id, b.producer_id);
        assert_eq!(line.price, d("29.99"));
        assert_eq!(line.platform_fee, d("4.50"));
        assert_eq!(line.producer_earnings, d("25.49"));
        assert!(!line.is_exclusive);
    }

    #[test]
    fn single_lease_order_prices_like_the_cart() {
        let b = beat(Uuid::new_v4());
        let t = tier(b.id, TierType::Mp3, d("29.99"));
        let line = build_line(&b, &t, &FeeSettings::default());
        let breakdown = fees::calculate(line.price, &FeeSettings::default());
        assert_eq!(breakdown.subtotal, d("29.99"));
        assert_eq!(breakdown.processing_fee, d("1.17"));
        assert_eq!(breakdown.total, d("31.16"));
    }

    #[test]
    fn settled_earning_copies_item_amounts_and_holds_funds() {
        let b = beat(Uuid::new_v4());
        let t = tier(b.id, TierType::Mp3, d("29.99"));
        let order_id = Uuid::new_v4();
        let items = vec![persisted(order_id, build_line(&b, &t, &FeeSettings::default()))];
        let order = order_for(&items);
        let paid_at = Utc::now();

        let earnings = plan_earnings(&order, &items, paid_at, 7);
        assert_eq!(earnings.len(), 1);
        let e = &earnings[0];
        assert_eq!(e.gross_amount, d("29.99"));
        assert_eq!(e.platform_fee, d("4.50"));
        assert_eq!(e.net_amount, d("25.49"));
        assert_eq!(e.producer_id, b.producer_id);
        assert_eq!(e.order_item_id, items[0].id);
        assert_eq!(e.available_at, paid_at + Duration::days(7));
    }

    #[test]
    fn earnings_are_not_recomputed_from_current_rates() {
        let b = beat(Uuid::new_v4());
        let t = tier(b.id, TierType::Wav, d("49.99"));
        let order_id = Uuid::new_v4();
        let mut item = persisted(order_id, build_line(&b, &t, &FeeSettings::default()));
        // rates changed after checkout; the frozen split still applies
        item.platform_fee = d("10.00");
        item.producer_earnings = d("39.99");
        let order = order_for(std::slice::from_ref(&item));

        let earnings = plan_earnings(&order, &[item], Utc::now(), 0);
        assert_eq!(earnings[0].platform_fee, d("10.00"));
        assert_eq!(earnings[0].net_amount, d("39.99"));
    }

    #[test]
    fn exclusive_items_flag_their_beats_once() {
        let b = beat(Uuid::new_v4());
        let other = beat(Uuid::new_v4());
        let order_id = Uuid::new_v4();
        let fees = FeeSettings::default();
        let items = vec![
            persisted(order_id, build_line(&b, &tier(b.id, TierType::Exclusive, d("499.00")), &fees)),
            persisted(order_id, build_line(&other, &tier(other.id, TierType::Mp3, d("29.99")), &fees)),
        ];
        assert_eq!(exclusive_beats(&items), vec![b.id]);
    }

    #[test]
    fn refunds_are_deducted_per_payout() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let refunded = vec![
            (Some(a), d("25.49")),
            (None, d("10.00")),
            (Some(a), d("4.51")),
            (Some(b), d("42.49")),
        ];
        let deductions = payout_deductions(&refunded);
        assert_eq!(deductions.len(), 2);
        assert_eq!(deductions[&a], d("30.00"));
        assert_eq!(deductions[&b], d("42.49"));
        assert!(payout_deductions(&[(None, d("1.00"))]).is_empty());
    }
}
