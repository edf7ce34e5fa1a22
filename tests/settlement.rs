// tests/settlement.rs
//
// Database-backed flows. Run with a Postgres `DATABASE_URL` and
// `cargo test -- --ignored`.

mod common;

use beat_market::{
    common::{error::AppError, response::PageRequest},
    config::AppState,
    db::catalog_repo::BeatSort,
    models::{
        auth::{User, UserRole},
        catalog::{BeatDetail, TierType},
        earnings::{EarningStatus, PayoutStatus, ProducerEarning},
        orders::{Buyer, CreateOrderPayload, OrderDetail, OrderLineInput, OrderStatus},
    },
    services::{catalog_service::BeatSearch, order_service::SettlementOutcome},
};
use rust_decimal::Decimal;
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

struct Market {
    state: AppState,
    producer: User,
    artist: User,
    beat: BeatDetail,
}

async fn market(pool: PgPool) -> Market {
    let state = common::state_with(pool);
    let producer = common::register(&state, UserRole::Producer, "maker@example.com", Some("maker")).await;
    let artist = common::register(&state, UserRole::Artist, "singer@example.com", None).await;
    let beat = common::publish_beat(
        &state,
        &producer,
        "Night Drive",
        vec![
            common::tier(TierType::Mp3, "MP3 Lease", Decimal::new(2999, 2)),
            common::tier(TierType::Exclusive, "Exclusive Rights", Decimal::new(49999, 2)),
        ],
    )
    .await;
    Market { state, producer, artist, beat }
}

fn tier_id(beat: &BeatDetail, tier_type: TierType) -> Uuid {
    beat.license_tiers
        .iter()
        .find(|t| t.tier_type == tier_type)
        .map(|t| t.id)
        .unwrap()
}

async fn order_for(m: &Market, buyer: &Buyer, tier_type: TierType, reference: &str) -> OrderDetail {
    let payload = CreateOrderPayload {
        items: vec![OrderLineInput {
            beat_id: m.beat.beat.beat.id,
            license_tier_id: tier_id(&m.beat, tier_type),
        }],
        payment_provider: "paystack".into(),
        payment_reference: Some(reference.into()),
        email: None,
    };
    m.state.order_service.create_order(buyer, &payload).await.unwrap()
}

fn artist_buyer(m: &Market) -> Buyer {
    Buyer::User {
        id: m.artist.id,
        email: m.artist.email.clone(),
    }
}

const PURCHASES_FOR_ORDER: &str = "SELECT COUNT(*) FROM user_purchases up \
     JOIN order_items oi ON oi.id = up.order_item_id WHERE oi.order_id = $1";

async fn count(pool: &PgPool, sql: &str, order_id: Uuid) -> i64 {
    sqlx::query_scalar::<_, i64>(sql)
        .bind(order_id)
        .fetch_one(pool)
        .await
        .unwrap()
}

async fn earnings_for(pool: &PgPool, order_id: Uuid) -> Vec<ProducerEarning> {
    sqlx::query_as::<_, ProducerEarning>("SELECT * FROM producer_earnings WHERE order_id = $1")
        .bind(order_id)
        .fetch_all(pool)
        .await
        .unwrap()
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "needs a Postgres DATABASE_URL"]
async fn order_totals_use_seeded_fees(pool: PgPool) {
    let m = market(pool).await;
    let detail = order_for(&m, &artist_buyer(&m), TierType::Mp3, "REF-TOTALS").await;

    assert_eq!(detail.order.status, OrderStatus::Pending);
    assert_eq!(detail.order.subtotal, Decimal::new(2999, 2));
    assert_eq!(detail.order.processing_fee, Decimal::new(117, 2));
    assert_eq!(detail.order.total, Decimal::new(3116, 2));
    assert_eq!(detail.items.len(), 1);
    assert_eq!(detail.items[0].platform_fee, Decimal::new(450, 2));
    assert_eq!(detail.items[0].producer_earnings, Decimal::new(2549, 2));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "needs a Postgres DATABASE_URL"]
async fn settlement_writes_purchase_and_pending_earning(pool: PgPool) {
    let m = market(pool.clone()).await;
    let detail = order_for(&m, &artist_buyer(&m), TierType::Mp3, "REF-SETTLE").await;

    let outcome = m
        .state
        .order_service
        .mark_order_as_paid("REF-SETTLE", json!({ "status": "success" }))
        .await
        .unwrap();
    let SettlementOutcome::Settled(order) = outcome else {
        panic!("expected the order to settle");
    };
    assert_eq!(order.status, OrderStatus::Completed);
    let paid_at = order.paid_at.unwrap();

    let earnings = earnings_for(&pool, detail.order.id).await;
    assert_eq!(earnings.len(), 1);
    assert_eq!(earnings[0].gross_amount, Decimal::new(2999, 2));
    assert_eq!(earnings[0].platform_fee, Decimal::new(450, 2));
    assert_eq!(earnings[0].net_amount, Decimal::new(2549, 2));
    assert_eq!(earnings[0].status, EarningStatus::Pending);
    assert_eq!(earnings[0].available_at, Some(paid_at + chrono::Duration::days(7)));

    let purchases = m
        .state
        .order_service
        .purchases_for_beat(m.artist.id, m.beat.beat.beat.id)
        .await
        .unwrap();
    assert_eq!(purchases.len(), 1);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "needs a Postgres DATABASE_URL"]
async fn unknown_reference_is_a_quiet_no_op(pool: PgPool) {
    let state = common::state_with(pool.clone());

    let outcome = state
        .order_service
        .mark_order_as_paid("REF-DOES-NOT-EXIST", json!({}))
        .await
        .unwrap();
    assert!(matches!(outcome, SettlementOutcome::UnknownReference));

    let earnings: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM producer_earnings")
        .fetch_one(&pool)
        .await
        .unwrap();
    let purchases: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM user_purchases")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!((earnings, purchases), (0, 0));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "needs a Postgres DATABASE_URL"]
async fn repeated_confirmation_settles_once(pool: PgPool) {
    let m = market(pool.clone()).await;
    let detail = order_for(&m, &artist_buyer(&m), TierType::Mp3, "REF-TWICE").await;
    let orders = &m.state.order_service;

    orders.mark_order_as_paid("REF-TWICE", json!({})).await.unwrap();
    let second = orders.mark_order_as_paid("REF-TWICE", json!({})).await.unwrap();
    assert!(matches!(second, SettlementOutcome::AlreadySettled(_)));

    let id = detail.order.id;
    assert_eq!(count(&pool, "SELECT COUNT(*) FROM producer_earnings WHERE order_id = $1", id).await, 1);
    assert_eq!(count(&pool, PURCHASES_FOR_ORDER, id).await, 1);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "needs a Postgres DATABASE_URL"]
async fn concurrent_confirmations_settle_once(pool: PgPool) {
    let m = market(pool.clone()).await;
    let detail = order_for(&m, &artist_buyer(&m), TierType::Mp3, "REF-RACE").await;

    let a = m.state.order_service.clone();
    let b = m.state.order_service.clone();
    let (first, second) = tokio::join!(
        a.mark_order_as_paid("REF-RACE", json!({ "via": "webhook" })),
        b.mark_order_as_paid("REF-RACE", json!({ "via": "verify" })),
    );
    let outcomes = [first.unwrap(), second.unwrap()];

    let settled = outcomes
        .iter()
        .filter(|o| matches!(o, SettlementOutcome::Settled(_)))
        .count();
    let skipped = outcomes
        .iter()
        .filter(|o| matches!(o, SettlementOutcome::AlreadySettled(_)))
        .count();
    assert_eq!((settled, skipped), (1, 1));

    let id = detail.order.id;
    let completed = count(
        &pool,
        "SELECT COUNT(*) FROM orders WHERE id = $1 AND status = 'completed'",
        id,
    )
    .await;
    assert_eq!(completed, 1);
    assert_eq!(count(&pool, "SELECT COUNT(*) FROM producer_earnings WHERE order_id = $1", id).await, 1);
    assert_eq!(count(&pool, PURCHASES_FOR_ORDER, id).await, 1);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "needs a Postgres DATABASE_URL"]
async fn owned_license_cannot_be_ordered_again(pool: PgPool) {
    let m = market(pool).await;
    let buyer = artist_buyer(&m);
    order_for(&m, &buyer, TierType::Mp3, "REF-FIRST").await;
    m.state
        .order_service
        .mark_order_as_paid("REF-FIRST", json!({}))
        .await
        .unwrap();

    let payload = CreateOrderPayload {
        items: vec![OrderLineInput {
            beat_id: m.beat.beat.beat.id,
            license_tier_id: tier_id(&m.beat, TierType::Mp3),
        }],
        payment_provider: "paystack".into(),
        payment_reference: Some("REF-SECOND".into()),
        email: None,
    };
    let err = m.state.order_service.create_order(&buyer, &payload).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "needs a Postgres DATABASE_URL"]
async fn exclusive_sale_retires_the_beat(pool: PgPool) {
    let m = market(pool).await;
    let beat_id = m.beat.beat.beat.id;
    order_for(&m, &artist_buyer(&m), TierType::Exclusive, "REF-EXCL").await;
    m.state
        .order_service
        .mark_order_as_paid("REF-EXCL", json!({}))
        .await
        .unwrap();

    let (listed, _) = m
        .state
        .catalog_service
        .list_beats(&BeatSearch::default(), BeatSort::Newest, PageRequest::new(None, None))
        .await
        .unwrap();
    assert!(listed.iter().all(|b| b.beat.id != beat_id));

    let anonymous = m.state.catalog_service.get_beat(beat_id, None).await;
    assert!(matches!(anonymous, Err(AppError::NotFound(_))));
    let producer_view = m.state.catalog_service.get_beat(beat_id, Some(m.producer.id)).await;
    assert!(matches!(producer_view, Err(AppError::NotFound(_))));

    let owner_view = m
        .state
        .catalog_service
        .get_beat(beat_id, Some(m.artist.id))
        .await
        .unwrap();
    assert!(owner_view.beat.beat.is_exclusive_sold);

    let guest = Buyer::Guest { email: "late@example.com".into() };
    let payload = CreateOrderPayload {
        items: vec![OrderLineInput {
            beat_id,
            license_tier_id: tier_id(&m.beat, TierType::Mp3),
        }],
        payment_provider: "paystack".into(),
        payment_reference: None,
        email: Some("late@example.com".into()),
    };
    let err = m.state.order_service.create_order(&guest, &payload).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "needs a Postgres DATABASE_URL"]
async fn guest_purchase_links_to_matching_account(pool: PgPool) {
    let m = market(pool.clone()).await;
    let guest = Buyer::Guest { email: m.artist.email.clone() };
    let detail = order_for(&m, &guest, TierType::Mp3, "REF-GUEST").await;
    assert_eq!(detail.order.user_id, None);

    m.state
        .order_service
        .mark_order_as_paid("REF-GUEST", json!({}))
        .await
        .unwrap();

    let purchases = m.state.order_service.purchases(m.artist.id).await.unwrap();
    assert_eq!(purchases.len(), 1);
    assert_eq!(
        count(&pool, "SELECT COUNT(*) FROM producer_earnings WHERE order_id = $1", detail.order.id).await,
        1
    );
}

async fn release_everything(m: &Market, pool: &PgPool) {
    sqlx::query("UPDATE producer_earnings SET available_at = NOW() - INTERVAL '1 day' WHERE status = 'pending'")
        .execute(pool)
        .await
        .unwrap();
    m.state.earnings_service.release_matured().await.unwrap();
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "needs a Postgres DATABASE_URL"]
async fn refund_takes_earnings_out_of_an_open_payout(pool: PgPool) {
    let m = market(pool.clone()).await;
    let lease = order_for(&m, &artist_buyer(&m), TierType::Mp3, "REF-LEASE").await;
    let fan = Buyer::Guest { email: "fan@example.com".into() };
    let exclusive = order_for(&m, &fan, TierType::Exclusive, "REF-BUYOUT").await;
    let orders = &m.state.order_service;
    orders.mark_order_as_paid("REF-LEASE", json!({})).await.unwrap();
    orders.mark_order_as_paid("REF-BUYOUT", json!({})).await.unwrap();
    release_everything(&m, &pool).await;

    let earnings = &m.state.earnings_service;
    let payout = earnings.request_payout(m.producer.id).await.unwrap();
    let kept = earnings_for(&pool, exclusive.order.id).await[0].net_amount;
    let refunded = earnings_for(&pool, lease.order.id).await[0].net_amount;
    assert_eq!(payout.amount, kept + refunded);

    orders.refund_order(lease.order.id).await.unwrap();

    let lease_earning = &earnings_for(&pool, lease.order.id).await[0];
    assert_eq!(lease_earning.status, EarningStatus::Refunded);
    assert_eq!(lease_earning.payout_id, None);

    let paid = earnings.complete_payout(payout.id, Some("TRX-1")).await.unwrap();
    assert_eq!(paid.amount, kept);
    let lease_earning = &earnings_for(&pool, lease.order.id).await[0];
    assert_eq!(lease_earning.status, EarningStatus::Refunded);
    assert_eq!(earnings_for(&pool, exclusive.order.id).await[0].status, EarningStatus::Paid);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "needs a Postgres DATABASE_URL"]
async fn refunding_a_whole_payout_cancels_it(pool: PgPool) {
    let m = market(pool.clone()).await;
    let detail = order_for(&m, &artist_buyer(&m), TierType::Exclusive, "REF-ALL").await;
    m.state
        .order_service
        .mark_order_as_paid("REF-ALL", json!({}))
        .await
        .unwrap();
    release_everything(&m, &pool).await;

    let earnings = &m.state.earnings_service;
    let payout = earnings.request_payout(m.producer.id).await.unwrap();
    m.state.order_service.refund_order(detail.order.id).await.unwrap();

    let (payouts, _) = earnings
        .list_payouts(m.producer.id, PageRequest::new(None, None))
        .await
        .unwrap();
    let cancelled = payouts.iter().find(|p| p.id == payout.id).unwrap();
    assert_eq!(cancelled.status, PayoutStatus::Cancelled);
    assert_eq!(cancelled.amount, Decimal::ZERO);

    let err = earnings.complete_payout(payout.id, None).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
}

fn charge_event(reference: &str, amount: i64, currency: &str) -> Vec<u8> {
    json!({
        "event": "charge.success",
        "data": { "reference": reference, "status": "success", "amount": amount, "currency": currency }
    })
    .to_string()
    .into_bytes()
}

async fn status_of(pool: &PgPool, order_id: Uuid) -> OrderStatus {
    sqlx::query_scalar::<_, OrderStatus>("SELECT status FROM orders WHERE id = $1")
        .bind(order_id)
        .fetch_one(pool)
        .await
        .unwrap()
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "needs a Postgres DATABASE_URL"]
async fn webhook_for_the_wrong_amount_leaves_the_order_unpaid(pool: PgPool) {
    let m = market(pool.clone()).await;
    let detail = order_for(&m, &artist_buyer(&m), TierType::Mp3, "REF-AMOUNT").await;
    let payments = &m.state.payment_service;

    for body in [
        charge_event("REF-AMOUNT", 100, "USD"),
        charge_event("REF-AMOUNT", 3116, "NGN"),
    ] {
        payments
            .handle_paystack_webhook(&body, Some(&common::sign(&body)))
            .await
            .unwrap();
        assert_eq!(status_of(&pool, detail.order.id).await, OrderStatus::Pending);
    }
    assert_eq!(count(&pool, PURCHASES_FOR_ORDER, detail.order.id).await, 0);
    assert!(earnings_for(&pool, detail.order.id).await.is_empty());

    let body = charge_event("REF-AMOUNT", 3116, "USD");
    payments
        .handle_paystack_webhook(&body, Some(&common::sign(&body)))
        .await
        .unwrap();
    assert_eq!(status_of(&pool, detail.order.id).await, OrderStatus::Completed);
    assert_eq!(count(&pool, PURCHASES_FOR_ORDER, detail.order.id).await, 1);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "needs a Postgres DATABASE_URL"]
async fn exclusive_rights_are_sold_only_once(pool: PgPool) {
    let m = market(pool.clone()).await;
    let rival = common::register(&m.state, UserRole::Artist, "rival@example.com", None).await;
    let rival_buyer = Buyer::User {
        id: rival.id,
        email: rival.email.clone(),
    };
    let first = order_for(&m, &artist_buyer(&m), TierType::Exclusive, "REF-EXCL-A").await;
    let second = order_for(&m, &rival_buyer, TierType::Exclusive, "REF-EXCL-B").await;

    let orders = &m.state.order_service;
    let won = orders.mark_order_as_paid("REF-EXCL-A", json!({})).await.unwrap();
    assert!(matches!(won, SettlementOutcome::Settled(_)));

    let lost = orders.mark_order_as_paid("REF-EXCL-B", json!({})).await.unwrap();
    let SettlementOutcome::ExclusiveUnavailable(order) = lost else {
        panic!("expected the second exclusive sale to be refused");
    };
    assert_eq!(order.status, OrderStatus::Failed);

    // a retried confirmation still grants nothing
    let retried = orders.mark_order_as_paid("REF-EXCL-B", json!({})).await.unwrap();
    assert!(matches!(retried, SettlementOutcome::ExclusiveUnavailable(_)));

    assert_eq!(count(&pool, PURCHASES_FOR_ORDER, first.order.id).await, 1);
    assert_eq!(count(&pool, PURCHASES_FOR_ORDER, second.order.id).await, 0);
    assert_eq!(earnings_for(&pool, first.order.id).await.len(), 1);
    assert!(earnings_for(&pool, second.order.id).await.is_empty());

    let owners: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM user_purchases WHERE beat_id = $1 AND license_type = 'exclusive'",
    )
    .bind(m.beat.beat.beat.id)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(owners, 1);
}
