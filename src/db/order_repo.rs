// src/db/order_repo.rs

use rust_decimal::Decimal;
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::{db_utils::conflict_on_unique, error::AppError, response::PageRequest},
    models::orders::{NewOrderItem, Order, OrderItem, PurchaseSummary, UserPurchase},
};

const ORDER_COLUMNS: &str = "id, user_id, order_number, email, subtotal, processing_fee, total, currency, status, payment_provider, payment_reference, payment_metadata, paid_at, created_at, updated_at";

const ITEM_COLUMNS: &str = "id, order_id, beat_id, license_tier_id, producer_id, beat_title, license_name, license_type, price, platform_fee, producer_earnings, is_exclusive, created_at";

const PURCHASE_COLUMNS: &str = "up.id, up.user_id, up.beat_id, up.order_item_id, up.license_tier_id, up.license_type, up.purchased_at";

/// Header values of an order about to be written.
#[derive(Debug, Clone)]
pub struct NewOrder<'a> {
    pub user_id: Option<Uuid>,
    pub order_number: &'a str,
    pub email: &'a str,
    pub subtotal: Decimal,
    pub processing_fee: Decimal,
    pub total: Decimal,
    pub currency: &'a str,
    pub payment_provider: &'a str,
    pub payment_reference: &'a str,
}

#[derive(Clone)]
pub struct OrderRepository {
    pool: PgPool,
}

impl OrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert_order<'e, E>(&self, executor: E, order: &NewOrder<'_>) -> Result<Order, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            r#"
            INSERT INTO orders (
                user_id, order_number, email, subtotal, processing_fee, total, currency,
                status, payment_provider, payment_reference
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, 'pending', $8, $9)
            RETURNING {}
            "#,
            ORDER_COLUMNS
        );
        sqlx::query_as::<_, Order>(&sql)
            .bind(order.user_id)
            .bind(order.order_number)
            .bind(order.email)
            .bind(order.subtotal)
            .bind(order.processing_fee)
            .bind(order.total)
            .bind(order.currency)
            .bind(order.payment_provider)
            .bind(order.payment_reference)
            .fetch_one(executor)
            .await
            .map_err(|e| conflict_on_unique(e, "Payment reference is already in use"))
    }

    pub async fn insert_item<'e, E>(
        &self,
        executor: E,
        order_id: Uuid,
        item: &NewOrderItem,
    ) -> Result<OrderItem, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            r#"
            INSERT INTO order_items (
                order_id, beat_id, license_tier_id, producer_id, beat_title, license_name,
                license_type, price, platform_fee, producer_earnings, is_exclusive
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING {}
            "#,
            ITEM_COLUMNS
        );
        let row = sqlx::query_as::<_, OrderItem>(&sql)
            .bind(order_id)
            .bind(item.beat_id)
            .bind(item.license_tier_id)
            .bind(item.producer_id)
            .bind(&item.beat_title)
            .bind(&item.license_name)
            .bind(item.license_type)
            .bind(item.price)
            .bind(item.platform_fee)
            .bind(item.producer_earnings)
            .bind(item.is_exclusive)
            .fetch_one(executor)
            .await?;
        Ok(row)
    }

    /// Row-locks the order for the rest of the caller's transaction.
    pub async fn lock_by_reference<'e, E>(&self, executor: E, reference: &str) -> Result<Option<Order>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            "SELECT {} FROM orders WHERE payment_reference = $1 ORDER BY created_at LIMIT 1 FOR UPDATE",
            ORDER_COLUMNS
        );
        let order = sqlx::query_as::<_, Order>(&sql)
            .bind(reference)
            .fetch_optional(executor)
            .await?;
        Ok(order)
    }

    pub async fn lock_by_id<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<Order>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!("SELECT {} FROM orders WHERE id = $1 FOR UPDATE", ORDER_COLUMNS);
        let order = sqlx::query_as::<_, Order>(&sql)
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(order)
    }

    pub async fn mark_completed<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        metadata: &serde_json::Value,
    ) -> Result<Order, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            r#"
            UPDATE orders
            SET status = 'completed', paid_at = NOW(), payment_metadata = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            ORDER_COLUMNS
        );
        let order = sqlx::query_as::<_, Order>(&sql)
            .bind(id)
            .bind(metadata)
            .fetch_one(executor)
            .await?;
        Ok(order)
    }

    pub async fn mark_failed<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        metadata: &serde_json::Value,
    ) -> Result<Order, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            "UPDATE orders SET status = 'failed', payment_metadata = $2, updated_at = NOW() WHERE id = $1 RETURNING {}",
            ORDER_COLUMNS
        );
        let order = sqlx::query_as::<_, Order>(&sql)
            .bind(id)
            .bind(metadata)
            .fetch_one(executor)
            .await?;
        Ok(order)
    }

    pub async fn mark_refunded<'e, E>(&self, executor: E, id: Uuid) -> Result<Order, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            "UPDATE orders SET status = 'refunded', updated_at = NOW() WHERE id = $1 RETURNING {}",
            ORDER_COLUMNS
        );
        let order = sqlx::query_as::<_, Order>(&sql)
            .bind(id)
            .fetch_one(executor)
            .await?;
        Ok(order)
    }

    pub async fn items_for_order<'e, E>(&self, executor: E, order_id: Uuid) -> Result<Vec<OrderItem>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            "SELECT {} FROM order_items WHERE order_id = $1 ORDER BY created_at, id",
            ITEM_COLUMNS
        );
        let items = sqlx::query_as::<_, OrderItem>(&sql)
            .bind(order_id)
            .fetch_all(executor)
            .await?;
        Ok(items)
    }

    pub async fn list_for_user(&self, user_id: Uuid, page: PageRequest) -> Result<(Vec<Order>, i64), AppError> {
        let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM orders WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;

        let sql = format!(
            "SELECT {} FROM orders WHERE user_id = $1 ORDER BY created_at DESC LIMIT $2 OFFSET $3",
            ORDER_COLUMNS
        );
        let orders = sqlx::query_as::<_, Order>(&sql)
            .bind(user_id)
            .bind(page.limit)
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await?;
        Ok((orders, total))
    }

    pub async fn find_for_user(&self, id: Uuid, user_id: Uuid) -> Result<Option<Order>, AppError> {
        let sql = format!("SELECT {} FROM orders WHERE id = $1 AND user_id = $2", ORDER_COLUMNS);
        let order = sqlx::query_as::<_, Order>(&sql)
            .bind(id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(order)
    }

    // ---
    // Purchases
    // ---

    /// Returns false when the (user, beat, tier) purchase already existed.
    pub async fn insert_purchase<'e, E>(&self, executor: E, user_id: Uuid, item: &OrderItem) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            r#"
            INSERT INTO user_purchases (user_id, beat_id, order_item_id, license_tier_id, license_type)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (user_id, beat_id, license_tier_id) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(item.beat_id)
        .bind(item.id)
        .bind(item.license_tier_id)
        .bind(item.license_type)
        .execute(executor)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn owns_tier<'e, E>(
        &self,
        executor: E,
        user_id: Uuid,
        beat_id: Uuid,
        tier_id: Uuid,
    ) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let owned = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM user_purchases WHERE user_id = $1 AND beat_id = $2 AND license_tier_id = $3)",
        )
        .bind(user_id)
        .bind(beat_id)
        .bind(tier_id)
        .fetch_one(executor)
        .await?;
        Ok(owned)
    }

    pub async fn list_purchases(&self, user_id: Uuid) -> Result<Vec<PurchaseSummary>, AppError> {
        let sql = format!(
            r#"
            SELECT {},
                   b.title, b.cover_image, b.preview_audio_url,
                   p.display_name AS producer_name, p.username AS producer_username
            FROM user_purchases up
            JOIN beats b ON b.id = up.beat_id
            LEFT JOIN producers p ON p.id = b.producer_id
            WHERE up.user_id = $1
            ORDER BY up.purchased_at DESC
            "#,
            PURCHASE_COLUMNS
        );
        let purchases = sqlx::query_as::<_, PurchaseSummary>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(purchases)
    }

    pub async fn purchases_for_beat(&self, user_id: Uuid, beat_id: Uuid) -> Result<Vec<UserPurchase>, AppError> {
        let sql = format!(
            "SELECT {} FROM user_purchases up WHERE up.user_id = $1 AND up.beat_id = $2 ORDER BY up.purchased_at",
            PURCHASE_COLUMNS
        );
        let purchases = sqlx::query_as::<_, UserPurchase>(&sql)
            .bind(user_id)
            .bind(beat_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(purchases)
    }
}
