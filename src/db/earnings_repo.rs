// src/db/earnings_repo.rs

use rust_decimal::Decimal;
use sqlx::{Executor, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    common::{
        error::AppError,
        filter::{push_filters, FilterColumn, FilterExpr},
        response::PageRequest,
    },
    models::earnings::{EarningStatus, EarningsSummary, NewEarning, Payout, PayoutStatus, ProducerEarning},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EarningColumn {
    Status,
    CreatedAt,
    Beat,
    Order,
}

impl FilterColumn for EarningColumn {
    fn sql(&self) -> &'static str {
        match self {
            EarningColumn::Status => "pe.status::text",
            EarningColumn::CreatedAt => "pe.created_at",
            EarningColumn::Beat => "pe.beat_id",
            EarningColumn::Order => "pe.order_id",
        }
    }
}

const EARNING_COLUMNS: &str = "pe.id, pe.producer_id, pe.order_id, pe.order_item_id, pe.beat_id, pe.gross_amount, pe.platform_fee, pe.net_amount, pe.currency, pe.status, pe.payout_id, pe.available_at, pe.paid_at, pe.created_at";

const PAYOUT_COLUMNS: &str = "id, producer_id, payout_number, amount, currency, status, transaction_reference, failure_reason, requested_at, processed_at, completed_at";

/// Text names of every status allowed to move into `next`; status updates
/// are guarded with `status::text = ANY(...)`.
fn source_names(next: EarningStatus) -> Vec<String> {
    EarningStatus::sources_of(next)
        .into_iter()
        .map(|s| s.as_str().to_string())
        .collect()
}

#[derive(Clone)]
pub struct EarningsRepository {
    pool: PgPool,
}

impl EarningsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Returns false when the order item already had its earning.
    pub async fn insert_earning<'e, E>(&self, executor: E, earning: &NewEarning) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            r#"
            INSERT INTO producer_earnings (
                producer_id, order_id, order_item_id, beat_id, gross_amount, platform_fee,
                net_amount, currency, status, available_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 'pending', $9)
            ON CONFLICT (order_item_id) DO NOTHING
            "#,
        )
        .bind(earning.producer_id)
        .bind(earning.order_id)
        .bind(earning.order_item_id)
        .bind(earning.beat_id)
        .bind(earning.gross_amount)
        .bind(earning.platform_fee)
        .bind(earning.net_amount)
        .bind(&earning.currency)
        .bind(earning.available_at)
        .execute(executor)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn list(
        &self,
        producer_id: Uuid,
        filters: &[FilterExpr<EarningColumn>],
        page: PageRequest,
    ) -> Result<(Vec<ProducerEarning>, i64), AppError> {
        let mut count_qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM producer_earnings pe WHERE pe.producer_id = ");
        count_qb.push_bind(producer_id);
        push_filters(&mut count_qb, filters);
        let total: i64 = count_qb.build_query_scalar().fetch_one(&self.pool).await?;

        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT {} FROM producer_earnings pe WHERE pe.producer_id = ",
            EARNING_COLUMNS
        ));
        qb.push_bind(producer_id);
        push_filters(&mut qb, filters);
        qb.push(" ORDER BY pe.created_at DESC LIMIT ").push_bind(page.limit);
        qb.push(" OFFSET ").push_bind(page.offset());

        let rows = qb.build_query_as::<ProducerEarning>().fetch_all(&self.pool).await?;
        Ok((rows, total))
    }

    pub async fn summary(&self, producer_id: Uuid) -> Result<EarningsSummary, AppError> {
        let summary = sqlx::query_as::<_, EarningsSummary>(
            r#"
            SELECT
                COUNT(*) FILTER (WHERE status <> 'refunded') AS total_sales,
                COALESCE(SUM(gross_amount) FILTER (WHERE status <> 'refunded'), 0) AS total_gross,
                COALESCE(SUM(net_amount) FILTER (WHERE status <> 'refunded'), 0) AS total_net,
                COALESCE(SUM(net_amount) FILTER (WHERE status = 'pending'), 0) AS pending_balance,
                COALESCE(SUM(net_amount) FILTER (WHERE status = 'available'), 0) AS available_balance,
                COALESCE(SUM(net_amount) FILTER (WHERE status = 'processing'), 0) AS processing_balance,
                COALESCE(SUM(net_amount) FILTER (WHERE status = 'paid'), 0) AS paid_out,
                COALESCE(SUM(net_amount) FILTER (WHERE status = 'refunded'), 0) AS refunded
            FROM producer_earnings
            WHERE producer_id = $1
            "#,
        )
        .bind(producer_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(summary)
    }

    /// Pending earnings whose holding period is over become available.
    pub async fn release_matured(&self) -> Result<u64, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE producer_earnings
            SET status = 'available'
            WHERE status = 'pending' AND available_at <= NOW()
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn lock_available<'e, E>(&self, executor: E, producer_id: Uuid) -> Result<Vec<ProducerEarning>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            "SELECT {} FROM producer_earnings pe WHERE pe.producer_id = $1 AND pe.status = 'available' ORDER BY pe.created_at FOR UPDATE",
            EARNING_COLUMNS
        );
        let rows = sqlx::query_as::<_, ProducerEarning>(&sql)
            .bind(producer_id)
            .fetch_all(executor)
            .await?;
        Ok(rows)
    }

    pub async fn attach_to_payout<'e, E>(&self, executor: E, ids: &[Uuid], payout_id: Uuid) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            r#"
            UPDATE producer_earnings
            SET status = 'processing', payout_id = $2
            WHERE id = ANY($1) AND status::text = ANY($3)
            "#,
        )
        .bind(ids)
        .bind(payout_id)
        .bind(source_names(EarningStatus::Processing))
        .execute(executor)
        .await?;
        Ok(result.rows_affected())
    }

    /// Settles or releases every earning attached to a payout.
    pub async fn transition_payout_earnings<'e, E>(
        &self,
        executor: E,
        payout_id: Uuid,
        next: EarningStatus,
    ) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            r#"
            UPDATE producer_earnings
            SET status = $2,
                paid_at = CASE WHEN $2 = 'paid'::earning_status THEN NOW() ELSE paid_at END,
                payout_id = CASE WHEN $2 = 'available'::earning_status THEN NULL ELSE payout_id END
            WHERE payout_id = $1 AND status::text = ANY($3)
            "#,
        )
        .bind(payout_id)
        .bind(next)
        .bind(source_names(next))
        .execute(executor)
        .await?;
        Ok(result.rows_affected())
    }

    /// Payouts still holding unpaid earnings of the order.
    pub async fn payouts_for_order<'e, E>(&self, executor: E, order_id: Uuid) -> Result<Vec<Uuid>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let ids = sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT DISTINCT payout_id FROM producer_earnings
            WHERE order_id = $1 AND status = 'processing' AND payout_id IS NOT NULL
            ORDER BY payout_id
            "#,
        )
        .bind(order_id)
        .fetch_all(executor)
        .await?;
        Ok(ids)
    }

    /// Refunds every unpaid earning of the order and detaches it from its
    /// payout. Returns the payout each refunded earning was attached to and
    /// its net amount.
    pub async fn refund_for_order<'e, E>(
        &self,
        executor: E,
        order_id: Uuid,
    ) -> Result<Vec<(Option<Uuid>, Decimal)>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let rows = sqlx::query_as::<_, (Option<Uuid>, Decimal)>(
            r#"
            WITH target AS (
                SELECT id, payout_id, net_amount FROM producer_earnings
                WHERE order_id = $1 AND status::text = ANY($2)
                FOR UPDATE
            )
            UPDATE producer_earnings pe
            SET status = 'refunded', payout_id = NULL
            FROM target
            WHERE pe.id = target.id
            RETURNING target.payout_id, target.net_amount
            "#,
        )
        .bind(order_id)
        .bind(source_names(EarningStatus::Refunded))
        .fetch_all(executor)
        .await?;
        Ok(rows)
    }

    // ---
    // Payouts
    // ---

    pub async fn insert_payout<'e, E>(
        &self,
        executor: E,
        producer_id: Uuid,
        payout_number: &str,
        amount: Decimal,
        currency: &str,
    ) -> Result<Payout, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            r#"
            INSERT INTO payouts (producer_id, payout_number, amount, currency, status)
            VALUES ($1, $2, $3, $4, 'pending')
            RETURNING {}
            "#,
            PAYOUT_COLUMNS
        );
        let payout = sqlx::query_as::<_, Payout>(&sql)
            .bind(producer_id)
            .bind(payout_number)
            .bind(amount)
            .bind(currency)
            .fetch_one(executor)
            .await?;
        Ok(payout)
    }

    pub async fn lock_payout<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<Payout>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!("SELECT {} FROM payouts WHERE id = $1 FOR UPDATE", PAYOUT_COLUMNS);
        let payout = sqlx::query_as::<_, Payout>(&sql)
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(payout)
    }

    pub async fn finish_payout<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        status: PayoutStatus,
        transaction_reference: Option<&str>,
        failure_reason: Option<&str>,
    ) -> Result<Payout, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            r#"
            UPDATE payouts
            SET status = $2,
                transaction_reference = COALESCE($3, transaction_reference),
                failure_reason = $4,
                processed_at = NOW(),
                completed_at = CASE WHEN $2 = 'completed'::payout_status THEN NOW() ELSE completed_at END
            WHERE id = $1
            RETURNING {}
            "#,
            PAYOUT_COLUMNS
        );
        let payout = sqlx::query_as::<_, Payout>(&sql)
            .bind(id)
            .bind(status)
            .bind(transaction_reference)
            .bind(failure_reason)
            .fetch_one(executor)
            .await?;
        Ok(payout)
    }

    /// Takes refunded earnings out of an unfinished payout. A payout left with
    /// nothing to pay is cancelled.
    pub async fn deduct_from_payout<'e, E>(&self, executor: E, id: Uuid, amount: Decimal) -> Result<Payout, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            r#"
            UPDATE payouts
            SET amount = GREATEST(amount - $2, 0),
                status = CASE WHEN amount - $2 <= 0 THEN 'cancelled'::payout_status ELSE status END,
                failure_reason = CASE WHEN amount - $2 <= 0 THEN 'All earnings refunded' ELSE failure_reason END,
                processed_at = CASE WHEN amount - $2 <= 0 THEN NOW() ELSE processed_at END
            WHERE id = $1 AND status IN ('pending', 'processing')
            RETURNING {}
            "#,
            PAYOUT_COLUMNS
        );
        let payout = sqlx::query_as::<_, Payout>(&sql)
            .bind(id)
            .bind(amount)
            .fetch_optional(executor)
            .await?
            .ok_or_else(|| AppError::Conflict("Payout is no longer open".into()))?;
        Ok(payout)
    }

    pub async fn list_payouts(&self, producer_id: Uuid, page: PageRequest) -> Result<(Vec<Payout>, i64), AppError> {
        let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM payouts WHERE producer_id = $1")
            .bind(producer_id)
            .fetch_one(&self.pool)
            .await?;

        let sql = format!(
            "SELECT {} FROM payouts WHERE producer_id = $1 ORDER BY requested_at DESC LIMIT $2 OFFSET $3",
            PAYOUT_COLUMNS
        );
        let payouts = sqlx::query_as::<_, Payout>(&sql)
            .bind(producer_id)
            .bind(page.limit)
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await?;
        Ok((payouts, total))
    }
}
