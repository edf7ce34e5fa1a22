// src/db/cart_repo.rs

use sqlx::{Executor, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::cart::{CartItem, CartLine, CartOwner},
};

const ITEM_COLUMNS: &str = "id, user_id, session_id, beat_id, license_tier_id, created_at, updated_at";

fn push_owner(qb: &mut QueryBuilder<'_, Postgres>, owner: &CartOwner) {
    match owner {
        CartOwner::User(id) => qb.push("ci.user_id = ").push_bind(*id),
        CartOwner::Session(sid) => qb.push("ci.session_id = ").push_bind(sid.clone()),
    };
}

#[derive(Clone)]
pub struct CartRepository {
    pool: PgPool,
}

impl CartRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Priced lines, newest first. Rows whose beat left the market or whose
    /// tier was disabled are not returned.
    pub async fn lines(&self, owner: &CartOwner) -> Result<Vec<CartLine>, AppError> {
        let mut qb = QueryBuilder::<Postgres>::new(
            r#"
            SELECT ci.id, ci.beat_id, ci.license_tier_id,
                   b.title, b.cover_image, b.bpm, b.musical_key, b.producer_id,
                   p.display_name AS producer_name, p.username AS producer_username,
                   g.name AS genre_name,
                   lt.name AS tier_name, lt.tier_type, lt.is_exclusive, lt.price,
                   ci.created_at
            FROM cart_items ci
            JOIN beats b ON b.id = ci.beat_id
            JOIN producers p ON p.id = b.producer_id
            LEFT JOIN genres g ON g.id = b.genre_id
            JOIN license_tiers lt ON lt.id = ci.license_tier_id AND lt.beat_id = b.id
            WHERE b.deleted_at IS NULL
              AND b.status = 'active'
              AND b.is_exclusive_sold = FALSE
              AND lt.is_enabled
              AND "#,
        );
        push_owner(&mut qb, owner);
        qb.push(" ORDER BY ci.created_at DESC");

        let lines = qb.build_query_as::<CartLine>().fetch_all(&self.pool).await?;
        Ok(lines)
    }

    pub async fn items<'e, E>(&self, executor: E, owner: &CartOwner) -> Result<Vec<CartItem>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT {} FROM cart_items ci WHERE ", ITEM_COLUMNS));
        push_owner(&mut qb, owner);
        qb.push(" ORDER BY ci.created_at");
        let items = qb.build_query_as::<CartItem>().fetch_all(executor).await?;
        Ok(items)
    }

    /// Adds a line, or switches the tier of the line already holding this beat.
    pub async fn upsert(&self, owner: &CartOwner, beat_id: Uuid, tier_id: Uuid) -> Result<CartItem, AppError> {
        let sql = match owner {
            CartOwner::User(_) => format!(
                r#"
                INSERT INTO cart_items (user_id, beat_id, license_tier_id) VALUES ($1, $2, $3)
                ON CONFLICT (user_id, beat_id) WHERE user_id IS NOT NULL
                DO UPDATE SET license_tier_id = EXCLUDED.license_tier_id, updated_at = NOW()
                RETURNING {}
                "#,
                ITEM_COLUMNS
            ),
            CartOwner::Session(_) => format!(
                r#"
                INSERT INTO cart_items (session_id, beat_id, license_tier_id) VALUES ($1, $2, $3)
                ON CONFLICT (session_id, beat_id) WHERE session_id IS NOT NULL
                DO UPDATE SET license_tier_id = EXCLUDED.license_tier_id, updated_at = NOW()
                RETURNING {}
                "#,
                ITEM_COLUMNS
            ),
        };

        let query = sqlx::query_as::<_, CartItem>(&sql);
        let query = match owner {
            CartOwner::User(id) => query.bind(*id),
            CartOwner::Session(sid) => query.bind(sid.as_str()),
        };
        let item = query.bind(beat_id).bind(tier_id).fetch_one(&self.pool).await?;
        Ok(item)
    }

    pub async fn update_tier(&self, owner: &CartOwner, beat_id: Uuid, tier_id: Uuid) -> Result<u64, AppError> {
        let mut qb = QueryBuilder::<Postgres>::new("UPDATE cart_items ci SET license_tier_id = ");
        qb.push_bind(tier_id);
        qb.push(", updated_at = NOW() WHERE ci.beat_id = ").push_bind(beat_id);
        qb.push(" AND ");
        push_owner(&mut qb, owner);
        let result = qb.build().execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    pub async fn remove(&self, owner: &CartOwner, beat_id: Uuid) -> Result<u64, AppError> {
        let mut qb = QueryBuilder::<Postgres>::new("DELETE FROM cart_items ci WHERE ci.beat_id = ");
        qb.push_bind(beat_id);
        qb.push(" AND ");
        push_owner(&mut qb, owner);
        let result = qb.build().execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    pub async fn clear<'e, E>(&self, executor: E, owner: &CartOwner) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let mut qb = QueryBuilder::<Postgres>::new("DELETE FROM cart_items ci WHERE ");
        push_owner(&mut qb, owner);
        let result = qb.build().execute(executor).await?;
        Ok(result.rows_affected())
    }

    pub async fn reassign_to_user<'e, E>(&self, executor: E, item_id: Uuid, user_id: Uuid) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("UPDATE cart_items SET user_id = $2, session_id = NULL, updated_at = NOW() WHERE id = $1")
            .bind(item_id)
            .bind(user_id)
            .execute(executor)
            .await?;
        Ok(())
    }

    pub async fn delete_item<'e, E>(&self, executor: E, item_id: Uuid) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("DELETE FROM cart_items WHERE id = $1")
            .bind(item_id)
            .execute(executor)
            .await?;
        Ok(())
    }
}
