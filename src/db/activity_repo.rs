// src/db/activity_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::{error::AppError, response::PageRequest},
    db::catalog_repo::{PUBLIC_BEATS, SUMMARY_SELECT},
    models::{
        activity::{Listener, PlayHistoryEntry},
        catalog::BeatSummary,
    },
};

// Likes and listening history.
#[derive(Clone)]
pub struct ActivityRepository {
    pool: PgPool,
}

impl ActivityRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Returns false when the like was already there.
    pub async fn insert_like<'e, E>(&self, executor: E, user_id: Uuid, beat_id: Uuid) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            "INSERT INTO beat_likes (user_id, beat_id) VALUES ($1, $2) ON CONFLICT (user_id, beat_id) DO NOTHING",
        )
        .bind(user_id)
        .bind(beat_id)
        .execute(executor)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn delete_like<'e, E>(&self, executor: E, user_id: Uuid, beat_id: Uuid) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM beat_likes WHERE user_id = $1 AND beat_id = $2")
            .bind(user_id)
            .bind(beat_id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Moves the beat's counter by `delta`, never below zero.
    pub async fn adjust_likes_count<'e, E>(&self, executor: E, beat_id: Uuid, delta: i64) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let count = sqlx::query_scalar::<_, i64>(
            "UPDATE beats SET likes_count = GREATEST(likes_count + $2, 0) WHERE id = $1 RETURNING likes_count",
        )
        .bind(beat_id)
        .bind(delta)
        .fetch_optional(executor)
        .await?
        .ok_or_else(|| AppError::not_found("Beat"))?;
        Ok(count)
    }

    pub async fn liked_beats(&self, user_id: Uuid, page: PageRequest) -> Result<(Vec<BeatSummary>, i64), AppError> {
        let total = sqlx::query_scalar::<_, i64>(&format!(
            "SELECT COUNT(*) FROM beats b JOIN beat_likes bl ON bl.beat_id = b.id {} AND bl.user_id = $1",
            PUBLIC_BEATS
        ))
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        let sql = format!(
            "{} JOIN beat_likes bl ON bl.beat_id = b.id {} AND bl.user_id = $1 ORDER BY bl.created_at DESC LIMIT $2 OFFSET $3",
            SUMMARY_SELECT, PUBLIC_BEATS
        );
        let beats = sqlx::query_as::<_, BeatSummary>(&sql)
            .bind(user_id)
            .bind(page.limit)
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await?;
        Ok((beats, total))
    }

    pub async fn insert_play<'e, E>(
        &self,
        executor: E,
        beat_id: Uuid,
        listener: &Listener,
        duration_seconds: i32,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            "INSERT INTO play_history (beat_id, user_id, session_id, duration_seconds) VALUES ($1, $2, $3, $4)",
        )
        .bind(beat_id)
        .bind(listener.user_id)
        .bind(&listener.session_id)
        .bind(duration_seconds)
        .execute(executor)
        .await?;
        Ok(())
    }

    pub async fn play_history(
        &self,
        user_id: Uuid,
        page: PageRequest,
    ) -> Result<(Vec<PlayHistoryEntry>, i64), AppError> {
        let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM play_history WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;

        let entries = sqlx::query_as::<_, PlayHistoryEntry>(
            r#"
            SELECT ph.id, ph.beat_id, b.title AS beat_title, b.cover_image,
                   p.display_name AS producer_name, p.username AS producer_username,
                   ph.duration_seconds, ph.played_at
            FROM play_history ph
            JOIN beats b ON b.id = ph.beat_id
            JOIN producers p ON p.id = b.producer_id
            WHERE ph.user_id = $1
            ORDER BY ph.played_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(user_id)
        .bind(page.limit)
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;
        Ok((entries, total))
    }
}
