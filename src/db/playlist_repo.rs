// src/db/playlist_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::{db_utils::conflict_on_unique, error::AppError},
    db::catalog_repo::{PUBLIC_BEATS, SUMMARY_SELECT},
    models::{
        catalog::BeatSummary,
        playlists::{CreatePlaylistPayload, Playlist, UpdatePlaylistPayload, DEFAULT_PLAYLIST_COLOR},
    },
};

const PLAYLIST_COLUMNS: &str =
    "id, user_id, name, description, color, is_public, beats_count, created_at, updated_at";

#[derive(Clone)]
pub struct PlaylistRepository {
    pool: PgPool,
}

impl PlaylistRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Playlist>, AppError> {
        let sql = format!(
            "SELECT {} FROM playlists WHERE user_id = $1 ORDER BY updated_at DESC",
            PLAYLIST_COLUMNS
        );
        let playlists = sqlx::query_as::<_, Playlist>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(playlists)
    }

    pub async fn find(&self, id: Uuid) -> Result<Option<Playlist>, AppError> {
        let sql = format!("SELECT {} FROM playlists WHERE id = $1", PLAYLIST_COLUMNS);
        let playlist = sqlx::query_as::<_, Playlist>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(playlist)
    }

    /// Locks the playlist for its owner; `None` for anyone else.
    pub async fn lock_owned<'e, E>(&self, executor: E, id: Uuid, user_id: Uuid) -> Result<Option<Playlist>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            "SELECT {} FROM playlists WHERE id = $1 AND user_id = $2 FOR UPDATE",
            PLAYLIST_COLUMNS
        );
        let playlist = sqlx::query_as::<_, Playlist>(&sql)
            .bind(id)
            .bind(user_id)
            .fetch_optional(executor)
            .await?;
        Ok(playlist)
    }

    pub async fn create(&self, user_id: Uuid, payload: &CreatePlaylistPayload) -> Result<Playlist, AppError> {
        let sql = format!(
            r#"
            INSERT INTO playlists (user_id, name, description, color, is_public)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {}
            "#,
            PLAYLIST_COLUMNS
        );
        let playlist = sqlx::query_as::<_, Playlist>(&sql)
            .bind(user_id)
            .bind(payload.name.trim())
            .bind(&payload.description)
            .bind(payload.color.as_deref().unwrap_or(DEFAULT_PLAYLIST_COLOR))
            .bind(payload.is_public)
            .fetch_one(&self.pool)
            .await?;
        Ok(playlist)
    }

    pub async fn update(
        &self,
        id: Uuid,
        user_id: Uuid,
        changes: &UpdatePlaylistPayload,
    ) -> Result<Option<Playlist>, AppError> {
        let sql = format!(
            r#"
            UPDATE playlists SET
                name = COALESCE($3, name),
                description = COALESCE($4, description),
                color = COALESCE($5, color),
                is_public = COALESCE($6, is_public),
                updated_at = NOW()
            WHERE id = $1 AND user_id = $2
            RETURNING {}
            "#,
            PLAYLIST_COLUMNS
        );
        let playlist = sqlx::query_as::<_, Playlist>(&sql)
            .bind(id)
            .bind(user_id)
            .bind(changes.name.as_deref().map(str::trim))
            .bind(&changes.description)
            .bind(&changes.color)
            .bind(changes.is_public)
            .fetch_optional(&self.pool)
            .await?;
        Ok(playlist)
    }

    pub async fn delete(&self, id: Uuid, user_id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM playlists WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Beats still on sale, in playlist order.
    pub async fn beats(&self, playlist_id: Uuid) -> Result<Vec<BeatSummary>, AppError> {
        let sql = format!(
            "{} JOIN playlist_beats pb ON pb.beat_id = b.id {} AND pb.playlist_id = $1 ORDER BY pb.position",
            SUMMARY_SELECT, PUBLIC_BEATS
        );
        let beats = sqlx::query_as::<_, BeatSummary>(&sql)
            .bind(playlist_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(beats)
    }

    /// Appends after the current last position. The caller holds the
    /// playlist lock.
    pub async fn append_beat<'e, E>(&self, executor: E, playlist_id: Uuid, beat_id: Uuid) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            r#"
            INSERT INTO playlist_beats (playlist_id, beat_id, position)
            SELECT $1, $2, COALESCE(MAX(position), 0) + 1 FROM playlist_beats WHERE playlist_id = $1
            "#,
        )
        .bind(playlist_id)
        .bind(beat_id)
        .execute(executor)
        .await
        .map_err(|e| conflict_on_unique(e, "The beat is already in this playlist"))?;
        Ok(())
    }

    pub async fn remove_beat<'e, E>(&self, executor: E, playlist_id: Uuid, beat_id: Uuid) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM playlist_beats WHERE playlist_id = $1 AND beat_id = $2")
            .bind(playlist_id)
            .bind(beat_id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn adjust_beats_count<'e, E>(&self, executor: E, playlist_id: Uuid, delta: i32) -> Result<Playlist, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            r#"
            UPDATE playlists
            SET beats_count = GREATEST(beats_count + $2, 0), updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            PLAYLIST_COLUMNS
        );
        let playlist = sqlx::query_as::<_, Playlist>(&sql)
            .bind(playlist_id)
            .bind(delta)
            .fetch_one(executor)
            .await?;
        Ok(playlist)
    }
}
