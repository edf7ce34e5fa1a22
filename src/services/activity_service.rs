// src/services/activity_service.rs

use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::{error::AppError, response::PageRequest},
    db::{ActivityRepository, CatalogRepository},
    models::{
        activity::{LikeState, Listener, PlayHistoryEntry},
        catalog::{Beat, BeatSummary},
    },
};

#[derive(Clone)]
pub struct ActivityService {
    repo: ActivityRepository,
    catalog_repo: CatalogRepository,
    pool: PgPool,
}

impl ActivityService {
    pub fn new(repo: ActivityRepository, catalog_repo: CatalogRepository, pool: PgPool) -> Self {
        Self {
            repo,
            catalog_repo,
            pool,
        }
    }

    /// Likes the beat, or takes the like back if the user already liked it.
    /// The beat's counter moves in the same transaction. Only beats on sale
    /// can gain likes; a like on a retired beat can still be removed.
    pub async fn toggle_like(&self, user_id: Uuid, beat_id: Uuid) -> Result<LikeState, AppError> {
        let mut tx = self.pool.begin().await?;

        let (liked, delta) = if self.repo.delete_like(&mut *tx, user_id, beat_id).await? {
            (false, -1)
        } else {
            self.catalog_repo
                .find_beat(&mut *tx, beat_id)
                .await?
                .filter(Beat::is_purchasable)
                .ok_or_else(|| AppError::not_found("Beat"))?;
            // a concurrent request may have inserted it first
            let inserted = self.repo.insert_like(&mut *tx, user_id, beat_id).await?;
            (true, if inserted { 1 } else { 0 })
        };

        let likes_count = self.repo.adjust_likes_count(&mut *tx, beat_id, delta).await?;

        tx.commit().await?;
        tracing::debug!(user_id = %user_id, beat_id = %beat_id, liked, likes_count, "like toggled");
        Ok(LikeState { liked, likes_count })
    }

    pub async fn liked_beats(&self, user_id: Uuid, page: PageRequest) -> Result<(Vec<BeatSummary>, i64), AppError> {
        self.repo.liked_beats(user_id, page).await
    }

    /// Counts the play and keeps it in the listener's history.
    pub async fn record_play(&self, beat_id: Uuid, listener: &Listener, duration_seconds: i32) -> Result<i64, AppError> {
        let mut tx = self.pool.begin().await?;

        let plays = self
            .catalog_repo
            .increment_plays(&mut *tx, beat_id)
            .await?
            .ok_or_else(|| AppError::not_found("Beat"))?;
        self.repo
            .insert_play(&mut *tx, beat_id, listener, duration_seconds.max(0))
            .await?;

        tx.commit().await?;
        Ok(plays)
    }

    pub async fn play_history(
        &self,
        user_id: Uuid,
        page: PageRequest,
    ) -> Result<(Vec<PlayHistoryEntry>, i64), AppError> {
        self.repo.play_history(user_id, page).await
    }
}
