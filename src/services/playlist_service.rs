// src/services/playlist_service.rs

use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{CatalogRepository, PlaylistRepository},
    models::playlists::{CreatePlaylistPayload, Playlist, PlaylistDetail, UpdatePlaylistPayload},
};

#[derive(Clone)]
pub struct PlaylistService {
    repo: PlaylistRepository,
    catalog_repo: CatalogRepository,
    pool: PgPool,
}

impl PlaylistService {
    pub fn new(repo: PlaylistRepository, catalog_repo: CatalogRepository, pool: PgPool) -> Self {
        Self {
            repo,
            catalog_repo,
            pool,
        }
    }

    pub async fn list(&self, user_id: Uuid) -> Result<Vec<Playlist>, AppError> {
        self.repo.list_for_user(user_id).await
    }

    /// Public playlists are open to anyone; private ones answer 403 to
    /// everyone but the owner.
    pub async fn get(&self, id: Uuid, viewer: Option<Uuid>) -> Result<PlaylistDetail, AppError> {
        let playlist = self
            .repo
            .find(id)
            .await?
            .ok_or_else(|| AppError::not_found("Playlist"))?;
        if !playlist.is_visible_to(viewer) {
            return Err(AppError::Forbidden("This playlist is private".into()));
        }
        self.detail(playlist).await
    }

    pub async fn create(&self, user_id: Uuid, payload: &CreatePlaylistPayload) -> Result<PlaylistDetail, AppError> {
        let playlist = self.repo.create(user_id, payload).await?;
        tracing::info!(playlist_id = %playlist.id, user_id = %user_id, "playlist created");
        Ok(PlaylistDetail {
            playlist,
            beats: Vec::new(),
        })
    }

    pub async fn update(
        &self,
        id: Uuid,
        user_id: Uuid,
        changes: &UpdatePlaylistPayload,
    ) -> Result<PlaylistDetail, AppError> {
        let playlist = self
            .repo
            .update(id, user_id, changes)
            .await?
            .ok_or_else(|| AppError::not_found("Playlist"))?;
        self.detail(playlist).await
    }

    pub async fn delete(&self, id: Uuid, user_id: Uuid) -> Result<(), AppError> {
        if !self.repo.delete(id, user_id).await? {
            return Err(AppError::not_found("Playlist"));
        }
        tracing::info!(playlist_id = %id, "playlist deleted");
        Ok(())
    }

    /// Appends a beat at the end of the owner's playlist.
    pub async fn add_beat(&self, id: Uuid, user_id: Uuid, beat_id: Uuid) -> Result<PlaylistDetail, AppError> {
        let mut tx = self.pool.begin().await?;

        self.repo
            .lock_owned(&mut *tx, id, user_id)
            .await?
            .ok_or_else(|| AppError::not_found("Playlist"))?;
        self.catalog_repo
            .find_beat(&mut *tx, beat_id)
            .await?
            .ok_or_else(|| AppError::not_found("Beat"))?;

        self.repo.append_beat(&mut *tx, id, beat_id).await?;
        let playlist = self.repo.adjust_beats_count(&mut *tx, id, 1).await?;

        tx.commit().await?;
        self.detail(playlist).await
    }

    pub async fn remove_beat(&self, id: Uuid, user_id: Uuid, beat_id: Uuid) -> Result<PlaylistDetail, AppError> {
        let mut tx = self.pool.begin().await?;

        self.repo
            .lock_owned(&mut *tx, id, user_id)
            .await?
            .ok_or_else(|| AppError::not_found("Playlist"))?;
        if !self.repo.remove_beat(&mut *tx, id, beat_id).await? {
            return Err(AppError::NotFound("The beat is not in this playlist".into()));
        }
        let playlist = self.repo.adjust_beats_count(&mut *tx, id, -1).await?;

        tx.commit().await?;
        self.detail(playlist).await
    }

    async fn detail(&self, playlist: Playlist) -> Result<PlaylistDetail, AppError> {
        let beats = self.repo.beats(playlist.id).await?;
        Ok(PlaylistDetail { playlist, beats })
    }
}
