// src/services/catalog_service.rs

use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::{
        db_utils::slugify,
        error::AppError,
        filter::{FilterExpr, FilterValue},
        response::PageRequest,
    },
    db::{
        catalog_repo::{BeatColumn, BeatSort},
        CatalogRepository, UserRepository,
    },
    models::{
        auth::ProducerProfile,
        catalog::{
            BeatDetail, BeatStatus, BeatSummary, CreateBeatPayload, CreateGenrePayload, Genre,
            LicenseTier, TierInput, UpdateBeatPayload,
        },
    },
};

pub const TRENDING_DEFAULT: i64 = 10;
pub const TRENDING_MAX: i64 = 50;

/// Listing criteria as they arrive from the query string.
#[derive(Debug, Clone, Default)]
pub struct BeatSearch {
    pub genre_id: Option<Uuid>,
    pub producer_id: Option<Uuid>,
    pub bpm_min: Option<i32>,
    pub bpm_max: Option<i32>,
    pub keys: Vec<String>,
    pub search: Option<String>,
}

impl BeatSearch {
    pub fn to_filters(&self) -> Vec<FilterExpr<BeatColumn>> {
        let mut filters = Vec::new();
        if let Some(genre_id) = self.genre_id {
            filters.push(FilterExpr::Equals(BeatColumn::Genre, FilterValue::Uuid(genre_id)));
        }
        if let Some(producer_id) = self.producer_id {
            filters.push(FilterExpr::Equals(BeatColumn::Producer, FilterValue::Uuid(producer_id)));
        }
        if self.bpm_min.is_some() || self.bpm_max.is_some() {
            filters.push(FilterExpr::Range {
                column: BeatColumn::Bpm,
                min: self.bpm_min.map(|v| FilterValue::Int(v.into())),
                max: self.bpm_max.map(|v| FilterValue::Int(v.into())),
            });
        }
        if !self.keys.is_empty() {
            filters.push(FilterExpr::InSet(
                BeatColumn::MusicalKey,
                self.keys.iter().cloned().map(FilterValue::Text).collect(),
            ));
        }
        if let Some(search) = self.search.as_deref().filter(|s| !s.trim().is_empty()) {
            filters.push(FilterExpr::Like(
                vec![
                    BeatColumn::Title,
                    BeatColumn::Description,
                    BeatColumn::Tags,
                    BeatColumn::ProducerName,
                ],
                search.to_string(),
            ));
        }
        filters
    }
}

#[derive(Clone)]
pub struct CatalogService {
    repo: CatalogRepository,
    user_repo: UserRepository,
    pool: PgPool,
}

impl CatalogService {
    pub fn new(repo: CatalogRepository, user_repo: UserRepository, pool: PgPool) -> Self {
        Self { repo, user_repo, pool }
    }

    // --- GENRES ---

    pub async fn list_genres(&self) -> Result<Vec<Genre>, AppError> {
        self.repo.list_active_genres().await
    }

    pub async fn create_genre(&self, payload: &CreateGenrePayload) -> Result<Genre, AppError> {
        let slug = slugify(&payload.name);
        if slug.is_empty() {
            return Err(AppError::BadRequest("Genre name must contain letters or digits".into()));
        }
        self.repo.create_genre(payload, &slug).await
    }

    // --- PUBLIC CATALOG ---

    pub async fn list_beats(
        &self,
        search: &BeatSearch,
        sort: BeatSort,
        page: PageRequest,
    ) -> Result<(Vec<BeatSummary>, i64), AppError> {
        if let (Some(min), Some(max)) = (search.bpm_min, search.bpm_max) {
            if min > max {
                return Err(AppError::BadRequest("bpmMin cannot exceed bpmMax".into()));
            }
        }
        self.repo.list_public_beats(&search.to_filters(), sort, page).await
    }

    pub async fn trending(&self, limit: Option<i64>) -> Result<Vec<BeatSummary>, AppError> {
        let limit = limit.unwrap_or(TRENDING_DEFAULT).clamp(1, TRENDING_MAX);
        self.repo.trending(limit).await
    }

    /// Sold-out exclusives stay visible only to the buyer who holds them.
    pub async fn get_beat(&self, id: Uuid, viewer: Option<Uuid>) -> Result<BeatDetail, AppError> {
        let beat = self
            .repo
            .find_summary(id)
            .await?
            .ok_or_else(|| AppError::not_found("Beat"))?;

        if beat.beat.is_exclusive_sold {
            let is_owner = match viewer {
                Some(user_id) => self.repo.has_exclusive_purchase(user_id, id).await?,
                None => false,
            };
            if !is_owner {
                return Err(AppError::NotFound("This beat is no longer available".into()));
            }
        } else if beat.beat.status != BeatStatus::Active {
            return Err(AppError::not_found("Beat"));
        }

        let license_tiers = self.repo.list_tiers(&self.pool, id, true).await?;
        Ok(BeatDetail { beat, license_tiers })
    }

    pub async fn producer_beats(
        &self,
        username: &str,
        page: PageRequest,
    ) -> Result<(ProducerProfile, Vec<BeatSummary>, i64), AppError> {
        let producer = self
            .user_repo
            .find_producer_by_username(username)
            .await?
            .ok_or_else(|| AppError::not_found("Producer"))?;

        let search = BeatSearch {
            producer_id: Some(producer.id),
            ..Default::default()
        };
        let (beats, total) = self
            .repo
            .list_public_beats(&search.to_filters(), BeatSort::Newest, page)
            .await?;
        Ok((producer, beats, total))
    }

    // --- PRODUCER MANAGEMENT ---

    async fn producer_for(&self, user_id: Uuid) -> Result<ProducerProfile, AppError> {
        self.user_repo
            .find_producer_by_user(user_id)
            .await?
            .ok_or_else(|| AppError::Forbidden("A producer profile is required".into()))
    }

    /// Beat and tiers are written together or not at all.
    pub async fn create_beat(&self, user_id: Uuid, payload: &CreateBeatPayload) -> Result<BeatDetail, AppError> {
        let producer = self.producer_for(user_id).await?;

        let status = payload.status.unwrap_or(BeatStatus::Active);
        if !matches!(status, BeatStatus::Draft | BeatStatus::Active) {
            return Err(AppError::BadRequest("New beats must be draft or active".into()));
        }
        let slug = slugify(&payload.title);
        if slug.is_empty() {
            return Err(AppError::BadRequest("Title must contain letters or digits".into()));
        }

        let mut tx = self.pool.begin().await?;

        let beat = self
            .repo
            .create_beat(
                &mut *tx,
                producer.id,
                &slug,
                payload.title.trim(),
                payload.genre_id,
                payload.description.as_deref(),
                payload.bpm,
                payload.musical_key.trim(),
                payload.duration_seconds,
                payload.cover_image.as_deref(),
                payload.preview_audio_url.as_deref(),
                &payload.tags,
                status,
                payload.is_featured,
            )
            .await?;

        let mut tiers = Vec::with_capacity(payload.license_tiers.len());
        for (idx, tier) in payload.license_tiers.iter().enumerate() {
            tiers.push(self.repo.upsert_tier(&mut *tx, beat.id, tier, idx as i32 + 1).await?);
        }

        tx.commit().await?;
        tracing::info!(beat_id = %beat.id, producer_id = %producer.id, tiers = tiers.len(), "beat created");

        self.detail_for_owner(beat.id).await
    }

    async fn owned_beat(&self, user_id: Uuid, beat_id: Uuid) -> Result<(ProducerProfile, BeatSummary), AppError> {
        let producer = self.producer_for(user_id).await?;
        let beat = self
            .repo
            .find_summary(beat_id)
            .await?
            .ok_or_else(|| AppError::not_found("Beat"))?;
        if beat.beat.producer_id != producer.id {
            return Err(AppError::Forbidden("You can only manage your own beats".into()));
        }
        Ok((producer, beat))
    }

    pub async fn update_beat(
        &self,
        user_id: Uuid,
        beat_id: Uuid,
        changes: &UpdateBeatPayload,
    ) -> Result<BeatDetail, AppError> {
        let (_, current) = self.owned_beat(user_id, beat_id).await?;
        if current.beat.is_exclusive_sold {
            return Err(AppError::Conflict("A beat sold exclusively can no longer be edited".into()));
        }
        if let Some(status) = changes.status {
            if !status.is_producer_settable() {
                return Err(AppError::BadRequest("That status cannot be set directly".into()));
            }
        }

        self.repo.update_beat(&self.pool, beat_id, changes).await?;
        self.detail_for_owner(beat_id).await
    }

    pub async fn replace_tiers(
        &self,
        user_id: Uuid,
        beat_id: Uuid,
        tiers: &[TierInput],
    ) -> Result<Vec<LicenseTier>, AppError> {
        let (_, current) = self.owned_beat(user_id, beat_id).await?;
        if current.beat.is_exclusive_sold {
            return Err(AppError::Conflict("A beat sold exclusively can no longer be edited".into()));
        }

        let mut tx = self.pool.begin().await?;
        for (idx, tier) in tiers.iter().enumerate() {
            self.repo.upsert_tier(&mut *tx, beat_id, tier, idx as i32 + 1).await?;
        }
        let all = self.repo.list_tiers(&mut *tx, beat_id, false).await?;
        tx.commit().await?;
        Ok(all)
    }

    pub async fn delete_beat(&self, user_id: Uuid, beat_id: Uuid) -> Result<(), AppError> {
        self.owned_beat(user_id, beat_id).await?;
        if !self.repo.soft_delete(beat_id).await? {
            return Err(AppError::not_found("Beat"));
        }
        tracing::info!(beat_id = %beat_id, "beat deleted");
        Ok(())
    }

    /// Owner view: every tier, enabled or not.
    async fn detail_for_owner(&self, beat_id: Uuid) -> Result<BeatDetail, AppError> {
        let beat = self
            .repo
            .find_summary(beat_id)
            .await?
            .ok_or_else(|| AppError::not_found("Beat"))?;
        let license_tiers = self.repo.list_tiers(&self.pool, beat_id, false).await?;
        Ok(BeatDetail { beat, license_tiers })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_search_has_no_filters() {
        assert!(BeatSearch::default().to_filters().is_empty());
    }

    #[test]
    fn search_maps_each_criterion_to_one_filter() {
        let genre = Uuid::new_v4();
        let search = BeatSearch {
            genre_id: Some(genre),
            bpm_min: Some(120),
            keys: vec!["Am".into(), "F#m".into()],
            search: Some("dark".into()),
            ..Default::default()
        };
        let filters = search.to_filters();
        assert_eq!(filters.len(), 4);
        assert_eq!(filters[0], FilterExpr::Equals(BeatColumn::Genre, FilterValue::Uuid(genre)));
        assert_eq!(
            filters[1],
            FilterExpr::Range {
                column: BeatColumn::Bpm,
                min: Some(FilterValue::Int(120)),
                max: None,
            }
        );
        assert!(matches!(&filters[2], FilterExpr::InSet(BeatColumn::MusicalKey, v) if v.len() == 2));
        assert!(matches!(&filters[3], FilterExpr::Like(cols, s) if cols.len() == 4 && s == "dark"));
    }

    #[test]
    fn blank_search_text_is_ignored() {
        let search = BeatSearch {
            search: Some("   ".into()),
            ..Default::default()
        };
        assert!(search.to_filters().is_empty());
    }
}
