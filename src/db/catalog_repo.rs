// src/db/catalog_repo.rs

use sqlx::{Executor, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    common::{
        db_utils::conflict_on_unique,
        error::AppError,
        filter::{push_filters, FilterColumn, FilterExpr},
        response::PageRequest,
    },
    models::catalog::{
        Beat, BeatStatus, BeatSummary, CreateGenrePayload, Genre, LicenseTier, TierInput,
        UpdateBeatPayload,
    },
};

/// Columns the public listing can filter on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BeatColumn {
    Genre,
    Producer,
    Bpm,
    MusicalKey,
    Title,
    Description,
    Tags,
    ProducerName,
}

impl FilterColumn for BeatColumn {
    fn sql(&self) -> &'static str {
        match self {
            BeatColumn::Genre => "b.genre_id",
            BeatColumn::Producer => "b.producer_id",
            BeatColumn::Bpm => "b.bpm",
            BeatColumn::MusicalKey => "b.musical_key",
            BeatColumn::Title => "b.title",
            BeatColumn::Description => "b.description",
            BeatColumn::Tags => "array_to_string(b.tags, ' ')",
            BeatColumn::ProducerName => "p.display_name",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub enum BeatSort {
    #[default]
    Newest,
    Oldest,
    Popular,
    PriceAsc,
    PriceDesc,
    Title,
}

impl BeatSort {
    fn order_by(self) -> &'static str {
        match self {
            BeatSort::Newest => " ORDER BY b.published_at DESC NULLS LAST, b.created_at DESC",
            BeatSort::Oldest => " ORDER BY b.created_at ASC",
            BeatSort::Popular => " ORDER BY b.plays_count DESC, b.created_at DESC",
            BeatSort::PriceAsc => " ORDER BY starting_price ASC NULLS LAST, b.created_at DESC",
            BeatSort::PriceDesc => " ORDER BY starting_price DESC NULLS LAST, b.created_at DESC",
            BeatSort::Title => " ORDER BY b.title ASC",
        }
    }
}

pub(crate) const SUMMARY_SELECT: &str = r#"
    SELECT b.*,
           p.display_name AS producer_name,
           p.username AS producer_username,
           g.name AS genre_name,
           (SELECT MIN(lt.price) FROM license_tiers lt
             WHERE lt.beat_id = b.id AND lt.is_enabled) AS starting_price
    FROM beats b
    JOIN producers p ON p.id = b.producer_id
    LEFT JOIN genres g ON g.id = b.genre_id
"#;

/// Live, unsold, not deleted.
pub(crate) const PUBLIC_BEATS: &str =
    " WHERE b.deleted_at IS NULL AND b.status = 'active' AND b.is_exclusive_sold = FALSE";

const TIER_COLUMNS: &str = "id, beat_id, tier_type, name, price, description, included_files, is_exclusive, is_enabled, sort_order, created_at, updated_at";

#[derive(Clone)]
pub struct CatalogRepository {
    pool: PgPool,
}

impl CatalogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // ---
    // Genres
    // ---

    pub async fn list_active_genres(&self) -> Result<Vec<Genre>, AppError> {
        let genres = sqlx::query_as::<_, Genre>(
            "SELECT id, name, slug, color, sort_order, is_active, created_at FROM genres WHERE is_active ORDER BY sort_order, name",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(genres)
    }

    pub async fn create_genre(&self, payload: &CreateGenrePayload, slug: &str) -> Result<Genre, AppError> {
        sqlx::query_as::<_, Genre>(
            r#"
            INSERT INTO genres (name, slug, color, sort_order)
            VALUES ($1, $2, $3, $4)
            RETURNING id, name, slug, color, sort_order, is_active, created_at
            "#,
        )
        .bind(payload.name.trim())
        .bind(slug)
        .bind(&payload.color)
        .bind(payload.sort_order)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "Genre already exists"))
    }

    // ---
    // Public listing
    // ---

    pub async fn list_public_beats(
        &self,
        filters: &[FilterExpr<BeatColumn>],
        sort: BeatSort,
        page: PageRequest,
    ) -> Result<(Vec<BeatSummary>, i64), AppError> {
        let mut count_qb = QueryBuilder::<Postgres>::new(
            "SELECT COUNT(*) FROM beats b JOIN producers p ON p.id = b.producer_id",
        );
        count_qb.push(PUBLIC_BEATS);
        push_filters(&mut count_qb, filters);
        let total: i64 = count_qb.build_query_scalar().fetch_one(&self.pool).await?;

        let mut qb = QueryBuilder::<Postgres>::new(SUMMARY_SELECT);
        qb.push(PUBLIC_BEATS);
        push_filters(&mut qb, filters);
        qb.push(sort.order_by());
        qb.push(" LIMIT ").push_bind(page.limit);
        qb.push(" OFFSET ").push_bind(page.offset());

        let beats = qb.build_query_as::<BeatSummary>().fetch_all(&self.pool).await?;
        Ok((beats, total))
    }

    pub async fn trending(&self, limit: i64) -> Result<Vec<BeatSummary>, AppError> {
        let mut qb = QueryBuilder::<Postgres>::new(SUMMARY_SELECT);
        qb.push(PUBLIC_BEATS);
        qb.push(BeatSort::Popular.order_by());
        qb.push(" LIMIT ").push_bind(limit);
        let beats = qb.build_query_as::<BeatSummary>().fetch_all(&self.pool).await?;
        Ok(beats)
    }

    /// Any non-deleted beat, whatever its status.
    pub async fn find_summary(&self, id: Uuid) -> Result<Option<BeatSummary>, AppError> {
        let sql = format!("{} WHERE b.id = $1 AND b.deleted_at IS NULL", SUMMARY_SELECT);
        let beat = sqlx::query_as::<_, BeatSummary>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(beat)
    }

    pub async fn increment_plays<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<i64>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let plays = sqlx::query_scalar::<_, i64>(
            "UPDATE beats SET plays_count = plays_count + 1 WHERE id = $1 AND deleted_at IS NULL RETURNING plays_count",
        )
        .bind(id)
        .fetch_optional(executor)
        .await?;
        Ok(plays)
    }

    pub async fn has_exclusive_purchase(&self, user_id: Uuid, beat_id: Uuid) -> Result<bool, AppError> {
        let owned = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM user_purchases up
                JOIN license_tiers lt ON lt.id = up.license_tier_id
                WHERE up.user_id = $1 AND up.beat_id = $2 AND lt.is_exclusive
            )
            "#,
        )
        .bind(user_id)
        .bind(beat_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(owned)
    }

    // ---
    // Beats and tiers (transaction aware)
    // ---

    pub async fn find_beat<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<Beat>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let beat = sqlx::query_as::<_, Beat>("SELECT * FROM beats WHERE id = $1 AND deleted_at IS NULL")
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(beat)
    }

    pub async fn find_tier<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<LicenseTier>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!("SELECT {} FROM license_tiers WHERE id = $1", TIER_COLUMNS);
        let tier = sqlx::query_as::<_, LicenseTier>(&sql)
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(tier)
    }

    pub async fn list_tiers<'e, E>(
        &self,
        executor: E,
        beat_id: Uuid,
        enabled_only: bool,
    ) -> Result<Vec<LicenseTier>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            "SELECT {} FROM license_tiers WHERE beat_id = $1 AND ($2 = FALSE OR is_enabled) ORDER BY sort_order, price",
            TIER_COLUMNS
        );
        let tiers = sqlx::query_as::<_, LicenseTier>(&sql)
            .bind(beat_id)
            .bind(enabled_only)
            .fetch_all(executor)
            .await?;
        Ok(tiers)
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn create_beat<'e, E>(
        &self,
        executor: E,
        producer_id: Uuid,
        slug: &str,
        title: &str,
        genre_id: Option<Uuid>,
        description: Option<&str>,
        bpm: i32,
        musical_key: &str,
        duration_seconds: Option<i32>,
        cover_image: Option<&str>,
        preview_audio_url: Option<&str>,
        tags: &[String],
        status: BeatStatus,
        is_featured: bool,
    ) -> Result<Beat, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Beat>(
            r#"
            INSERT INTO beats (
                producer_id, slug, title, genre_id, description, bpm, musical_key,
                duration_seconds, cover_image, preview_audio_url, tags, status, is_featured,
                published_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13,
                    CASE WHEN $12 = 'active'::beat_status THEN NOW() END)
            RETURNING *
            "#,
        )
        .bind(producer_id)
        .bind(slug)
        .bind(title)
        .bind(genre_id)
        .bind(description)
        .bind(bpm)
        .bind(musical_key)
        .bind(duration_seconds)
        .bind(cover_image)
        .bind(preview_audio_url)
        .bind(tags)
        .bind(status)
        .bind(is_featured)
        .fetch_one(executor)
        .await
        .map_err(|e| conflict_on_unique(e, "You already have a beat with this title"))
    }

    /// One tier per tier type: an existing tier of the same type is rewritten.
    pub async fn upsert_tier<'e, E>(
        &self,
        executor: E,
        beat_id: Uuid,
        tier: &TierInput,
        sort_order: i32,
    ) -> Result<LicenseTier, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            r#"
            INSERT INTO license_tiers (
                beat_id, tier_type, name, price, description, included_files,
                is_exclusive, is_enabled, sort_order
            )
            VALUES ($1, $2, $3, $4, $5, $6, $2 = 'exclusive'::tier_type, $7, $8)
            ON CONFLICT (beat_id, tier_type) DO UPDATE SET
                name = EXCLUDED.name,
                price = EXCLUDED.price,
                description = EXCLUDED.description,
                included_files = EXCLUDED.included_files,
                is_enabled = EXCLUDED.is_enabled,
                sort_order = EXCLUDED.sort_order,
                updated_at = NOW()
            RETURNING {}
            "#,
            TIER_COLUMNS
        );
        let tier = sqlx::query_as::<_, LicenseTier>(&sql)
            .bind(beat_id)
            .bind(tier.tier_type)
            .bind(&tier.name)
            .bind(tier.price)
            .bind(&tier.description)
            .bind(&tier.included_files)
            .bind(tier.is_enabled)
            .bind(tier.sort_order.unwrap_or(sort_order))
            .fetch_one(executor)
            .await?;
        Ok(tier)
    }

    pub async fn update_beat<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        changes: &UpdateBeatPayload,
    ) -> Result<Beat, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Beat>(
            r#"
            UPDATE beats SET
                title = COALESCE($2, title),
                genre_id = COALESCE($3, genre_id),
                description = COALESCE($4, description),
                bpm = COALESCE($5, bpm),
                musical_key = COALESCE($6, musical_key),
                duration_seconds = COALESCE($7, duration_seconds),
                cover_image = COALESCE($8, cover_image),
                preview_audio_url = COALESCE($9, preview_audio_url),
                tags = COALESCE($10, tags),
                status = COALESCE($11, status),
                is_featured = COALESCE($12, is_featured),
                published_at = CASE
                    WHEN published_at IS NULL AND $11 = 'active'::beat_status THEN NOW()
                    ELSE published_at
                END,
                updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&changes.title)
        .bind(changes.genre_id)
        .bind(&changes.description)
        .bind(changes.bpm)
        .bind(&changes.musical_key)
        .bind(changes.duration_seconds)
        .bind(&changes.cover_image)
        .bind(&changes.preview_audio_url)
        .bind(&changes.tags)
        .bind(changes.status)
        .bind(changes.is_featured)
        .fetch_optional(executor)
        .await?
        .ok_or_else(|| AppError::not_found("Beat"))
    }

    pub async fn soft_delete(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE beats
            SET deleted_at = NOW(),
                status = CASE WHEN is_exclusive_sold THEN status ELSE 'archived'::beat_status END,
                updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Locks the beat row and reports whether its exclusive rights are gone.
    pub async fn lock_exclusive_sold<'e, E>(&self, executor: E, beat_id: Uuid) -> Result<Option<bool>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sold = sqlx::query_scalar::<_, bool>("SELECT is_exclusive_sold FROM beats WHERE id = $1 FOR UPDATE")
            .bind(beat_id)
            .fetch_optional(executor)
            .await?;
        Ok(sold)
    }

    /// Takes the beat off the market once its exclusive rights are sold.
    pub async fn mark_exclusive_sold<'e, E>(&self, executor: E, beat_id: Uuid) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            r#"
            UPDATE beats
            SET is_exclusive_sold = TRUE, status = 'sold_exclusive', updated_at = NOW()
            WHERE id = $1 AND is_exclusive_sold = FALSE
            "#,
        )
        .bind(beat_id)
        .execute(executor)
        .await?;
        Ok(result.rows_affected())
    }
}
