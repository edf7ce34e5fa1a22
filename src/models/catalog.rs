// src/models/catalog.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Genre {
    pub id: Uuid,
    #[schema(example = "Trap")]
    pub name: String,
    #[schema(example = "trap")]
    pub slug: String,
    pub color: Option<String>,
    pub sort_order: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "beat_status", rename_all = "snake_case")]
#[serde(rename_all = "camelCase")]
pub enum BeatStatus {
    Draft,
    Active,
    Archived,
    SoldExclusive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "tier_type", rename_all = "snake_case")]
#[serde(rename_all = "camelCase")]
pub enum TierType {
    Mp3,
    Wav,
    Stems,
    Exclusive,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Beat {
    pub id: Uuid,
    pub producer_id: Uuid,
    pub genre_id: Option<Uuid>,
    #[schema(example = "Midnight Drive")]
    pub title: String,
    pub slug: String,
    pub description: Option<String>,
    #[schema(example = 140)]
    pub bpm: i32,
    #[schema(example = "Am")]
    pub musical_key: String,
    pub duration_seconds: Option<i32>,
    pub cover_image: Option<String>,
    pub preview_audio_url: Option<String>,
    pub tags: Vec<String>,
    pub plays_count: i64,
    pub likes_count: i64,
    pub is_exclusive_sold: bool,
    pub status: BeatStatus,
    pub is_featured: bool,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing)]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Beat {
    /// A beat can enter a cart or an order only while it is live and its
    /// exclusive rights are unsold.
    pub fn is_purchasable(&self) -> bool {
        self.deleted_at.is_none() && self.status == BeatStatus::Active && !self.is_exclusive_sold
    }
}

/// Listing row: the beat plus the names a catalog card shows.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BeatSummary {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub beat: Beat,
    pub producer_name: String,
    pub producer_username: String,
    pub genre_name: Option<String>,
    /// Cheapest enabled tier price, if any tier is on sale.
    pub starting_price: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LicenseTier {
    pub id: Uuid,
    pub beat_id: Uuid,
    pub tier_type: TierType,
    #[schema(example = "MP3 Lease")]
    pub name: String,
    #[schema(example = "29.99")]
    pub price: Decimal,
    pub description: Option<String>,
    pub included_files: Vec<String>,
    pub is_exclusive: bool,
    pub is_enabled: bool,
    pub sort_order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BeatDetail {
    #[serde(flatten)]
    pub beat: BeatSummary,
    pub license_tiers: Vec<LicenseTier>,
}

/// Picks the tier a cart line defaults to when the buyer names none.
pub fn cheapest_enabled_tier(tiers: &[LicenseTier]) -> Option<&LicenseTier> {
    tiers
        .iter()
        .filter(|t| t.is_enabled)
        .min_by(|a, b| a.price.cmp(&b.price).then(a.sort_order.cmp(&b.sort_order)))
}

// ---
// Payloads
// ---

fn validate_not_negative(val: &Decimal) -> Result<(), ValidationError> {
    if val.is_sign_negative() {
        let mut err = ValidationError::new("range");
        err.message = Some("Price cannot be negative.".into());
        return Err(err);
    }
    Ok(())
}

fn validate_unique_tier_types(tiers: &[TierInput]) -> Result<(), ValidationError> {
    let mut seen = Vec::with_capacity(tiers.len());
    for tier in tiers {
        if seen.contains(&tier.tier_type) {
            let mut err = ValidationError::new("duplicate_tier");
            err.message = Some("Each tier type may appear only once.".into());
            return Err(err);
        }
        seen.push(tier.tier_type);
    }
    Ok(())
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateGenrePayload {
    #[validate(length(min = 1, max = 50, message = "Name is required."))]
    #[schema(example = "Drill")]
    pub name: String,
    pub color: Option<String>,
    #[serde(default)]
    pub sort_order: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TierInput {
    pub tier_type: TierType,

    #[validate(length(min = 1, max = 100, message = "Tier name is required."))]
    #[schema(example = "WAV Lease")]
    pub name: String,

    #[validate(custom(function = "validate_not_negative"))]
    #[schema(example = "49.99")]
    pub price: Decimal,

    pub description: Option<String>,

    #[serde(default)]
    pub included_files: Vec<String>,

    #[serde(default = "default_true")]
    pub is_enabled: bool,

    pub sort_order: Option<i32>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateBeatPayload {
    #[validate(length(min = 1, max = 255, message = "Title is required."))]
    pub title: String,

    pub genre_id: Option<Uuid>,
    pub description: Option<String>,

    #[validate(range(min = 40, max = 300, message = "BPM must be between 40 and 300."))]
    pub bpm: i32,

    #[validate(length(min = 1, max = 10, message = "Musical key is required."))]
    pub musical_key: String,

    pub duration_seconds: Option<i32>,
    pub cover_image: Option<String>,
    pub preview_audio_url: Option<String>,

    #[serde(default)]
    pub tags: Vec<String>,

    /// `draft` or `active`; new beats go live unless told otherwise.
    pub status: Option<BeatStatus>,

    #[serde(default)]
    pub is_featured: bool,

    #[validate(nested, custom(function = "validate_unique_tier_types"))]
    #[serde(default)]
    pub license_tiers: Vec<TierInput>,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBeatPayload {
    #[validate(length(min = 1, max = 255))]
    pub title: Option<String>,
    pub genre_id: Option<Uuid>,
    pub description: Option<String>,
    #[validate(range(min = 40, max = 300))]
    pub bpm: Option<i32>,
    #[validate(length(min = 1, max = 10))]
    pub musical_key: Option<String>,
    pub duration_seconds: Option<i32>,
    pub cover_image: Option<String>,
    pub preview_audio_url: Option<String>,
    pub tags: Option<Vec<String>>,
    pub status: Option<BeatStatus>,
    pub is_featured: Option<bool>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpsertTiersPayload {
    #[validate(length(min = 1), nested, custom(function = "validate_unique_tier_types"))]
    pub tiers: Vec<TierInput>,
}

impl BeatStatus {
    /// Statuses a producer may set by hand; `sold_exclusive` is only ever
    /// reached through settlement.
    pub fn is_producer_settable(self) -> bool {
        matches!(self, BeatStatus::Draft | BeatStatus::Active | BeatStatus::Archived)
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn beat(producer_id: Uuid) -> Beat {
        let now = Utc::now();
        Beat {
            id: Uuid::new_v4(),
            producer_id,
            genre_id: None,
            title: "Midnight Drive".into(),
            slug: "midnight-drive".into(),
            description: None,
            bpm: 140,
            musical_key: "Am".into(),
            duration_seconds: Some(180),
            cover_image: None,
            preview_audio_url: None,
            tags: vec!["dark".into()],
            plays_count: 0,
            likes_count: 0,
            is_exclusive_sold: false,
            status: BeatStatus::Active,
            is_featured: false,
            published_at: Some(now),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    pub fn tier(beat_id: Uuid, tier_type: TierType, price: Decimal) -> LicenseTier {
        let now = Utc::now();
        LicenseTier {
            id: Uuid::new_v4(),
            beat_id,
            tier_type,
            name: format!("{:?} License", tier_type),
            price,
            description: None,
            included_files: vec![],
            is_exclusive: tier_type == TierType::Exclusive,
            is_enabled: true,
            sort_order: 0,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::{beat, tier};
    use super::*;

    #[test]
    fn sold_or_inactive_beats_are_not_purchasable() {
        let mut b = beat(Uuid::new_v4());
        assert!(b.is_purchasable());

        b.is_exclusive_sold = true;
        assert!(!b.is_purchasable());

        // the flag wins even if someone flips the status back
        b.status = BeatStatus::Active;
        assert!(!b.is_purchasable());

        let mut draft = beat(Uuid::new_v4());
        draft.status = BeatStatus::Draft;
        assert!(!draft.is_purchasable());

        let mut deleted = beat(Uuid::new_v4());
        deleted.deleted_at = Some(Utc::now());
        assert!(!deleted.is_purchasable());
    }

    #[test]
    fn default_tier_is_the_cheapest_enabled_one() {
        let beat_id = Uuid::new_v4();
        let mut mp3 = tier(beat_id, TierType::Mp3, Decimal::new(2999, 2));
        let wav = tier(beat_id, TierType::Wav, Decimal::new(4999, 2));
        let exclusive = tier(beat_id, TierType::Exclusive, Decimal::new(49900, 2));

        let tiers = vec![wav.clone(), exclusive.clone(), mp3.clone()];
        assert_eq!(cheapest_enabled_tier(&tiers).map(|t| t.id), Some(mp3.id));

        mp3.is_enabled = false;
        let tiers = vec![mp3, wav.clone(), exclusive];
        assert_eq!(cheapest_enabled_tier(&tiers).map(|t| t.id), Some(wav.id));

        assert!(cheapest_enabled_tier(&[]).is_none());
    }

    #[test]
    fn tier_type_uses_lowercase_names() {
        assert_eq!(serde_json::to_string(&TierType::Stems).unwrap(), "\"stems\"");
        assert_eq!(
            serde_json::to_string(&BeatStatus::SoldExclusive).unwrap(),
            "\"soldExclusive\""
        );
    }

    #[test]
    fn duplicate_tier_types_fail_validation() {
        let tier = |t| TierInput {
            tier_type: t,
            name: "Lease".into(),
            price: Decimal::new(2999, 2),
            description: None,
            included_files: vec![],
            is_enabled: true,
            sort_order: None,
        };
        let ok = UpsertTiersPayload { tiers: vec![tier(TierType::Mp3), tier(TierType::Wav)] };
        assert!(ok.validate().is_ok());

        let dup = UpsertTiersPayload { tiers: vec![tier(TierType::Mp3), tier(TierType::Mp3)] };
        assert!(dup.validate().is_err());

        let mut negative = tier(TierType::Stems);
        negative.price = Decimal::new(-1, 0);
        assert!(UpsertTiersPayload { tiers: vec![negative] }.validate().is_err());
    }

    #[test]
    fn only_settlement_marks_a_beat_sold() {
        assert!(BeatStatus::Archived.is_producer_settable());
        assert!(!BeatStatus::SoldExclusive.is_producer_settable());
    }
}
