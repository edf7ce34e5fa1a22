// src/models/activity.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

// ---
// Likes
// ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LikeState {
    pub liked: bool,
    pub likes_count: i64,
}

// ---
// Listening history
// ---

#[derive(Debug, Default, Deserialize, Validate, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct RecordPlayQuery {
    /// Seconds actually listened.
    #[validate(range(min = 0, max = 86400))]
    pub duration: Option<i32>,
}

/// Who was listening: a signed-in user, a guest session, or nobody known.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Listener {
    pub user_id: Option<Uuid>,
    pub session_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PlayHistoryEntry {
    pub id: Uuid,
    pub beat_id: Uuid,
    pub beat_title: String,
    pub cover_image: Option<String>,
    pub producer_name: String,
    pub producer_username: String,
    pub duration_seconds: i32,
    pub played_at: DateTime<Utc>,
}
