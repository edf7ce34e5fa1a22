// src/models/playlists.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::models::catalog::BeatSummary;

pub const DEFAULT_PLAYLIST_COLOR: &str = "bg-orange-500";

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Playlist {
    pub id: Uuid,
    pub user_id: Uuid,
    #[schema(example = "Late night writing")]
    pub name: String,
    pub description: Option<String>,
    /// CSS class the client paints the playlist card with.
    #[schema(example = "bg-orange-500")]
    pub color: String,
    pub is_public: bool,
    pub beats_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Playlist {
    /// Private playlists are visible to their owner only.
    pub fn is_visible_to(&self, viewer: Option<Uuid>) -> bool {
        self.is_public || viewer == Some(self.user_id)
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistDetail {
    #[serde(flatten)]
    pub playlist: Playlist,
    /// In playlist order. Beats no longer on sale are left out.
    pub beats: Vec<BeatSummary>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreatePlaylistPayload {
    #[validate(length(min = 1, max = 100, message = "Playlist name must be 1 to 100 characters."))]
    pub name: String,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
    #[validate(length(min = 1, max = 50))]
    pub color: Option<String>,
    #[serde(default)]
    pub is_public: bool,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePlaylistPayload {
    #[validate(length(min = 1, max = 100, message = "Playlist name must be 1 to 100 characters."))]
    pub name: Option<String>,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
    #[validate(length(min = 1, max = 50))]
    pub color: Option<String>,
    pub is_public: Option<bool>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddPlaylistBeatPayload {
    pub beat_id: Uuid,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn playlist(is_public: bool) -> Playlist {
        Playlist {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            name: "Drafts".into(),
            description: None,
            color: DEFAULT_PLAYLIST_COLOR.into(),
            is_public,
            beats_count: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn private_playlists_are_owner_only() {
        let private = playlist(false);
        assert!(private.is_visible_to(Some(private.user_id)));
        assert!(!private.is_visible_to(Some(Uuid::new_v4())));
        assert!(!private.is_visible_to(None));

        let public = playlist(true);
        assert!(public.is_visible_to(None));
    }

    #[test]
    fn blank_names_are_rejected() {
        let payload: CreatePlaylistPayload = serde_json::from_str(r#"{"name":""}"#).unwrap();
        assert!(payload.validate().is_err());

        let payload: CreatePlaylistPayload = serde_json::from_str(r#"{"name":"Hooks"}"#).unwrap();
        assert!(payload.validate().is_ok());
        assert!(!payload.is_public);
    }
}
