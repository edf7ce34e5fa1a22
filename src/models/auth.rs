// src/models/auth.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "user_role", rename_all = "snake_case")]
#[serde(rename_all = "camelCase")]
pub enum UserRole {
    Producer,
    Artist,
    Admin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "user_status", rename_all = "snake_case")]
#[serde(rename_all = "camelCase")]
pub enum UserStatus {
    Active,
    Inactive,
    Suspended,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,

    #[serde(skip_serializing)]
    pub password_hash: String,

    pub role: UserRole,
    pub status: UserStatus,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ---
// Role profiles
// ---

/// Which profile table backs a role. This is the only place a role is mapped
/// to its profile storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileKind {
    Producer,
    Artist,
    Admin,
}

impl ProfileKind {
    pub fn for_role(role: UserRole) -> Self {
        match role {
            UserRole::Producer => ProfileKind::Producer,
            UserRole::Artist => ProfileKind::Artist,
            UserRole::Admin => ProfileKind::Admin,
        }
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProducerProfile {
    pub id: Uuid,
    pub user_id: Uuid,
    pub username: String,
    pub display_name: String,
    pub avatar: Option<String>,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub website: Option<String>,
    pub is_verified: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ArtistProfile {
    pub id: Uuid,
    pub user_id: Uuid,
    pub display_name: String,
    pub avatar: Option<String>,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub website: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdminProfile {
    pub id: Uuid,
    pub user_id: Uuid,
    pub display_name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Profile {
    Producer(ProducerProfile),
    Artist(ArtistProfile),
    Admin(AdminProfile),
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserWithProfile {
    #[serde(flatten)]
    pub user: User,
    pub profile: Option<Profile>,
}

// ---
// Payloads
// ---

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterUserPayload {
    #[validate(length(min = 1, max = 100, message = "Name is required."))]
    #[schema(example = "Metro Beats")]
    pub name: String,

    #[validate(email(message = "The email address is invalid."))]
    #[schema(example = "producer@example.com")]
    pub email: String,

    #[validate(length(min = 8, message = "Password must be at least 8 characters."))]
    pub password: String,

    #[schema(example = "producer")]
    pub role: UserRole,

    /// Required when registering as a producer.
    #[validate(length(min = 3, max = 50, message = "Username must be 3 to 50 characters."))]
    #[schema(example = "metrobeats")]
    pub username: Option<String>,

    #[validate(length(max = 100))]
    pub display_name: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginUserPayload {
    #[validate(email(message = "The email address is invalid."))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required."))]
    pub password: String,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserStatusPayload {
    pub status: UserStatus,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    /// Short-lived bearer token.
    pub token: String,
    /// Single-use token for `POST /api/auth/refresh`.
    pub refresh_token: String,
    pub user: User,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RefreshTokenPayload {
    #[validate(length(min = 1, message = "Refresh token is required."))]
    pub refresh_token: String,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LogoutPayload {
    /// Ends this session only. Without it every session of the account ends.
    pub refresh_token: Option<String>,
}

#[derive(Debug, Deserialize, Validate, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct UsernameQuery {
    #[validate(length(min = 3, max = 50, message = "Username must be 3 to 50 characters."))]
    pub username: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UsernameAvailability {
    pub username: String,
    pub available: bool,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpgradeToProducerPayload {
    /// Public handle; one is derived from the email when left out.
    #[validate(length(min = 3, max = 50, message = "Username must be 3 to 50 characters."))]
    pub username: Option<String>,
}

/// JWT claims.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub role: UserRole,
    pub exp: usize,
    pub iat: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_role_maps_to_its_own_profile() {
        assert_eq!(ProfileKind::for_role(UserRole::Producer), ProfileKind::Producer);
        assert_eq!(ProfileKind::for_role(UserRole::Artist), ProfileKind::Artist);
        assert_eq!(ProfileKind::for_role(UserRole::Admin), ProfileKind::Admin);
    }

    #[test]
    fn profile_serializes_with_kind_tag() {
        let profile = Profile::Admin(AdminProfile {
            id: Uuid::nil(),
            user_id: Uuid::nil(),
            display_name: "Ops".into(),
            created_at: Utc::now(),
        });
        let json = serde_json::to_value(&profile).unwrap();
        assert_eq!(json["kind"], "admin");
        assert_eq!(json["displayName"], "Ops");
    }

    #[test]
    fn role_deserializes_from_lowercase() {
        let role: UserRole = serde_json::from_str("\"producer\"").unwrap();
        assert_eq!(role, UserRole::Producer);
    }
}
