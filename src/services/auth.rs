// src/services/auth.rs

use bcrypt::{hash, verify};
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use sha2::{Digest, Sha256};
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{RefreshTokenRepository, UserRepository},
    models::auth::{
        AuthResponse, Claims, Profile, ProfileKind, RegisterUserPayload, User, UserRole, UserStatus,
        UsernameAvailability, UserWithProfile,
    },
};

/// Opaque refresh token: 256 bits from two random v4 UUIDs.
fn new_refresh_token() -> String {
    format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
}

/// Hex SHA-256 of a refresh token; the only form that is stored.
pub fn hash_refresh_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.trim().as_bytes()))
}

/// Username offered to an artist who upgrades without choosing one: the
/// email's local part reduced to `[a-z0-9_]`, plus three digits.
pub fn derive_username(email: &str) -> String {
    let local = email.split('@').next().unwrap_or_default();
    let mut base: String = local
        .chars()
        .filter_map(|c| {
            let c = c.to_ascii_lowercase();
            (c.is_ascii_alphanumeric() || c == '_').then_some(c)
        })
        .take(40)
        .collect();
    if base.len() < 3 {
        base.insert_str(0, "producer");
    }
    let suffix = Uuid::new_v4().as_u128() % 1000;
    format!("{}{:03}", base, suffix)
}

#[derive(Clone)]
pub struct AuthService {
    user_repo: UserRepository,
    token_repo: RefreshTokenRepository,
    jwt_secret: String,
    token_ttl_days: i64,
    refresh_ttl_days: i64,
    pool: PgPool,
}

impl AuthService {
    pub fn new(
        user_repo: UserRepository,
        token_repo: RefreshTokenRepository,
        jwt_secret: String,
        token_ttl_days: i64,
        refresh_ttl_days: i64,
        pool: PgPool,
    ) -> Self {
        Self {
            user_repo,
            token_repo,
            jwt_secret,
            token_ttl_days,
            refresh_ttl_days,
            pool,
        }
    }

    /// Creates the account and its role profile in one transaction.
    pub async fn register_user(&self, payload: &RegisterUserPayload) -> Result<AuthResponse, AppError> {
        if payload.role == UserRole::Admin {
            return Err(AppError::Forbidden("Admin accounts cannot self-register".into()));
        }
        let username = match (payload.role, payload.username.as_deref()) {
            (UserRole::Producer, None) => {
                return Err(AppError::BadRequest("A username is required for producers".into()));
            }
            (_, username) => username,
        };

        // Hashing stays off the async runtime and outside the transaction.
        let password = payload.password.clone();
        let hashed_password = tokio::task::spawn_blocking(move || hash(&password, bcrypt::DEFAULT_COST))
            .await
            .map_err(|e| anyhow::anyhow!("password hashing task failed: {}", e))??;

        let display_name = payload
            .display_name
            .as_deref()
            .filter(|d| !d.trim().is_empty())
            .unwrap_or(&payload.name);

        let mut tx = self.pool.begin().await?;

        let user = self
            .user_repo
            .create_user(&mut *tx, payload.name.trim(), &payload.email, &hashed_password, payload.role)
            .await?;

        match ProfileKind::for_role(user.role) {
            ProfileKind::Producer => {
                let username = username.unwrap_or_default();
                self.user_repo
                    .create_producer_profile(&mut *tx, user.id, username, display_name)
                    .await?;
            }
            ProfileKind::Artist => {
                self.user_repo
                    .create_artist_profile(&mut *tx, user.id, display_name)
                    .await?;
            }
            ProfileKind::Admin => {
                self.user_repo
                    .create_admin_profile(&mut *tx, user.id, display_name)
                    .await?;
            }
        }

        let response = self.issue_tokens(&mut *tx, user).await?;
        tx.commit().await?;
        tracing::info!(user_id = %response.user.id, role = ?response.user.role, "user registered");
        Ok(response)
    }

    pub async fn login_user(&self, email: &str, password: &str) -> Result<AuthResponse, AppError> {
        let user = self
            .user_repo
            .find_by_email(email)
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        let password = password.to_owned();
        let password_hash = user.password_hash.clone();
        let is_password_valid = tokio::task::spawn_blocking(move || verify(&password, &password_hash))
            .await
            .map_err(|e| anyhow::anyhow!("password verification task failed: {}", e))??;

        if !is_password_valid {
            return Err(AppError::InvalidCredentials);
        }
        ensure_not_suspended(&user)?;

        self.user_repo.touch_last_login(user.id).await?;
        self.issue_tokens(&self.pool, user).await
    }

    /// Trades a refresh token for a new pair. The presented token is
    /// revoked, so replaying it fails.
    pub async fn refresh(&self, refresh_token: &str) -> Result<AuthResponse, AppError> {
        let mut tx = self.pool.begin().await?;

        let user_id = self
            .token_repo
            .consume(&mut *tx, &hash_refresh_token(refresh_token))
            .await?
            .ok_or(AppError::InvalidToken)?;
        let user = self
            .user_repo
            .find_by_id(user_id)
            .await?
            .ok_or(AppError::InvalidToken)?;
        ensure_not_suspended(&user)?;

        let response = self.issue_tokens(&mut *tx, user).await?;
        tx.commit().await?;
        tracing::debug!(user_id = %response.user.id, "refresh token rotated");
        Ok(response)
    }

    /// Ends one session, or every session of the user when no token is given.
    /// Bearer tokens already issued stay valid until they expire.
    pub async fn logout(&self, user: &User, refresh_token: Option<&str>) -> Result<u64, AppError> {
        let revoked = match refresh_token.map(str::trim).filter(|t| !t.is_empty()) {
            Some(token) => self
                .token_repo
                .revoke_for_user(user.id, &hash_refresh_token(token))
                .await? as u64,
            None => self.token_repo.revoke_all(&self.pool, user.id).await?,
        };
        tracing::info!(user_id = %user.id, revoked, "user logged out");
        Ok(revoked)
    }

    pub async fn check_username(&self, username: &str) -> Result<UsernameAvailability, AppError> {
        let username = username.trim().to_lowercase();
        let taken = self.user_repo.find_producer_by_username(&username).await?.is_some();
        Ok(UsernameAvailability {
            username,
            available: !taken,
        })
    }

    /// Turns an artist into a producer, carrying the artist profile's public
    /// details over. Producers get their profile back unchanged.
    pub async fn upgrade_to_producer(&self, user: &User, username: Option<&str>) -> Result<UserWithProfile, AppError> {
        match user.role {
            UserRole::Producer => return self.me(user.clone()).await,
            UserRole::Admin => {
                return Err(AppError::Forbidden("Admin accounts cannot become producers".into()));
            }
            UserRole::Artist => {}
        }
        let username = match username.map(str::trim).filter(|u| !u.is_empty()) {
            Some(chosen) => chosen.to_string(),
            None => derive_username(&user.email),
        };

        let mut tx = self.pool.begin().await?;

        let current = self
            .user_repo
            .lock_by_id(&mut *tx, user.id)
            .await?
            .ok_or_else(|| AppError::not_found("User"))?;
        if current.role != UserRole::Artist {
            return Err(AppError::Conflict("The account role changed, try again".into()));
        }

        let upgraded = self.user_repo.update_role(&mut *tx, user.id, UserRole::Producer).await?;
        let promoted = self
            .user_repo
            .promote_artist_profile(&mut *tx, user.id, &username)
            .await?;
        let producer = match promoted {
            Some(profile) => profile,
            None => {
                self.user_repo
                    .create_producer_profile(&mut *tx, user.id, &username, &upgraded.name)
                    .await?
            }
        };
        self.user_repo.delete_artist_profile(&mut *tx, user.id).await?;

        tx.commit().await?;
        tracing::info!(user_id = %upgraded.id, username = %producer.username, "artist upgraded to producer");
        Ok(UserWithProfile {
            user: upgraded,
            profile: Some(Profile::Producer(producer)),
        })
    }

    pub async fn validate_token(&self, token: &str) -> Result<User, AppError> {
        let claims = self.decode_token(token)?;
        let user = self
            .user_repo
            .find_by_id(claims.sub)
            .await?
            .ok_or(AppError::InvalidToken)?;
        ensure_not_suspended(&user)?;
        Ok(user)
    }

    pub async fn me(&self, user: User) -> Result<UserWithProfile, AppError> {
        let profile = self
            .user_repo
            .find_profile(user.id, ProfileKind::for_role(user.role))
            .await?;
        Ok(UserWithProfile { user, profile })
    }

    /// Suspending an account also ends all its sessions.
    pub async fn set_status(&self, user_id: Uuid, status: UserStatus) -> Result<User, AppError> {
        let user = self
            .user_repo
            .update_status(user_id, status)
            .await?
            .ok_or_else(|| AppError::not_found("User"))?;
        if status == UserStatus::Suspended {
            self.token_repo.revoke_all(&self.pool, user.id).await?;
        }
        tracing::info!(user_id = %user.id, status = ?status, "user status changed");
        Ok(user)
    }

    async fn issue_tokens<'e, E>(&self, executor: E, user: User) -> Result<AuthResponse, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let refresh_token = new_refresh_token();
        let expires_at = Utc::now() + chrono::Duration::days(self.refresh_ttl_days);
        self.token_repo
            .insert(executor, user.id, &hash_refresh_token(&refresh_token), expires_at)
            .await?;
        let token = self.create_token(&user)?;
        Ok(AuthResponse {
            token,
            refresh_token,
            user,
        })
    }

    fn decode_token(&self, token: &str) -> Result<Claims, AppError> {
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_ref()),
            &Validation::default(),
        )
        .map_err(|_| AppError::InvalidToken)?;
        Ok(token_data.claims)
    }

    fn create_token(&self, user: &User) -> Result<String, AppError> {
        let now = Utc::now();
        let expires_at = now + chrono::Duration::days(self.token_ttl_days);

        let claims = Claims {
            sub: user.id,
            role: user.role,
            exp: expires_at.timestamp() as usize,
            iat: now.timestamp() as usize,
        };

        Ok(encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_ref()),
        )?)
    }
}

fn ensure_not_suspended(user: &User) -> Result<(), AppError> {
    if user.status == UserStatus::Suspended {
        return Err(AppError::Forbidden("This account has been suspended".into()));
    }
    Ok(())
}
