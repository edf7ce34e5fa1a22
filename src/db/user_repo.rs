// src/db/user_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::{db_utils::conflict_on_unique, error::AppError},
    models::auth::{
        AdminProfile, ArtistProfile, ProducerProfile, Profile, ProfileKind, User, UserRole,
        UserStatus,
    },
};

const USER_COLUMNS: &str = "id, name, email, password_hash, role, status, last_login_at, created_at, updated_at";

// Users and their role profiles.
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let sql = format!("SELECT {} FROM users WHERE LOWER(email) = LOWER($1)", USER_COLUMNS);
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        let sql = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    /// Used by settlement to attach a guest order to the account registered
    /// under the same email.
    pub async fn find_id_by_email<'e, E>(&self, executor: E, email: &str) -> Result<Option<Uuid>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let id = sqlx::query_scalar::<_, Uuid>("SELECT id FROM users WHERE LOWER(email) = LOWER($1)")
            .bind(email)
            .fetch_optional(executor)
            .await?;
        Ok(id)
    }

    pub async fn create_user<'e, E>(
        &self,
        executor: E,
        name: &str,
        email: &str,
        password_hash: &str,
        role: UserRole,
    ) -> Result<User, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            "INSERT INTO users (name, email, password_hash, role) VALUES ($1, $2, $3, $4) RETURNING {}",
            USER_COLUMNS
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(name)
            .bind(email.to_lowercase())
            .bind(password_hash)
            .bind(role)
            .fetch_one(executor)
            .await
            .map_err(|e| conflict_on_unique(e, "Email is already registered"))
    }

    pub async fn touch_last_login(&self, id: Uuid) -> Result<(), AppError> {
        sqlx::query("UPDATE users SET last_login_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn update_status(&self, id: Uuid, status: UserStatus) -> Result<Option<User>, AppError> {
        let sql = format!(
            "UPDATE users SET status = $2, updated_at = NOW() WHERE id = $1 RETURNING {}",
            USER_COLUMNS
        );
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .bind(status)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    pub async fn lock_by_id<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<User>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!("SELECT {} FROM users WHERE id = $1 FOR UPDATE", USER_COLUMNS);
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(user)
    }

    pub async fn update_role<'e, E>(&self, executor: E, id: Uuid, role: UserRole) -> Result<User, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            "UPDATE users SET role = $2, updated_at = NOW() WHERE id = $1 RETURNING {}",
            USER_COLUMNS
        );
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .bind(role)
            .fetch_one(executor)
            .await?;
        Ok(user)
    }

    // ---
    // Profiles
    // ---

    pub async fn create_producer_profile<'e, E>(
        &self,
        executor: E,
        user_id: Uuid,
        username: &str,
        display_name: &str,
    ) -> Result<ProducerProfile, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, ProducerProfile>(
            r#"
            INSERT INTO producers (user_id, username, display_name)
            VALUES ($1, $2, $3)
            RETURNING id, user_id, username, display_name, avatar, bio, location, website, is_verified, created_at
            "#,
        )
        .bind(user_id)
        .bind(username.to_lowercase())
        .bind(display_name)
        .fetch_one(executor)
        .await
        .map_err(|e| conflict_on_unique(e, "Username is already taken"))
    }

    pub async fn create_artist_profile<'e, E>(
        &self,
        executor: E,
        user_id: Uuid,
        display_name: &str,
    ) -> Result<ArtistProfile, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let profile = sqlx::query_as::<_, ArtistProfile>(
            r#"
            INSERT INTO artists (user_id, display_name)
            VALUES ($1, $2)
            RETURNING id, user_id, display_name, avatar, bio, location, website, created_at
            "#,
        )
        .bind(user_id)
        .bind(display_name)
        .fetch_one(executor)
        .await?;
        Ok(profile)
    }

    pub async fn create_admin_profile<'e, E>(
        &self,
        executor: E,
        user_id: Uuid,
        display_name: &str,
    ) -> Result<AdminProfile, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let profile = sqlx::query_as::<_, AdminProfile>(
            r#"
            INSERT INTO admins (user_id, display_name)
            VALUES ($1, $2)
            RETURNING id, user_id, display_name, created_at
            "#,
        )
        .bind(user_id)
        .bind(display_name)
        .fetch_one(executor)
        .await?;
        Ok(profile)
    }

    /// Builds a producer profile from the user's artist profile, keeping its
    /// public details. `None` when there is no artist profile to copy.
    pub async fn promote_artist_profile<'e, E>(
        &self,
        executor: E,
        user_id: Uuid,
        username: &str,
    ) -> Result<Option<ProducerProfile>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, ProducerProfile>(
            r#"
            INSERT INTO producers (user_id, username, display_name, avatar, bio, location, website)
            SELECT user_id, $2, display_name, avatar, bio, location, website
            FROM artists WHERE user_id = $1
            RETURNING id, user_id, username, display_name, avatar, bio, location, website, is_verified, created_at
            "#,
        )
        .bind(user_id)
        .bind(username.to_lowercase())
        .fetch_optional(executor)
        .await
        .map_err(|e| conflict_on_unique(e, "Username is already taken"))
    }

    pub async fn delete_artist_profile<'e, E>(&self, executor: E, user_id: Uuid) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("DELETE FROM artists WHERE user_id = $1")
            .bind(user_id)
            .execute(executor)
            .await?;
        Ok(())
    }

    pub async fn find_profile(&self, user_id: Uuid, kind: ProfileKind) -> Result<Option<Profile>, AppError> {
        let profile = match kind {
            ProfileKind::Producer => self.find_producer_by_user(user_id).await?.map(Profile::Producer),
            ProfileKind::Artist => sqlx::query_as::<_, ArtistProfile>(
                "SELECT id, user_id, display_name, avatar, bio, location, website, created_at FROM artists WHERE user_id = $1",
            )
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?
            .map(Profile::Artist),
            ProfileKind::Admin => sqlx::query_as::<_, AdminProfile>(
                "SELECT id, user_id, display_name, created_at FROM admins WHERE user_id = $1",
            )
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?
            .map(Profile::Admin),
        };
        Ok(profile)
    }

    pub async fn find_producer_by_user(&self, user_id: Uuid) -> Result<Option<ProducerProfile>, AppError> {
        let producer = sqlx::query_as::<_, ProducerProfile>(
            r#"
            SELECT id, user_id, username, display_name, avatar, bio, location, website, is_verified, created_at
            FROM producers WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(producer)
    }

    pub async fn find_producer_by_username(&self, username: &str) -> Result<Option<ProducerProfile>, AppError> {
        let producer = sqlx::query_as::<_, ProducerProfile>(
            r#"
            SELECT id, user_id, username, display_name, avatar, bio, location, website, is_verified, created_at
            FROM producers WHERE LOWER(username) = LOWER($1)
            "#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(producer)
    }
}
