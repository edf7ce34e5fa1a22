// src/db/settings_repo.rs

use sqlx::PgPool;

use crate::{
    common::{db_utils::conflict_on_unique, error::AppError},
    models::settings::{CreateSettingPayload, PlatformSetting},
};

const SETTING_COLUMNS: &str = "key, value, value_type, category, description, created_at, updated_at";

#[derive(Clone)]
pub struct SettingsRepository {
    pool: PgPool,
}

impl SettingsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn all(&self) -> Result<Vec<PlatformSetting>, AppError> {
        let sql = format!("SELECT {} FROM platform_settings ORDER BY category, key", SETTING_COLUMNS);
        let rows = sqlx::query_as::<_, PlatformSetting>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    pub async fn by_category(&self, category: &str) -> Result<Vec<PlatformSetting>, AppError> {
        let sql = format!(
            "SELECT {} FROM platform_settings WHERE category = $1 ORDER BY key",
            SETTING_COLUMNS
        );
        let rows = sqlx::query_as::<_, PlatformSetting>(&sql)
            .bind(category)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    pub async fn find(&self, key: &str) -> Result<Option<PlatformSetting>, AppError> {
        let sql = format!("SELECT {} FROM platform_settings WHERE key = $1", SETTING_COLUMNS);
        let row = sqlx::query_as::<_, PlatformSetting>(&sql)
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    pub async fn update_value(&self, key: &str, value: &str) -> Result<Option<PlatformSetting>, AppError> {
        let sql = format!(
            "UPDATE platform_settings SET value = $2, updated_at = NOW() WHERE key = $1 RETURNING {}",
            SETTING_COLUMNS
        );
        let row = sqlx::query_as::<_, PlatformSetting>(&sql)
            .bind(key)
            .bind(value)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    pub async fn insert(&self, payload: &CreateSettingPayload, value: &str) -> Result<PlatformSetting, AppError> {
        let sql = format!(
            r#"
            INSERT INTO platform_settings (key, value, value_type, category, description)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {}
            "#,
            SETTING_COLUMNS
        );
        sqlx::query_as::<_, PlatformSetting>(&sql)
            .bind(&payload.key)
            .bind(value)
            .bind(payload.value_type.as_str())
            .bind(&payload.category)
            .bind(&payload.description)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| conflict_on_unique(e, "Setting already exists"))
    }

    pub async fn delete(&self, key: &str) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM platform_settings WHERE key = $1")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
