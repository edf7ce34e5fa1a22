// src/config.rs

use std::{env, str::FromStr, sync::Arc, time::Duration};

use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{
    db::{
        ActivityRepository, CartRepository, CatalogRepository, EarningsRepository, OrderRepository,
        PlaylistRepository, RefreshTokenRepository, SettingsRepository, UserRepository,
    },
    services::{
        activity_service::ActivityService,
        auth::AuthService,
        cart_service::CartService,
        catalog_service::CatalogService,
        earnings_service::EarningsService,
        notification_service::{PurchaseNotifier, TracingNotifier},
        order_service::OrderService,
        payment_service::{PaymentService, PaystackClient},
        playlist_service::PlaylistService,
        settings_service::{SettingsCache, SettingsService},
    },
};

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub database_max_connections: u32,
    pub jwt_secret: String,
    pub jwt_ttl_days: i64,
    pub refresh_token_ttl_days: i64,
    pub paystack_secret_key: Option<String>,
    pub paystack_base_url: String,
    pub settings_cache_ttl: Duration,
    pub earnings_hold_days: i64,
    pub default_currency: String,
    pub bind_addr: String,
}

fn required(key: &str) -> anyhow::Result<String> {
    env::var(key).with_context(|| format!("{} must be set", key))
}

fn parsed_or<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("{} has an invalid value '{}': {}", key, raw, e)),
        Err(_) => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            database_url: required("DATABASE_URL")?,
            database_max_connections: parsed_or("DATABASE_MAX_CONNECTIONS", 5)?,
            jwt_secret: required("JWT_SECRET")?,
            jwt_ttl_days: parsed_or("JWT_TTL_DAYS", 7)?,
            refresh_token_ttl_days: parsed_or("REFRESH_TOKEN_TTL_DAYS", 30)?,
            paystack_secret_key: env::var("PAYSTACK_SECRET_KEY").ok().filter(|k| !k.trim().is_empty()),
            paystack_base_url: parsed_or("PAYSTACK_BASE_URL", "https://api.paystack.co".to_string())?,
            settings_cache_ttl: Duration::from_secs(parsed_or("SETTINGS_CACHE_TTL_SECS", 60)?),
            earnings_hold_days: parsed_or("EARNINGS_HOLD_DAYS", 7)?,
            default_currency: parsed_or("DEFAULT_CURRENCY", "USD".to_string())?,
            bind_addr: parsed_or("BIND_ADDR", "0.0.0.0:3000".to_string())?,
        })
    }
}

#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub config: Arc<Config>,
    pub auth_service: AuthService,
    pub settings_service: SettingsService,
    pub catalog_service: CatalogService,
    pub cart_service: CartService,
    pub order_service: OrderService,
    pub earnings_service: EarningsService,
    pub payment_service: PaymentService,
    pub activity_service: ActivityService,
    pub playlist_service: PlaylistService,
}

impl AppState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let db_pool = PgPoolOptions::new()
            .max_connections(config.database_max_connections)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&config.database_url)
            .await
            .context("failed to connect to the database")?;

        tracing::info!("database connection established");

        Ok(Self::with_pool(config, db_pool, Arc::new(TracingNotifier)))
    }

    /// Wires every repository and service on top of an existing pool.
    pub fn with_pool(config: Config, db_pool: PgPool, notifier: Arc<dyn PurchaseNotifier>) -> Self {
        let user_repo = UserRepository::new(db_pool.clone());
        let catalog_repo = CatalogRepository::new(db_pool.clone());
        let cart_repo = CartRepository::new(db_pool.clone());
        let order_repo = OrderRepository::new(db_pool.clone());
        let earnings_repo = EarningsRepository::new(db_pool.clone());
        let settings_repo = SettingsRepository::new(db_pool.clone());

        let settings_service = SettingsService::new(settings_repo, SettingsCache::new(config.settings_cache_ttl));

        let auth_service = AuthService::new(
            user_repo.clone(),
            RefreshTokenRepository::new(db_pool.clone()),
            config.jwt_secret.clone(),
            config.jwt_ttl_days,
            config.refresh_token_ttl_days,
            db_pool.clone(),
        );
        let activity_service = ActivityService::new(
            ActivityRepository::new(db_pool.clone()),
            catalog_repo.clone(),
            db_pool.clone(),
        );
        let playlist_service = PlaylistService::new(
            PlaylistRepository::new(db_pool.clone()),
            catalog_repo.clone(),
            db_pool.clone(),
        );
        let catalog_service = CatalogService::new(catalog_repo.clone(), user_repo.clone(), db_pool.clone());
        let cart_service = CartService::new(
            cart_repo.clone(),
            catalog_repo.clone(),
            order_repo.clone(),
            settings_service.clone(),
            db_pool.clone(),
        );
        let order_service = OrderService::new(
            order_repo,
            catalog_repo,
            user_repo.clone(),
            earnings_repo.clone(),
            cart_repo,
            settings_service.clone(),
            notifier,
            db_pool.clone(),
            config.earnings_hold_days,
            config.default_currency.clone(),
        );
        let earnings_service = EarningsService::new(
            earnings_repo,
            user_repo,
            settings_service.clone(),
            db_pool.clone(),
            config.default_currency.clone(),
        );
        let payment_service = PaymentService::new(
            PaystackClient::new(&config.paystack_base_url, config.paystack_secret_key.clone()),
            order_service.clone(),
        );

        Self {
            db_pool,
            config: Arc::new(config),
            auth_service,
            settings_service,
            catalog_service,
            cart_service,
            order_service,
            earnings_service,
            payment_service,
            activity_service,
            playlist_service,
        }
    }
}
