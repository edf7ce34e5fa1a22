// src/services/settings_service.rs

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};

use moka::future::Cache;
use rust_decimal::Decimal;

use crate::{
    common::error::AppError,
    db::SettingsRepository,
    models::settings::{
        CreateSettingPayload, FeeBreakdown, FeeSettings, PayoutSettings, PlatformSetting,
        SettingValue, MINIMUM_PAYOUT_AMOUNT, PAYOUT_FREQUENCY, PLATFORM_COMMISSION_RATE,
        PROCESSING_FEE_FIXED, PROCESSING_FEE_PERCENTAGE,
    },
    services::fees,
};

/// Every setting, parsed by its declared type.
pub type SettingsSnapshot = Arc<HashMap<String, SettingValue>>;

/// Holds the last settings snapshot for a bounded time. Owned by the
/// settings service and cleared on every write it performs.
///
/// Every invalidation bumps `generation`; a snapshot loaded across a bump is
/// returned to its caller but never left in the cache.
#[derive(Clone)]
pub struct SettingsCache {
    cache: Cache<(), SettingsSnapshot>,
    generation: Arc<AtomicU64>,
}

impl SettingsCache {
    pub fn new(ttl: Duration) -> Self {
        let cache = Cache::builder().time_to_live(ttl).max_capacity(1).build();
        Self {
            cache,
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    pub async fn get_or_load<F, Fut>(&self, load: F) -> Result<SettingsSnapshot, AppError>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<SettingsSnapshot, AppError>>,
    {
        if let Some(snapshot) = self.cache.get(&()).await {
            return Ok(snapshot);
        }

        let generation = self.generation.load(Ordering::SeqCst);
        let snapshot = load().await?;
        if self.generation.load(Ordering::SeqCst) != generation {
            tracing::debug!("settings changed during load, snapshot not cached");
            return Ok(snapshot);
        }

        self.cache.insert((), snapshot.clone()).await;
        if self.generation.load(Ordering::SeqCst) != generation {
            self.cache.invalidate(&()).await;
        }
        Ok(snapshot)
    }

    pub async fn invalidate(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.cache.invalidate(&()).await;
    }
}

fn number_or(snapshot: &HashMap<String, SettingValue>, key: &str, fallback: Decimal) -> Decimal {
    snapshot.get(key).and_then(SettingValue::as_decimal).unwrap_or(fallback)
}

pub fn fee_settings_from(snapshot: &HashMap<String, SettingValue>) -> FeeSettings {
    let defaults = FeeSettings::default();
    FeeSettings {
        platform_commission_rate: number_or(snapshot, PLATFORM_COMMISSION_RATE, defaults.platform_commission_rate),
        processing_fee_percentage: number_or(snapshot, PROCESSING_FEE_PERCENTAGE, defaults.processing_fee_percentage),
        processing_fee_fixed: number_or(snapshot, PROCESSING_FEE_FIXED, defaults.processing_fee_fixed),
    }
}

pub fn payout_settings_from(snapshot: &HashMap<String, SettingValue>) -> PayoutSettings {
    let defaults = PayoutSettings::default();
    PayoutSettings {
        minimum_payout_amount: number_or(snapshot, MINIMUM_PAYOUT_AMOUNT, defaults.minimum_payout_amount),
        payout_frequency: snapshot
            .get(PAYOUT_FREQUENCY)
            .and_then(SettingValue::as_text)
            .map(str::to_string)
            .unwrap_or(defaults.payout_frequency),
    }
}

/// Range checks for the keys prices are computed from. Percentages must lie
/// in 0..=100; fixed amounts cannot be negative.
pub fn check_bounds(key: &str, value: &SettingValue) -> Result<(), AppError> {
    let is_percentage = matches!(key, PLATFORM_COMMISSION_RATE | PROCESSING_FEE_PERCENTAGE);
    let is_amount = matches!(key, PROCESSING_FEE_FIXED | MINIMUM_PAYOUT_AMOUNT);
    if !is_percentage && !is_amount {
        return Ok(());
    }

    let number = value
        .as_decimal()
        .ok_or_else(|| AppError::BadRequest(format!("'{}' must be a number", key)))?;
    if number.is_sign_negative() && !number.is_zero() {
        return Err(AppError::BadRequest(format!("'{}' cannot be negative", key)));
    }
    if is_percentage && number > Decimal::ONE_HUNDRED {
        return Err(AppError::BadRequest(format!("'{}' must be between 0 and 100", key)));
    }
    Ok(())
}

#[derive(Clone)]
pub struct SettingsService {
    repo: SettingsRepository,
    cache: SettingsCache,
}

impl SettingsService {
    pub fn new(repo: SettingsRepository, cache: SettingsCache) -> Self {
        Self { repo, cache }
    }

    pub async fn snapshot(&self) -> Result<SettingsSnapshot, AppError> {
        let repo = self.repo.clone();
        self.cache
            .get_or_load(|| async move {
                let rows = repo.all().await?;
                tracing::debug!(count = rows.len(), "platform settings loaded");
                let map = rows
                    .iter()
                    .map(|row| (row.key.clone(), row.typed_value()))
                    .collect::<HashMap<_, _>>();
                Ok(Arc::new(map))
            })
            .await
    }

    pub async fn get_all(&self) -> Result<Vec<PlatformSetting>, AppError> {
        self.repo.all().await
    }

    pub async fn get_by_category(&self, category: &str) -> Result<Vec<PlatformSetting>, AppError> {
        self.repo.by_category(category).await
    }

    pub async fn get(&self, key: &str) -> Result<SettingValue, AppError> {
        self.snapshot()
            .await?
            .get(key)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Setting '{}' not found", key)))
    }

    /// Overwrites an existing setting; the new value must parse as the
    /// setting's declared type.
    pub async fn set(&self, key: &str, raw: &str) -> Result<PlatformSetting, AppError> {
        let existing = self
            .repo
            .find(key)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Setting '{}' not found", key)))?;

        let value = SettingValue::parse(raw, existing.setting_type())?;
        check_bounds(key, &value)?;

        let updated = self
            .repo
            .update_value(key, raw.trim())
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Setting '{}' not found", key)))?;

        self.cache.invalidate().await;
        tracing::info!(key, value = %updated.value, "platform setting updated");
        Ok(updated)
    }

    pub async fn create(&self, payload: &CreateSettingPayload) -> Result<PlatformSetting, AppError> {
        let value = SettingValue::parse(&payload.value, payload.value_type)?;
        check_bounds(&payload.key, &value)?;
        let created = self.repo.insert(payload, payload.value.trim()).await?;
        self.cache.invalidate().await;
        tracing::info!(key = %created.key, "platform setting created");
        Ok(created)
    }

    pub async fn delete(&self, key: &str) -> Result<(), AppError> {
        if !self.repo.delete(key).await? {
            return Err(AppError::NotFound(format!("Setting '{}' not found", key)));
        }
        self.cache.invalidate().await;
        tracing::info!(key, "platform setting deleted");
        Ok(())
    }

    pub async fn get_fee_settings(&self) -> Result<FeeSettings, AppError> {
        Ok(fee_settings_from(&*self.snapshot().await?))
    }

    pub async fn get_payout_settings(&self) -> Result<PayoutSettings, AppError> {
        Ok(payout_settings_from(&*self.snapshot().await?))
    }

    pub async fn quote(&self, subtotal: Decimal) -> Result<FeeBreakdown, AppError> {
        if subtotal.is_sign_negative() {
            return Err(AppError::BadRequest("Subtotal cannot be negative".into()));
        }
        let fee_settings = self.get_fee_settings().await?;
        Ok(fees::calculate(subtotal, &fee_settings))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn snapshot_with(pairs: &[(&str, SettingValue)]) -> SettingsSnapshot {
        Arc::new(pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect())
    }

    #[test]
    fn fee_settings_fall_back_to_defaults() {
        let fees = fee_settings_from(&HashMap::new());
        assert_eq!(fees, FeeSettings::default());

        let snapshot = snapshot_with(&[
            (PLATFORM_COMMISSION_RATE, SettingValue::Number(Decimal::new(20, 0))),
            (PROCESSING_FEE_FIXED, SettingValue::Text("oops".into())),
        ]);
        let fees = fee_settings_from(&snapshot);
        assert_eq!(fees.platform_commission_rate, Decimal::new(20, 0));
        assert_eq!(fees.processing_fee_fixed, FeeSettings::default().processing_fee_fixed);
    }

    #[test]
    fn explicit_zero_commission_is_kept() {
        let snapshot = snapshot_with(&[(PLATFORM_COMMISSION_RATE, SettingValue::Number(Decimal::ZERO))]);
        assert_eq!(fee_settings_from(&snapshot).platform_commission_rate, Decimal::ZERO);
    }

    #[test]
    fn payout_settings_read_frequency_text() {
        let snapshot = snapshot_with(&[
            (MINIMUM_PAYOUT_AMOUNT, SettingValue::Number(Decimal::new(25, 0))),
            (PAYOUT_FREQUENCY, SettingValue::Text("monthly".into())),
        ]);
        let payout = payout_settings_from(&snapshot);
        assert_eq!(payout.minimum_payout_amount, Decimal::new(25, 0));
        assert_eq!(payout.payout_frequency, "monthly");
    }

    #[tokio::test]
    async fn cache_serves_repeat_reads_until_invalidated() {
        let cache = SettingsCache::new(Duration::from_secs(60));
        let loads = Arc::new(AtomicUsize::new(0));

        let load = |loads: Arc<AtomicUsize>| async move {
            loads.fetch_add(1, Ordering::SeqCst);
            Ok::<_, AppError>(snapshot_with(&[]))
        };

        cache.get_or_load(|| load(loads.clone())).await.unwrap();
        cache.get_or_load(|| load(loads.clone())).await.unwrap();
        assert_eq!(loads.load(Ordering::SeqCst), 1);

        cache.invalidate().await;
        cache.get_or_load(|| load(loads.clone())).await.unwrap();
        assert_eq!(loads.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn fee_keys_are_range_checked() {
        let n = |v: i64| SettingValue::Number(Decimal::new(v, 0));

        assert!(check_bounds(PLATFORM_COMMISSION_RATE, &n(15)).is_ok());
        assert!(check_bounds(PLATFORM_COMMISSION_RATE, &n(0)).is_ok());
        assert!(check_bounds(PLATFORM_COMMISSION_RATE, &n(100)).is_ok());
        assert!(matches!(
            check_bounds(PLATFORM_COMMISSION_RATE, &n(150)),
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            check_bounds(PROCESSING_FEE_PERCENTAGE, &n(-1)),
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            check_bounds(PROCESSING_FEE_FIXED, &n(-5)),
            Err(AppError::BadRequest(_))
        ));
        assert!(check_bounds(PROCESSING_FEE_FIXED, &n(250)).is_ok());
        assert!(matches!(
            check_bounds(MINIMUM_PAYOUT_AMOUNT, &SettingValue::Text("fifty".into())),
            Err(AppError::BadRequest(_))
        ));
        assert!(check_bounds("maintenanceMode", &SettingValue::Boolean(true)).is_ok());
    }

    #[tokio::test]
    async fn load_racing_an_invalidation_is_not_cached() {
        let cache = SettingsCache::new(Duration::from_secs(60));
        let loads = Arc::new(AtomicUsize::new(0));

        let racing = cache.clone();
        let counter = loads.clone();
        cache
            .get_or_load(|| async move {
                counter.fetch_add(1, Ordering::SeqCst);
                // a write lands while this load is in flight
                racing.invalidate().await;
                Ok::<_, AppError>(snapshot_with(&[]))
            })
            .await
            .unwrap();

        let counter = loads.clone();
        cache
            .get_or_load(|| async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok::<_, AppError>(snapshot_with(&[]))
            })
            .await
            .unwrap();
        assert_eq!(loads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn failed_loads_are_not_cached() {
        let cache = SettingsCache::new(Duration::from_secs(60));
        let err = cache
            .get_or_load(|| async { Err(AppError::BadRequest("db down".into())) })
            .await;
        assert!(err.is_err());

        let ok = cache.get_or_load(|| async { Ok(snapshot_with(&[])) }).await;
        assert!(ok.is_ok());
    }

    #[tokio::test]
    async fn entries_expire_after_ttl() {
        let cache = SettingsCache::new(Duration::from_millis(50));
        let loads = Arc::new(AtomicUsize::new(0));
        let load = |loads: Arc<AtomicUsize>| async move {
            loads.fetch_add(1, Ordering::SeqCst);
            Ok::<_, AppError>(snapshot_with(&[]))
        };

        cache.get_or_load(|| load(loads.clone())).await.unwrap();
        tokio::time::sleep(Duration::from_millis(120)).await;
        cache.get_or_load(|| load(loads.clone())).await.unwrap();
        assert_eq!(loads.load(Ordering::SeqCst), 2);
    }
}
