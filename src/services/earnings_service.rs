// src/services/earnings_service.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::{
        error::AppError,
        filter::{FilterExpr, FilterValue},
        response::PageRequest,
    },
    db::{earnings_repo::EarningColumn, EarningsRepository, UserRepository},
    models::{
        auth::ProducerProfile,
        earnings::{EarningStatus, EarningsSummary, Payout, PayoutStatus, ProducerEarning},
    },
    services::settings_service::SettingsService,
};

#[derive(Debug, Clone, Default)]
pub struct EarningsFilter {
    pub status: Option<EarningStatus>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl EarningsFilter {
    pub fn to_filters(&self) -> Vec<FilterExpr<EarningColumn>> {
        let mut filters = Vec::new();
        if let Some(status) = self.status {
            filters.push(FilterExpr::Equals(
                EarningColumn::Status,
                FilterValue::Text(status.as_str().to_string()),
            ));
        }
        if self.from.is_some() || self.to.is_some() {
            filters.push(FilterExpr::Range {
                column: EarningColumn::CreatedAt,
                min: self.from.map(FilterValue::Timestamp),
                max: self.to.map(FilterValue::Timestamp),
            });
        }
        filters
    }
}

/// `BB-PO-YYYYMMDD-XXXXXXXX`
pub fn generate_payout_number(now: DateTime<Utc>) -> String {
    let mut suffix = Uuid::new_v4().simple().to_string();
    suffix.truncate(8);
    format!("BB-PO-{}-{}", now.format("%Y%m%d"), suffix.to_uppercase())
}

/// Sum of what a payout would carry, or why it cannot be requested.
pub fn payout_total(earnings: &[ProducerEarning], minimum: Decimal) -> Result<Decimal, AppError> {
    let total: Decimal = earnings.iter().map(|e| e.net_amount).sum();
    if earnings.is_empty() || total <= Decimal::ZERO {
        return Err(AppError::BadRequest("No available earnings to withdraw".into()));
    }
    if total < minimum {
        return Err(AppError::BadRequest(format!(
            "Available balance {} is below the minimum payout amount of {}",
            total, minimum
        )));
    }
    Ok(total)
}

#[derive(Clone)]
pub struct EarningsService {
    repo: EarningsRepository,
    user_repo: UserRepository,
    settings: SettingsService,
    pool: PgPool,
    currency: String,
}

impl EarningsService {
    pub fn new(
        repo: EarningsRepository,
        user_repo: UserRepository,
        settings: SettingsService,
        pool: PgPool,
        currency: String,
    ) -> Self {
        Self {
            repo,
            user_repo,
            settings,
            pool,
            currency,
        }
    }

    async fn producer_for(&self, user_id: Uuid) -> Result<ProducerProfile, AppError> {
        self.user_repo
            .find_producer_by_user(user_id)
            .await?
            .ok_or_else(|| AppError::Forbidden("A producer profile is required".into()))
    }

    pub async fn list(
        &self,
        user_id: Uuid,
        filter: &EarningsFilter,
        page: PageRequest,
    ) -> Result<(Vec<ProducerEarning>, i64), AppError> {
        if let (Some(from), Some(to)) = (filter.from, filter.to) {
            if from > to {
                return Err(AppError::BadRequest("'from' must not be after 'to'".into()));
            }
        }
        let producer = self.producer_for(user_id).await?;
        self.repo.list(producer.id, &filter.to_filters(), page).await
    }

    pub async fn summary(&self, user_id: Uuid) -> Result<EarningsSummary, AppError> {
        let producer = self.producer_for(user_id).await?;
        self.repo.summary(producer.id).await
    }

    /// Bundles every available earning into one pending payout.
    pub async fn request_payout(&self, user_id: Uuid) -> Result<Payout, AppError> {
        let producer = self.producer_for(user_id).await?;
        let payout_settings = self.settings.get_payout_settings().await?;

        let mut tx = self.pool.begin().await?;

        let earnings = self.repo.lock_available(&mut *tx, producer.id).await?;
        let amount = payout_total(&earnings, payout_settings.minimum_payout_amount)?;
        let currency = earnings
            .first()
            .map(|e| e.currency.clone())
            .unwrap_or_else(|| self.currency.clone());

        let payout = self
            .repo
            .insert_payout(&mut *tx, producer.id, &generate_payout_number(Utc::now()), amount, &currency)
            .await?;

        let ids: Vec<Uuid> = earnings.iter().map(|e| e.id).collect();
        let attached = self.repo.attach_to_payout(&mut *tx, &ids, payout.id).await?;
        if attached != ids.len() as u64 {
            return Err(AppError::Conflict("Earnings changed while the payout was being created".into()));
        }

        tx.commit().await?;
        tracing::info!(
            payout_id = %payout.id,
            producer_id = %producer.id,
            amount = %payout.amount,
            earnings = attached,
            "payout requested"
        );
        Ok(payout)
    }

    pub async fn list_payouts(&self, user_id: Uuid, page: PageRequest) -> Result<(Vec<Payout>, i64), AppError> {
        let producer = self.producer_for(user_id).await?;
        self.repo.list_payouts(producer.id, page).await
    }

    pub async fn release_matured(&self) -> Result<u64, AppError> {
        let released = self.repo.release_matured().await?;
        tracing::info!(released, "matured earnings released");
        Ok(released)
    }

    pub async fn complete_payout(&self, payout_id: Uuid, transaction_reference: Option<&str>) -> Result<Payout, AppError> {
        self.finish_payout(payout_id, PayoutStatus::Completed, transaction_reference, None)
            .await
    }

    pub async fn fail_payout(&self, payout_id: Uuid, reason: &str) -> Result<Payout, AppError> {
        self.finish_payout(payout_id, PayoutStatus::Failed, None, Some(reason))
            .await
    }

    async fn finish_payout(
        &self,
        payout_id: Uuid,
        status: PayoutStatus,
        transaction_reference: Option<&str>,
        failure_reason: Option<&str>,
    ) -> Result<Payout, AppError> {
        let earning_status = match status {
            PayoutStatus::Completed => EarningStatus::Paid,
            _ => EarningStatus::Available,
        };

        let mut tx = self.pool.begin().await?;

        let payout = self
            .repo
            .lock_payout(&mut *tx, payout_id)
            .await?
            .ok_or_else(|| AppError::not_found("Payout"))?;
        if !matches!(payout.status, PayoutStatus::Pending | PayoutStatus::Processing) {
            return Err(AppError::Conflict(format!(
                "Payout {} is already {:?}",
                payout.payout_number, payout.status
            )));
        }

        let moved = self
            .repo
            .transition_payout_earnings(&mut *tx, payout.id, earning_status)
            .await?;
        let payout = self
            .repo
            .finish_payout(&mut *tx, payout.id, status, transaction_reference, failure_reason)
            .await?;

        tx.commit().await?;
        tracing::info!(payout_id = %payout.id, status = ?payout.status, earnings = moved, "payout finished");
        Ok(payout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn earning(net: &str) -> ProducerEarning {
        ProducerEarning {
            id: Uuid::new_v4(),
            producer_id: Uuid::new_v4(),
            order_id: Uuid::new_v4(),
            order_item_id: Uuid::new_v4(),
            beat_id: None,
            gross_amount: d(net),
            platform_fee: Decimal::ZERO,
            net_amount: d(net),
            currency: "USD".into(),
            status: EarningStatus::Available,
            payout_id: None,
            available_at: None,
            paid_at: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn payout_requires_some_balance() {
        assert!(matches!(payout_total(&[], d("50")), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn payout_below_minimum_is_rejected() {
        let earnings = vec![earning("25.49"), earning("20.00")];
        let err = payout_total(&earnings, d("50")).unwrap_err();
        assert!(err.to_string().contains("45.49"));
    }

    #[test]
    fn payout_at_or_above_minimum_sums_net_amounts() {
        let earnings = vec![earning("25.49"), earning("24.51")];
        assert_eq!(payout_total(&earnings, d("50")).unwrap(), d("50.00"));
    }

    #[test]
    fn payout_numbers_are_prefixed_and_dated() {
        let now = DateTime::parse_from_rfc3339("2026-01-25T08:30:00Z").unwrap().with_timezone(&Utc);
        let number = generate_payout_number(now);
        assert!(number.starts_with("BB-PO-20260125-"));
        assert_eq!(number.len(), "BB-PO-20260125-".len() + 8);
    }

    #[test]
    fn filter_maps_status_and_dates() {
        let from = Utc::now();
        let filter = EarningsFilter {
            status: Some(EarningStatus::Pending),
            from: Some(from),
            to: None,
        };
        let exprs = filter.to_filters();
        assert_eq!(
            exprs[0],
            FilterExpr::Equals(EarningColumn::Status, FilterValue::Text("pending".into()))
        );
        assert_eq!(
            exprs[1],
            FilterExpr::Range {
                column: EarningColumn::CreatedAt,
                min: Some(FilterValue::Timestamp(from)),
                max: None,
            }
        );
        assert!(EarningsFilter::default().to_filters().is_empty());
    }
}
