// src/models/settings.rs

use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use crate::common::error::AppError;

pub const PLATFORM_COMMISSION_RATE: &str = "platformCommissionRate";
pub const PROCESSING_FEE_PERCENTAGE: &str = "processingFeePercentage";
pub const PROCESSING_FEE_FIXED: &str = "processingFeeFixed";
pub const MINIMUM_PAYOUT_AMOUNT: &str = "minimumPayoutAmount";
pub const PAYOUT_FREQUENCY: &str = "payoutFrequency";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SettingType {
    String,
    Number,
    Boolean,
    Json,
}

impl SettingType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SettingType::String => "string",
            SettingType::Number => "number",
            SettingType::Boolean => "boolean",
            SettingType::Json => "json",
        }
    }

    pub fn parse(raw: &str) -> Self {
        match raw {
            "number" => SettingType::Number,
            "boolean" => SettingType::Boolean,
            "json" => SettingType::Json,
            _ => SettingType::String,
        }
    }
}

/// Raw `platform_settings` row.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PlatformSetting {
    #[schema(example = "platformCommissionRate")]
    pub key: String,
    #[schema(example = "15")]
    pub value: String,
    #[schema(example = "number")]
    pub value_type: String,
    #[schema(example = "fees")]
    pub category: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PlatformSetting {
    pub fn setting_type(&self) -> SettingType {
        SettingType::parse(&self.value_type)
    }

    /// Lenient read used for snapshots: a stored value that no longer parses
    /// falls back to its raw text.
    pub fn typed_value(&self) -> SettingValue {
        SettingValue::parse(&self.value, self.setting_type())
            .unwrap_or_else(|_| SettingValue::Text(self.value.clone()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(untagged)]
pub enum SettingValue {
    Text(String),
    Number(Decimal),
    Boolean(bool),
    #[schema(value_type = Object)]
    Json(serde_json::Value),
}

impl SettingValue {
    /// Strict parse used on writes.
    pub fn parse(raw: &str, kind: SettingType) -> Result<Self, AppError> {
        let raw = raw.trim();
        match kind {
            SettingType::String => Ok(SettingValue::Text(raw.to_string())),
            SettingType::Number => Decimal::from_str(raw)
                .map(SettingValue::Number)
                .map_err(|_| AppError::BadRequest(format!("'{}' is not a number", raw))),
            SettingType::Boolean => match raw {
                "true" | "1" => Ok(SettingValue::Boolean(true)),
                "false" | "0" => Ok(SettingValue::Boolean(false)),
                _ => Err(AppError::BadRequest(format!("'{}' is not a boolean", raw))),
            },
            SettingType::Json => serde_json::from_str(raw)
                .map(SettingValue::Json)
                .map_err(|_| AppError::BadRequest("Value is not valid JSON".into())),
        }
    }

    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            SettingValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            SettingValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

/// Fee inputs read on every price computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FeeSettings {
    #[schema(example = "15")]
    pub platform_commission_rate: Decimal,
    #[schema(example = "2.9")]
    pub processing_fee_percentage: Decimal,
    #[schema(example = "0.30")]
    pub processing_fee_fixed: Decimal,
}

impl Default for FeeSettings {
    fn default() -> Self {
        Self {
            platform_commission_rate: Decimal::new(15, 0),
            processing_fee_percentage: Decimal::new(29, 1),
            processing_fee_fixed: Decimal::new(30, 2),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PayoutSettings {
    pub minimum_payout_amount: Decimal,
    pub payout_frequency: String,
}

impl Default for PayoutSettings {
    fn default() -> Self {
        Self {
            minimum_payout_amount: Decimal::new(50, 0),
            payout_frequency: "weekly".to_string(),
        }
    }
}

/// Result of pricing a subtotal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FeeBreakdown {
    pub subtotal: Decimal,
    pub processing_fee: Decimal,
    pub platform_fee: Decimal,
    pub producer_earnings: Decimal,
    pub total: Decimal,
    pub platform_commission_rate: Decimal,
}

// ---
// Payloads
// ---

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateSettingPayload {
    #[validate(length(min = 1, max = 100))]
    pub key: String,
    pub value: String,
    pub value_type: SettingType,
    #[validate(length(min = 1, max = 50))]
    pub category: String,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSettingPayload {
    pub value: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn values_parse_by_declared_type() {
        assert_eq!(
            SettingValue::parse("2.9", SettingType::Number).unwrap(),
            SettingValue::Number(Decimal::new(29, 1))
        );
        assert_eq!(
            SettingValue::parse("1", SettingType::Boolean).unwrap(),
            SettingValue::Boolean(true)
        );
        assert_eq!(
            SettingValue::parse("{\"a\":1}", SettingType::Json).unwrap(),
            SettingValue::Json(serde_json::json!({"a": 1}))
        );
        assert_eq!(
            SettingValue::parse("weekly", SettingType::String).unwrap(),
            SettingValue::Text("weekly".into())
        );
    }

    #[test]
    fn bad_values_are_rejected_on_write() {
        assert!(SettingValue::parse("fifteen", SettingType::Number).is_err());
        assert!(SettingValue::parse("yes", SettingType::Boolean).is_err());
        assert!(SettingValue::parse("{", SettingType::Json).is_err());
    }

    #[test]
    fn unknown_type_names_fall_back_to_string() {
        assert_eq!(SettingType::parse("mystery"), SettingType::String);
        assert_eq!(SettingType::parse("number").as_str(), "number");
    }

    #[test]
    fn fee_defaults_match_seeded_rates() {
        let fees = FeeSettings::default();
        assert_eq!(fees.platform_commission_rate.to_string(), "15");
        assert_eq!(fees.processing_fee_percentage.to_string(), "2.9");
        assert_eq!(fees.processing_fee_fixed.to_string(), "0.30");
    }
}
