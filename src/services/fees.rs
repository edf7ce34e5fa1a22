// src/services/fees.rs

use rust_decimal::{Decimal, RoundingStrategy};

use crate::models::settings::{FeeBreakdown, FeeSettings};

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

/// Platform/producer share of one line price.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineSplit {
    pub platform_fee: Decimal,
    pub producer_earnings: Decimal,
}

/// Two decimals, half-up on cents.
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

pub fn split_line(price: Decimal, fees: &FeeSettings) -> LineSplit {
    let platform_fee = round_money(price * fees.platform_commission_rate / HUNDRED);
    LineSplit {
        platform_fee,
        producer_earnings: price - platform_fee,
    }
}

/// Prices a subtotal. The rounded parts always add back up exactly:
/// `total = subtotal + processing_fee` and
/// `subtotal = platform_fee + producer_earnings`.
pub fn calculate(subtotal: Decimal, fees: &FeeSettings) -> FeeBreakdown {
    let subtotal = round_money(subtotal);
    let processing_fee =
        round_money(subtotal * fees.processing_fee_percentage / HUNDRED + fees.processing_fee_fixed);
    let split = split_line(subtotal, fees);

    FeeBreakdown {
        subtotal,
        processing_fee,
        platform_fee: split.platform_fee,
        producer_earnings: split.producer_earnings,
        total: subtotal + processing_fee,
        platform_commission_rate: fees.platform_commission_rate,
    }
}
