use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use ricemill_stock::Quantity;

use crate::error::TradeError;

/// Money is kept to this many decimal places.
pub const MONEY_DECIMAL_PLACES: u32 = 2;

/// What a rate is quoted per.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PricingBasis {
    /// Rate per kilogram of total weight (paddy, bran, rice bought by weight).
    #[default]
    PerKg,
    /// Rate per full sack; loose kilograms are not charged.
    PerSack,
}

pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(MONEY_DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
}

/// `quantity basis × rate`, rounded to money precision.
pub fn line_total(quantity: &Quantity, rate: Decimal, basis: PricingBasis) -> Result<Decimal, TradeError> {
    if rate <= Decimal::ZERO {
        return Err(TradeError::NonPositiveAmount {
            field: "rate",
            value: rate,
        });
    }

    let units = match basis {
        PricingBasis::PerKg => quantity.total_kg()?,
        PricingBasis::PerSack => Decimal::from(quantity.sack_count()),
    };

    let total = units
        .checked_mul(rate)
        .ok_or(TradeError::AmountOutOfRange {
            field: "total_amount",
        })?;
    Ok(round_money(total))
}
