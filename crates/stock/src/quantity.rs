//! Sack + loose-kilogram quantity model.
//!
//! A quantity of a bulk commodity is a number of full standard sacks ("bosta") plus a
//! loose remainder in kilograms. [`normalize`] folds any kilogram total back into that
//! shape so that the loose part is always smaller than one sack.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use ricemill_core::ValueObject;

use crate::error::StockError;

/// Loose kilograms are kept to this many decimal places.
pub const KG_DECIMAL_PLACES: u32 = 2;

/// Weight of one standard sack, in kilograms.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct SackSize(Decimal);

impl SackSize {
    pub const KG_25: SackSize = SackSize(Decimal::from_parts(25, 0, 0, false, 0));
    pub const KG_50: SackSize = SackSize(Decimal::from_parts(50, 0, 0, false, 0));

    /// Sizes the mill packs in unless configured otherwise.
    pub const STANDARD: [SackSize; 2] = [Self::KG_25, Self::KG_50];

    /// Reject zero and negative sizes up front so conversions never divide by zero.
    pub fn new(kg: Decimal) -> Result<Self, StockError> {
        if kg <= Decimal::ZERO {
            return Err(StockError::InvalidSackSize(kg));
        }
        Ok(Self(kg.normalize()))
    }

    pub fn kg(self) -> Decimal {
        self.0
    }
}

impl Default for SackSize {
    fn default() -> Self {
        Self::KG_50
    }
}

impl TryFrom<Decimal> for SackSize {
    type Error = StockError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<SackSize> for Decimal {
    fn from(value: SackSize) -> Self {
        value.0
    }
}

impl core::fmt::Display for SackSize {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}kg", self.0)
    }
}

/// Round a kilogram value to [`KG_DECIMAL_PLACES`], halves away from zero.
pub fn round_kg(kg: Decimal) -> Decimal {
    kg.round_dp_with_strategy(KG_DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
}

pub fn sacks_to_kg(sack_count: u64, sack_size: SackSize) -> Result<Decimal, StockError> {
    Decimal::from(sack_count)
        .checked_mul(sack_size.kg())
        .ok_or(StockError::OutOfRange(sack_size.kg()))
}

/// Fractional sack count, for display and estimates only.
pub fn kg_to_sacks(kg: Decimal, sack_size: SackSize) -> Result<Decimal, StockError> {
    kg.checked_div(sack_size.kg())
        .ok_or(StockError::OutOfRange(kg))
}

pub fn total_kg(loose_kg: Decimal, sack_count: u64, sack_size: SackSize) -> Result<Decimal, StockError> {
    loose_kg
        .checked_add(sacks_to_kg(sack_count, sack_size)?)
        .ok_or(StockError::OutOfRange(loose_kg))
}

/// Re-express a kilogram total as full sacks plus a loose remainder below one sack.
///
/// Negative totals are rejected rather than folded into a negative sack count.
pub fn normalize(total_kg: Decimal, sack_size: SackSize) -> Result<Quantity, StockError> {
    if total_kg < Decimal::ZERO {
        return Err(StockError::negative("total_kg", total_kg));
    }

    let size = sack_size.kg();
    let remainder = total_kg % size;
    let mut sack_count = (total_kg - remainder)
        .checked_div(size)
        .and_then(|sacks| sacks.round().to_u64())
        .ok_or(StockError::OutOfRange(total_kg))?;

    let mut loose_kg = round_kg(remainder);
    // Rounding can lift e.g. 49.996 to a full 50.00; carry it into the sack count.
    if loose_kg >= size {
        sack_count = sack_count
            .checked_add(1)
            .ok_or(StockError::OutOfRange(total_kg))?;
        loose_kg -= size;
    }

    Ok(Quantity {
        loose_kg: loose_kg.normalize(),
        sack_count,
        sack_size,
    })
}

/// A commodity quantity: `sack_count` full sacks of `sack_size` plus `loose_kg`.
///
/// Incoming transaction quantities need not be normalized (a farmer may deliver
/// 5 bosta weighing 208 kg in total). Balances held by a ledger always are.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawQuantity")]
pub struct Quantity {
    loose_kg: Decimal,
    sack_count: u64,
    #[serde(rename = "sack_size_kg")]
    sack_size: SackSize,
}

impl ValueObject for Quantity {}

impl Quantity {
    pub fn new(loose_kg: Decimal, sack_count: u64, sack_size: SackSize) -> Result<Self, StockError> {
        if loose_kg < Decimal::ZERO {
            return Err(StockError::negative("loose_kg", loose_kg));
        }
        Ok(Self {
            loose_kg: loose_kg.normalize(),
            sack_count,
            sack_size,
        })
    }

    pub fn zero(sack_size: SackSize) -> Self {
        Self {
            loose_kg: Decimal::ZERO,
            sack_count: 0,
            sack_size,
        }
    }

    /// Only loose kilograms, no sacks (e.g. bran weighed on the scale).
    pub fn loose(kg: Decimal, sack_size: SackSize) -> Result<Self, StockError> {
        Self::new(kg, 0, sack_size)
    }

    pub fn sacks(sack_count: u64, sack_size: SackSize) -> Self {
        Self {
            loose_kg: Decimal::ZERO,
            sack_count,
            sack_size,
        }
    }

    /// Normalized quantity for a kilogram total.
    pub fn from_kg(total_kg: Decimal, sack_size: SackSize) -> Result<Self, StockError> {
        normalize(total_kg, sack_size)
    }

    pub fn loose_kg(&self) -> Decimal {
        self.loose_kg
    }

    pub fn sack_count(&self) -> u64 {
        self.sack_count
    }

    pub fn sack_size(&self) -> SackSize {
        self.sack_size
    }

    /// Fails with `OutOfRange` when the weight is not representable.
    pub fn total_kg(&self) -> Result<Decimal, StockError> {
        total_kg(self.loose_kg, self.sack_count, self.sack_size)
    }

    /// Total weight expressed in (fractional) sacks of this quantity's size.
    pub fn in_sacks(&self) -> Result<Decimal, StockError> {
        kg_to_sacks(self.total_kg()?, self.sack_size)
    }

    pub fn is_zero(&self) -> bool {
        self.loose_kg.is_zero() && self.sack_count == 0
    }

    pub fn is_normalized(&self) -> bool {
        self.loose_kg < self.sack_size.kg()
    }

    /// Same weight, re-packed into sacks of this quantity's size.
    pub fn normalized(&self) -> Result<Self, StockError> {
        normalize(self.total_kg()?, self.sack_size)
    }
}

/// Renders `8 KG`, `3 Bosta (50kg)` or `8 KG + 3 Bosta (50kg)`; zero parts are
/// omitted and an empty quantity renders as `0 KG`.
impl core::fmt::Display for Quantity {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let mut parts = Vec::with_capacity(2);
        if !self.loose_kg.is_zero() {
            parts.push(format!("{} KG", self.loose_kg.normalize()));
        }
        if self.sack_count > 0 {
            parts.push(format!("{} Bosta ({})", self.sack_count, self.sack_size));
        }

        if parts.is_empty() {
            f.write_str("0 KG")
        } else {
            f.write_str(&parts.join(" + "))
        }
    }
}

/// Wire form; `sack_size_kg` is required.
#[derive(Deserialize)]
struct RawQuantity {
    #[serde(default)]
    loose_kg: Decimal,
    #[serde(default)]
    sack_count: u64,
    sack_size_kg: SackSize,
}

impl TryFrom<RawQuantity> for Quantity {
    type Error = StockError;

    fn try_from(raw: RawQuantity) -> Result<Self, Self::Error> {
        Quantity::new(raw.loose_kg, raw.sack_count, raw.sack_size_kg)
    }
}
