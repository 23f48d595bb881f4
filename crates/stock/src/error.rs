use rust_decimal::Decimal;
use thiserror::Error;

use ricemill_core::DomainError;

use crate::commodity::Commodity;
use crate::quantity::SackSize;

/// Stock-level failure.
///
/// Every variant is deterministic: the same balance and the same movement always
/// fail the same way, and a failed movement never changes a balance.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StockError {
    /// Sack sizes are fixed per ledger and must be positive.
    #[error("sack size must be positive (got {0} kg)")]
    InvalidSackSize(Decimal),

    #[error("sack size {0} is not allowed for this ledger")]
    SackSizeNotAllowed(SackSize),

    /// Physical quantities cannot be negative.
    #[error("{field} cannot be negative (got {value})")]
    NegativeQuantity { field: &'static str, value: Decimal },

    #[error("quantity out of range: {0} kg")]
    OutOfRange(Decimal),

    #[error("type name cannot be empty")]
    EmptyTypeName,

    #[error("movement quantity must be greater than zero")]
    ZeroMovement,

    /// A withdrawal larger than the current balance.
    #[error(
        "insufficient {commodity} stock for '{type_name}': requested {requested_kg} kg, available {available_kg} kg"
    )]
    InsufficientStock {
        commodity: Commodity,
        type_name: String,
        requested_kg: Decimal,
        available_kg: Decimal,
    },

    #[error(transparent)]
    Domain(#[from] DomainError),
}

impl StockError {
    pub fn negative(field: &'static str, value: Decimal) -> Self {
        Self::NegativeQuantity { field, value }
    }

    pub fn is_insufficient_stock(&self) -> bool {
        matches!(self, Self::InsufficientStock { .. })
    }
}
