use rust_decimal::Decimal;
use thiserror::Error;

use ricemill_stock::{Commodity, StockError};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TradeError {
    #[error("{field} cannot be negative (got {value})")]
    NegativeAmount { field: &'static str, value: Decimal },

    #[error("{field} must be positive (got {value})")]
    NonPositiveAmount { field: &'static str, value: Decimal },

    /// Only raised under `OverpaymentPolicy::Reject`.
    #[error("paid amount {paid} exceeds total {total}")]
    Overpaid { total: Decimal, paid: Decimal },

    #[error("production batch must produce at least one output")]
    NoProductionOutput,

    #[error("production output cannot be {0}")]
    InvalidOutputCommodity(Commodity),

    #[error("production output {output_kg} kg exceeds paddy consumed {input_kg} kg")]
    OutputExceedsInput { output_kg: Decimal, input_kg: Decimal },

    /// The amount does not fit a decimal (absurd quantities or rates).
    #[error("{field} is out of range")]
    AmountOutOfRange { field: &'static str },

    #[error(transparent)]
    Stock(#[from] StockError),
}
