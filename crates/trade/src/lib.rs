//! Trade calculations (purchases, production batches, sales).
//!
//! Every transaction the mill records boils down to the same arithmetic: an amount
//! (`quantity × rate`), a settlement (`due = total − paid`) and one or more stock
//! movements. This crate computes those; the stock ledger applies the movements.

pub mod error;
pub mod payment;
pub mod pricing;
pub mod production;
pub mod purchase;
pub mod sale;
pub mod transaction;

pub use error::TradeError;
pub use payment::{OverpaymentPolicy, Payment, Settlement, settle};
pub use pricing::{PricingBasis, line_total, round_money};
pub use production::{ProductionBatch, ProductionOutput};
pub use purchase::Purchase;
pub use sale::Sale;
pub use transaction::{StockEffect, Transaction};
