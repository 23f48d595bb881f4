//! Stock domain module (event-sourced).
//!
//! Quantities of paddy, rice and bran are kept as whole sacks ("bosta") plus a loose
//! kilogram remainder. This crate holds the unit-conversion model and the stock ledger
//! that keeps per-type balances consistent, implemented purely as deterministic domain
//! logic (no IO, no HTTP, no storage).

pub mod commodity;
pub mod error;
pub mod ledger;
pub mod quantity;

pub use commodity::{Commodity, Direction, StockMovement, TypeName};
pub use error::StockError;
pub use ledger::{
    LedgerOpened, OpenLedger, RecordMovements, SackPolicy, Stock, StockAdjusted, StockLedger,
    StockLedgerCommand, StockLedgerEvent, StockLedgerId,
};
pub use quantity::{Quantity, SackSize, kg_to_sacks, normalize, round_kg, sacks_to_kg, total_kg};
