//! Read-model projections fed from published events.

pub mod stock_summary;

pub use stock_summary::{
    StockSummaryKey, StockSummaryProjection, StockSummaryProjectionError, StockSummaryRow,
};
