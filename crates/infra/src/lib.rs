//! Infrastructure layer: event storage, command dispatch, read models, config.

pub mod command_dispatcher;
pub mod config;
pub mod event_store;
pub mod projections;
pub mod read_model;
pub mod service;


pub use command_dispatcher::{CommandDispatcher, DispatchError};
pub use config::{ConfigError, MillConfig};
pub use service::{RecordedTransaction, ServiceError, StockService};
