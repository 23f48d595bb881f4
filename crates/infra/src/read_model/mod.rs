//! Mill-isolated read model storage abstractions.

pub mod mill_store;

pub use mill_store::{InMemoryMillStore, MillStore};
