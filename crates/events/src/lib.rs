//! Domain events and their distribution.
//!
//! Events are immutable facts about the mill (stock received, stock issued).
//! They are appended to a stream first and published over an [`EventBus`] afterwards.

pub mod bus;
pub mod envelope;
pub mod event;
pub mod in_memory_bus;

pub use bus::{EventBus, Subscription};
pub use envelope::EventEnvelope;
pub use event::Event;
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};
