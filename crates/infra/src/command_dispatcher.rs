//! Command execution pipeline for event-sourced aggregates.
//!
//! ```text
//! Command
//!   ↓ 1. load the aggregate's stream (mill-scoped)
//!   ↓ 2. rehydrate by applying every stored event
//!   ↓ 3. handle the command (pure decision, produces events)
//!   ↓ 4. append with ExpectedVersion::Exact(loaded version)
//!   ↓ 5. publish the committed events
//! ```
//!
//! Step 4 is the compare-and-swap that keeps concurrent read-compute-write cycles on
//! the same stock ledger from losing updates: a writer that loaded a stale version
//! gets `DispatchError::Concurrency` and must reload.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use thiserror::Error;
use uuid::Uuid;

use ricemill_core::{Aggregate, AggregateId, DomainError, ExpectedVersion, MillId};
use ricemill_events::{EventBus, EventEnvelope};
use ricemill_stock::StockError;

use crate::event_store::{EventStore, EventStoreError, StoredEvent, UncommittedEvent};

#[derive(Debug, Error)]
pub enum DispatchError {
    /// Stale aggregate version; reload and retry.
    #[error("optimistic concurrency check failed: {0}")]
    Concurrency(String),

    #[error("mill isolation violation: {0}")]
    MillIsolation(String),

    /// The aggregate refused the command (validation, invariant, insufficient stock).
    #[error("command rejected: {0}")]
    Rejected(StockError),

    #[error("aggregate not found")]
    NotFound,

    #[error("failed to deserialize stored event: {0}")]
    Deserialize(String),

    #[error(transparent)]
    Store(EventStoreError),

    /// Publication failed after a successful append; the events are persisted.
    #[error("event publication failed: {0}")]
    Publish(String),
}

impl DispatchError {
    pub fn is_concurrency(&self) -> bool {
        matches!(self, DispatchError::Concurrency(_))
    }
}

impl From<EventStoreError> for DispatchError {
    fn from(value: EventStoreError) -> Self {
        match value {
            EventStoreError::Concurrency(msg) => DispatchError::Concurrency(msg),
            EventStoreError::MillIsolation(msg) => DispatchError::MillIsolation(msg),
            other => DispatchError::Store(other),
        }
    }
}

impl From<StockError> for DispatchError {
    fn from(value: StockError) -> Self {
        match value {
            StockError::Domain(DomainError::NotFound) => DispatchError::NotFound,
            other => DispatchError::Rejected(other),
        }
    }
}

/// Reusable command execution engine (store + bus injected).
#[derive(Debug)]
pub struct CommandDispatcher<S, B> {
    store: S,
    bus: B,
}

impl<S, B> CommandDispatcher<S, B> {
    pub fn new(store: S, bus: B) -> Self {
        Self { store, bus }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_parts(self) -> (S, B) {
        (self.store, self.bus)
    }
}

impl<S, B> CommandDispatcher<S, B>
where
    S: EventStore,
    B: EventBus<EventEnvelope<JsonValue>>,
{
    /// Run `command` against the aggregate's current state and commit the result.
    ///
    /// Returns the committed events; an empty vector when the command decided nothing.
    pub fn dispatch<A>(
        &self,
        mill_id: MillId,
        aggregate_id: AggregateId,
        aggregate_type: impl Into<String>,
        command: A::Command,
        make_aggregate: impl FnOnce(MillId, AggregateId) -> A,
    ) -> Result<Vec<StoredEvent>, DispatchError>
    where
        A: Aggregate,
        A::Error: Into<DispatchError>,
        A::Event: ricemill_events::Event + Serialize + DeserializeOwned,
    {
        let history = self.store.load_stream(mill_id, aggregate_id)?;
        validate_loaded_stream(mill_id, aggregate_id, &history)?;
        let expected = ExpectedVersion::Exact(stream_version(&history));

        let mut aggregate = make_aggregate(mill_id, aggregate_id);
        apply_history(&mut aggregate, &history)?;

        let decided = aggregate
            .handle(&command)
            .map_err(Into::<DispatchError>::into)?;
        if decided.is_empty() {
            return Ok(vec![]);
        }

        let aggregate_type = aggregate_type.into();
        let uncommitted = decided
            .iter()
            .map(|ev| {
                UncommittedEvent::from_typed(
                    mill_id,
                    aggregate_id,
                    aggregate_type.clone(),
                    Uuid::now_v7(),
                    ev,
                )
            })
            .collect::<Result<Vec<_>, _>>()?;

        let committed = self.store.append(uncommitted, expected)?;

        for stored in &committed {
            self.bus
                .publish(stored.to_envelope())
                .map_err(|e| DispatchError::Publish(format!("{e:?}")))?;
        }

        Ok(committed)
    }

    /// Rehydrate an aggregate without handling a command.
    pub fn load<A>(
        &self,
        mill_id: MillId,
        aggregate_id: AggregateId,
        make_aggregate: impl FnOnce(MillId, AggregateId) -> A,
    ) -> Result<A, DispatchError>
    where
        A: Aggregate,
        A::Event: DeserializeOwned,
    {
        let history = self.store.load_stream(mill_id, aggregate_id)?;
        validate_loaded_stream(mill_id, aggregate_id, &history)?;

        let mut aggregate = make_aggregate(mill_id, aggregate_id);
        apply_history(&mut aggregate, &history)?;
        Ok(aggregate)
    }
}

fn stream_version(stream: &[StoredEvent]) -> u64 {
    stream.last().map(|e| e.sequence_number).unwrap_or(0)
}

fn validate_loaded_stream(
    mill_id: MillId,
    aggregate_id: AggregateId,
    stream: &[StoredEvent],
) -> Result<(), DispatchError> {
    let mut last = 0u64;
    for (idx, e) in stream.iter().enumerate() {
        if e.mill_id != mill_id {
            return Err(DispatchError::MillIsolation(format!(
                "loaded stream contains wrong mill_id at index {idx}"
            )));
        }
        if e.aggregate_id != aggregate_id {
            return Err(DispatchError::MillIsolation(format!(
                "loaded stream contains wrong aggregate_id at index {idx}"
            )));
        }
        if e.sequence_number <= last {
            return Err(DispatchError::Store(EventStoreError::InvalidAppend(format!(
                "non-monotonic sequence_number in loaded stream (last={last}, found={})",
                e.sequence_number
            ))));
        }
        last = e.sequence_number;
    }
    Ok(())
}

fn apply_history<A>(aggregate: &mut A, history: &[StoredEvent]) -> Result<(), DispatchError>
where
    A: Aggregate,
    A::Event: DeserializeOwned,
{
    // `validate_loaded_stream` already guarantees sequence order.
    for stored in history {
        let ev: A::Event = serde_json::from_value(stored.payload.clone())
            .map_err(|e| DispatchError::Deserialize(e.to_string()))?;
        aggregate.apply(&ev);
    }

    Ok(())
}
