use std::collections::HashMap;
use std::sync::RwLock;

use ricemill_core::{AggregateId, ExpectedVersion, MillId};

use super::r#trait::{EventStore, EventStoreError, StoredEvent, UncommittedEvent};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
struct StreamKey {
    mill_id: MillId,
    aggregate_id: AggregateId,
}

/// In-memory append-only event store (tests, CLI replays).
#[derive(Debug, Default)]
pub struct InMemoryEventStore {
    streams: RwLock<HashMap<StreamKey, Vec<StoredEvent>>>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn current_version(stream: &[StoredEvent]) -> u64 {
        stream.last().map(|e| e.sequence_number).unwrap_or(0)
    }
}

impl EventStore for InMemoryEventStore {
    fn append(
        &self,
        events: Vec<UncommittedEvent>,
        expected_version: ExpectedVersion,
    ) -> Result<Vec<StoredEvent>, EventStoreError> {
        let Some(first) = events.first() else {
            return Ok(vec![]);
        };

        let mill_id = first.mill_id;
        let aggregate_id = first.aggregate_id;
        let aggregate_type = first.aggregate_type.clone();

        for (idx, e) in events.iter().enumerate() {
            if e.mill_id != mill_id {
                return Err(EventStoreError::MillIsolation(format!(
                    "batch contains multiple mill_ids (index {idx})"
                )));
            }
            if e.aggregate_id != aggregate_id {
                return Err(EventStoreError::InvalidAppend(format!(
                    "batch contains multiple aggregate_ids (index {idx})"
                )));
            }
            if e.aggregate_type != aggregate_type {
                return Err(EventStoreError::AggregateTypeMismatch(format!(
                    "batch contains multiple aggregate_types (index {idx})"
                )));
            }
        }

        let key = StreamKey {
            mill_id,
            aggregate_id,
        };

        let mut streams = self
            .streams
            .write()
            .map_err(|_| EventStoreError::InvalidAppend("lock poisoned".to_string()))?;

        let stream = streams.entry(key).or_default();
        let current = Self::current_version(stream);

        if !expected_version.matches(current) {
            return Err(EventStoreError::Concurrency(format!(
                "expected {expected_version:?}, found {current}"
            )));
        }

        if let Some(existing) = stream.first() {
            if existing.aggregate_type != aggregate_type {
                return Err(EventStoreError::AggregateTypeMismatch(format!(
                    "stream aggregate_type is '{}', attempted append with '{}'",
                    existing.aggregate_type, aggregate_type
                )));
            }
        }

        let mut committed = Vec::with_capacity(events.len());
        for (offset, e) in events.into_iter().enumerate() {
            committed.push(StoredEvent {
                event_id: e.event_id,
                mill_id: e.mill_id,
                aggregate_id: e.aggregate_id,
                aggregate_type: e.aggregate_type,
                sequence_number: current + 1 + offset as u64,
                event_type: e.event_type,
                event_version: e.event_version,
                occurred_at: e.occurred_at,
                payload: e.payload,
            });
        }
        stream.extend(committed.iter().cloned());

        Ok(committed)
    }

    fn load_stream(
        &self,
        mill_id: MillId,
        aggregate_id: AggregateId,
    ) -> Result<Vec<StoredEvent>, EventStoreError> {
        let key = StreamKey {
            mill_id,
            aggregate_id,
        };

        let streams = self
            .streams
            .read()
            .map_err(|_| EventStoreError::InvalidAppend("lock poisoned".to_string()))?;

        Ok(streams.get(&key).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn event(mill_id: MillId, aggregate_id: AggregateId) -> UncommittedEvent {
        UncommittedEvent {
            event_id: Uuid::now_v7(),
            mill_id,
            aggregate_id,
            aggregate_type: "stock.ledger".to_string(),
            event_type: "stock.ledger.adjusted".to_string(),
            event_version: 1,
            occurred_at: Utc::now(),
            payload: serde_json::json!({}),
        }
    }

    #[test]
    fn append_assigns_consecutive_sequence_numbers() {
        let store = InMemoryEventStore::new();
        let mill_id = MillId::new();
        let aggregate_id = AggregateId::new();

        let first = store
            .append(vec![event(mill_id, aggregate_id)], ExpectedVersion::Exact(0))
            .unwrap();
        let second = store
            .append(
                vec![event(mill_id, aggregate_id), event(mill_id, aggregate_id)],
                ExpectedVersion::Exact(1),
            )
            .unwrap();

        assert_eq!(first[0].sequence_number, 1);
        assert_eq!(
            second.iter().map(|e| e.sequence_number).collect::<Vec<_>>(),
            vec![2, 3]
        );
        assert_eq!(store.load_stream(mill_id, aggregate_id).unwrap().len(), 3);
    }

    #[test]
    fn stale_expected_version_is_rejected() {
        let store = InMemoryEventStore::new();
        let mill_id = MillId::new();
        let aggregate_id = AggregateId::new();

        store
            .append(vec![event(mill_id, aggregate_id)], ExpectedVersion::Exact(0))
            .unwrap();
        let err = store
            .append(vec![event(mill_id, aggregate_id)], ExpectedVersion::Exact(0))
            .unwrap_err();

        assert!(matches!(err, EventStoreError::Concurrency(_)));
        assert_eq!(store.load_stream(mill_id, aggregate_id).unwrap().len(), 1);
    }

    #[test]
    fn mixed_mill_batch_is_rejected() {
        let store = InMemoryEventStore::new();
        let aggregate_id = AggregateId::new();
        let err = store
            .append(
                vec![event(MillId::new(), aggregate_id), event(MillId::new(), aggregate_id)],
                ExpectedVersion::Any,
            )
            .unwrap_err();
        assert!(matches!(err, EventStoreError::MillIsolation(_)));
    }

    #[test]
    fn streams_are_isolated_per_mill() {
        let store = InMemoryEventStore::new();
        let aggregate_id = AggregateId::new();
        let mill_a = MillId::new();

        store
            .append(vec![event(mill_a, aggregate_id)], ExpectedVersion::Exact(0))
            .unwrap();

        assert!(store.load_stream(MillId::new(), aggregate_id).unwrap().is_empty());
    }
}
