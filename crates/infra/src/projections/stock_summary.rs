use std::collections::HashMap;
use std::sync::RwLock;

use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value as JsonValue;
use thiserror::Error;

use ricemill_core::{AggregateId, MillId};
use ricemill_events::EventEnvelope;
use ricemill_stock::{Commodity, Direction, Quantity, StockLedgerEvent, StockLedgerId, TypeName};

use crate::read_model::MillStore;

/// One row of the stock summary: current balance and lifetime movement totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StockSummaryRow {
    pub commodity: Commodity,
    pub type_name: TypeName,
    pub balance: Quantity,
    pub received_kg: Decimal,
    pub issued_kg: Decimal,
    pub movements: u64,
}

pub type StockSummaryKey = (Commodity, TypeName);

/// Envelopes of other event types are not stock movements and are skipped.
const STOCK_LEDGER_EVENT_PREFIX: &str = "stock.ledger.";

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
struct CursorKey {
    mill_id: MillId,
    aggregate_id: AggregateId,
}

#[derive(Debug, Error)]
pub enum StockSummaryProjectionError {
    #[error("failed to deserialize stock event: {0}")]
    Deserialize(String),

    #[error("mill isolation violation: {0}")]
    MillIsolation(String),

    #[error("non-monotonic sequence number (last={last}, found={found})")]
    NonMonotonicSequence { last: u64, found: u64 },

    #[error("movement totals out of range for {0}")]
    TotalOutOfRange(String),

    #[error("projection cursor lock poisoned")]
    Poisoned,
}

/// Stock summary projection.
///
/// Consumes published ledger envelopes and keeps one row per commodity type.
/// Rows are disposable and can be rebuilt from the event stream; envelopes at or
/// below the stream cursor are ignored, so redelivery is harmless.
#[derive(Debug)]
pub struct StockSummaryProjection<S>
where
    S: MillStore<StockSummaryKey, StockSummaryRow>,
{
    store: S,
    cursors: RwLock<HashMap<CursorKey, u64>>,
}

impl<S> StockSummaryProjection<S>
where
    S: MillStore<StockSummaryKey, StockSummaryRow>,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            cursors: RwLock::new(HashMap::new()),
        }
    }

    pub fn get(&self, mill_id: MillId, commodity: Commodity, type_name: &TypeName) -> Option<StockSummaryRow> {
        self.store.get(mill_id, &(commodity, type_name.clone()))
    }

    /// Every row of a mill, ordered by commodity then type name.
    pub fn list(&self, mill_id: MillId) -> Vec<StockSummaryRow> {
        self.store.list(mill_id)
    }

    pub fn list_commodity(&self, mill_id: MillId, commodity: Commodity) -> Vec<StockSummaryRow> {
        self.list(mill_id)
            .into_iter()
            .filter(|row| row.commodity == commodity)
            .collect()
    }

    pub fn apply_envelope(&self, envelope: &EventEnvelope<JsonValue>) -> Result<(), StockSummaryProjectionError> {
        if !envelope.event_type().starts_with(STOCK_LEDGER_EVENT_PREFIX) {
            return Ok(());
        }

        let mill_id = envelope.mill_id();
        let aggregate_id = envelope.aggregate_id();
        let seq = envelope.sequence_number();

        let mut cursors = self
            .cursors
            .write()
            .map_err(|_| StockSummaryProjectionError::Poisoned)?;
        let key = CursorKey { mill_id, aggregate_id };
        let last = cursors.get(&key).copied().unwrap_or(0);

        if seq == 0 {
            return Err(StockSummaryProjectionError::NonMonotonicSequence { last, found: seq });
        }
        if seq <= last {
            // Redelivery.
            return Ok(());
        }
        if seq != last + 1 && last != 0 {
            return Err(StockSummaryProjectionError::NonMonotonicSequence { last, found: seq });
        }

        let event: StockLedgerEvent = serde_json::from_value(envelope.payload().clone())
            .map_err(|e| StockSummaryProjectionError::Deserialize(e.to_string()))?;

        match event {
            StockLedgerEvent::LedgerOpened(e) => {
                ensure_same_stream(e.mill_id, e.ledger_id, mill_id, aggregate_id)?;
            }
            StockLedgerEvent::StockAdjusted(e) => {
                ensure_same_stream(e.mill_id, e.ledger_id, mill_id, aggregate_id)?;

                let row_key = (e.commodity, e.type_name.clone());
                let mut row = self.store.get(mill_id, &row_key).unwrap_or(StockSummaryRow {
                    commodity: e.commodity,
                    type_name: e.type_name.clone(),
                    balance: e.balance,
                    received_kg: Decimal::ZERO,
                    issued_kg: Decimal::ZERO,
                    movements: 0,
                });
                let total = match e.direction {
                    Direction::Add => &mut row.received_kg,
                    Direction::Subtract => &mut row.issued_kg,
                };
                *total = total.checked_add(e.change_kg).ok_or_else(|| {
                    StockSummaryProjectionError::TotalOutOfRange(e.type_name.to_string())
                })?;
                row.balance = e.balance;
                row.movements += 1;
                self.store.upsert(mill_id, row_key, row);
            }
        }

        cursors.insert(key, seq);
        Ok(())
    }

    /// Rebuild the read model from scratch by replaying envelopes.
    pub fn rebuild_from_scratch(
        &self,
        envelopes: impl IntoIterator<Item = EventEnvelope<JsonValue>>,
    ) -> Result<(), StockSummaryProjectionError> {
        self.cursors
            .write()
            .map_err(|_| StockSummaryProjectionError::Poisoned)?
            .clear();

        let mut envs: Vec<_> = envelopes.into_iter().collect();

        let mut mills = envs.iter().map(|e| e.mill_id()).collect::<Vec<_>>();
        mills.sort();
        mills.dedup();
        for mill_id in mills {
            self.store.clear_mill(mill_id);
        }

        // Deterministic replay order: mill, aggregate, sequence.
        envs.sort_by_key(|e| (e.mill_id(), e.aggregate_id(), e.sequence_number()));

        for env in &envs {
            self.apply_envelope(env)?;
        }

        Ok(())
    }
}

fn ensure_same_stream(
    event_mill_id: MillId,
    event_ledger_id: StockLedgerId,
    mill_id: MillId,
    aggregate_id: AggregateId,
) -> Result<(), StockSummaryProjectionError> {
    if event_mill_id != mill_id {
        return Err(StockSummaryProjectionError::MillIsolation(
            "event mill_id does not match envelope mill_id".to_string(),
        ));
    }
    if event_ledger_id.0 != aggregate_id {
        return Err(StockSummaryProjectionError::MillIsolation(
            "event ledger_id does not match envelope aggregate_id".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use chrono::{DateTime, TimeZone, Utc};
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    use ricemill_core::{Aggregate, AggregateRoot};
    use ricemill_stock::{
        OpenLedger, RecordMovements, SackPolicy, SackSize, StockLedger, StockLedgerCommand,
        StockMovement,
    };

    use super::*;
    use crate::read_model::InMemoryMillStore;

    fn test_mill_id() -> MillId {
        MillId::from_str("0190e8a0-0000-7000-8000-000000000001").unwrap()
    }

    fn test_ledger_id() -> StockLedgerId {
        StockLedgerId::new(AggregateId::from_str("0190e8a0-0000-7000-8000-0000000000aa").unwrap())
    }

    fn test_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 15, 8, 0, 0).unwrap()
    }

    fn miniket() -> TypeName {
        TypeName::new("Miniket").unwrap()
    }

    fn projection() -> StockSummaryProjection<InMemoryMillStore<StockSummaryKey, StockSummaryRow>> {
        StockSummaryProjection::new(InMemoryMillStore::new())
    }

    /// Run commands through a ledger and wrap the emitted events as published envelopes.
    fn envelopes(commands: Vec<StockLedgerCommand>) -> Vec<EventEnvelope<JsonValue>> {
        let mut ledger = StockLedger::empty(test_ledger_id());
        let mut out = Vec::new();
        for cmd in commands {
            for event in ledger.handle(&cmd).unwrap() {
                ledger.apply(&event);
                out.push(EventEnvelope::new(
                    Uuid::now_v7(),
                    test_mill_id(),
                    test_ledger_id().0,
                    "stock.ledger",
                    ricemill_events::Event::event_type(&event),
                    ledger.version(),
                    serde_json::to_value(&event).unwrap(),
                ));
            }
        }
        out
    }

    fn open() -> StockLedgerCommand {
        StockLedgerCommand::OpenLedger(OpenLedger {
            mill_id: test_mill_id(),
            ledger_id: test_ledger_id(),
            sack_policy: SackPolicy::standard(),
            occurred_at: test_time(),
        })
    }

    fn record(movements: Vec<StockMovement>) -> StockLedgerCommand {
        StockLedgerCommand::RecordMovements(RecordMovements {
            mill_id: test_mill_id(),
            ledger_id: test_ledger_id(),
            movements,
            reference: None,
            occurred_at: test_time(),
        })
    }

    #[test]
    fn summary_tracks_balance_and_totals() {
        let envs = envelopes(vec![
            open(),
            record(vec![StockMovement::add(
                Commodity::Rice,
                miniket(),
                Quantity::sacks(4, SackSize::KG_50),
            )]),
            record(vec![StockMovement::subtract(
                Commodity::Rice,
                miniket(),
                Quantity::loose(dec!(30), SackSize::KG_50).unwrap(),
            )]),
        ]);

        let projection = projection();
        for env in &envs {
            projection.apply_envelope(env).unwrap();
        }

        let row = projection
            .get(test_mill_id(), Commodity::Rice, &miniket())
            .unwrap();
        assert_eq!(row.balance.sack_count(), 3);
        assert_eq!(row.balance.loose_kg(), dec!(20));
        assert_eq!(row.received_kg, dec!(200));
        assert_eq!(row.issued_kg, dec!(30));
        assert_eq!(row.movements, 2);
    }

    #[test]
    fn duplicate_delivery_is_ignored() {
        let envs = envelopes(vec![
            open(),
            record(vec![StockMovement::add(
                Commodity::Bran,
                TypeName::new("Fine").unwrap(),
                Quantity::loose(dec!(12.5), SackSize::KG_25).unwrap(),
            )]),
        ]);

        let projection = projection();
        for env in &envs {
            projection.apply_envelope(env).unwrap();
        }
        projection.apply_envelope(&envs[1]).unwrap();

        let rows = projection.list_commodity(test_mill_id(), Commodity::Bran);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].received_kg, dec!(12.5));
        assert_eq!(rows[0].movements, 1);
    }

    #[test]
    fn sequence_gap_is_rejected() {
        let envs = envelopes(vec![
            open(),
            record(vec![StockMovement::add(Commodity::Paddy, miniket(), Quantity::sacks(1, SackSize::KG_50))]),
            record(vec![StockMovement::add(Commodity::Paddy, miniket(), Quantity::sacks(1, SackSize::KG_50))]),
        ]);

        let projection = projection();
        projection.apply_envelope(&envs[0]).unwrap();
        match projection.apply_envelope(&envs[2]) {
            Err(StockSummaryProjectionError::NonMonotonicSequence { last: 1, found: 3 }) => {}
            other => panic!("Expected NonMonotonicSequence, got {other:?}"),
        }
    }

    #[test]
    fn rebuild_matches_incremental_apply() {
        let envs = envelopes(vec![
            open(),
            record(vec![
                StockMovement::add(Commodity::Paddy, miniket(), Quantity::sacks(10, SackSize::KG_50)),
                StockMovement::add(Commodity::Rice, miniket(), Quantity::loose(dec!(42), SackSize::KG_50).unwrap()),
            ]),
        ]);

        let incremental = projection();
        for env in &envs {
            incremental.apply_envelope(env).unwrap();
        }

        let rebuilt = projection();
        rebuilt.apply_envelope(&envs[0]).unwrap();
        let mut shuffled = envs.clone();
        shuffled.reverse();
        rebuilt.rebuild_from_scratch(shuffled).unwrap();

        assert_eq!(incremental.list(test_mill_id()), rebuilt.list(test_mill_id()));
        assert_eq!(rebuilt.list(test_mill_id()).len(), 2);
    }

    #[test]
    fn foreign_events_are_skipped() {
        let env = EventEnvelope::new(
            Uuid::now_v7(),
            test_mill_id(),
            AggregateId::new(),
            "payroll.run",
            "payroll.run.posted",
            1,
            serde_json::json!({"employees": 12}),
        );
        let projection = projection();
        projection.apply_envelope(&env).unwrap();
        assert!(projection.list(test_mill_id()).is_empty());
    }

    #[test]
    fn opening_for_another_ledger_is_rejected() {
        let opened = envelopes(vec![open()]).remove(0);
        let misrouted = EventEnvelope::new(
            opened.event_id(),
            opened.mill_id(),
            AggregateId::from_str("0190e8a0-0000-7000-8000-0000000000bb").unwrap(),
            opened.aggregate_type(),
            opened.event_type(),
            opened.sequence_number(),
            opened.payload().clone(),
        );

        let projection = projection();
        match projection.apply_envelope(&misrouted) {
            Err(StockSummaryProjectionError::MillIsolation(msg)) if msg.contains("ledger_id") => {}
            other => panic!("Expected MillIsolation, got {other:?}"),
        }

        projection.apply_envelope(&opened).unwrap();
        assert!(projection.list(test_mill_id()).is_empty());
    }

    #[test]
    fn opening_for_another_mill_is_rejected() {
        let opened = envelopes(vec![open()]).remove(0);
        let foreign = EventEnvelope::new(
            opened.event_id(),
            MillId::from_str("0190e8a0-0000-7000-8000-000000000002").unwrap(),
            opened.aggregate_id(),
            opened.aggregate_type(),
            opened.event_type(),
            opened.sequence_number(),
            opened.payload().clone(),
        );
        match projection().apply_envelope(&foreign) {
            Err(StockSummaryProjectionError::MillIsolation(msg)) if msg.contains("mill_id") => {}
            other => panic!("Expected MillIsolation, got {other:?}"),
        }
    }

    #[test]
    fn garbage_payload_is_a_deserialize_error() {
        let env = EventEnvelope::new(
            Uuid::now_v7(),
            test_mill_id(),
            test_ledger_id().0,
            "stock.ledger",
            "stock.ledger.adjusted",
            1,
            serde_json::json!({"nope": true}),
        );
        match projection().apply_envelope(&env) {
            Err(StockSummaryProjectionError::Deserialize(_)) => {}
            other => panic!("Expected Deserialize, got {other:?}"),
        }
    }
}
