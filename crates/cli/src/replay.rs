//! Run a journal through a fresh in-memory stock ledger.

use std::sync::Arc;

use anyhow::{Result, bail};
use serde_json::Value as JsonValue;
use tracing::info;

use ricemill_core::{AggregateId, MillId};
use ricemill_events::{EventBus, EventEnvelope, InMemoryEventBus};
use ricemill_infra::event_store::InMemoryEventStore;
use ricemill_infra::projections::{StockSummaryKey, StockSummaryProjection, StockSummaryRow};
use ricemill_infra::read_model::InMemoryMillStore;
use ricemill_infra::{CommandDispatcher, MillConfig, StockService};
use ricemill_stock::StockLedgerId;
use ricemill_trade::Transaction;

use crate::report::describe;

#[derive(Debug, Default)]
pub struct ReplayOutcome {
    /// One line per journal entry, recorded or rejected.
    pub lines: Vec<String>,
    pub recorded: usize,
    pub rejected: usize,
    pub summary: Vec<StockSummaryRow>,
}

pub fn replay(transactions: &[Transaction], config: MillConfig, strict: bool) -> Result<ReplayOutcome> {
    let mill_id = MillId::new();
    let bus: Arc<InMemoryEventBus<EventEnvelope<JsonValue>>> = Arc::new(InMemoryEventBus::new());
    let subscription = bus.subscribe();
    let service = StockService::new(
        CommandDispatcher::new(InMemoryEventStore::new(), bus),
        config,
        mill_id,
        StockLedgerId::new(AggregateId::new()),
    );
    service.open_ledger()?;

    let projection: StockSummaryProjection<InMemoryMillStore<StockSummaryKey, StockSummaryRow>> =
        StockSummaryProjection::new(InMemoryMillStore::new());

    let mut outcome = ReplayOutcome::default();
    for (idx, tx) in transactions.iter().enumerate() {
        let entry = idx + 1;
        match service.record(tx) {
            Ok(recorded) => {
                outcome.recorded += 1;
                outcome.lines.push(format!("#{entry} {}", describe(&recorded)));
            }
            Err(e) if strict => bail!("entry {entry} ({}) rejected: {e}", tx.kind()),
            Err(e) => {
                outcome.rejected += 1;
                outcome
                    .lines
                    .push(format!("#{entry} {} REJECTED: {e}", tx.kind()));
            }
        }
    }

    for env in subscription.drain() {
        projection.apply_envelope(&env)?;
    }
    outcome.summary = projection.list(mill_id);

    info!(
        recorded = outcome.recorded,
        rejected = outcome.rejected,
        "journal replayed"
    );
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::journal::parse_journal;
    use ricemill_stock::{Commodity, Quantity, SackSize};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    const JOURNAL: &str = r#"[
        { "kind": "purchase", "supplier": "Abdul Karim", "commodity": "paddy", "type_name": "BR-28",
          "quantity": { "loose_kg": 8, "sack_count": 4 }, "rate": "30", "payment": { "mode": "cash" } },
        { "kind": "sale", "customer": "Rahman Traders", "commodity": "paddy", "type_name": "BR-28",
          "quantity": { "sack_count": 5 }, "rate": "30", "payment": { "mode": "cash" } },
        { "kind": "sale", "customer": "Rahman Traders", "commodity": "paddy", "type_name": "BR-28",
          "quantity": { "sack_count": 1 }, "rate": "1500", "basis": "per_sack",
          "payment": { "mode": "due", "paid_amount": "1000" } }
    ]"#;

    #[test]
    fn rejected_entries_are_reported_and_skipped() {
        let txs = parse_journal(JOURNAL, SackSize::KG_50).unwrap();
        let outcome = replay(&txs, MillConfig::default(), false).unwrap();

        assert_eq!(outcome.recorded, 2);
        assert_eq!(outcome.rejected, 1);
        assert!(outcome.lines[1].starts_with("#2 sale REJECTED: "), "{}", outcome.lines[1]);
        assert!(outcome.lines[1].contains("insufficient paddy stock"));
        assert!(outcome.lines[2].contains("due 500"));

        assert_eq!(outcome.summary.len(), 1);
        let paddy = &outcome.summary[0];
        assert_eq!(paddy.commodity, Commodity::Paddy);
        assert_eq!(paddy.balance, Quantity::new(dec!(8), 3, SackSize::KG_50).unwrap());
        assert_eq!(paddy.received_kg, dec!(208));
        assert_eq!(paddy.issued_kg, dec!(50));
    }

    #[test]
    fn strict_replay_stops_at_the_first_rejection() {
        let txs = parse_journal(JOURNAL, SackSize::KG_50).unwrap();
        let err = replay(&txs, MillConfig::default(), true).unwrap_err();
        assert!(err.to_string().starts_with("entry 2 (sale) rejected"), "{err}");
    }

    #[test]
    fn oversized_entries_are_rejected() {
        let journal = r#"[
            { "kind": "purchase", "supplier": "Abdul Karim", "commodity": "paddy", "type_name": "BR-28",
              "quantity": { "sack_count": 18446744073709551615 }, "rate": "1000000000",
              "payment": { "mode": "cash" } },
            { "kind": "purchase", "supplier": "Abdul Karim", "commodity": "paddy", "type_name": "BR-28",
              "quantity": { "sack_count": 18446744073709551615 }, "rate": "30",
              "payment": { "mode": "cash" } },
            { "kind": "purchase", "supplier": "Abdul Karim", "commodity": "paddy", "type_name": "BR-28",
              "quantity": { "sack_count": 1 }, "rate": "30", "payment": { "mode": "cash" } }
        ]"#;
        let txs = parse_journal(journal, SackSize::KG_50).unwrap();
        let outcome = replay(&txs, MillConfig::default(), false).unwrap();

        assert_eq!(outcome.recorded, 1);
        assert_eq!(outcome.rejected, 2);
        assert!(
            outcome.lines[0].contains("total_amount is out of range"),
            "{}",
            outcome.lines[0]
        );
        assert!(outcome.lines[2].contains("out of range"), "{}", outcome.lines[2]);

        let paddy = &outcome.summary[0];
        assert_eq!(paddy.balance, Quantity::sacks(u64::MAX, SackSize::KG_50));
        assert_eq!(paddy.received_kg, Decimal::from(u64::MAX) * dec!(50));
    }

    #[test]
    fn configured_default_sack_size_applies_to_the_journal() {
        let config = MillConfig::from_lookup(|key| match key {
            "RICEMILL_DEFAULT_SACK_KG" => Some("25".to_string()),
            "RICEMILL_SACK_SIZES" => Some("25".to_string()),
            _ => None,
        })
        .unwrap();
        let journal = r#"[
            { "kind": "purchase", "supplier": "Abdul Karim", "commodity": "paddy", "type_name": "BR-28",
              "quantity": { "sack_count": 2 }, "rate": "30", "payment": { "mode": "cash" } }
        ]"#;

        let txs = parse_journal(journal, config.sack_policy.default_size()).unwrap();
        let outcome = replay(&txs, config, false).unwrap();

        assert_eq!(outcome.recorded, 1, "{:?}", outcome.lines);
        assert_eq!(outcome.summary[0].balance, Quantity::sacks(2, SackSize::KG_25));
        assert_eq!(outcome.summary[0].received_kg, dec!(50));
    }
}
