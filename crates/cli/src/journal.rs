//! Transaction journal files: a JSON array of `kind`-tagged entries.
//!
//! Quantities may leave out `sack_size_kg`; they are then read in the mill's
//! configured default sack size.

use std::path::Path;

use anyhow::{Context, Result};
use serde_json::Value as JsonValue;

use ricemill_stock::SackSize;
use ricemill_trade::Transaction;

pub fn load_journal(path: &Path, default_sack_size: SackSize) -> Result<Vec<Transaction>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read journal {}", path.display()))?;
    parse_journal(&raw, default_sack_size)
        .with_context(|| format!("invalid journal {}", path.display()))
}

/// Parse every entry, naming the first one that does not decode.
pub fn parse_journal(raw: &str, default_sack_size: SackSize) -> Result<Vec<Transaction>> {
    let entries: Vec<JsonValue> =
        serde_json::from_str(raw).context("journal must be a JSON array of transactions")?;
    let size = JsonValue::from(default_sack_size.kg().to_string());

    entries
        .into_iter()
        .enumerate()
        .map(|(idx, entry)| {
            serde_json::from_value::<Transaction>(with_sack_sizes(entry, &size))
                .with_context(|| format!("entry {} is not a valid transaction", idx + 1))
        })
        .collect()
}

fn with_sack_sizes(mut entry: JsonValue, size: &JsonValue) -> JsonValue {
    fill_sack_size(entry.get_mut("quantity"), size);
    fill_sack_size(entry.get_mut("paddy_consumed"), size);
    if let Some(JsonValue::Array(outputs)) = entry.get_mut("outputs") {
        for output in outputs {
            fill_sack_size(output.get_mut("quantity"), size);
        }
    }
    entry
}

fn fill_sack_size(quantity: Option<&mut JsonValue>, size: &JsonValue) {
    if let Some(JsonValue::Object(fields)) = quantity {
        fields
            .entry("sack_size_kg")
            .or_insert_with(|| size.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ricemill_stock::Commodity;
    use ricemill_trade::Payment;
    use rust_decimal_macros::dec;

    const DAY: &str = r#"[
        {
            "kind": "purchase",
            "reference": "PP-0001",
            "supplier": "Abdul Karim",
            "commodity": "paddy",
            "type_name": "BR-28",
            "quantity": { "loose_kg": 8, "sack_count": 4, "sack_size_kg": 50 },
            "rate": "30",
            "payment": { "mode": "due", "paid_amount": "5000" }
        },
        {
            "kind": "production",
            "batch_no": "B-1",
            "paddy_type": "BR-28",
            "paddy_consumed": { "sack_count": 4, "sack_size_kg": 50 },
            "outputs": [
                { "commodity": "rice", "type_name": "Miniket", "quantity": { "loose_kg": 30, "sack_count": 2, "sack_size_kg": 50 } },
                { "commodity": "bran", "type_name": "Fine", "quantity": { "loose_kg": 16, "sack_size_kg": 25 } }
            ]
        },
        {
            "kind": "sale",
            "customer": "Rahman Traders",
            "commodity": "rice",
            "type_name": "Miniket",
            "quantity": { "sack_count": 1, "sack_size_kg": 50 },
            "rate": "3100",
            "basis": "per_sack",
            "payment": { "mode": "cash" }
        }
    ]"#;

    #[test]
    fn parses_a_day_of_transactions() {
        let txs = parse_journal(DAY, SackSize::KG_50).unwrap();
        assert_eq!(txs.len(), 3);
        assert_eq!(
            txs.iter().map(Transaction::kind).collect::<Vec<_>>(),
            vec!["purchase", "production", "sale"]
        );

        match &txs[0] {
            Transaction::Purchase(p) => {
                assert_eq!(p.quantity.total_kg().unwrap(), dec!(208));
                assert_eq!(p.payment, Payment::Due { paid_amount: dec!(5000) });
            }
            other => panic!("Expected Purchase, got {other:?}"),
        }
        match &txs[1] {
            Transaction::Production(b) => {
                assert_eq!(b.outputs.len(), 2);
                assert_eq!(b.outputs[1].commodity, Commodity::Bran);
            }
            other => panic!("Expected Production, got {other:?}"),
        }
    }

    #[test]
    fn error_names_the_bad_entry() {
        let raw = r#"[
            { "kind": "sale", "customer": "X", "commodity": "rice", "type_name": "Miniket",
              "quantity": { "sack_count": 1 }, "rate": "10", "payment": { "mode": "cash" } },
            { "kind": "gift" }
        ]"#;
        let err = parse_journal(raw, SackSize::KG_50).unwrap_err();
        assert!(err.to_string().contains("entry 2"), "got {err:#}");
    }

    #[test]
    fn missing_sack_sizes_take_the_configured_default() {
        let raw = r#"[
            { "kind": "purchase", "supplier": "Abdul Karim", "commodity": "paddy", "type_name": "BR-28",
              "quantity": { "sack_count": 2 }, "rate": "30", "payment": { "mode": "cash" } },
            { "kind": "production", "batch_no": "B-2", "paddy_type": "BR-28",
              "paddy_consumed": { "sack_count": 2 },
              "outputs": [
                { "commodity": "rice", "type_name": "Miniket", "quantity": { "loose_kg": 30 } },
                { "commodity": "bran", "type_name": "Fine", "quantity": { "sack_count": 1, "sack_size_kg": 50 } }
              ] }
        ]"#;
        let txs = parse_journal(raw, SackSize::KG_25).unwrap();

        match &txs[0] {
            Transaction::Purchase(p) => {
                assert_eq!(p.quantity.sack_size(), SackSize::KG_25);
                assert_eq!(p.quantity.total_kg().unwrap(), dec!(50));
            }
            other => panic!("Expected Purchase, got {other:?}"),
        }
        match &txs[1] {
            Transaction::Production(b) => {
                assert_eq!(b.paddy_consumed.sack_size(), SackSize::KG_25);
                assert_eq!(b.outputs[0].quantity.sack_size(), SackSize::KG_25);
                // An explicit size is kept.
                assert_eq!(b.outputs[1].quantity.sack_size(), SackSize::KG_50);
            }
            other => panic!("Expected Production, got {other:?}"),
        }
    }

    #[test]
    fn non_array_is_rejected() {
        let err = parse_journal(r#"{"kind": "sale"}"#, SackSize::KG_50).unwrap_err();
        assert!(err.to_string().contains("JSON array"));
    }

    #[test]
    fn blank_type_name_is_rejected() {
        let raw = r#"[{ "kind": "sale", "customer": "X", "commodity": "rice", "type_name": "  ",
            "quantity": { "sack_count": 1 }, "rate": "10", "payment": { "mode": "cash" } }]"#;
        assert!(parse_journal(raw, SackSize::KG_50).is_err());
    }
}
