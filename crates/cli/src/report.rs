//! Plain-text rendering of recorded transactions and stock summaries.

use std::fmt::Write as _;

use ricemill_infra::RecordedTransaction;
use ricemill_infra::projections::StockSummaryRow;
use ricemill_stock::{Direction, Quantity, SackSize, StockError, kg_to_sacks, round_kg};

/// One line per recorded transaction.
pub fn describe(recorded: &RecordedTransaction) -> String {
    let mut line = String::from(recorded.kind);
    if let Some(reference) = &recorded.reference {
        let _ = write!(line, " {reference}");
    }

    if let Some(s) = &recorded.settlement {
        let _ = write!(
            line,
            ": total {}, paid {}, due {}",
            s.total_amount, s.paid_amount, s.due_amount
        );
    }

    for adj in &recorded.adjustments {
        let sign = match adj.direction {
            Direction::Add => '+',
            Direction::Subtract => '-',
        };
        let _ = write!(
            line,
            "; {} {} {sign}{} kg => {}",
            adj.commodity, adj.type_name, adj.change_kg, adj.balance
        );
    }

    line
}

/// Stock table, one row per commodity type, in commodity then type order.
pub fn render_summary(rows: &[StockSummaryRow]) -> String {
    if rows.is_empty() {
        return "no stock recorded\n".to_string();
    }

    let width = rows
        .iter()
        .map(|r| r.type_name.as_str().len())
        .max()
        .unwrap_or(0);

    let mut out = String::new();
    for row in rows {
        let _ = writeln!(
            out,
            "{:<5}  {:<width$}  {:<24}  in {} kg, out {} kg",
            row.commodity.as_str(),
            row.type_name.as_str(),
            row.balance.to_string(),
            row.received_kg,
            row.issued_kg,
        );
    }
    out
}

/// `208 kg = 8 KG + 4 Bosta (50kg) (4.16 bosta)`
pub fn convert(kg: rust_decimal::Decimal, sack_size: SackSize) -> Result<String, StockError> {
    let quantity = Quantity::from_kg(kg, sack_size)?;
    Ok(format!(
        "{} kg = {} ({} bosta)",
        round_kg(kg).normalize(),
        quantity,
        round_kg(kg_to_sacks(kg, sack_size)?).normalize()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ricemill_stock::{Commodity, TypeName};
    use rust_decimal_macros::dec;

    #[test]
    fn convert_prints_the_normalized_quantity() {
        assert_eq!(
            convert(dec!(208), SackSize::KG_50).unwrap(),
            "208 kg = 8 KG + 4 Bosta (50kg) (4.16 bosta)"
        );
        assert_eq!(
            convert(dec!(75), SackSize::KG_25).unwrap(),
            "75 kg = 3 Bosta (25kg) (3 bosta)"
        );
        assert_eq!(convert(dec!(0), SackSize::KG_50).unwrap(), "0 kg = 0 KG (0 bosta)");
    }

    #[test]
    fn convert_rejects_negative_weight() {
        assert!(matches!(
            convert(dec!(-1), SackSize::KG_50),
            Err(StockError::NegativeQuantity { .. })
        ));
    }

    #[test]
    fn summary_lists_each_row() {
        let rows = vec![
            StockSummaryRow {
                commodity: Commodity::Paddy,
                type_name: TypeName::new("BR-28").unwrap(),
                balance: Quantity::new(dec!(8), 0, SackSize::KG_50).unwrap(),
                received_kg: dec!(208),
                issued_kg: dec!(200),
                movements: 2,
            },
            StockSummaryRow {
                commodity: Commodity::Rice,
                type_name: TypeName::new("Miniket").unwrap(),
                balance: Quantity::sacks(3, SackSize::KG_50),
                received_kg: dec!(150),
                issued_kg: dec!(0),
                movements: 1,
            },
        ];

        let out = render_summary(&rows);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("paddy  BR-28  "));
        assert!(lines[0].contains("8 KG"));
        assert!(lines[1].contains("3 Bosta (50kg)"));
        assert!(lines[1].ends_with("in 150 kg, out 0 kg"));
    }

    #[test]
    fn empty_summary_says_so() {
        assert_eq!(render_summary(&[]), "no stock recorded\n");
    }
}
