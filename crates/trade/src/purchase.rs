use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use ricemill_stock::{Commodity, Quantity, StockMovement, TypeName};

use crate::error::TradeError;
use crate::payment::{OverpaymentPolicy, Payment, Settlement, settle};
use crate::pricing::{PricingBasis, line_total};
use crate::transaction::StockEffect;

/// Stock bought in: paddy from a farmer, or rice/bran from an outside supplier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Purchase {
    #[serde(default)]
    pub reference: Option<String>,
    pub supplier: String,
    pub commodity: Commodity,
    pub type_name: TypeName,
    pub quantity: Quantity,
    pub rate: Decimal,
    #[serde(default)]
    pub basis: PricingBasis,
    pub payment: Payment,
}

impl Purchase {
    pub fn total_amount(&self) -> Result<Decimal, TradeError> {
        line_total(&self.quantity, self.rate, self.basis)
    }

    pub fn settle(&self, policy: OverpaymentPolicy) -> Result<Settlement, TradeError> {
        settle(self.total_amount()?, &self.payment, policy)
    }
}

impl StockEffect for Purchase {
    fn movements(&self) -> Result<Vec<StockMovement>, TradeError> {
        Ok(vec![StockMovement::add(
            self.commodity,
            self.type_name.clone(),
            self.quantity,
        )])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ricemill_stock::{Direction, SackSize};
    use rust_decimal_macros::dec;

    fn paddy_purchase(payment: Payment) -> Purchase {
        Purchase {
            reference: Some("PP-0001".to_string()),
            supplier: "Abdul Karim".to_string(),
            commodity: Commodity::Paddy,
            type_name: TypeName::new("BR-28").unwrap(),
            // 5 bosta weighing 208 kg on the scale.
            quantity: Quantity::new(dec!(8), 4, SackSize::KG_50).unwrap(),
            rate: dec!(30),
            basis: PricingBasis::PerKg,
            payment,
        }
    }

    #[test]
    fn paddy_purchase_totals_by_weight() {
        let purchase = paddy_purchase(Payment::Due {
            paid_amount: dec!(4000),
        });
        let s = purchase.settle(OverpaymentPolicy::Allow).unwrap();
        assert_eq!(s.total_amount, dec!(6240));
        assert_eq!(s.due_amount, dec!(2240));
    }

    #[test]
    fn purchase_adds_stock() {
        let movements = paddy_purchase(Payment::Cash).movements().unwrap();
        assert_eq!(movements.len(), 1);
        assert_eq!(movements[0].direction, Direction::Add);
        assert_eq!(movements[0].quantity.total_kg().unwrap(), dec!(208));
    }
}
