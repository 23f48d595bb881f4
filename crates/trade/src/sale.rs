use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use ricemill_stock::{Commodity, Quantity, StockMovement, TypeName};

use crate::error::TradeError;
use crate::payment::{OverpaymentPolicy, Payment, Settlement, settle};
use crate::pricing::{PricingBasis, line_total};
use crate::transaction::StockEffect;

/// Stock sold to a customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sale {
    #[serde(default)]
    pub reference: Option<String>,
    pub customer: String,
    pub commodity: Commodity,
    pub type_name: TypeName,
    pub quantity: Quantity,
    pub rate: Decimal,
    #[serde(default)]
    pub basis: PricingBasis,
    pub payment: Payment,
}

impl Sale {
    pub fn total_amount(&self) -> Result<Decimal, TradeError> {
        line_total(&self.quantity, self.rate, self.basis)
    }

    pub fn settle(&self, policy: OverpaymentPolicy) -> Result<Settlement, TradeError> {
        settle(self.total_amount()?, &self.payment, policy)
    }
}

impl StockEffect for Sale {
    fn movements(&self) -> Result<Vec<StockMovement>, TradeError> {
        Ok(vec![StockMovement::subtract(
            self.commodity,
            self.type_name.clone(),
            self.quantity,
        )])
    }
}
