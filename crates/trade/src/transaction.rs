use serde::{Deserialize, Serialize};

use ricemill_stock::StockMovement;

use crate::error::TradeError;
use crate::payment::{OverpaymentPolicy, Settlement};
use crate::production::ProductionBatch;
use crate::purchase::Purchase;
use crate::sale::Sale;

/// Anything that changes stock when recorded.
pub trait StockEffect {
    /// Movements in the order they must be applied.
    fn movements(&self) -> Result<Vec<StockMovement>, TradeError>;
}

/// A recordable mill transaction, tagged by `kind` on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Transaction {
    Purchase(Purchase),
    Production(ProductionBatch),
    Sale(Sale),
}

impl Transaction {
    pub fn kind(&self) -> &'static str {
        match self {
            Transaction::Purchase(_) => "purchase",
            Transaction::Production(_) => "production",
            Transaction::Sale(_) => "sale",
        }
    }

    /// Human reference carried onto the ledger events.
    pub fn reference(&self) -> Option<String> {
        match self {
            Transaction::Purchase(p) => p.reference.clone(),
            Transaction::Production(b) => Some(b.batch_no.clone()),
            Transaction::Sale(s) => s.reference.clone(),
        }
    }

    /// Money owed for the transaction; production batches have none.
    pub fn settlement(&self, policy: OverpaymentPolicy) -> Result<Option<Settlement>, TradeError> {
        match self {
            Transaction::Purchase(p) => p.settle(policy).map(Some),
            Transaction::Production(_) => Ok(None),
            Transaction::Sale(s) => s.settle(policy).map(Some),
        }
    }
}

impl StockEffect for Transaction {
    fn movements(&self) -> Result<Vec<StockMovement>, TradeError> {
        match self {
            Transaction::Purchase(p) => p.movements(),
            Transaction::Production(b) => b.movements(),
            Transaction::Sale(s) => s.movements(),
        }
    }
}
