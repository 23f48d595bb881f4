use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::TradeError;
use crate::pricing::round_money;

/// How the counterparty pays.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum Payment {
    /// Paid in full on the spot; any entered amount is ignored.
    Cash,
    /// Credit: whatever was paid now, the rest is due.
    Due { paid_amount: Decimal },
}

/// Whether a credit payment may exceed the transaction total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverpaymentPolicy {
    /// Accept it; the due amount goes negative (money owed back).
    #[default]
    Allow,
    Reject,
}

/// Amounts owed after a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settlement {
    pub total_amount: Decimal,
    pub paid_amount: Decimal,
    pub due_amount: Decimal,
}

impl Settlement {
    pub fn is_settled(&self) -> bool {
        self.due_amount.is_zero()
    }

    pub fn is_overpaid(&self) -> bool {
        self.due_amount < Decimal::ZERO
    }
}

pub fn settle(
    total_amount: Decimal,
    payment: &Payment,
    policy: OverpaymentPolicy,
) -> Result<Settlement, TradeError> {
    if total_amount < Decimal::ZERO {
        return Err(TradeError::NegativeAmount {
            field: "total_amount",
            value: total_amount,
        });
    }

    let paid_amount = match payment {
        Payment::Cash => total_amount,
        Payment::Due { paid_amount } => {
            if *paid_amount < Decimal::ZERO {
                return Err(TradeError::NegativeAmount {
                    field: "paid_amount",
                    value: *paid_amount,
                });
            }
            if policy == OverpaymentPolicy::Reject && *paid_amount > total_amount {
                return Err(TradeError::Overpaid {
                    total: total_amount,
                    paid: *paid_amount,
                });
            }
            round_money(*paid_amount)
        }
    };

    Ok(Settlement {
        total_amount,
        paid_amount,
        due_amount: total_amount - paid_amount,
    })
}
