//! Record mill transactions against one stock ledger, end to end.
//!
//! `StockService::record` computes the settlement, derives the stock movements, and
//! dispatches them as one `RecordMovements` command. Losing an append race reloads the
//! ledger and retries, up to `MillConfig::max_conflict_retries` times.

use chrono::Utc;
use serde_json::Value as JsonValue;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use ricemill_core::{DomainError, MillId};
use ricemill_events::{EventBus, EventEnvelope};
use ricemill_stock::{
    Commodity, OpenLedger, Quantity, RecordMovements, StockAdjusted, StockError, StockLedger,
    StockLedgerCommand, StockLedgerEvent, StockLedgerId, TypeName,
};
use ricemill_trade::{Settlement, StockEffect, Transaction, TradeError};

use crate::command_dispatcher::{CommandDispatcher, DispatchError};
use crate::config::MillConfig;
use crate::event_store::{EventStore, StoredEvent};

/// Aggregate type recorded on every stock ledger event.
pub const STOCK_LEDGER_AGGREGATE: &str = "stock.ledger";

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Trade(#[from] TradeError),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error("unexpected stock ledger event: {0}")]
    Deserialize(String),
}

impl ServiceError {
    pub fn is_insufficient_stock(&self) -> bool {
        match self {
            ServiceError::Dispatch(DispatchError::Rejected(e)) => e.is_insufficient_stock(),
            ServiceError::Trade(TradeError::Stock(e)) => e.is_insufficient_stock(),
            _ => false,
        }
    }

    pub fn is_concurrency(&self) -> bool {
        matches!(self, ServiceError::Dispatch(e) if e.is_concurrency())
    }
}

/// What one recorded transaction did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedTransaction {
    pub kind: &'static str,
    pub reference: Option<String>,
    /// `None` for production batches.
    pub settlement: Option<Settlement>,
    /// One entry per movement, in application order, each with the resulting balance.
    pub adjustments: Vec<StockAdjusted>,
}

impl RecordedTransaction {
    /// Balance of a type after this transaction, if the transaction touched it.
    pub fn balance(&self, commodity: Commodity, type_name: &TypeName) -> Option<Quantity> {
        self.adjustments
            .iter()
            .rev()
            .find(|a| a.commodity == commodity && &a.type_name == type_name)
            .map(|a| a.balance)
    }
}

#[derive(Debug)]
pub struct StockService<S, B> {
    dispatcher: CommandDispatcher<S, B>,
    config: MillConfig,
    mill_id: MillId,
    ledger_id: StockLedgerId,
}

impl<S, B> StockService<S, B>
where
    S: EventStore,
    B: EventBus<EventEnvelope<JsonValue>>,
{
    pub fn new(
        dispatcher: CommandDispatcher<S, B>,
        config: MillConfig,
        mill_id: MillId,
        ledger_id: StockLedgerId,
    ) -> Self {
        Self {
            dispatcher,
            config,
            mill_id,
            ledger_id,
        }
    }

    pub fn mill_id(&self) -> MillId {
        self.mill_id
    }

    pub fn ledger_id(&self) -> StockLedgerId {
        self.ledger_id
    }

    pub fn config(&self) -> &MillConfig {
        &self.config
    }

    pub fn dispatcher(&self) -> &CommandDispatcher<S, B> {
        &self.dispatcher
    }

    /// Open the ledger with the configured sack policy. Fails if it is already open.
    pub fn open_ledger(&self) -> Result<(), ServiceError> {
        let command = StockLedgerCommand::OpenLedger(OpenLedger {
            mill_id: self.mill_id,
            ledger_id: self.ledger_id,
            sack_policy: self.config.sack_policy.clone(),
            occurred_at: Utc::now(),
        });
        self.dispatch(command)?;
        info!(mill_id = %self.mill_id, ledger_id = %self.ledger_id, "stock ledger opened");
        Ok(())
    }

    /// Open the ledger unless it already is.
    pub fn ensure_open(&self) -> Result<(), ServiceError> {
        if self.ledger()?.is_open() {
            return Ok(());
        }
        match self.open_ledger() {
            Ok(()) => Ok(()),
            // Another writer opened it first.
            Err(ServiceError::Dispatch(DispatchError::Concurrency(_))) => Ok(()),
            Err(ServiceError::Dispatch(DispatchError::Rejected(StockError::Domain(
                DomainError::Conflict(_),
            )))) => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Current ledger state, rehydrated from the event store.
    pub fn ledger(&self) -> Result<StockLedger, ServiceError> {
        let ledger_id = self.ledger_id;
        Ok(self
            .dispatcher
            .load(self.mill_id, ledger_id.0, |_, _| StockLedger::empty(ledger_id))?)
    }

    pub fn balance(&self, commodity: Commodity, type_name: &TypeName) -> Result<Quantity, ServiceError> {
        Ok(self.ledger()?.balance(commodity, type_name))
    }

    /// Record a transaction: settle it, then move stock. Nothing is committed on error.
    #[instrument(
        skip(self, transaction),
        fields(mill_id = %self.mill_id, kind = transaction.kind())
    )]
    pub fn record(&self, transaction: &Transaction) -> Result<RecordedTransaction, ServiceError> {
        let result = self.try_record(transaction);
        match &result {
            Ok(recorded) => info!(
                reference = recorded.reference.as_deref().unwrap_or("-"),
                movements = recorded.adjustments.len(),
                "transaction recorded"
            ),
            Err(e) => warn!(
                reference = transaction.reference().as_deref().unwrap_or("-"),
                error = %e,
                "transaction rejected"
            ),
        }
        result
    }

    fn try_record(&self, transaction: &Transaction) -> Result<RecordedTransaction, ServiceError> {
        let settlement = transaction.settlement(self.config.overpayment_policy)?;
        let movements = transaction.movements()?;
        let reference = transaction.reference();

        let command = StockLedgerCommand::RecordMovements(RecordMovements {
            mill_id: self.mill_id,
            ledger_id: self.ledger_id,
            movements,
            reference: reference.clone(),
            occurred_at: Utc::now(),
        });

        let committed = self.dispatch(command)?;
        let adjustments = committed
            .iter()
            .map(adjustment_of)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(RecordedTransaction {
            kind: transaction.kind(),
            reference,
            settlement,
            adjustments,
        })
    }

    fn dispatch(&self, command: StockLedgerCommand) -> Result<Vec<StoredEvent>, ServiceError> {
        let ledger_id = self.ledger_id;
        let mut attempt = 0u32;
        loop {
            let result = self.dispatcher.dispatch(
                self.mill_id,
                ledger_id.0,
                STOCK_LEDGER_AGGREGATE,
                command.clone(),
                |_, _| StockLedger::empty(ledger_id),
            );

            match result {
                Err(e) if e.is_concurrency() && attempt < self.config.max_conflict_retries => {
                    attempt += 1;
                    debug!(attempt, error = %e, "stock ledger append conflict; retrying");
                }
                other => return Ok(other?),
            }
        }
    }
}

fn adjustment_of(stored: &StoredEvent) -> Result<StockAdjusted, ServiceError> {
    match serde_json::from_value::<StockLedgerEvent>(stored.payload.clone()) {
        Ok(StockLedgerEvent::StockAdjusted(adjusted)) => Ok(adjusted),
        Ok(other) => Err(ServiceError::Deserialize(format!(
            "expected an adjustment, got {}",
            ricemill_events::Event::event_type(&other)
        ))),
        Err(e) => Err(ServiceError::Deserialize(e.to_string())),
    }
}
