use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use ricemill_core::{Aggregate, AggregateId, AggregateRoot, DomainError, MillId};
use ricemill_events::Event;

use crate::commodity::{Commodity, Direction, StockMovement, TypeName};
use crate::error::StockError;
use crate::quantity::{Quantity, SackSize, normalize};

/// Stock ledger identifier (one ledger per mill in practice).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StockLedgerId(pub AggregateId);

impl StockLedgerId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for StockLedgerId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Which sack sizes a ledger accepts, and which one new balances start with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawSackPolicy")]
pub struct SackPolicy {
    default: SackSize,
    allowed: Vec<SackSize>,
}

impl SackPolicy {
    pub fn new(default: SackSize, mut allowed: Vec<SackSize>) -> Result<Self, StockError> {
        allowed.sort();
        allowed.dedup();
        if !allowed.contains(&default) {
            return Err(StockError::SackSizeNotAllowed(default));
        }
        Ok(Self { default, allowed })
    }

    /// 50 kg default, 25 kg and 50 kg accepted.
    pub fn standard() -> Self {
        Self {
            default: SackSize::KG_50,
            allowed: SackSize::STANDARD.to_vec(),
        }
    }

    pub fn default_size(&self) -> SackSize {
        self.default
    }

    pub fn allowed(&self) -> &[SackSize] {
        &self.allowed
    }

    pub fn is_allowed(&self, size: SackSize) -> bool {
        self.allowed.contains(&size)
    }
}

impl Default for SackPolicy {
    fn default() -> Self {
        Self::standard()
    }
}

#[derive(Deserialize)]
struct RawSackPolicy {
    default: SackSize,
    allowed: Vec<SackSize>,
}

impl TryFrom<RawSackPolicy> for SackPolicy {
    type Error = StockError;

    fn try_from(raw: RawSackPolicy) -> Result<Self, Self::Error> {
        SackPolicy::new(raw.default, raw.allowed)
    }
}

/// Current balances, one per type name, grouped by commodity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stock {
    paddy: BTreeMap<TypeName, Quantity>,
    rice: BTreeMap<TypeName, Quantity>,
    bran: BTreeMap<TypeName, Quantity>,
}

impl Stock {
    pub fn new() -> Self {
        Self::default()
    }

    fn map(&self, commodity: Commodity) -> &BTreeMap<TypeName, Quantity> {
        match commodity {
            Commodity::Paddy => &self.paddy,
            Commodity::Rice => &self.rice,
            Commodity::Bran => &self.bran,
        }
    }

    fn map_mut(&mut self, commodity: Commodity) -> &mut BTreeMap<TypeName, Quantity> {
        match commodity {
            Commodity::Paddy => &mut self.paddy,
            Commodity::Rice => &mut self.rice,
            Commodity::Bran => &mut self.bran,
        }
    }

    pub fn get(&self, commodity: Commodity, type_name: &TypeName) -> Option<&Quantity> {
        self.map(commodity).get(type_name)
    }

    /// Balances of one commodity, ordered by type name.
    pub fn balances(&self, commodity: Commodity) -> impl Iterator<Item = (&TypeName, &Quantity)> {
        self.map(commodity).iter()
    }

    pub fn total_kg(&self, commodity: Commodity) -> Result<Decimal, StockError> {
        self.map(commodity).values().try_fold(Decimal::ZERO, |sum, q| {
            let kg = q.total_kg()?;
            sum.checked_add(kg).ok_or(StockError::OutOfRange(kg))
        })
    }

    fn set(&mut self, commodity: Commodity, type_name: TypeName, balance: Quantity) {
        self.map_mut(commodity).insert(type_name, balance);
    }

    /// Add or withdraw one movement and return the new balance.
    ///
    /// A type without a balance starts at zero in `default_sack_size`. The result is
    /// re-normalized in the existing balance's sack size, not the movement's, so a
    /// type keeps the sack size it was first stocked in. Withdrawing more than the
    /// balance fails and leaves the balance untouched.
    pub fn apply(
        &mut self,
        movement: &StockMovement,
        default_sack_size: SackSize,
    ) -> Result<Quantity, StockError> {
        let change_kg = movement.quantity.total_kg()?;
        if change_kg.is_zero() {
            return Err(StockError::ZeroMovement);
        }

        let current = self
            .get(movement.commodity, &movement.type_name)
            .copied()
            .unwrap_or_else(|| Quantity::zero(default_sack_size));
        let current_kg = current.total_kg()?;

        let new_total_kg = match movement.direction {
            Direction::Add => current_kg.checked_add(change_kg),
            Direction::Subtract => current_kg.checked_sub(change_kg),
        }
        .ok_or(StockError::OutOfRange(change_kg))?;

        if new_total_kg < Decimal::ZERO {
            return Err(StockError::InsufficientStock {
                commodity: movement.commodity,
                type_name: movement.type_name.to_string(),
                requested_kg: change_kg,
                available_kg: current_kg,
            });
        }

        let balance = normalize(new_total_kg, current.sack_size())?;
        self.set(movement.commodity, movement.type_name.clone(), balance);
        Ok(balance)
    }
}

/// Aggregate root: StockLedger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockLedger {
    id: StockLedgerId,
    mill_id: Option<MillId>,
    sack_policy: SackPolicy,
    stock: Stock,
    version: u64,
    created: bool,
}

impl StockLedger {
    /// Create an empty, not-yet-opened aggregate instance for rehydration.
    pub fn empty(id: StockLedgerId) -> Self {
        Self {
            id,
            mill_id: None,
            sack_policy: SackPolicy::standard(),
            stock: Stock::new(),
            version: 0,
            created: false,
        }
    }

    /// An opened ledger held directly by the caller (no event store involved).
    pub fn opened(id: StockLedgerId, mill_id: MillId, sack_policy: SackPolicy) -> Self {
        let mut ledger = Self::empty(id);
        ledger.apply(&StockLedgerEvent::LedgerOpened(LedgerOpened {
            mill_id,
            ledger_id: id,
            sack_policy,
            occurred_at: Utc::now(),
        }));
        ledger
    }

    pub fn id_typed(&self) -> StockLedgerId {
        self.id
    }

    pub fn mill_id(&self) -> Option<MillId> {
        self.mill_id
    }

    pub fn is_open(&self) -> bool {
        self.created
    }

    pub fn sack_policy(&self) -> &SackPolicy {
        &self.sack_policy
    }

    pub fn stock(&self) -> &Stock {
        &self.stock
    }

    /// Current balance of a type; zero in the default sack size when never stocked.
    pub fn balance(&self, commodity: Commodity, type_name: &TypeName) -> Quantity {
        self.stock
            .get(commodity, type_name)
            .copied()
            .unwrap_or_else(|| Quantity::zero(self.sack_policy.default_size()))
    }

    /// Record a single movement in place and return the new balance.
    pub fn record(&mut self, movement: StockMovement) -> Result<Quantity, StockError> {
        let mill_id = self.mill_id.ok_or(DomainError::NotFound)?;
        let command = StockLedgerCommand::RecordMovements(RecordMovements {
            mill_id,
            ledger_id: self.id,
            movements: vec![movement.clone()],
            reference: None,
            occurred_at: Utc::now(),
        });

        for event in self.handle(&command)? {
            self.apply(&event);
        }
        Ok(self.balance(movement.commodity, &movement.type_name))
    }
}

impl AggregateRoot for StockLedger {
    type Id = StockLedgerId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: OpenLedger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenLedger {
    pub mill_id: MillId,
    pub ledger_id: StockLedgerId,
    pub sack_policy: SackPolicy,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RecordMovements (all movements succeed, or none are recorded).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordMovements {
    pub mill_id: MillId,
    pub ledger_id: StockLedgerId,
    pub movements: Vec<StockMovement>,
    /// Free-text link to the originating transaction (purchase no., batch no., ...).
    pub reference: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StockLedgerCommand {
    OpenLedger(OpenLedger),
    RecordMovements(RecordMovements),
}

/// Event: LedgerOpened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerOpened {
    pub mill_id: MillId,
    pub ledger_id: StockLedgerId,
    pub sack_policy: SackPolicy,
    pub occurred_at: DateTime<Utc>,
}

/// Event: StockAdjusted. Carries the resulting balance so replay never recomputes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockAdjusted {
    pub mill_id: MillId,
    pub ledger_id: StockLedgerId,
    pub commodity: Commodity,
    pub type_name: TypeName,
    pub direction: Direction,
    pub change_kg: Decimal,
    pub balance: Quantity,
    pub reference: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StockLedgerEvent {
    LedgerOpened(LedgerOpened),
    StockAdjusted(StockAdjusted),
}

impl Event for StockLedgerEvent {
    fn event_type(&self) -> &'static str {
        match self {
            StockLedgerEvent::LedgerOpened(_) => "stock.ledger.opened",
            StockLedgerEvent::StockAdjusted(_) => "stock.ledger.adjusted",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            StockLedgerEvent::LedgerOpened(e) => e.occurred_at,
            StockLedgerEvent::StockAdjusted(e) => e.occurred_at,
        }
    }
}

impl Aggregate for StockLedger {
    type Command = StockLedgerCommand;
    type Event = StockLedgerEvent;
    type Error = StockError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            StockLedgerEvent::LedgerOpened(e) => {
                self.id = e.ledger_id;
                self.mill_id = Some(e.mill_id);
                self.sack_policy = e.sack_policy.clone();
                self.stock = Stock::new();
                self.created = true;
            }
            StockLedgerEvent::StockAdjusted(e) => {
                self.stock.set(e.commodity, e.type_name.clone(), e.balance);
            }
        }

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            StockLedgerCommand::OpenLedger(cmd) => self.handle_open(cmd),
            StockLedgerCommand::RecordMovements(cmd) => self.handle_record(cmd),
        }
    }
}

impl StockLedger {
    fn ensure_mill(&self, mill_id: MillId) -> Result<(), DomainError> {
        if !self.created {
            return Ok(());
        }
        if self.mill_id != Some(mill_id) {
            return Err(DomainError::invariant("mill mismatch"));
        }
        Ok(())
    }

    fn ensure_ledger_id(&self, ledger_id: StockLedgerId) -> Result<(), DomainError> {
        if self.id != ledger_id {
            return Err(DomainError::invariant("ledger_id mismatch"));
        }
        Ok(())
    }

    fn handle_open(&self, cmd: &OpenLedger) -> Result<Vec<StockLedgerEvent>, StockError> {
        if self.created {
            return Err(DomainError::conflict("stock ledger already open").into());
        }
        self.ensure_ledger_id(cmd.ledger_id)?;

        Ok(vec![StockLedgerEvent::LedgerOpened(LedgerOpened {
            mill_id: cmd.mill_id,
            ledger_id: cmd.ledger_id,
            sack_policy: cmd.sack_policy.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_record(&self, cmd: &RecordMovements) -> Result<Vec<StockLedgerEvent>, StockError> {
        if !self.created {
            return Err(DomainError::not_found().into());
        }
        self.ensure_mill(cmd.mill_id)?;
        self.ensure_ledger_id(cmd.ledger_id)?;

        if cmd.movements.is_empty() {
            return Err(DomainError::validation("at least one movement is required").into());
        }

        // Work on a scratch copy: one failing movement rejects the whole command.
        let mut scratch = self.stock.clone();
        let mut events = Vec::with_capacity(cmd.movements.len());

        for movement in &cmd.movements {
            let size = movement.quantity.sack_size();
            if !self.sack_policy.is_allowed(size) {
                return Err(StockError::SackSizeNotAllowed(size));
            }

            let balance = scratch.apply(movement, self.sack_policy.default_size())?;
            let change_kg = movement.quantity.total_kg()?;

            events.push(StockLedgerEvent::StockAdjusted(StockAdjusted {
                mill_id: cmd.mill_id,
                ledger_id: cmd.ledger_id,
                commodity: movement.commodity,
                type_name: movement.type_name.clone(),
                direction: movement.direction,
                change_kg,
                balance,
                reference: cmd.reference.clone(),
                occurred_at: cmd.occurred_at,
            }));
        }

        Ok(events)
    }
}
