use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tacklebox_auth::ActorRef;
use tacklebox_core::{Aggregate, AggregateRoot, DomainError, Event, ProductId, SaleId};

/// Aggregate root: one recorded sale.
///
/// Sales are immutable once recorded; corrections happen on the inventory
/// side through the approval workflow, not by editing the sale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sale {
    id: SaleId,
    product_id: Option<ProductId>,
    quantity: i64,
    unit_price_cents: i64,
    recorded_by: Option<ActorRef>,
    occurred_at: Option<DateTime<Utc>>,
    version: u64,
    created: bool,
}

impl Sale {
    /// Create an empty, not-yet-recorded aggregate instance.
    pub fn empty(id: SaleId) -> Self {
        Self {
            id,
            product_id: None,
            quantity: 0,
            unit_price_cents: 0,
            recorded_by: None,
            occurred_at: None,
            version: 0,
            created: false,
        }
    }

    pub fn total_cents(&self) -> i64 {
        self.quantity * self.unit_price_cents
    }

    pub fn recorded_by(&self) -> Option<&ActorRef> {
        self.recorded_by.as_ref()
    }

    pub fn view(&self) -> Option<SaleView> {
        let product_id = self.product_id?;
        let recorded_by = self.recorded_by.clone()?;
        let occurred_at = self.occurred_at?;
        Some(SaleView {
            sale_id: self.id,
            product_id,
            quantity: self.quantity,
            unit_price_cents: self.unit_price_cents,
            total_cents: self.total_cents(),
            recorded_by,
            occurred_at,
        })
    }
}

impl AggregateRoot for Sale {
    type Id = SaleId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Read-side snapshot of a recorded sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleView {
    pub sale_id: SaleId,
    pub product_id: ProductId,
    pub quantity: i64,
    pub unit_price_cents: i64,
    pub total_cents: i64,
    pub recorded_by: ActorRef,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RecordSale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordSale {
    pub sale_id: SaleId,
    pub product_id: ProductId,
    pub quantity: i64,
    pub unit_price_cents: i64,
    pub recorded_by: ActorRef,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SaleCommand {
    RecordSale(RecordSale),
}

/// Event: SaleRecorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleRecorded {
    pub sale_id: SaleId,
    pub product_id: ProductId,
    pub quantity: i64,
    pub unit_price_cents: i64,
    pub recorded_by: ActorRef,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SaleEvent {
    SaleRecorded(SaleRecorded),
}

impl Event for SaleEvent {
    fn event_type(&self) -> &'static str {
        match self {
            SaleEvent::SaleRecorded(_) => "sales.sale.recorded",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            SaleEvent::SaleRecorded(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Sale {
    type Command = SaleCommand;
    type Event = SaleEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            SaleEvent::SaleRecorded(e) => {
                self.id = e.sale_id;
                self.product_id = Some(e.product_id);
                self.quantity = e.quantity;
                self.unit_price_cents = e.unit_price_cents;
                self.recorded_by = Some(e.recorded_by.clone());
                self.occurred_at = Some(e.occurred_at);
                self.created = true;
            }
        }
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            SaleCommand::RecordSale(cmd) => self.handle_record(cmd),
        }
    }
}

impl Sale {
    fn handle_record(&self, cmd: &RecordSale) -> Result<Vec<SaleEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("sale already recorded"));
        }
        if cmd.quantity <= 0 {
            return Err(DomainError::validation("quantity must be positive"));
        }
        if cmd.unit_price_cents < 0 {
            return Err(DomainError::validation("unit price cannot be negative"));
        }

        Ok(vec![SaleEvent::SaleRecorded(SaleRecorded {
            sale_id: cmd.sale_id,
            product_id: cmd.product_id,
            quantity: cmd.quantity,
            unit_price_cents: cmd.unit_price_cents,
            recorded_by: cmd.recorded_by.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }
}
