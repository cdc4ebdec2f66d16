use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tacklebox_core::{Aggregate, AggregateRoot, DomainError, Event, ProductId};

/// Aggregate root: a catalog product with an on-hand stock level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Product {
    id: ProductId,
    sku: String,
    name: String,
    unit_price_cents: i64,
    stock: i64,
    version: u64,
    created: bool,
}

impl Product {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: ProductId) -> Self {
        Self {
            id,
            sku: String::new(),
            name: String::new(),
            unit_price_cents: 0,
            stock: 0,
            version: 0,
            created: false,
        }
    }

    pub fn stock(&self) -> i64 {
        self.stock
    }

    pub fn unit_price_cents(&self) -> i64 {
        self.unit_price_cents
    }

    pub fn view(&self) -> ProductView {
        ProductView {
            product_id: self.id,
            sku: self.sku.clone(),
            name: self.name.clone(),
            unit_price_cents: self.unit_price_cents,
            stock: self.stock,
        }
    }
}

impl AggregateRoot for Product {
    type Id = ProductId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Read-side snapshot of a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductView {
    pub product_id: ProductId,
    pub sku: String,
    pub name: String,
    pub unit_price_cents: i64,
    pub stock: i64,
}

/// Command: CreateProduct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateProduct {
    pub product_id: ProductId,
    pub sku: String,
    pub name: String,
    pub unit_price_cents: i64,
    pub occurred_at: DateTime<Utc>,
}

/// Command: AdjustStock (positive or negative delta).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdjustStock {
    pub product_id: ProductId,
    pub delta: i64,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProductCommand {
    CreateProduct(CreateProduct),
    AdjustStock(AdjustStock),
}

/// Event: ProductCreated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductCreated {
    pub product_id: ProductId,
    pub sku: String,
    pub name: String,
    pub unit_price_cents: i64,
    pub occurred_at: DateTime<Utc>,
}

/// Event: StockAdjusted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockAdjusted {
    pub product_id: ProductId,
    pub delta: i64,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProductEvent {
    ProductCreated(ProductCreated),
    StockAdjusted(StockAdjusted),
}

impl Event for ProductEvent {
    fn event_type(&self) -> &'static str {
        match self {
            ProductEvent::ProductCreated(_) => "inventory.product.created",
            ProductEvent::StockAdjusted(_) => "inventory.product.stock_adjusted",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            ProductEvent::ProductCreated(e) => e.occurred_at,
            ProductEvent::StockAdjusted(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Product {
    type Command = ProductCommand;
    type Event = ProductEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            ProductEvent::ProductCreated(e) => {
                self.id = e.product_id;
                self.sku = e.sku.clone();
                self.name = e.name.clone();
                self.unit_price_cents = e.unit_price_cents;
                self.stock = 0;
                self.created = true;
            }
            ProductEvent::StockAdjusted(e) => {
                self.stock += e.delta;
            }
        }

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            ProductCommand::CreateProduct(cmd) => self.handle_create(cmd),
            ProductCommand::AdjustStock(cmd) => self.handle_adjust(cmd),
        }
    }
}

impl Product {
    fn ensure_product_id(&self, product_id: ProductId) -> Result<(), DomainError> {
        if self.id != product_id {
            return Err(DomainError::invariant("product_id mismatch"));
        }
        Ok(())
    }

    fn handle_create(&self, cmd: &CreateProduct) -> Result<Vec<ProductEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("product already exists"));
        }
        if cmd.sku.trim().is_empty() {
            return Err(DomainError::validation("sku cannot be empty"));
        }
        if cmd.name.trim().is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }
        if cmd.unit_price_cents < 0 {
            return Err(DomainError::validation("unit price cannot be negative"));
        }
        Ok(vec![ProductEvent::ProductCreated(ProductCreated {
            product_id: cmd.product_id,
            sku: cmd.sku.trim().to_string(),
            name: cmd.name.trim().to_string(),
            unit_price_cents: cmd.unit_price_cents,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_adjust(&self, cmd: &AdjustStock) -> Result<Vec<ProductEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        self.ensure_product_id(cmd.product_id)?;

        if cmd.delta == 0 {
            return Err(DomainError::validation("delta cannot be zero"));
        }

        let new_stock = self.stock + cmd.delta;
        if new_stock < 0 {
            return Err(DomainError::invariant("stock cannot go negative"));
        }

        Ok(vec![ProductEvent::StockAdjusted(StockAdjusted {
            product_id: cmd.product_id,
            delta: cmd.delta,
            occurred_at: cmd.occurred_at,
        })])
    }
}
