//! In-memory sale records, with stock decrement and revenue attribution.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use chrono::{DateTime, Utc};

use tacklebox_auth::{ActorRef, Identity};
use tacklebox_core::{Aggregate, DomainError, DomainResult, Event, ProductId, SaleId};
use tacklebox_sales::{RecordSale, Sale, SaleCommand, SaleView};

use crate::{InMemoryCredentialStore, InMemoryProductStore};

/// In-memory sale store.
///
/// Recording a sale is the ordinary, unaudited stock path: the decrement is a
/// direct consequence of the sale, not a correction. Revenue is attributed to
/// the recording worker (admins record sales without attribution).
pub struct InMemorySaleStore {
    rows: RwLock<HashMap<SaleId, Arc<Mutex<Sale>>>>,
    products: Arc<InMemoryProductStore>,
    workers: Arc<InMemoryCredentialStore>,
}

impl InMemorySaleStore {
    pub fn new(
        products: Arc<InMemoryProductStore>,
        workers: Arc<InMemoryCredentialStore>,
    ) -> Self {
        Self {
            rows: RwLock::new(HashMap::new()),
            products,
            workers,
        }
    }

    pub fn record(
        &self,
        recorded_by: &Identity,
        product_id: ProductId,
        quantity: i64,
        now: DateTime<Utc>,
    ) -> DomainResult<SaleView> {
        let product = self.products.get(product_id).ok_or(DomainError::NotFound)?;

        let sale_id = SaleId::new();
        let mut sale = Sale::empty(sale_id);
        let events = sale.handle(&SaleCommand::RecordSale(RecordSale {
            sale_id,
            product_id,
            quantity,
            unit_price_cents: product.unit_price_cents,
            recorded_by: ActorRef::from(recorded_by),
            occurred_at: now,
        }))?;

        // Take the stock before committing the sale; an insufficient-stock
        // sale never becomes a record.
        self.products.adjust_stock(product_id, -quantity, now)?;

        for event in &events {
            tracing::debug!(event = event.event_type(), "sales event");
            sale.apply(event);
        }
        let view = sale
            .view()
            .ok_or_else(|| DomainError::invariant("recorded sale has no view"))?;

        if let Identity::Worker(worker) = recorded_by {
            if let Err(err) = self.workers.add_revenue(worker.worker_id, view.total_cents) {
                tracing::warn!(worker_id = %worker.worker_id, %err, "revenue attribution failed");
            }
        }

        self.rows
            .write()
            .map_err(|_| DomainError::invariant("sale store lock poisoned"))?
            .insert(sale_id, Arc::new(Mutex::new(sale)));
        Ok(view)
    }

    pub fn get(&self, sale_id: SaleId) -> Option<SaleView> {
        let row = {
            let rows = self.rows.read().ok()?;
            Arc::clone(rows.get(&sale_id)?)
        };
        let sale = row.lock().ok()?;
        sale.view()
    }
}
