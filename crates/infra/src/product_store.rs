//! In-memory product store (catalog + stock).

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use chrono::{DateTime, Utc};

use tacklebox_audit::{AuditWorkflow, TargetRef};
use tacklebox_core::{Aggregate, DomainError, DomainResult, Event, ProductId};
use tacklebox_inventory::{AdjustStock, CreateProduct, Product, ProductCommand, ProductView};

/// In-memory product rows; same locking contract as the credential store.
#[derive(Debug, Default)]
pub struct InMemoryProductStore {
    rows: RwLock<HashMap<ProductId, Arc<Mutex<Product>>>>,
}

impl InMemoryProductStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_product(
        &self,
        sku: &str,
        name: &str,
        unit_price_cents: i64,
        now: DateTime<Utc>,
    ) -> DomainResult<ProductView> {
        let product_id = ProductId::new();
        let mut product = Product::empty(product_id);
        let events = product.handle(&ProductCommand::CreateProduct(CreateProduct {
            product_id,
            sku: sku.to_string(),
            name: name.to_string(),
            unit_price_cents,
            occurred_at: now,
        }))?;
        Self::commit(&mut product, &events);

        let view = product.view();
        self.write_rows()?
            .insert(product_id, Arc::new(Mutex::new(product)));
        Ok(view)
    }

    pub fn get(&self, product_id: ProductId) -> Option<ProductView> {
        let row = {
            let rows = self.rows.read().ok()?;
            Arc::clone(rows.get(&product_id)?)
        };
        let product = row.lock().ok()?;
        Some(product.view())
    }

    /// All products, ordered by SKU.
    pub fn list(&self) -> Vec<ProductView> {
        let rows: Vec<Arc<Mutex<Product>>> = match self.rows.read() {
            Ok(rows) => rows.values().map(Arc::clone).collect(),
            Err(_) => return Vec::new(),
        };

        let mut views: Vec<ProductView> = rows
            .iter()
            .filter_map(|row| row.lock().ok().map(|p| p.view()))
            .collect();
        views.sort_by(|a, b| a.sku.cmp(&b.sku));
        views
    }

    /// Adjust a product's stock by a signed delta, serialized per row.
    ///
    /// Callers are the sale path (decrements) and the approval workflow's
    /// mutation sink; the HTTP surface has no direct route here.
    pub fn adjust_stock(
        &self,
        product_id: ProductId,
        delta: i64,
        now: DateTime<Utc>,
    ) -> DomainResult<ProductView> {
        let row = self.row(product_id)?;
        let mut product = row
            .lock()
            .map_err(|_| DomainError::invariant("product row lock poisoned"))?;

        let events = product.handle(&ProductCommand::AdjustStock(AdjustStock {
            product_id,
            delta,
            occurred_at: now,
        }))?;
        Self::commit(&mut product, &events);
        Ok(product.view())
    }

    /// Delete a product.
    ///
    /// Pending audit entries targeting it are auto-rejected first (reason
    /// "target deleted"), so no entry is left referencing a missing row.
    pub fn remove(
        &self,
        product_id: ProductId,
        workflow: &AuditWorkflow,
        now: DateTime<Utc>,
    ) -> DomainResult<usize> {
        let cancelled = workflow.cancel_for_target(&TargetRef::Product(product_id), now)?;

        let mut rows = self.write_rows()?;
        if rows.remove(&product_id).is_none() {
            return Err(DomainError::NotFound);
        }
        tracing::info!(%product_id, cancelled, "product removed");
        Ok(cancelled)
    }

    fn row(&self, product_id: ProductId) -> DomainResult<Arc<Mutex<Product>>> {
        let rows = self
            .rows
            .read()
            .map_err(|_| DomainError::invariant("product store lock poisoned"))?;
        rows.get(&product_id)
            .map(Arc::clone)
            .ok_or(DomainError::NotFound)
    }

    fn write_rows(
        &self,
    ) -> DomainResult<std::sync::RwLockWriteGuard<'_, HashMap<ProductId, Arc<Mutex<Product>>>>>
    {
        self.rows
            .write()
            .map_err(|_| DomainError::invariant("product store lock poisoned"))
    }

    fn commit(product: &mut Product, events: &[tacklebox_inventory::ProductEvent]) {
        for event in events {
            tracing::debug!(event = event.event_type(), "inventory event");
            product.apply(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_get_list() {
        let store = InMemoryProductStore::new();
        let a = store
            .create_product("REEL-2", "Baitcasting reel", 14_999, Utc::now())
            .unwrap();
        let b = store
            .create_product("LURE-9", "Crankbait lure", 799, Utc::now())
            .unwrap();

        assert_eq!(store.get(a.product_id).unwrap().stock, 0);

        let listed = store.list();
        assert_eq!(listed.len(), 2);
        // Ordered by SKU.
        assert_eq!(listed[0].product_id, b.product_id);
    }

    #[test]
    fn adjust_stock_round_trip() {
        let store = InMemoryProductStore::new();
        let p = store
            .create_product("ROD-7", "Spinning rod", 8_999, Utc::now())
            .unwrap();

        let view = store.adjust_stock(p.product_id, 10, Utc::now()).unwrap();
        assert_eq!(view.stock, 10);

        let too_much = store.adjust_stock(p.product_id, -11, Utc::now());
        assert!(matches!(too_much, Err(DomainError::InvariantViolation(_))));
        assert_eq!(store.get(p.product_id).unwrap().stock, 10);
    }

    #[test]
    fn remove_unknown_is_not_found() {
        let store = InMemoryProductStore::new();
        let workflow = AuditWorkflow::new();
        let result = store.remove(ProductId::new(), &workflow, Utc::now());
        assert_eq!(result, Err(DomainError::NotFound));
    }
}
