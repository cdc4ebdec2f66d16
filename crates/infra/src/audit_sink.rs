//! Bridges approved audit entries to the business stores that own the data.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use tacklebox_audit::{MutationSink, ProposedMutation, TargetRef};
use tacklebox_core::{DomainError, DomainResult};

use crate::{InMemoryCredentialStore, InMemoryProductStore};

/// The one [`MutationSink`] wired into the workflow: routes each approved
/// mutation to its owning store, which applies it under the target's row lock.
#[derive(Clone)]
pub struct BusinessMutationSink {
    products: Arc<InMemoryProductStore>,
    workers: Arc<InMemoryCredentialStore>,
}

impl BusinessMutationSink {
    pub fn new(products: Arc<InMemoryProductStore>, workers: Arc<InMemoryCredentialStore>) -> Self {
        Self { products, workers }
    }
}

impl MutationSink for BusinessMutationSink {
    fn apply(
        &self,
        target: &TargetRef,
        mutation: &ProposedMutation,
        occurred_at: DateTime<Utc>,
    ) -> DomainResult<()> {
        match (target, mutation) {
            (TargetRef::Product(product_id), ProposedMutation::StockCorrection { delta }) => {
                let view = self.products.adjust_stock(*product_id, *delta, occurred_at)?;
                tracing::info!(%product_id, delta, stock = view.stock, "stock correction applied");
                Ok(())
            }
            (
                TargetRef::Worker(worker_id),
                ProposedMutation::SalaryChange {
                    monthly_salary_cents,
                },
            ) => {
                self.workers.set_salary(*worker_id, *monthly_salary_cents)?;
                tracing::info!(%worker_id, monthly_salary_cents, "salary change applied");
                Ok(())
            }
            // Pairing is validated at propose time; anything else here is a bug.
            _ => Err(DomainError::validation(
                "mutation does not apply to this target",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tacklebox_audit::{AuditStatus, AuditWorkflow};
    use tacklebox_auth::{AdminIdentity, Identity};

    fn admin(subject: &str) -> Identity {
        Identity::Admin(AdminIdentity {
            subject: subject.to_string(),
            email: format!("{subject}@x.com"),
        })
    }

    fn wired() -> (
        AuditWorkflow,
        BusinessMutationSink,
        Arc<InMemoryProductStore>,
        Arc<InMemoryCredentialStore>,
    ) {
        let products = Arc::new(InMemoryProductStore::new());
        let workers = Arc::new(InMemoryCredentialStore::new());
        let sink = BusinessMutationSink::new(Arc::clone(&products), Arc::clone(&workers));
        (AuditWorkflow::new(), sink, products, workers)
    }

    #[test]
    fn approved_stock_correction_updates_the_product() {
        let (workflow, sink, products, _) = wired();
        let now = Utc::now();

        let p = products
            .create_product("ROD-7", "Spinning rod", 8_999, now)
            .unwrap();
        products.adjust_stock(p.product_id, 10, now).unwrap();

        let entry = workflow
            .propose(
                &admin("auth0|a"),
                TargetRef::Product(p.product_id),
                ProposedMutation::StockCorrection { delta: -4 },
                now,
            )
            .unwrap();

        // Nothing applied while pending.
        assert_eq!(products.get(p.product_id).unwrap().stock, 10);

        let resolved = workflow
            .approve(entry.entry_id, &admin("auth0|b"), &sink, now)
            .unwrap();
        assert_eq!(resolved.status, AuditStatus::Approved);
        assert_eq!(products.get(p.product_id).unwrap().stock, 6);
    }

    #[test]
    fn correction_that_violates_stock_invariant_stays_pending() {
        let (workflow, sink, products, _) = wired();
        let now = Utc::now();

        let p = products
            .create_product("ROD-7", "Spinning rod", 8_999, now)
            .unwrap();
        products.adjust_stock(p.product_id, 2, now).unwrap();

        let entry = workflow
            .propose(
                &admin("auth0|a"),
                TargetRef::Product(p.product_id),
                ProposedMutation::StockCorrection { delta: -5 },
                now,
            )
            .unwrap();

        let result = workflow.approve(entry.entry_id, &admin("auth0|b"), &sink, now);
        assert!(matches!(result, Err(DomainError::InvariantViolation(_))));
        assert_eq!(products.get(p.product_id).unwrap().stock, 2);
        assert_eq!(
            workflow.get(entry.entry_id).unwrap().status,
            AuditStatus::Pending
        );
    }

    #[test]
    fn approved_salary_change_updates_the_worker() {
        let (workflow, sink, _, workers) = wired();
        let now = Utc::now();

        let w = workers
            .create_worker("a@x.com", "password123", 350_000, now)
            .unwrap();

        let entry = workflow
            .propose(
                &admin("auth0|a"),
                TargetRef::Worker(w.worker_id),
                ProposedMutation::SalaryChange {
                    monthly_salary_cents: 420_000,
                },
                now,
            )
            .unwrap();

        workflow
            .approve(entry.entry_id, &admin("auth0|b"), &sink, now)
            .unwrap();
        assert_eq!(
            workers.profile(w.worker_id).unwrap().monthly_salary_cents,
            420_000
        );
    }

    #[test]
    fn deleting_a_product_auto_rejects_its_pending_entries() {
        let (workflow, _sink, products, _) = wired();
        let now = Utc::now();

        let p = products
            .create_product("ROD-7", "Spinning rod", 8_999, now)
            .unwrap();
        let entry = workflow
            .propose(
                &admin("auth0|a"),
                TargetRef::Product(p.product_id),
                ProposedMutation::StockCorrection { delta: 3 },
                now,
            )
            .unwrap();

        let cancelled = products.remove(p.product_id, &workflow, now).unwrap();
        assert_eq!(cancelled, 1);
        assert!(products.get(p.product_id).is_none());

        let view = workflow.get(entry.entry_id).unwrap();
        assert_eq!(view.status, AuditStatus::Rejected);
        assert_eq!(view.rejection_reason.as_deref(), Some("target deleted"));
    }
}
