//! RBAC resolver: the single authorization decision point.
//!
//! `authorize` is a pure, total function: every (role, operation) pair has a
//! defined outcome and anything not explicitly allowed is denied.

use serde::Serialize;
use thiserror::Error;

use tacklebox_core::{DomainError, WorkerId};

use crate::{Identity, Role, WorkerIdentity};

/// Protected operations, enumerated.
///
/// Adding a variant forces the policy match below to be revisited; there is
/// no catch-all allow.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    // Catalog
    ListProducts,
    ReadProduct,
    CreateProduct,
    DeleteProduct,

    // Sales
    RecordSale,
    ReadSale,

    // Workers
    ReadWorker,
    ListWorkers,
    CreateWorker,

    // Audit workflow
    ProposeMutation,
    ResolveAudit,
    ListAuditEntries,

    /// Directly committing an audited mutation, bypassing the approval cycle.
    /// Reserved to the workflow itself; no principal holds it.
    CommitAuditedMutation,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::ListProducts => "products.list",
            Operation::ReadProduct => "products.read",
            Operation::CreateProduct => "products.create",
            Operation::DeleteProduct => "products.delete",
            Operation::RecordSale => "sales.record",
            Operation::ReadSale => "sales.read",
            Operation::ReadWorker => "workers.read",
            Operation::ListWorkers => "workers.list",
            Operation::CreateWorker => "workers.create",
            Operation::ProposeMutation => "audit.propose",
            Operation::ResolveAudit => "audit.resolve",
            Operation::ListAuditEntries => "audit.list",
            Operation::CommitAuditedMutation => "audit.commit",
        }
    }
}

impl core::fmt::Display for Operation {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ownership context for operations scoped to a particular worker's data.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct ResourceContext {
    /// Worker the resource belongs to (profile owner, sale recorder), if the
    /// resource is owned at all.
    pub owner: Option<WorkerId>,
}

impl ResourceContext {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn owned_by(worker_id: WorkerId) -> Self {
        Self {
            owner: Some(worker_id),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("role '{role}' may not perform {operation}")]
    Forbidden { role: Role, operation: Operation },

    #[error("{operation} is restricted to the owning worker")]
    NotOwner { operation: Operation },

    #[error("{operation} requires the approval workflow and cannot be executed directly")]
    ApprovalRequired { operation: Operation },
}

impl From<AuthzError> for DomainError {
    fn from(err: AuthzError) -> Self {
        DomainError::permission_denied(err.to_string())
    }
}

/// Authorize a verified identity for one operation.
///
/// - No IO
/// - No panics
/// - Fail-closed: unmatched (role, operation) pairs deny
pub fn authorize(
    identity: &Identity,
    operation: Operation,
    ctx: &ResourceContext,
) -> Result<(), AuthzError> {
    // Reserved to the human-in-the-loop workflow: nobody commits directly,
    // admins included.
    if operation == Operation::CommitAuditedMutation {
        return Err(AuthzError::ApprovalRequired { operation });
    }

    match identity {
        Identity::Admin(_) => Ok(()),
        Identity::Worker(worker) => authorize_worker(worker, operation, ctx),
    }
}

fn authorize_worker(
    worker: &WorkerIdentity,
    operation: Operation,
    ctx: &ResourceContext,
) -> Result<(), AuthzError> {
    match operation {
        // Whitelist: read the catalog, record sales.
        Operation::ListProducts | Operation::ReadProduct | Operation::RecordSale => Ok(()),

        // Ownership-scoped: own profile, own sales.
        Operation::ReadWorker | Operation::ReadSale => {
            if ctx.owner == Some(worker.worker_id) {
                Ok(())
            } else {
                Err(AuthzError::NotOwner { operation })
            }
        }

        // Everything else is denied for workers.
        Operation::CreateProduct
        | Operation::DeleteProduct
        | Operation::ListWorkers
        | Operation::CreateWorker
        | Operation::ProposeMutation
        | Operation::ResolveAudit
        | Operation::ListAuditEntries
        | Operation::CommitAuditedMutation => Err(AuthzError::Forbidden {
            role: Role::Worker,
            operation,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AdminIdentity;

    fn admin() -> Identity {
        Identity::Admin(AdminIdentity {
            subject: "auth0|admin-1".to_string(),
            email: "boss@x.com".to_string(),
        })
    }

    fn worker(worker_id: WorkerId) -> Identity {
        Identity::Worker(WorkerIdentity {
            worker_id,
            email: "a@x.com".to_string(),
        })
    }

    const ALL_OPERATIONS: [Operation; 13] = [
        Operation::ListProducts,
        Operation::ReadProduct,
        Operation::CreateProduct,
        Operation::DeleteProduct,
        Operation::RecordSale,
        Operation::ReadSale,
        Operation::ReadWorker,
        Operation::ListWorkers,
        Operation::CreateWorker,
        Operation::ProposeMutation,
        Operation::ResolveAudit,
        Operation::ListAuditEntries,
        Operation::CommitAuditedMutation,
    ];

    #[test]
    fn admin_allowed_everything_except_direct_commit() {
        let identity = admin();
        for op in ALL_OPERATIONS {
            let got = authorize(&identity, op, &ResourceContext::none());
            if op == Operation::CommitAuditedMutation {
                assert_eq!(got, Err(AuthzError::ApprovalRequired { operation: op }));
            } else {
                assert_eq!(got, Ok(()), "admin should be allowed {op}");
            }
        }
    }

    #[test]
    fn worker_policy_table() {
        let id = WorkerId::new();
        let identity = worker(id);
        let own = ResourceContext::owned_by(id);
        let theirs = ResourceContext::owned_by(WorkerId::new());
        let unowned = ResourceContext::none();

        // Whitelisted, ownership-free.
        for op in [
            Operation::ListProducts,
            Operation::ReadProduct,
            Operation::RecordSale,
        ] {
            assert_eq!(authorize(&identity, op, &unowned), Ok(()));
        }

        // Ownership-scoped.
        for op in [Operation::ReadWorker, Operation::ReadSale] {
            assert_eq!(authorize(&identity, op, &own), Ok(()));
            assert_eq!(
                authorize(&identity, op, &theirs),
                Err(AuthzError::NotOwner { operation: op })
            );
            assert_eq!(
                authorize(&identity, op, &unowned),
                Err(AuthzError::NotOwner { operation: op })
            );
        }

        // Denied outright.
        for op in [
            Operation::CreateProduct,
            Operation::DeleteProduct,
            Operation::ListWorkers,
            Operation::CreateWorker,
            Operation::ProposeMutation,
            Operation::ResolveAudit,
            Operation::ListAuditEntries,
        ] {
            assert_eq!(
                authorize(&identity, op, &unowned),
                Err(AuthzError::Forbidden {
                    role: Role::Worker,
                    operation: op
                })
            );
        }
    }

    #[test]
    fn decisions_are_deterministic_and_order_independent() {
        let id = WorkerId::new();
        let identity = worker(id);
        let ctx = ResourceContext::owned_by(id);

        let first: Vec<_> = ALL_OPERATIONS
            .iter()
            .map(|op| authorize(&identity, *op, &ctx))
            .collect();
        let second: Vec<_> = ALL_OPERATIONS
            .iter()
            .rev()
            .map(|op| authorize(&identity, *op, &ctx))
            .collect();

        let second_reversed: Vec<_> = second.into_iter().rev().collect();
        assert_eq!(first, second_reversed);
    }
}
