//! `tacklebox-audit` — the approval workflow gating sensitive mutations.
//!
//! A sensitive mutation (stock correction, salary change) is never applied
//! where it is requested. The request is captured as a durable [`AuditEntry`]
//! in `pending` state; a different principal holding approval permission later
//! approves it (the deferred mutation is applied atomically with the state
//! transition) or rejects it (terminal, no side effect).

pub mod entry;
pub mod workflow;

pub use entry::{
    AuditCommand, AuditEntry, AuditEntryView, AuditEvent, AuditStatus, ProposedMutation, TargetRef,
};
pub use workflow::{AuditWorkflow, MutationSink};
