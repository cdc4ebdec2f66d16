//! The workflow service owning audit entries until resolution.
//!
//! Owns the entry table and the pending index. The check-then-create for the
//! one-outstanding-proposal rule and the transition-plus-mutation on approval
//! both happen under the workflow's write lock, so they are atomic with
//! respect to concurrent callers. Lock order is always workflow first, then
//! business store row; sinks must never call back into the workflow.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};

use tacklebox_auth::{ActorRef, Identity};
use tacklebox_core::{Aggregate, AuditEntryId, DomainError, DomainResult, Event};

use crate::entry::{
    ApproveEntry, AuditCommand, AuditEntry, AuditEntryView, AuditStatus, ProposeEntry,
    ProposedMutation, RejectEntry, TargetRef,
};

/// Applies an approved mutation to the business data that owns the target.
///
/// Implementations must be atomic per target (row-level locking or better)
/// and must validate the mutation against current state: an error here leaves
/// the audit entry pending, untouched.
pub trait MutationSink: Send + Sync {
    fn apply(
        &self,
        target: &TargetRef,
        mutation: &ProposedMutation,
        occurred_at: DateTime<Utc>,
    ) -> DomainResult<()>;
}

#[derive(Debug, Default)]
struct WorkflowState {
    entries: HashMap<AuditEntryId, AuditEntry>,
    /// Outstanding proposals, keyed by (target, mutation key). The invariant
    /// "at most one pending entry per key" is this map's key uniqueness.
    pending: HashMap<(TargetRef, &'static str), AuditEntryId>,
}

/// Audit/approval workflow: owns entries from proposal to resolution.
#[derive(Debug, Default)]
pub struct AuditWorkflow {
    state: RwLock<WorkflowState>,
}

impl AuditWorkflow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Capture a sensitive mutation as a pending entry. Nothing is applied.
    ///
    /// Fails with `Conflict` if an outstanding pending entry already exists
    /// for the same (target, mutation key); the check and the insert happen
    /// under one write lock.
    pub fn propose(
        &self,
        requested_by: &Identity,
        target: TargetRef,
        mutation: ProposedMutation,
        now: DateTime<Utc>,
    ) -> DomainResult<AuditEntryView> {
        let mut state = self.write_state()?;

        let key = (target.clone(), mutation.key());
        if state.pending.contains_key(&key) {
            return Err(DomainError::conflict(format!(
                "a pending proposal already exists for {} ({})",
                key.0, key.1
            )));
        }

        let entry_id = AuditEntryId::new();
        let mut entry = AuditEntry::empty(entry_id);
        let events = entry.handle(&AuditCommand::Propose(ProposeEntry {
            entry_id,
            target,
            mutation,
            requested_by: ActorRef::from(requested_by),
            occurred_at: now,
        }))?;
        Self::commit(&mut entry, &events);

        let view = Self::snapshot(&entry)?;
        state.pending.insert(key, entry_id);
        state.entries.insert(entry_id, entry);
        Ok(view)
    }

    /// Approve a pending entry: transition and deferred mutation commit
    /// together or not at all.
    pub fn approve(
        &self,
        entry_id: AuditEntryId,
        approved_by: &Identity,
        sink: &dyn MutationSink,
        now: DateTime<Utc>,
    ) -> DomainResult<AuditEntryView> {
        let mut state = self.write_state()?;
        let state = &mut *state;

        let entry = state.entries.get_mut(&entry_id).ok_or(DomainError::NotFound)?;
        let events = entry.handle(&AuditCommand::Approve(ApproveEntry {
            entry_id,
            approved_by: ActorRef::from(approved_by),
            occurred_at: now,
        }))?;

        let key = Self::pending_key(entry)?;

        // Apply the deferred mutation first: if the target rejects it (gone,
        // or would violate its own invariants), the entry stays pending.
        {
            let target = entry
                .target()
                .ok_or_else(|| DomainError::invariant("pending entry without target"))?;
            let mutation = entry
                .mutation()
                .ok_or_else(|| DomainError::invariant("pending entry without mutation"))?;
            sink.apply(target, mutation, now)?;
        }

        Self::commit(entry, &events);
        let view = Self::snapshot(entry)?;
        state.pending.remove(&key);
        Ok(view)
    }

    /// Reject a pending entry. No mutation is ever applied.
    pub fn reject(
        &self,
        entry_id: AuditEntryId,
        rejected_by: &Identity,
        reason: String,
        now: DateTime<Utc>,
    ) -> DomainResult<AuditEntryView> {
        let mut state = self.write_state()?;
        self.reject_locked(&mut state, entry_id, ActorRef::from(rejected_by), reason, now)
    }

    /// Auto-reject every pending entry for a target that is being deleted.
    ///
    /// Policy for the "target deleted while proposals are pending" case:
    /// the entries resolve to `rejected` (system actor, explicit reason)
    /// before the target row goes away, so no entry is ever left dangling.
    pub fn cancel_for_target(&self, target: &TargetRef, now: DateTime<Utc>) -> DomainResult<usize> {
        let mut state = self.write_state()?;

        let doomed: Vec<AuditEntryId> = state
            .pending
            .iter()
            .filter(|((t, _), _)| t == target)
            .map(|(_, id)| *id)
            .collect();

        for entry_id in &doomed {
            self.reject_locked(
                &mut state,
                *entry_id,
                ActorRef::system(),
                "target deleted".to_string(),
                now,
            )?;
        }
        Ok(doomed.len())
    }

    pub fn get(&self, entry_id: AuditEntryId) -> Option<AuditEntryView> {
        let state = self.state.read().ok()?;
        state.entries.get(&entry_id).and_then(AuditEntry::view)
    }

    /// All pending entries, oldest first.
    pub fn pending(&self) -> Vec<AuditEntryView> {
        let Ok(state) = self.state.read() else {
            return Vec::new();
        };
        let mut views: Vec<AuditEntryView> = state
            .entries
            .values()
            .filter(|e| e.status() == AuditStatus::Pending)
            .filter_map(AuditEntry::view)
            .collect();
        views.sort_by_key(|v| v.created_at);
        views
    }

    pub fn has_pending_for(&self, target: &TargetRef) -> bool {
        self.state
            .read()
            .map(|s| s.pending.keys().any(|(t, _)| t == target))
            .unwrap_or(false)
    }

    fn reject_locked(
        &self,
        state: &mut WorkflowState,
        entry_id: AuditEntryId,
        rejected_by: ActorRef,
        reason: String,
        now: DateTime<Utc>,
    ) -> DomainResult<AuditEntryView> {
        let entry = state.entries.get_mut(&entry_id).ok_or(DomainError::NotFound)?;
        let events = entry.handle(&AuditCommand::Reject(RejectEntry {
            entry_id,
            rejected_by,
            reason,
            occurred_at: now,
        }))?;

        let key = Self::pending_key(entry)?;
        Self::commit(entry, &events);
        let view = Self::snapshot(entry)?;
        state.pending.remove(&key);
        Ok(view)
    }

    fn pending_key(entry: &AuditEntry) -> DomainResult<(TargetRef, &'static str)> {
        let target = entry
            .target()
            .ok_or_else(|| DomainError::invariant("pending entry without target"))?;
        let mutation = entry
            .mutation()
            .ok_or_else(|| DomainError::invariant("pending entry without mutation"))?;
        Ok((target.clone(), mutation.key()))
    }

    fn commit(entry: &mut AuditEntry, events: &[crate::entry::AuditEvent]) {
        for event in events {
            tracing::info!(
                entry_id = %tacklebox_core::AggregateRoot::id(entry),
                event = event.event_type(),
                "audit entry transition"
            );
            entry.apply(event);
        }
    }

    fn snapshot(entry: &AuditEntry) -> DomainResult<AuditEntryView> {
        entry
            .view()
            .ok_or_else(|| DomainError::invariant("entry has no view before proposal"))
    }

    fn write_state(&self) -> DomainResult<std::sync::RwLockWriteGuard<'_, WorkflowState>> {
        self.state
            .write()
            .map_err(|_| DomainError::invariant("audit workflow lock poisoned"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use tacklebox_auth::AdminIdentity;
    use tacklebox_core::ProductId;

    fn admin(subject: &str) -> Identity {
        Identity::Admin(AdminIdentity {
            subject: subject.to_string(),
            email: format!("{subject}@x.com"),
        })
    }

    /// Sink that records what it applied, optionally failing every call.
    #[derive(Default)]
    struct RecordingSink {
        applied: Mutex<Vec<(TargetRef, ProposedMutation)>>,
        fail_with: Option<DomainError>,
    }

    impl RecordingSink {
        fn failing(err: DomainError) -> Self {
            Self {
                applied: Mutex::new(Vec::new()),
                fail_with: Some(err),
            }
        }

        fn applied_count(&self) -> usize {
            self.applied.lock().unwrap().len()
        }
    }

    impl MutationSink for RecordingSink {
        fn apply(
            &self,
            target: &TargetRef,
            mutation: &ProposedMutation,
            _occurred_at: DateTime<Utc>,
        ) -> DomainResult<()> {
            if let Some(err) = &self.fail_with {
                return Err(err.clone());
            }
            self.applied
                .lock()
                .unwrap()
                .push((target.clone(), mutation.clone()));
            Ok(())
        }
    }

    fn correction(delta: i64) -> ProposedMutation {
        ProposedMutation::StockCorrection { delta }
    }

    #[test]
    fn second_proposal_for_same_target_conflicts() {
        let workflow = AuditWorkflow::new();
        let target = TargetRef::Product(ProductId::new());
        let now = Utc::now();

        workflow
            .propose(&admin("auth0|a"), target.clone(), correction(-3), now)
            .unwrap();

        let second = workflow.propose(&admin("auth0|b"), target.clone(), correction(5), now);
        assert!(matches!(second, Err(DomainError::Conflict(_))));

        // A different target is unaffected.
        workflow
            .propose(
                &admin("auth0|b"),
                TargetRef::Product(ProductId::new()),
                correction(5),
                now,
            )
            .unwrap();
    }

    #[test]
    fn approve_applies_the_mutation_exactly_once() {
        let workflow = AuditWorkflow::new();
        let sink = RecordingSink::default();
        let target = TargetRef::Product(ProductId::new());
        let now = Utc::now();

        let entry = workflow
            .propose(&admin("auth0|a"), target.clone(), correction(-3), now)
            .unwrap();
        assert_eq!(sink.applied_count(), 0);

        let resolved = workflow
            .approve(entry.entry_id, &admin("auth0|b"), &sink, now)
            .unwrap();
        assert_eq!(resolved.status, AuditStatus::Approved);
        assert_eq!(sink.applied_count(), 1);

        // Third attempt on the same entry: invalid state, no second apply.
        let again = workflow.approve(entry.entry_id, &admin("auth0|c"), &sink, now);
        assert!(matches!(again, Err(DomainError::InvalidState(_))));
        assert_eq!(sink.applied_count(), 1);
    }

    #[test]
    fn approval_frees_the_pending_slot() {
        let workflow = AuditWorkflow::new();
        let sink = RecordingSink::default();
        let target = TargetRef::Product(ProductId::new());
        let now = Utc::now();

        let entry = workflow
            .propose(&admin("auth0|a"), target.clone(), correction(-3), now)
            .unwrap();
        workflow
            .approve(entry.entry_id, &admin("auth0|b"), &sink, now)
            .unwrap();

        // Same (target, mutation key) can be proposed again once resolved.
        workflow
            .propose(&admin("auth0|a"), target, correction(2), now)
            .unwrap();
    }

    #[test]
    fn reject_never_applies_and_is_terminal() {
        let workflow = AuditWorkflow::new();
        let sink = RecordingSink::default();
        let target = TargetRef::Product(ProductId::new());
        let now = Utc::now();

        let entry = workflow
            .propose(&admin("auth0|a"), target, correction(-3), now)
            .unwrap();
        let rejected = workflow
            .reject(
                entry.entry_id,
                &admin("auth0|b"),
                "recount was wrong".to_string(),
                now,
            )
            .unwrap();

        assert_eq!(rejected.status, AuditStatus::Rejected);
        assert_eq!(rejected.rejection_reason.as_deref(), Some("recount was wrong"));
        assert_eq!(sink.applied_count(), 0);

        let approve_after = workflow.approve(entry.entry_id, &admin("auth0|c"), &sink, now);
        assert!(matches!(approve_after, Err(DomainError::InvalidState(_))));
        assert_eq!(sink.applied_count(), 0);
    }

    #[test]
    fn failed_mutation_leaves_entry_pending() {
        let workflow = AuditWorkflow::new();
        let sink = RecordingSink::failing(DomainError::invariant("stock cannot go negative"));
        let target = TargetRef::Product(ProductId::new());
        let now = Utc::now();

        let entry = workflow
            .propose(&admin("auth0|a"), target, correction(-3), now)
            .unwrap();

        let result = workflow.approve(entry.entry_id, &admin("auth0|b"), &sink, now);
        assert!(matches!(result, Err(DomainError::InvariantViolation(_))));

        // Entry is untouched: still pending, still resolvable.
        let view = workflow.get(entry.entry_id).unwrap();
        assert_eq!(view.status, AuditStatus::Pending);

        let ok_sink = RecordingSink::default();
        workflow
            .approve(entry.entry_id, &admin("auth0|b"), &ok_sink, now)
            .unwrap();
        assert_eq!(ok_sink.applied_count(), 1);
    }

    #[test]
    fn self_approval_rejected_at_workflow_level() {
        let workflow = AuditWorkflow::new();
        let sink = RecordingSink::default();
        let now = Utc::now();

        let entry = workflow
            .propose(
                &admin("auth0|a"),
                TargetRef::Product(ProductId::new()),
                correction(-1),
                now,
            )
            .unwrap();

        let result = workflow.approve(entry.entry_id, &admin("auth0|a"), &sink, now);
        assert!(matches!(result, Err(DomainError::PermissionDenied(_))));
        assert_eq!(sink.applied_count(), 0);
    }

    #[test]
    fn cancel_for_target_auto_rejects_pending_entries() {
        let workflow = AuditWorkflow::new();
        let target = TargetRef::Product(ProductId::new());
        let now = Utc::now();

        let entry = workflow
            .propose(&admin("auth0|a"), target.clone(), correction(-3), now)
            .unwrap();
        assert!(workflow.has_pending_for(&target));

        let cancelled = workflow.cancel_for_target(&target, now).unwrap();
        assert_eq!(cancelled, 1);
        assert!(!workflow.has_pending_for(&target));

        let view = workflow.get(entry.entry_id).unwrap();
        assert_eq!(view.status, AuditStatus::Rejected);
        assert_eq!(view.rejection_reason.as_deref(), Some("target deleted"));
        assert_eq!(view.resolved_by.unwrap().id, "system");
    }

    #[test]
    fn missing_entry_is_not_found() {
        let workflow = AuditWorkflow::new();
        let sink = RecordingSink::default();

        let result = workflow.approve(AuditEntryId::new(), &admin("auth0|b"), &sink, Utc::now());
        assert_eq!(result, Err(DomainError::NotFound));
    }
}
