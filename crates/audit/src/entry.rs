//! The audit entry aggregate: one proposed sensitive mutation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tacklebox_auth::ActorRef;
use tacklebox_core::{Aggregate, AggregateRoot, AuditEntryId, DomainError, Event, ProductId, WorkerId};

/// Resource a proposed mutation targets.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum TargetRef {
    Product(ProductId),
    Worker(WorkerId),
}

impl core::fmt::Display for TargetRef {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            TargetRef::Product(id) => write!(f, "product/{id}"),
            TargetRef::Worker(id) => write!(f, "worker/{id}"),
        }
    }
}

/// The deferred change itself: a durable command payload, not a closure, so a
/// proposal survives a process restart between proposal and resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mutation", rename_all = "snake_case")]
pub enum ProposedMutation {
    /// Correct a product's on-hand stock by a signed delta.
    StockCorrection { delta: i64 },
    /// Change a worker's monthly salary.
    SalaryChange { monthly_salary_cents: i64 },
}

impl ProposedMutation {
    /// Mutation key: together with the target it identifies "the same change
    /// being proposed", for the one-outstanding-proposal rule.
    pub fn key(&self) -> &'static str {
        match self {
            ProposedMutation::StockCorrection { .. } => "inventory.stock_correction",
            ProposedMutation::SalaryChange { .. } => "workers.salary_change",
        }
    }

    pub fn applies_to(&self, target: &TargetRef) -> bool {
        matches!(
            (self, target),
            (ProposedMutation::StockCorrection { .. }, TargetRef::Product(_))
                | (ProposedMutation::SalaryChange { .. }, TargetRef::Worker(_))
        )
    }

    fn validate(&self) -> Result<(), DomainError> {
        match self {
            ProposedMutation::StockCorrection { delta } => {
                if *delta == 0 {
                    return Err(DomainError::validation("correction delta cannot be zero"));
                }
                Ok(())
            }
            ProposedMutation::SalaryChange {
                monthly_salary_cents,
            } => {
                if *monthly_salary_cents < 0 {
                    return Err(DomainError::validation("salary cannot be negative"));
                }
                Ok(())
            }
        }
    }
}

/// Lifecycle state of an audit entry. Both resolved states are absorbing.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditStatus {
    Pending,
    Approved,
    Rejected,
}

impl core::fmt::Display for AuditStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            AuditStatus::Pending => f.write_str("pending"),
            AuditStatus::Approved => f.write_str("approved"),
            AuditStatus::Rejected => f.write_str("rejected"),
        }
    }
}

/// Aggregate root: one pending or resolved sensitive mutation.
///
/// # Invariants
/// - Initial state is always `pending`.
/// - An entry transitions exactly once, to `approved` or `rejected`; resolved
///   entries never transition again.
/// - The requester may not approve their own proposal, regardless of role.
/// - A rejection always carries a reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditEntry {
    id: AuditEntryId,
    target: Option<TargetRef>,
    mutation: Option<ProposedMutation>,
    requested_by: Option<ActorRef>,
    status: AuditStatus,
    resolved_by: Option<ActorRef>,
    rejection_reason: Option<String>,
    created_at: Option<DateTime<Utc>>,
    resolved_at: Option<DateTime<Utc>>,
    version: u64,
    created: bool,
}

impl AuditEntry {
    /// Create an empty, not-yet-proposed aggregate instance.
    pub fn empty(id: AuditEntryId) -> Self {
        Self {
            id,
            target: None,
            mutation: None,
            requested_by: None,
            status: AuditStatus::Pending,
            resolved_by: None,
            rejection_reason: None,
            created_at: None,
            resolved_at: None,
            version: 0,
            created: false,
        }
    }

    pub fn status(&self) -> AuditStatus {
        self.status
    }

    pub fn target(&self) -> Option<&TargetRef> {
        self.target.as_ref()
    }

    pub fn mutation(&self) -> Option<&ProposedMutation> {
        self.mutation.as_ref()
    }

    pub fn view(&self) -> Option<AuditEntryView> {
        Some(AuditEntryView {
            entry_id: self.id,
            target: self.target.clone()?,
            mutation: self.mutation.clone()?,
            requested_by: self.requested_by.clone()?,
            status: self.status,
            resolved_by: self.resolved_by.clone(),
            rejection_reason: self.rejection_reason.clone(),
            created_at: self.created_at?,
            resolved_at: self.resolved_at,
        })
    }
}

impl AggregateRoot for AuditEntry {
    type Id = AuditEntryId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Read-side snapshot of an audit entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntryView {
    pub entry_id: AuditEntryId,
    pub target: TargetRef,
    pub mutation: ProposedMutation,
    pub requested_by: ActorRef,
    pub status: AuditStatus,
    pub resolved_by: Option<ActorRef>,
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

/// Command: propose a sensitive mutation (captures intent, applies nothing).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposeEntry {
    pub entry_id: AuditEntryId,
    pub target: TargetRef,
    pub mutation: ProposedMutation,
    pub requested_by: ActorRef,
    pub occurred_at: DateTime<Utc>,
}

/// Command: approve a pending entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApproveEntry {
    pub entry_id: AuditEntryId,
    pub approved_by: ActorRef,
    pub occurred_at: DateTime<Utc>,
}

/// Command: reject a pending entry. The reason is mandatory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectEntry {
    pub entry_id: AuditEntryId,
    pub rejected_by: ActorRef,
    pub reason: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuditCommand {
    Propose(ProposeEntry),
    Approve(ApproveEntry),
    Reject(RejectEntry),
}

/// Event: entry proposed (pending).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryProposed {
    pub entry_id: AuditEntryId,
    pub target: TargetRef,
    pub mutation: ProposedMutation,
    pub requested_by: ActorRef,
    pub occurred_at: DateTime<Utc>,
}

/// Event: entry approved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryApproved {
    pub entry_id: AuditEntryId,
    pub approved_by: ActorRef,
    pub occurred_at: DateTime<Utc>,
}

/// Event: entry rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryRejected {
    pub entry_id: AuditEntryId,
    pub rejected_by: ActorRef,
    pub reason: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuditEvent {
    Proposed(EntryProposed),
    Approved(EntryApproved),
    Rejected(EntryRejected),
}

impl Event for AuditEvent {
    fn event_type(&self) -> &'static str {
        match self {
            AuditEvent::Proposed(_) => "audit.entry.proposed",
            AuditEvent::Approved(_) => "audit.entry.approved",
            AuditEvent::Rejected(_) => "audit.entry.rejected",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            AuditEvent::Proposed(e) => e.occurred_at,
            AuditEvent::Approved(e) => e.occurred_at,
            AuditEvent::Rejected(e) => e.occurred_at,
        }
    }
}

impl Aggregate for AuditEntry {
    type Command = AuditCommand;
    type Event = AuditEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            AuditEvent::Proposed(e) => {
                self.id = e.entry_id;
                self.target = Some(e.target.clone());
                self.mutation = Some(e.mutation.clone());
                self.requested_by = Some(e.requested_by.clone());
                self.status = AuditStatus::Pending;
                self.created_at = Some(e.occurred_at);
                self.created = true;
            }
            AuditEvent::Approved(e) => {
                self.status = AuditStatus::Approved;
                self.resolved_by = Some(e.approved_by.clone());
                self.resolved_at = Some(e.occurred_at);
            }
            AuditEvent::Rejected(e) => {
                self.status = AuditStatus::Rejected;
                self.resolved_by = Some(e.rejected_by.clone());
                self.rejection_reason = Some(e.reason.clone());
                self.resolved_at = Some(e.occurred_at);
            }
        }
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            AuditCommand::Propose(cmd) => self.handle_propose(cmd),
            AuditCommand::Approve(cmd) => self.handle_approve(cmd),
            AuditCommand::Reject(cmd) => self.handle_reject(cmd),
        }
    }
}

impl AuditEntry {
    fn ensure_entry_id(&self, entry_id: AuditEntryId) -> Result<(), DomainError> {
        if self.id != entry_id {
            return Err(DomainError::invariant("entry_id mismatch"));
        }
        Ok(())
    }

    fn ensure_resolvable(&self, resolver: &ActorRef) -> Result<(), DomainError> {
        if !self.created {
            return Err(DomainError::NotFound);
        }
        if self.status != AuditStatus::Pending {
            return Err(DomainError::invalid_state(format!(
                "entry is already {}",
                self.status
            )));
        }
        if !resolver.role.can_resolve_audits() {
            return Err(DomainError::permission_denied(format!(
                "role '{}' may not resolve audit entries",
                resolver.role
            )));
        }
        Ok(())
    }

    fn handle_propose(&self, cmd: &ProposeEntry) -> Result<Vec<AuditEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("entry already proposed"));
        }
        if !cmd.mutation.applies_to(&cmd.target) {
            return Err(DomainError::validation(format!(
                "mutation '{}' does not apply to target '{}'",
                cmd.mutation.key(),
                cmd.target
            )));
        }
        cmd.mutation.validate()?;

        Ok(vec![AuditEvent::Proposed(EntryProposed {
            entry_id: cmd.entry_id,
            target: cmd.target.clone(),
            mutation: cmd.mutation.clone(),
            requested_by: cmd.requested_by.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_approve(&self, cmd: &ApproveEntry) -> Result<Vec<AuditEvent>, DomainError> {
        self.ensure_entry_id(cmd.entry_id)?;
        self.ensure_resolvable(&cmd.approved_by)?;

        // Self-approval is forbidden even when the requester holds approval
        // permission; a second pair of eyes is the point of the workflow.
        if self
            .requested_by
            .as_ref()
            .is_some_and(|r| r.id == cmd.approved_by.id)
        {
            return Err(DomainError::permission_denied(
                "requester may not approve their own proposal",
            ));
        }

        Ok(vec![AuditEvent::Approved(EntryApproved {
            entry_id: cmd.entry_id,
            approved_by: cmd.approved_by.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_reject(&self, cmd: &RejectEntry) -> Result<Vec<AuditEvent>, DomainError> {
        self.ensure_entry_id(cmd.entry_id)?;
        self.ensure_resolvable(&cmd.rejected_by)?;

        if cmd.reason.trim().is_empty() {
            return Err(DomainError::validation("rejection reason is required"));
        }

        Ok(vec![AuditEvent::Rejected(EntryRejected {
            entry_id: cmd.entry_id,
            rejected_by: cmd.rejected_by.clone(),
            reason: cmd.reason.trim().to_string(),
            occurred_at: cmd.occurred_at,
        })])
    }
}
