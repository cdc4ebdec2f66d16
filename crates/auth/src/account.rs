//! Worker account records owned by the credential store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tacklebox_core::WorkerId;

use crate::{LoginHistory, WorkerIdentity};

/// A worker's credential-store row.
///
/// # Invariants
/// - `email` is unique across the store (enforced by the store).
/// - `password_hash` never appears in any outward-facing representation:
///   it is skipped on serialization, and [`WorkerProfile`] (the only shape
///   handed to callers) has no field for it at all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerAccount {
    pub worker_id: WorkerId,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub monthly_salary_cents: i64,
    pub revenue_cents: i64,
    pub login_history: LoginHistory,
    pub created_at: DateTime<Utc>,
}

impl WorkerAccount {
    pub fn new(
        worker_id: WorkerId,
        email: String,
        password_hash: String,
        monthly_salary_cents: i64,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            worker_id,
            email,
            password_hash,
            monthly_salary_cents,
            revenue_cents: 0,
            login_history: LoginHistory::new(),
            created_at,
        }
    }

    pub fn identity(&self) -> WorkerIdentity {
        WorkerIdentity {
            worker_id: self.worker_id,
            email: self.email.clone(),
        }
    }

    pub fn profile(&self) -> WorkerProfile {
        WorkerProfile {
            worker_id: self.worker_id,
            email: self.email.clone(),
            monthly_salary_cents: self.monthly_salary_cents,
            revenue_cents: self.revenue_cents,
            recent_logins: self.login_history.entries().collect(),
            created_at: self.created_at,
        }
    }
}

/// Outward-facing worker record; structurally cannot carry the hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerProfile {
    pub worker_id: WorkerId,
    pub email: String,
    pub monthly_salary_cents: i64,
    pub revenue_cents: i64,
    pub recent_logins: Vec<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}
