use serde::{Deserialize, Serialize};

use tacklebox_core::WorkerId;

use crate::Role;

/// Identity of a principal authenticated by the external identity provider.
///
/// The provider owns these accounts end to end; we only ever see a verified
/// token. `subject` is the provider's opaque subject identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminIdentity {
    pub subject: String,
    pub email: String,
}

/// Identity of a worker authenticated against the self-hosted credential store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerIdentity {
    pub worker_id: WorkerId,
    pub email: String,
}

/// A verified principal, from either credential domain.
///
/// This is a tagged union on purpose: authorization code matches on the
/// variant instead of downcasting, and every core operation takes the verified
/// identity as an explicit argument (no ambient "current user").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Identity {
    Admin(AdminIdentity),
    Worker(WorkerIdentity),
}

impl Identity {
    pub fn role(&self) -> Role {
        match self {
            Identity::Admin(_) => Role::Admin,
            Identity::Worker(_) => Role::Worker,
        }
    }

    /// Stable identifier for accountability records (audit trails).
    ///
    /// Admin subjects and worker UUIDs never collide: the provider prefixes
    /// its subjects (e.g. "auth0|..."), workers are plain UUIDs.
    pub fn actor_id(&self) -> String {
        match self {
            Identity::Admin(a) => a.subject.clone(),
            Identity::Worker(w) => w.worker_id.to_string(),
        }
    }

    pub fn email(&self) -> &str {
        match self {
            Identity::Admin(a) => &a.email,
            Identity::Worker(w) => &w.email,
        }
    }

    pub fn as_worker(&self) -> Option<&WorkerIdentity> {
        match self {
            Identity::Worker(w) => Some(w),
            Identity::Admin(_) => None,
        }
    }
}

/// Snapshot of an identity recorded on durable accountability records.
///
/// Audit entries outlive sessions, so they keep this value copy rather than a
/// reference to the verified identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorRef {
    pub id: String,
    pub role: Role,
}

impl ActorRef {
    /// Actor used for system-initiated resolutions (e.g. auto-reject when a
    /// target is deleted while proposals are pending).
    pub fn system() -> Self {
        Self {
            id: "system".to_string(),
            role: Role::Admin,
        }
    }
}

impl From<&Identity> for ActorRef {
    fn from(identity: &Identity) -> Self {
        Self {
            id: identity.actor_id(),
            role: identity.role(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn worker_actor_id_is_its_uuid() {
        let worker_id = WorkerId::new();
        let identity = Identity::Worker(WorkerIdentity {
            worker_id,
            email: "a@x.com".to_string(),
        });

        assert_eq!(identity.actor_id(), worker_id.to_string());
        assert_eq!(identity.role(), Role::Worker);
    }

    #[test]
    fn admin_actor_id_is_provider_subject() {
        let identity = Identity::Admin(AdminIdentity {
            subject: "auth0|admin-1".to_string(),
            email: "boss@x.com".to_string(),
        });

        assert_eq!(identity.actor_id(), "auth0|admin-1");
        assert_eq!(identity.role(), Role::Admin);
        assert!(identity.as_worker().is_none());
    }

    #[test]
    fn serialized_identity_is_tagged() {
        let identity = Identity::Admin(AdminIdentity {
            subject: "auth0|admin-1".to_string(),
            email: "boss@x.com".to_string(),
        });

        let json = serde_json::to_value(&identity).unwrap();
        assert_eq!(json["kind"], "admin");
    }
}
