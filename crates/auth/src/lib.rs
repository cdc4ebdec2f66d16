//! `tacklebox-auth` — authentication/authorization boundary (zero-trust).
//!
//! Two disjoint credential schemes (provider-issued admin tokens, self-hosted
//! worker sessions) are reconciled here into one [`Identity`] consumed by the
//! RBAC resolver. This crate is intentionally decoupled from HTTP and storage.

pub mod account;
pub mod claims;
pub mod history;
pub mod identity;
pub mod password;
pub mod rate_limit;
pub mod rbac;
pub mod role;
pub mod token;

pub use account::{WorkerAccount, WorkerProfile};
pub use claims::{AuthError, SessionClaims, validate_claims};
pub use history::{LOGIN_HISTORY_CAPACITY, LoginHistory};
pub use identity::{ActorRef, AdminIdentity, Identity, WorkerIdentity};
pub use rate_limit::FixedWindowLimiter;
pub use rbac::{AuthzError, Operation, ResourceContext, authorize};
pub use role::Role;
pub use token::{AdminTokenVerifier, SessionIssuer};
