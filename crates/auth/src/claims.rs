use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use tacklebox_core::WorkerId;

use crate::{Role, WorkerIdentity};

/// Session token failure.
///
/// Deliberately coarse: a caller learns whether to re-authenticate (expired)
/// or to treat the token as garbage, nothing more.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("session token is malformed")]
    Malformed,

    #[error("session token has expired")]
    Expired,

    #[error("session token signature is invalid")]
    SignatureInvalid,
}

/// Claims carried by a session token (transport-agnostic).
///
/// `iat`/`exp` are unix seconds on the wire (standard JWT numeric dates);
/// use the accessors for `chrono` values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject: worker UUID for self-hosted sessions, provider subject for
    /// externally-issued admin tokens.
    pub sub: String,

    /// Role granted for the validity window.
    pub role: Role,

    /// Email of the principal.
    pub email: String,

    /// Issued-at (unix seconds).
    pub iat: i64,

    /// Expiration (unix seconds).
    pub exp: i64,
}

impl SessionClaims {
    pub fn issued_at(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.iat, 0).single().unwrap_or_default()
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.exp, 0).single().unwrap_or_default()
    }

    /// Interpret these claims as a verified worker identity.
    ///
    /// A token carrying any other role is rejected the same way as a forged
    /// signature, not treated as partially trusted.
    pub fn worker_identity(&self) -> Result<WorkerIdentity, AuthError> {
        if self.role != Role::Worker {
            return Err(AuthError::SignatureInvalid);
        }
        let worker_id: WorkerId = self.sub.parse().map_err(|_| AuthError::Malformed)?;
        Ok(WorkerIdentity {
            worker_id,
            email: self.email.clone(),
        })
    }
}

/// Deterministically validate the time window of decoded claims.
///
/// Signature verification is the token layer's job; this checks only the
/// claims themselves against an explicit `now` (testable without sleeping).
pub fn validate_claims(claims: &SessionClaims, now: DateTime<Utc>) -> Result<(), AuthError> {
    if claims.exp <= claims.iat {
        return Err(AuthError::Malformed);
    }
    if now.timestamp() < claims.iat {
        return Err(AuthError::Malformed);
    }
    if now.timestamp() >= claims.exp {
        return Err(AuthError::Expired);
    }
    Ok(())
}
