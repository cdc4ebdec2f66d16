//! Worker login flow: rate limit → verify credentials → issue session.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;

use tacklebox_auth::{
    AuthError, FixedWindowLimiter, SessionIssuer, WorkerIdentity, WorkerProfile, password,
};

use crate::InMemoryCredentialStore;

/// Login failure, as seen by callers.
///
/// Deliberately two-valued: unknown email and wrong password collapse into
/// one outcome so the endpoint cannot be used to enumerate accounts.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LoginError {
    #[error("too many attempts; try again later")]
    RateLimited,

    #[error("invalid email or password")]
    InvalidCredentials,
}

/// Successful login: profile (hash-free by construction) plus session token.
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub worker: WorkerProfile,
    pub token: String,
}

/// Authenticates workers against the credential store.
pub struct LoginService {
    workers: Arc<InMemoryCredentialStore>,
    issuer: Arc<SessionIssuer>,
    limiter: FixedWindowLimiter,
}

impl LoginService {
    pub fn new(
        workers: Arc<InMemoryCredentialStore>,
        issuer: Arc<SessionIssuer>,
        limiter: FixedWindowLimiter,
    ) -> Self {
        Self {
            workers,
            issuer,
            limiter,
        }
    }

    /// Authenticate `email`/`password` for the client identified by
    /// `client_key` (IP or account key).
    ///
    /// The rate limit is checked before any credential lookup so throttled
    /// clients cost no hashing work. A successful authentication appends to
    /// the worker's login history; per-request token verification does not.
    pub fn login(
        &self,
        email: &str,
        password_plaintext: &str,
        client_key: &str,
        now: DateTime<Utc>,
    ) -> Result<LoginOutcome, LoginError> {
        if !self.limiter.allow(client_key, now) {
            tracing::warn!(client_key, "login attempt rate limited");
            return Err(LoginError::RateLimited);
        }

        let Some((worker_id, stored_hash)) = self.workers.credentials_by_email(email) else {
            return Err(LoginError::InvalidCredentials);
        };
        if !password::verify(password_plaintext, &stored_hash) {
            return Err(LoginError::InvalidCredentials);
        }

        // Internal failures also surface as the generic outcome; nothing on
        // this path may distinguish accounts.
        let identity = self
            .workers
            .identity(worker_id)
            .map_err(|_| LoginError::InvalidCredentials)?;
        let token = self
            .issuer
            .issue(&identity, now)
            .map_err(|_| LoginError::InvalidCredentials)?;

        if let Err(err) = self.workers.record_login(worker_id, now) {
            tracing::warn!(%worker_id, %err, "login history append failed");
        }

        let worker = self
            .workers
            .profile(worker_id)
            .map_err(|_| LoginError::InvalidCredentials)?;

        tracing::info!(%worker_id, "worker logged in");
        Ok(LoginOutcome { worker, token })
    }

    /// Verify a worker session token; pure, no history side effect.
    pub fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<WorkerIdentity, AuthError> {
        self.issuer.verify(token, now)?.worker_identity()
    }

    /// Renew a still-valid worker session token.
    pub fn refresh(&self, token: &str, now: DateTime<Utc>) -> Result<String, AuthError> {
        self.issuer.refresh(token, now)
    }
}
