//! Session token issuing and verification.
//!
//! Two verifiers, one claims model: [`SessionIssuer`] mints and checks the
//! self-hosted worker sessions, [`AdminTokenVerifier`] checks tokens minted by
//! the external identity provider. Time-window validation is done against an
//! explicit `now` (see [`crate::claims::validate_claims`]) so expiry behavior
//! is deterministic under test.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, errors::ErrorKind};
use serde::Deserialize;

use crate::{AdminIdentity, AuthError, Role, SessionClaims, WorkerIdentity, validate_claims};

/// Default worker session lifetime.
pub const DEFAULT_SESSION_TTL_SECONDS: i64 = 60 * 60;

fn signature_only_validation() -> Validation {
    let mut validation = Validation::new(Algorithm::HS256);
    // Expiry is checked by `validate_claims` against an explicit clock.
    validation.validate_exp = false;
    validation.required_spec_claims.clear();
    validation
}

fn decode_error(err: &jsonwebtoken::errors::Error) -> AuthError {
    match err.kind() {
        ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => AuthError::SignatureInvalid,
        ErrorKind::ExpiredSignature => AuthError::Expired,
        _ => AuthError::Malformed,
    }
}

/// Mints and verifies short-lived worker session tokens (HS256 JWTs).
pub struct SessionIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl SessionIssuer {
    pub fn new(secret: &[u8], ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl,
        }
    }

    pub fn with_default_ttl(secret: &[u8]) -> Self {
        Self::new(secret, Duration::seconds(DEFAULT_SESSION_TTL_SECONDS))
    }

    /// Issue a session token for a verified worker.
    pub fn issue(&self, worker: &WorkerIdentity, now: DateTime<Utc>) -> Result<String, AuthError> {
        let claims = SessionClaims {
            sub: worker.worker_id.to_string(),
            role: Role::Worker,
            email: worker.email.clone(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };
        self.encode(&claims)
    }

    /// Verify a worker session token: signature first, then time window.
    pub fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<SessionClaims, AuthError> {
        let data = jsonwebtoken::decode::<SessionClaims>(
            token,
            &self.decoding,
            &signature_only_validation(),
        )
        .map_err(|e| decode_error(&e))?;

        validate_claims(&data.claims, now)?;
        Ok(data.claims)
    }

    /// Renew a still-valid token: identical subject/role/email, later expiry.
    ///
    /// An expired token can never be refreshed; the worker must log in again.
    pub fn refresh(&self, token: &str, now: DateTime<Utc>) -> Result<String, AuthError> {
        let claims = self.verify(token, now)?;

        let renewed = SessionClaims {
            // Strictly later than the old expiry even if called at issue time.
            exp: (now + self.ttl).timestamp().max(claims.exp + 1),
            iat: now.timestamp(),
            ..claims
        };
        self.encode(&renewed)
    }

    fn encode(&self, claims: &SessionClaims) -> Result<String, AuthError> {
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .map_err(|_| AuthError::Malformed)
    }
}

/// Claims shape of provider-issued tokens.
///
/// The provider's claim vocabulary is open; we only pin down what we consume.
#[derive(Debug, Deserialize)]
struct ExternalClaims {
    sub: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    role: Option<String>,
    iat: i64,
    exp: i64,
}

/// Validates session tokens minted by the external identity provider.
///
/// The system never issues or stores admin credentials; it only inspects the
/// provider's tokens: signature, expiry, and the mandatory `role: admin`
/// claim. A missing or mismatching role claim is treated exactly like a
/// forged signature, never as partial trust.
pub struct AdminTokenVerifier {
    decoding: DecodingKey,
}

impl AdminTokenVerifier {
    pub fn new(provider_secret: &[u8]) -> Self {
        Self {
            decoding: DecodingKey::from_secret(provider_secret),
        }
    }

    pub fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<AdminIdentity, AuthError> {
        let data = jsonwebtoken::decode::<ExternalClaims>(
            token,
            &self.decoding,
            &signature_only_validation(),
        )
        .map_err(|e| decode_error(&e))?;
        let claims = data.claims;

        if claims.role.as_deref() != Some(Role::Admin.as_str()) {
            return Err(AuthError::SignatureInvalid);
        }
        if claims.exp <= claims.iat {
            return Err(AuthError::Malformed);
        }
        if now.timestamp() >= claims.exp {
            return Err(AuthError::Expired);
        }

        Ok(AdminIdentity {
            subject: claims.sub,
            email: claims.email.unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tacklebox_core::WorkerId;

    const SECRET: &[u8] = b"test-secret";
    const PROVIDER_SECRET: &[u8] = b"provider-secret";

    fn worker() -> WorkerIdentity {
        WorkerIdentity {
            worker_id: WorkerId::new(),
            email: "a@x.com".to_string(),
        }
    }

    fn issuer() -> SessionIssuer {
        SessionIssuer::new(SECRET, Duration::minutes(30))
    }

    fn mint_external(secret: &[u8], claims: serde_json::Value) -> String {
        jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(secret),
        )
        .unwrap()
    }

    #[test]
    fn issue_then_verify_round_trip() {
        let issuer = issuer();
        let w = worker();
        let now = Utc::now();

        let token = issuer.issue(&w, now).unwrap();
        let claims = issuer.verify(&token, now).unwrap();

        assert_eq!(claims.sub, w.worker_id.to_string());
        assert_eq!(claims.role, Role::Worker);
        assert_eq!(claims.email, "a@x.com");
        assert_eq!(claims.worker_identity().unwrap(), w);
    }

    #[test]
    fn verify_fails_at_and_after_expiry() {
        let issuer = issuer();
        let now = Utc::now();
        let token = issuer.issue(&worker(), now).unwrap();

        assert!(issuer.verify(&token, now + Duration::minutes(29)).is_ok());
        assert_eq!(
            issuer.verify(&token, now + Duration::minutes(30)),
            Err(AuthError::Expired)
        );
        assert_eq!(
            issuer.verify(&token, now + Duration::hours(2)),
            Err(AuthError::Expired)
        );
    }

    #[test]
    fn wrong_secret_is_signature_invalid() {
        let now = Utc::now();
        let token = issuer().issue(&worker(), now).unwrap();

        let other = SessionIssuer::new(b"other-secret", Duration::minutes(30));
        assert_eq!(other.verify(&token, now), Err(AuthError::SignatureInvalid));
    }

    #[test]
    fn garbage_token_is_malformed() {
        let issuer = issuer();
        let now = Utc::now();
        assert_eq!(issuer.verify("", now), Err(AuthError::Malformed));
        assert_eq!(issuer.verify("not.a.jwt", now), Err(AuthError::Malformed));
    }

    #[test]
    fn refresh_preserves_claims_and_extends_expiry() {
        let issuer = issuer();
        let w = worker();
        let issued = Utc::now();

        let token = issuer.issue(&w, issued).unwrap();
        let old = issuer.verify(&token, issued).unwrap();

        let later = issued + Duration::minutes(10);
        let renewed = issuer.refresh(&token, later).unwrap();
        let new = issuer.verify(&renewed, later).unwrap();

        assert_eq!(new.sub, old.sub);
        assert_eq!(new.role, old.role);
        assert_eq!(new.email, old.email);
        assert!(new.exp > old.exp);
    }

    #[test]
    fn refresh_at_issue_instant_still_extends_expiry() {
        let issuer = issuer();
        let issued = Utc::now();

        let token = issuer.issue(&worker(), issued).unwrap();
        let old = issuer.verify(&token, issued).unwrap();
        let renewed = issuer.refresh(&token, issued).unwrap();
        let new = issuer.verify(&renewed, issued).unwrap();

        assert!(new.exp > old.exp);
    }

    #[test]
    fn expired_token_can_never_be_refreshed() {
        let issuer = issuer();
        let issued = Utc::now();
        let token = issuer.issue(&worker(), issued).unwrap();

        assert_eq!(
            issuer.refresh(&token, issued + Duration::hours(1)),
            Err(AuthError::Expired)
        );
    }

    #[test]
    fn external_admin_token_verifies() {
        let verifier = AdminTokenVerifier::new(PROVIDER_SECRET);
        let now = Utc::now();
        let token = mint_external(
            PROVIDER_SECRET,
            json!({
                "sub": "auth0|admin-1",
                "email": "boss@x.com",
                "role": "admin",
                "iat": now.timestamp(),
                "exp": now.timestamp() + 600,
            }),
        );

        let identity = verifier.verify(&token, now).unwrap();
        assert_eq!(identity.subject, "auth0|admin-1");
        assert_eq!(identity.email, "boss@x.com");
    }

    #[test]
    fn missing_or_wrong_role_claim_is_rejected_as_forgery() {
        let verifier = AdminTokenVerifier::new(PROVIDER_SECRET);
        let now = Utc::now();

        let missing = mint_external(
            PROVIDER_SECRET,
            json!({
                "sub": "auth0|admin-1",
                "iat": now.timestamp(),
                "exp": now.timestamp() + 600,
            }),
        );
        assert_eq!(
            verifier.verify(&missing, now),
            Err(AuthError::SignatureInvalid)
        );

        let wrong = mint_external(
            PROVIDER_SECRET,
            json!({
                "sub": "auth0|admin-1",
                "role": "manager",
                "iat": now.timestamp(),
                "exp": now.timestamp() + 600,
            }),
        );
        assert_eq!(
            verifier.verify(&wrong, now),
            Err(AuthError::SignatureInvalid)
        );
    }

    #[test]
    fn external_token_expiry_is_enforced() {
        let verifier = AdminTokenVerifier::new(PROVIDER_SECRET);
        let now = Utc::now();
        let token = mint_external(
            PROVIDER_SECRET,
            json!({
                "sub": "auth0|admin-1",
                "role": "admin",
                "iat": now.timestamp() - 1200,
                "exp": now.timestamp() - 600,
            }),
        );

        assert_eq!(verifier.verify(&token, now), Err(AuthError::Expired));
    }

    #[test]
    fn worker_session_secret_does_not_verify_admin_tokens() {
        let verifier = AdminTokenVerifier::new(PROVIDER_SECRET);
        let now = Utc::now();
        let token = issuer().issue(&worker(), now).unwrap();

        assert_eq!(
            verifier.verify(&token, now),
            Err(AuthError::SignatureInvalid)
        );
    }
}
