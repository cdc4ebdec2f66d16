//! Bearer authentication: two token domains, one request identity.
//!
//! Every protected request carries a bearer token that is either a
//! self-hosted worker session or a provider-issued admin token. Worker
//! verification runs first; a signature miss falls through to the admin
//! verifier (different key). The verified [`Identity`] is inserted as a
//! request extension and passed explicitly from there on.

use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};
use chrono::Utc;

use tacklebox_auth::{AdminTokenVerifier, AuthError, Identity, SessionIssuer};

#[derive(Clone)]
pub struct AuthState {
    pub sessions: Arc<SessionIssuer>,
    pub admin_tokens: Arc<AdminTokenVerifier>,
}

pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let token = extract_bearer(req.headers())?;
    let now = Utc::now();

    let identity = match state.sessions.verify(token, now) {
        Ok(claims) => Identity::Worker(
            claims
                .worker_identity()
                .map_err(|_| StatusCode::UNAUTHORIZED)?,
        ),
        // Not a worker session: maybe the provider minted it.
        Err(AuthError::SignatureInvalid | AuthError::Malformed) => Identity::Admin(
            state
                .admin_tokens
                .verify(token, now)
                .map_err(|_| StatusCode::UNAUTHORIZED)?,
        ),
        // An expired worker session never falls through to the admin keys.
        Err(AuthError::Expired) => return Err(StatusCode::UNAUTHORIZED),
    };

    req.extensions_mut().insert(identity);
    Ok(next.run(req).await)
}

pub fn extract_bearer(headers: &HeaderMap) -> Result<&str, StatusCode> {
    let header = headers
        .get(axum::http::header::AUTHORIZATION)
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let header = header.to_str().map_err(|_| StatusCode::UNAUTHORIZED)?;

    let header = header
        .strip_prefix("Bearer ")
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let token = header.trim();
    if token.is_empty() {
        return Err(StatusCode::UNAUTHORIZED);
    }

    Ok(token)
}
