//! HTTP API application wiring (Axum router + service wiring).
//!
//! Layout:
//! - `services.rs`: store/workflow wiring shared by handlers
//! - `routes/`: HTTP routes + handlers (one file per domain area)
//! - `dto.rs`: request DTOs
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{Extension, Router, routing::get};
use tower::ServiceBuilder;

use tacklebox_auth::{AdminTokenVerifier, SessionIssuer};

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

/// Secrets and knobs read once at startup.
pub struct AppConfig {
    /// HS256 secret for self-hosted worker sessions.
    pub session_secret: String,
    /// Verification secret for the external identity provider's tokens.
    pub admin_token_secret: String,
}

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub fn build_app(config: AppConfig) -> Router {
    let sessions = Arc::new(SessionIssuer::with_default_ttl(
        config.session_secret.as_bytes(),
    ));
    let admin_tokens = Arc::new(AdminTokenVerifier::new(
        config.admin_token_secret.as_bytes(),
    ));
    let auth_state = middleware::AuthState {
        sessions: Arc::clone(&sessions),
        admin_tokens,
    };

    let services = Arc::new(services::build_services(sessions));

    // Protected routes: require a verified identity (either token domain).
    let protected = routes::router()
        .layer(Extension(Arc::clone(&services)))
        .layer(axum::middleware::from_fn_with_state(
            auth_state,
            middleware::auth_middleware,
        ));

    Router::new()
        .route("/health", get(routes::system::health))
        .nest("/auth", routes::auth::router().layer(Extension(services)))
        .merge(protected)
        .layer(ServiceBuilder::new())
}
