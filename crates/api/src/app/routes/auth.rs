//! Public authentication endpoints (worker credential domain).

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
};
use chrono::Utc;

use crate::app::{dto, errors};
use crate::app::services::AppServices;
use crate::middleware::extract_bearer;

pub fn router() -> Router {
    Router::new()
        .route("/login", post(login))
        .route("/refresh", post(refresh))
        .route("/verify", get(verify))
}

pub async fn login(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::LoginRequest>,
) -> axum::response::Response {
    // Attempts are throttled per account key; unknown emails share the
    // same budget so probing is throttled identically.
    let client_key = body.email.trim().to_lowercase();

    match services
        .login
        .login(&body.email, &body.password, &client_key, Utc::now())
    {
        Ok(outcome) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "worker": outcome.worker,
                "token": outcome.token,
            })),
        )
            .into_response(),
        Err(e) => errors::login_error_to_response(e),
    }
}

pub async fn refresh(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::RefreshRequest>,
) -> axum::response::Response {
    match services.login.refresh(&body.token, Utc::now()) {
        Ok(token) => (
            StatusCode::OK,
            Json(serde_json::json!({ "token": token })),
        )
            .into_response(),
        Err(e) => errors::auth_error_to_response(e),
    }
}

pub async fn verify(
    Extension(services): Extension<Arc<AppServices>>,
    headers: HeaderMap,
) -> axum::response::Response {
    let Ok(token) = extract_bearer(&headers) else {
        return errors::json_error(StatusCode::UNAUTHORIZED, "token_missing", "missing bearer token");
    };

    match services.login.verify(token, Utc::now()) {
        Ok(identity) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "worker_id": identity.worker_id,
                "email": identity.email,
                "role": "worker",
            })),
        )
            .into_response(),
        Err(e) => errors::auth_error_to_response(e),
    }
}
