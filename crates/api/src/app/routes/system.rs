use axum::{Json, extract::Extension, http::StatusCode, response::IntoResponse};

use tacklebox_auth::Identity;

pub async fn health() -> axum::response::Response {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" }))).into_response()
}

/// The verified identity behind the current request, both token domains.
pub async fn whoami(Extension(identity): Extension<Identity>) -> axum::response::Response {
    (
        StatusCode::OK,
        Json(serde_json::json!({
            "actor_id": identity.actor_id(),
            "email": identity.email(),
            "role": identity.role(),
            "identity": identity,
        })),
    )
        .into_response()
}
