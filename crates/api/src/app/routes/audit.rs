//! Approval workflow endpoints (approver-only surface).

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use chrono::Utc;

use tacklebox_auth::{Identity, Operation, ResourceContext, authorize};
use tacklebox_core::AuditEntryId;

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/pending", get(list_pending))
        .route("/:id", get(get_entry))
        .route("/:id/approve", post(approve))
        .route("/:id/reject", post(reject))
}

pub async fn list_pending(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<Identity>,
) -> axum::response::Response {
    if let Err(e) = authorize(&identity, Operation::ListAuditEntries, &ResourceContext::none()) {
        return errors::authz_error_to_response(e);
    }

    (StatusCode::OK, Json(services.audit.pending())).into_response()
}

pub async fn get_entry(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let entry_id: AuditEntryId = match id.parse() {
        Ok(v) => v,
        Err(_) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid entry id"),
    };

    if let Err(e) = authorize(&identity, Operation::ListAuditEntries, &ResourceContext::none()) {
        return errors::authz_error_to_response(e);
    }

    match services.audit.get(entry_id) {
        Some(view) => (StatusCode::OK, Json(view)).into_response(),
        None => errors::json_error(StatusCode::NOT_FOUND, "not_found", "audit entry not found"),
    }
}

pub async fn approve(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let entry_id: AuditEntryId = match id.parse() {
        Ok(v) => v,
        Err(_) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid entry id"),
    };

    if let Err(e) = authorize(&identity, Operation::ResolveAudit, &ResourceContext::none()) {
        return errors::authz_error_to_response(e);
    }

    // The workflow re-checks permission, state, and self-approval, and
    // applies the deferred mutation atomically with the transition.
    match services
        .audit
        .approve(entry_id, &identity, &services.sink, Utc::now())
    {
        Ok(view) => (StatusCode::OK, Json(view)).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn reject(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<String>,
    Json(body): Json<dto::RejectRequest>,
) -> axum::response::Response {
    let entry_id: AuditEntryId = match id.parse() {
        Ok(v) => v,
        Err(_) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid entry id"),
    };

    if let Err(e) = authorize(&identity, Operation::ResolveAudit, &ResourceContext::none()) {
        return errors::authz_error_to_response(e);
    }

    match services
        .audit
        .reject(entry_id, &identity, body.reason, Utc::now())
    {
        Ok(view) => (StatusCode::OK, Json(view)).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}
