use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use chrono::Utc;

use tacklebox_audit::{ProposedMutation, TargetRef};
use tacklebox_auth::{Identity, Operation, ResourceContext, authorize};
use tacklebox_core::WorkerId;

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_workers).post(create_worker))
        .route("/:id", get(get_worker))
        .route("/:id/salary-changes", post(propose_salary_change))
}

pub async fn create_worker(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<Identity>,
    Json(body): Json<dto::CreateWorkerRequest>,
) -> axum::response::Response {
    if let Err(e) = authorize(&identity, Operation::CreateWorker, &ResourceContext::none()) {
        return errors::authz_error_to_response(e);
    }

    match services.workers.create_worker(
        &body.email,
        &body.password,
        body.monthly_salary_cents,
        Utc::now(),
    ) {
        Ok(profile) => (StatusCode::CREATED, Json(profile)).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn list_workers(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<Identity>,
) -> axum::response::Response {
    if let Err(e) = authorize(&identity, Operation::ListWorkers, &ResourceContext::none()) {
        return errors::authz_error_to_response(e);
    }

    (StatusCode::OK, Json(services.workers.list_profiles())).into_response()
}

pub async fn get_worker(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let worker_id: WorkerId = match id.parse() {
        Ok(v) => v,
        Err(_) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid worker id"),
    };

    // Workers may read only their own record; admins read any.
    if let Err(e) = authorize(
        &identity,
        Operation::ReadWorker,
        &ResourceContext::owned_by(worker_id),
    ) {
        return errors::authz_error_to_response(e);
    }

    match services.workers.profile(worker_id) {
        Ok(profile) => (StatusCode::OK, Json(profile)).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

/// Salary changes are sensitive: captured as a pending audit entry, applied
/// only on approval by a different admin.
pub async fn propose_salary_change(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<String>,
    Json(body): Json<dto::ProposeSalaryChangeRequest>,
) -> axum::response::Response {
    let worker_id: WorkerId = match id.parse() {
        Ok(v) => v,
        Err(_) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid worker id"),
    };

    if let Err(e) = authorize(&identity, Operation::ProposeMutation, &ResourceContext::none()) {
        return errors::authz_error_to_response(e);
    }

    // The target must exist before intent is captured.
    if let Err(e) = services.workers.profile(worker_id) {
        return errors::domain_error_to_response(e);
    }

    match services.audit.propose(
        &identity,
        TargetRef::Worker(worker_id),
        ProposedMutation::SalaryChange {
            monthly_salary_cents: body.monthly_salary_cents,
        },
        Utc::now(),
    ) {
        Ok(entry) => (StatusCode::CREATED, Json(entry)).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}
