use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use chrono::Utc;

use tacklebox_auth::{Identity, Operation, ResourceContext, Role, authorize};
use tacklebox_core::SaleId;

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/", post(record_sale))
        .route("/:id", get(get_sale))
}

pub async fn record_sale(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<Identity>,
    Json(body): Json<dto::RecordSaleRequest>,
) -> axum::response::Response {
    if let Err(e) = authorize(&identity, Operation::RecordSale, &ResourceContext::none()) {
        return errors::authz_error_to_response(e);
    }

    match services
        .sales
        .record(&identity, body.product_id, body.quantity, Utc::now())
    {
        Ok(view) => (StatusCode::CREATED, Json(view)).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn get_sale(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let sale_id: SaleId = match id.parse() {
        Ok(v) => v,
        Err(_) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid sale id"),
    };

    let Some(view) = services.sales.get(sale_id) else {
        return errors::json_error(StatusCode::NOT_FOUND, "not_found", "sale not found");
    };

    // A worker may read only sales they recorded themselves.
    let ctx = if view.recorded_by.role == Role::Worker {
        view.recorded_by
            .id
            .parse()
            .map(ResourceContext::owned_by)
            .unwrap_or_default()
    } else {
        ResourceContext::none()
    };
    if let Err(e) = authorize(&identity, Operation::ReadSale, &ctx) {
        return errors::authz_error_to_response(e);
    }

    (StatusCode::OK, Json(view)).into_response()
}
