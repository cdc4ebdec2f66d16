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
use tacklebox_core::ProductId;

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_products).post(create_product))
        .route("/:id", get(get_product).delete(delete_product))
        .route("/:id/corrections", post(propose_correction))
}

pub async fn create_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<Identity>,
    Json(body): Json<dto::CreateProductRequest>,
) -> axum::response::Response {
    if let Err(e) = authorize(&identity, Operation::CreateProduct, &ResourceContext::none()) {
        return errors::authz_error_to_response(e);
    }

    match services
        .products
        .create_product(&body.sku, &body.name, body.unit_price_cents, Utc::now())
    {
        Ok(view) => (StatusCode::CREATED, Json(view)).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn list_products(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<Identity>,
) -> axum::response::Response {
    if let Err(e) = authorize(&identity, Operation::ListProducts, &ResourceContext::none()) {
        return errors::authz_error_to_response(e);
    }

    (StatusCode::OK, Json(services.products.list())).into_response()
}

pub async fn get_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let product_id: ProductId = match id.parse() {
        Ok(v) => v,
        Err(_) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid product id"),
    };

    if let Err(e) = authorize(&identity, Operation::ReadProduct, &ResourceContext::none()) {
        return errors::authz_error_to_response(e);
    }

    match services.products.get(product_id) {
        Some(view) => (StatusCode::OK, Json(view)).into_response(),
        None => errors::json_error(StatusCode::NOT_FOUND, "not_found", "product not found"),
    }
}

/// Deleting a product auto-rejects its pending audit entries first.
pub async fn delete_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let product_id: ProductId = match id.parse() {
        Ok(v) => v,
        Err(_) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid product id"),
    };

    if let Err(e) = authorize(&identity, Operation::DeleteProduct, &ResourceContext::none()) {
        return errors::authz_error_to_response(e);
    }

    match services.products.remove(product_id, &services.audit, Utc::now()) {
        Ok(cancelled) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "product_id": product_id,
                "cancelled_entries": cancelled,
            })),
        )
            .into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

/// Stock corrections never touch stock here: they are captured as pending
/// audit entries and applied on approval.
pub async fn propose_correction(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<String>,
    Json(body): Json<dto::ProposeCorrectionRequest>,
) -> axum::response::Response {
    let product_id: ProductId = match id.parse() {
        Ok(v) => v,
        Err(_) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid product id"),
    };

    if let Err(e) = authorize(&identity, Operation::ProposeMutation, &ResourceContext::none()) {
        return errors::authz_error_to_response(e);
    }

    if services.products.get(product_id).is_none() {
        return errors::json_error(StatusCode::NOT_FOUND, "not_found", "product not found");
    }

    match services.audit.propose(
        &identity,
        TargetRef::Product(product_id),
        ProposedMutation::StockCorrection { delta: body.delta },
        Utc::now(),
    ) {
        Ok(entry) => (StatusCode::CREATED, Json(entry)).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}
