use axum::{Router, routing::get};

pub mod audit;
pub mod auth;
pub mod products;
pub mod sales;
pub mod system;
pub mod workers;

/// Router for all authenticated endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .nest("/workers", workers::router())
        .nest("/products", products::router())
        .nest("/sales", sales::router())
        .nest("/audit", audit::router())
}
