//! Request DTOs. Responses are serialized domain views plus ad-hoc JSON.

use serde::Deserialize;

use tacklebox_core::ProductId;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateWorkerRequest {
    pub email: String,
    pub password: String,
    pub monthly_salary_cents: i64,
}

#[derive(Debug, Deserialize)]
pub struct CreateProductRequest {
    pub sku: String,
    pub name: String,
    pub unit_price_cents: i64,
}

#[derive(Debug, Deserialize)]
pub struct ProposeCorrectionRequest {
    pub delta: i64,
}

#[derive(Debug, Deserialize)]
pub struct ProposeSalaryChangeRequest {
    pub monthly_salary_cents: i64,
}

#[derive(Debug, Deserialize)]
pub struct RecordSaleRequest {
    pub product_id: ProductId,
    pub quantity: i64,
}

#[derive(Debug, Deserialize)]
pub struct RejectRequest {
    pub reason: String,
}
