use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use tacklebox_auth::{AuthError, AuthzError};
use tacklebox_core::DomainError;
use tacklebox_infra::LoginError;

pub fn domain_error_to_response(err: DomainError) -> axum::response::Response {
    match err {
        DomainError::Validation(msg) => json_error(StatusCode::BAD_REQUEST, "validation_error", msg),
        DomainError::InvalidId(msg) => json_error(StatusCode::BAD_REQUEST, "invalid_id", msg),
        DomainError::NotFound => json_error(StatusCode::NOT_FOUND, "not_found", "not found"),
        DomainError::Conflict(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
        DomainError::InvalidState(msg) => {
            json_error(StatusCode::UNPROCESSABLE_ENTITY, "invalid_state", msg)
        }
        DomainError::InvariantViolation(msg) => {
            json_error(StatusCode::UNPROCESSABLE_ENTITY, "invariant_violation", msg)
        }
        DomainError::PermissionDenied(msg) => {
            json_error(StatusCode::FORBIDDEN, "permission_denied", msg)
        }
    }
}

pub fn authz_error_to_response(err: AuthzError) -> axum::response::Response {
    json_error(StatusCode::FORBIDDEN, "permission_denied", err.to_string())
}

/// Token errors: always 401, with a machine-readable code but no claim detail.
pub fn auth_error_to_response(err: AuthError) -> axum::response::Response {
    let code = match err {
        AuthError::Malformed => "token_malformed",
        AuthError::Expired => "token_expired",
        AuthError::SignatureInvalid => "token_signature_invalid",
    };
    json_error(StatusCode::UNAUTHORIZED, code, err.to_string())
}

/// Login failures: one generic message for anything credential-shaped.
pub fn login_error_to_response(err: LoginError) -> axum::response::Response {
    match err {
        LoginError::RateLimited => json_error(
            StatusCode::TOO_MANY_REQUESTS,
            "rate_limited",
            "too many attempts; try again later",
        ),
        LoginError::InvalidCredentials => json_error(
            StatusCode::UNAUTHORIZED,
            "invalid_credentials",
            "invalid email or password",
        ),
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
