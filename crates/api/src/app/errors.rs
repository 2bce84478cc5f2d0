use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use serde_json::json;

use storegate_auth::IdentityError;

/// Map the identity error taxonomy onto HTTP.
pub fn identity_error_to_response(err: IdentityError) -> axum::response::Response {
    let message = err.to_string();
    match err {
        IdentityError::InvalidCredentials => {
            json_error(StatusCode::UNAUTHORIZED, "invalid_credentials", message)
        }
        IdentityError::Unauthenticated => {
            json_error(StatusCode::UNAUTHORIZED, "unauthenticated", message)
        }
        IdentityError::AccountLocked { remaining_seconds } => (
            StatusCode::LOCKED,
            [(header::RETRY_AFTER, remaining_seconds.to_string())],
            axum::Json(json!({
                "error": "account_locked",
                "message": message,
                "remaining_seconds": remaining_seconds,
            })),
        )
            .into_response(),
        IdentityError::AccountSuspended => {
            json_error(StatusCode::FORBIDDEN, "account_suspended", message)
        }
        IdentityError::Forbidden(_) => json_error(StatusCode::FORBIDDEN, "forbidden", message),
        IdentityError::NotFound(_) => json_error(StatusCode::NOT_FOUND, "not_found", message),
        IdentityError::AlreadyImpersonating => {
            json_error(StatusCode::CONFLICT, "already_impersonating", message)
        }
        IdentityError::NotImpersonating => {
            json_error(StatusCode::CONFLICT, "not_impersonating", message)
        }
        IdentityError::HandleTaken(_) => json_error(StatusCode::CONFLICT, "handle_taken", message),
        IdentityError::SessionActive => json_error(StatusCode::CONFLICT, "session_active", message),
        IdentityError::Validation(_) => {
            json_error(StatusCode::BAD_REQUEST, "validation_error", message)
        }
        IdentityError::Store(e) => {
            tracing::error!(error = %e, "identity store failure");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "store_error", message)
        }
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

/// Parse a path or query value, answering 400 with `code` on failure.
pub fn parse_param<T>(raw: &str, code: &'static str) -> Result<T, axum::response::Response>
where
    T: core::str::FromStr,
    T::Err: core::fmt::Display,
{
    raw.parse()
        .map_err(|e: T::Err| json_error(StatusCode::BAD_REQUEST, code, e.to_string()))
}
