use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};

use storegate_core::SessionId;

use crate::app::errors::json_error;
use crate::app::services::AppServices;
use crate::context::SessionContext;

/// Resolve `Authorization: Bearer <session token>` into a [`SessionContext`].
///
/// Unknown, malformed and expired tokens are all 401.
pub async fn session_middleware(
    State(services): State<Arc<AppServices>>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Result<Response, Response> {
    let token = extract_bearer(req.headers()).ok_or_else(unauthenticated)?;
    let token: SessionId = token.parse().map_err(|_| unauthenticated())?;

    let session = services
        .sessions
        .get(token)
        .map_err(|e| {
            tracing::error!(error = %e, "session registry unavailable");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "store_error", e.to_string())
        })?
        .ok_or_else(unauthenticated)?;

    req.extensions_mut()
        .insert(SessionContext::new(token, session));

    Ok(next.run(req).await)
}

fn unauthenticated() -> Response {
    json_error(
        StatusCode::UNAUTHORIZED,
        "unauthenticated",
        "missing, invalid or expired session token",
    )
}

pub(crate) fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    let header = headers.get(axum::http::header::AUTHORIZATION)?;
    let token = header.to_str().ok()?.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then_some(token)
}
