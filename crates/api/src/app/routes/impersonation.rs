use std::sync::Arc;

use axum::{
    Json,
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};

use storegate_core::PrincipalId;

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::{SessionContext, request_origin};

/// POST /impersonation - act as `target_id` for the rest of the session
pub async fn start(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<SessionContext>,
    headers: HeaderMap,
    Json(body): Json<dto::ImpersonateRequest>,
) -> axum::response::Response {
    let target: PrincipalId = match errors::parse_param(&body.target_id, "invalid_id") {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match services
        .identity
        .start_impersonation(ctx.session(), &target, &request_origin(&headers))
    {
        Ok(principal) => (StatusCode::OK, Json(principal)).into_response(),
        Err(e) => errors::identity_error_to_response(e),
    }
}

/// DELETE /impersonation - return to the original principal
pub async fn stop(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<SessionContext>,
    headers: HeaderMap,
) -> axum::response::Response {
    match services
        .identity
        .stop_impersonation(ctx.session(), &request_origin(&headers))
    {
        Ok(restored) => (StatusCode::OK, Json(restored)).into_response(),
        Err(e) => errors::identity_error_to_response(e),
    }
}
