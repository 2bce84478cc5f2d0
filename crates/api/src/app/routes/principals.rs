use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, patch, put},
};

use storegate_core::PrincipalId;

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::{SessionContext, request_origin};

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_principals))
        .route("/:id", get(get_principal).delete(remove_principal))
        .route("/:id/status", patch(set_status))
        .route("/:id/account-manager", put(set_account_manager))
}

fn parse_id(raw: &str) -> Result<PrincipalId, axum::response::Response> {
    errors::parse_param(raw, "invalid_id")
}

/// GET /principals - workforce managers only
pub async fn list_principals(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<SessionContext>,
) -> axum::response::Response {
    match services.identity.browse_principals(ctx.session()) {
        Ok(principals) => (
            StatusCode::OK,
            Json(serde_json::json!({ "principals": principals })),
        )
            .into_response(),
        Err(e) => errors::identity_error_to_response(e),
    }
}

pub async fn get_principal(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<SessionContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services.identity.view_principal(ctx.session(), &id) {
        Ok(p) => (StatusCode::OK, Json(p)).into_response(),
        Err(e) => errors::identity_error_to_response(e),
    }
}

/// PATCH /principals/:id/status - suspend, approve or reinstate
pub async fn set_status(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<SessionContext>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<dto::SetStatusRequest>,
) -> axum::response::Response {
    let id = match parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services
        .identity
        .set_status(ctx.session(), &id, body.status, &request_origin(&headers))
    {
        Ok(p) => (StatusCode::OK, Json(p)).into_response(),
        Err(e) => errors::identity_error_to_response(e),
    }
}

pub async fn set_account_manager(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<SessionContext>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<dto::SetAccountManagerRequest>,
) -> axum::response::Response {
    let id = match parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services.identity.set_account_manager(
        ctx.session(),
        &id,
        &body.manager,
        &request_origin(&headers),
    ) {
        Ok(p) => (StatusCode::OK, Json(p)).into_response(),
        Err(e) => errors::identity_error_to_response(e),
    }
}

pub async fn remove_principal(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<SessionContext>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services
        .identity
        .remove_principal(ctx.session(), &id, &request_origin(&headers))
    {
        Ok(p) => (StatusCode::OK, Json(p)).into_response(),
        Err(e) => errors::identity_error_to_response(e),
    }
}
