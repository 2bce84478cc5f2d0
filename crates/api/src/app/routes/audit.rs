//! Audit trail endpoints.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Query},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::get,
};

use storegate_audit::{AuditActor, AuditCategory, AuditFilter, NewAuditEntry, Severity};
use storegate_auth::IdentityError;

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::{SessionContext, request_origin};

pub fn router() -> Router {
    Router::new().route("/", get(list_entries).post(append_entry))
}

/// GET /audit - newest first, optionally filtered (super-admin only)
pub async fn list_entries(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<SessionContext>,
    Query(query): Query<dto::AuditQuery>,
) -> axum::response::Response {
    let mut filter = AuditFilter {
        actor_id: query.actor,
        limit: query.limit,
        ..AuditFilter::default()
    };
    if let Some(raw) = query.category.as_deref() {
        match errors::parse_param::<AuditCategory>(raw, "invalid_category") {
            Ok(c) => filter.category = Some(c),
            Err(resp) => return resp,
        }
    }
    if let Some(raw) = query.severity.as_deref() {
        match errors::parse_param::<Severity>(raw, "invalid_severity") {
            Ok(s) => filter.severity = Some(s),
            Err(resp) => return resp,
        }
    }

    match services.identity.review_audit(ctx.session(), &filter) {
        Ok(entries) => (
            StatusCode::OK,
            Json(serde_json::json!({ "entries": entries })),
        )
            .into_response(),
        Err(e) => errors::identity_error_to_response(e),
    }
}

/// POST /audit - record a domain event as the session's current principal
pub async fn append_entry(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<SessionContext>,
    headers: HeaderMap,
    Json(body): Json<dto::AppendAuditRequest>,
) -> axum::response::Response {
    let Some(actor) = ctx.current() else {
        return errors::identity_error_to_response(IdentityError::Unauthenticated);
    };
    let category: AuditCategory = match errors::parse_param(&body.category, "invalid_category") {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let severity: Severity = match errors::parse_param(&body.severity, "invalid_severity") {
        Ok(s) => s,
        Err(resp) => return resp,
    };

    let entry = NewAuditEntry::new(
        AuditActor::principal(&actor.id, &actor.display_name),
        body.action,
        category,
        severity,
    )
    .details(body.details)
    .origin(request_origin(&headers));

    match services.identity.append_audit_entry(entry) {
        Ok(committed) => (StatusCode::CREATED, Json(committed)).into_response(),
        Err(e) => errors::identity_error_to_response(e),
    }
}
