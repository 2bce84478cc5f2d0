use std::sync::Arc;

use axum::{
    Json,
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, sse::Event as SseEvent},
};

use crate::app::dto;
use crate::app::services::{self, AppServices};
use crate::context::SessionContext;

pub async fn health() -> StatusCode {
    StatusCode::OK
}

pub async fn whoami(Extension(ctx): Extension<SessionContext>) -> impl IntoResponse {
    let session = ctx.session();
    let impersonating = session.is_impersonating();
    Json(dto::WhoAmIResponse {
        state: session.state(),
        principal: session.current(),
        impersonating,
        original: impersonating
            .then(|| session.authenticated_principal())
            .flatten(),
    })
}

pub async fn policy(Extension(services): Extension<Arc<AppServices>>) -> impl IntoResponse {
    Json(services.identity.policy().clone())
}

/// GET /events - this session's change notifications as SSE
pub async fn events(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<SessionContext>,
) -> axum::response::Sse<impl tokio_stream::Stream<Item = Result<SseEvent, std::convert::Infallible>>>
{
    services::session_sse_stream(services, ctx.token())
}
