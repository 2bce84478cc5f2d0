use std::sync::Arc;

use axum::{
    Json,
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};

use storegate_auth::NewPrincipal;
use storegate_core::SessionId;

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::{SessionContext, request_origin};
use crate::middleware::extract_bearer;

/// POST /auth/login - open a session and authenticate it
pub async fn login(
    Extension(services): Extension<Arc<AppServices>>,
    headers: HeaderMap,
    Json(body): Json<dto::LoginRequest>,
) -> axum::response::Response {
    let origin = request_origin(&headers);
    let session = match services.sessions.open() {
        Ok(s) => s,
        Err(e) => return errors::identity_error_to_response(e.into()),
    };

    match services
        .identity
        .login(&session, &body.handle, &body.credential, &origin)
    {
        Ok(principal) => (
            StatusCode::OK,
            Json(dto::LoginResponse {
                token: session.id().to_string(),
                principal,
            }),
        )
            .into_response(),
        Err(e) => {
            // A rejected login never leaves a usable token behind.
            if let Err(close) = services.sessions.close(session.id()) {
                tracing::error!(error = %close, "failed to discard rejected session");
            }
            errors::identity_error_to_response(e)
        }
    }
}

/// POST /auth/register - self-signup, or staff registration with a bearer token
pub async fn register(
    Extension(services): Extension<Arc<AppServices>>,
    headers: HeaderMap,
    Json(body): Json<dto::RegisterRequest>,
) -> axum::response::Response {
    let origin = request_origin(&headers);

    let session = match extract_bearer(&headers) {
        None => services.identity.open_session(),
        Some(raw) => {
            let token: SessionId = match errors::parse_param(raw, "invalid_token") {
                Ok(t) => t,
                Err(resp) => return resp,
            };
            match services.sessions.get(token) {
                Ok(Some(session)) => session,
                Ok(None) => {
                    return errors::json_error(
                        StatusCode::UNAUTHORIZED,
                        "unauthenticated",
                        "session token is unknown or expired",
                    );
                }
                Err(e) => return errors::identity_error_to_response(e.into()),
            }
        }
    };

    let input = NewPrincipal::new(body.full_name, body.handle, body.email, body.role);
    match services.identity.register_principal(
        &session,
        input,
        body.credential.as_deref(),
        &origin,
    ) {
        Ok(principal) => (StatusCode::CREATED, Json(principal)).into_response(),
        Err(e) => errors::identity_error_to_response(e),
    }
}

/// POST /auth/logout - end the session and retire its token
pub async fn logout(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<SessionContext>,
    headers: HeaderMap,
) -> axum::response::Response {
    let origin = request_origin(&headers);
    if let Err(e) = services.identity.logout(ctx.session(), &origin) {
        return errors::identity_error_to_response(e);
    }
    if let Err(e) = services.sessions.close(ctx.token()) {
        return errors::identity_error_to_response(e.into());
    }
    StatusCode::NO_CONTENT.into_response()
}
