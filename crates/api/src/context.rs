use axum::http::HeaderMap;

use storegate_auth::{Principal, Session};
use storegate_core::SessionId;

/// The caller's session, resolved from the bearer token.
///
/// Present on every protected route.
#[derive(Debug, Clone)]
pub struct SessionContext {
    token: SessionId,
    session: Session,
}

impl SessionContext {
    pub fn new(token: SessionId, session: Session) -> Self {
        Self { token, session }
    }

    pub fn token(&self) -> SessionId {
        self.token
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Effective principal (the impersonated one, if any).
    pub fn current(&self) -> Option<Principal> {
        self.session.current()
    }
}

/// Network origin of a request, for audit entries.
///
/// First hop of `X-Forwarded-For`, else `X-Real-IP`, else `"unknown"`.
pub fn request_origin(headers: &HeaderMap) -> String {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());

    let real_ip = || {
        headers
            .get("x-real-ip")
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };

    forwarded
        .or_else(real_ip)
        .unwrap_or(storegate_audit::NewAuditEntry::UNKNOWN_ORIGIN)
        .to_string()
}
