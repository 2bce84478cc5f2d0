use serde::{Deserialize, Serialize};

use storegate_auth::{AccountStatus, Principal, Role, SessionState};

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub handle: String,
    pub credential: String,
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub full_name: String,
    pub handle: String,
    pub email: String,
    pub role: Role,
    pub credential: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ImpersonateRequest {
    pub target_id: String,
}

#[derive(Debug, Deserialize)]
pub struct SetStatusRequest {
    pub status: AccountStatus,
}

#[derive(Debug, Deserialize)]
pub struct SetAccountManagerRequest {
    pub manager: String,
}

/// `GET /audit` query string. Values are parsed by hand so bad input
/// gets the same error body as everything else.
#[derive(Debug, Default, Deserialize)]
pub struct AuditQuery {
    pub actor: Option<String>,
    pub category: Option<String>,
    pub severity: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct AppendAuditRequest {
    pub action: String,
    pub category: String,
    #[serde(default)]
    pub details: String,
    pub severity: String,
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub principal: Principal,
}

#[derive(Debug, Serialize)]
pub struct WhoAmIResponse {
    pub state: SessionState,
    pub principal: Option<Principal>,
    pub impersonating: bool,
    /// The principal that authenticated, when impersonating.
    pub original: Option<Principal>,
}
