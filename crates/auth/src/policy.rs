//! Security policy parameters.

use chrono::Duration;
use serde::{Deserialize, Serialize};

/// Read-only security configuration consumed by the lockout engine, the
/// authentication engine and the session registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityPolicy {
    pub mfa_required: bool,
    pub min_credential_length: usize,
    pub session_timeout_minutes: u32,
    /// Consecutive failures that engage the lock.
    pub max_login_attempts: u32,
    pub lockout_duration_seconds: u32,
    pub ip_filtering_enabled: bool,
    /// Newest audit entries kept in the hot log.
    pub audit_retention: usize,
    /// Record refused impersonation attempts in the audit log.
    pub audit_denied_impersonation: bool,
    /// Argon2id memory cost for stored credentials.
    pub credential_hash_memory_kib: u32,
    pub credential_hash_iterations: u32,
}

impl Default for SecurityPolicy {
    fn default() -> Self {
        Self {
            mfa_required: false,
            min_credential_length: 8,
            session_timeout_minutes: 30,
            max_login_attempts: 5,
            lockout_duration_seconds: 60,
            ip_filtering_enabled: false,
            audit_retention: 1000,
            audit_denied_impersonation: false,
            credential_hash_memory_kib: 19 * 1024,
            credential_hash_iterations: 2,
        }
    }
}

impl SecurityPolicy {
    pub fn lockout_duration(&self) -> Duration {
        Duration::seconds(i64::from(self.lockout_duration_seconds))
    }

    pub fn session_timeout(&self) -> Duration {
        Duration::minutes(i64::from(self.session_timeout_minutes))
    }

    /// A threshold of zero would lock on no failures at all.
    pub fn effective_max_attempts(&self) -> u32 {
        self.max_login_attempts.max(1)
    }
}
