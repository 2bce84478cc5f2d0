//! Audit entry model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use storegate_core::{AuditEntryId, PrincipalId};

/// What area of the system an entry belongs to.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditCategory {
    Authentication,
    Authorization,
    Security,
    Financial,
    System,
}

impl AuditCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditCategory::Authentication => "authentication",
            AuditCategory::Authorization => "authorization",
            AuditCategory::Security => "security",
            AuditCategory::Financial => "financial",
            AuditCategory::System => "system",
        }
    }
}

impl core::fmt::Display for AuditCategory {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for AuditCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "authentication" | "auth" => Ok(AuditCategory::Authentication),
            "authorization" | "permission" => Ok(AuditCategory::Authorization),
            "security" => Ok(AuditCategory::Security),
            "financial" => Ok(AuditCategory::Financial),
            "system" => Ok(AuditCategory::System),
            other => Err(format!("unknown audit category '{other}'")),
        }
    }
}

/// Severity tag, serialized as `INFO` / `WARN` / `CRITICAL`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Info,
    Warn,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "INFO",
            Severity::Warn => "WARN",
            Severity::Critical => "CRITICAL",
        }
    }
}

impl core::fmt::Display for Severity {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "INFO" => Ok(Severity::Info),
            "WARN" | "WARNING" => Ok(Severity::Warn),
            "CRITICAL" => Ok(Severity::Critical),
            other => Err(format!("unknown severity '{other}'")),
        }
    }
}

/// Who performed the recorded action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditActor {
    pub id: String,
    pub name: String,
}

impl AuditActor {
    /// Actor id used for events with no authenticated principal.
    pub const ANONYMOUS: &'static str = "ANONYMOUS";
    pub const SYSTEM: &'static str = "SYSTEM";

    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }

    pub fn principal(id: &PrincipalId, name: impl Into<String>) -> Self {
        Self::new(id.as_str(), name)
    }

    pub fn anonymous() -> Self {
        Self::new(Self::ANONYMOUS, "Anonymous")
    }

    pub fn system() -> Self {
        Self::new(Self::SYSTEM, "System")
    }
}

/// An entry as submitted by a writer, before the log assigns id and time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAuditEntry {
    pub actor: AuditActor,
    pub action: String,
    pub category: AuditCategory,
    pub details: String,
    pub origin: String,
    pub severity: Severity,
}

impl NewAuditEntry {
    pub const UNKNOWN_ORIGIN: &'static str = "unknown";

    pub fn new(
        actor: AuditActor,
        action: impl Into<String>,
        category: AuditCategory,
        severity: Severity,
    ) -> Self {
        Self {
            actor,
            action: action.into(),
            category,
            details: String::new(),
            origin: Self::UNKNOWN_ORIGIN.to_string(),
            severity,
        }
    }

    pub fn details(mut self, details: impl Into<String>) -> Self {
        self.details = details.into();
        self
    }

    pub fn origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = origin.into();
        self
    }
}

/// A committed, immutable audit record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditLogEntry {
    pub id: AuditEntryId,
    pub timestamp: DateTime<Utc>,
    pub actor_id: String,
    pub actor_name: String,
    pub action: String,
    pub category: AuditCategory,
    pub details: String,
    pub origin: String,
    pub severity: Severity,
}

impl AuditLogEntry {
    pub(crate) fn commit(entry: NewAuditEntry, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: AuditEntryId::new(),
            timestamp,
            actor_id: entry.actor.id,
            actor_name: entry.actor.name,
            action: entry.action,
            category: entry.category,
            details: entry.details,
            origin: entry.origin,
            severity: entry.severity,
        }
    }
}
