//! Audit log contract.

use std::sync::Arc;

use serde::Deserialize;

use storegate_core::StoreError;

use crate::entry::{AuditCategory, AuditLogEntry, NewAuditEntry, Severity};

/// Selection applied by [`AuditLog::list`]. Empty fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AuditFilter {
    pub actor_id: Option<String>,
    pub category: Option<AuditCategory>,
    pub severity: Option<Severity>,
    pub limit: Option<usize>,
}

impl AuditFilter {
    pub fn all() -> Self {
        Self::default()
    }

    /// Only entries written by one actor.
    pub fn actor(actor_id: impl Into<String>) -> Self {
        Self {
            actor_id: Some(actor_id.into()),
            ..Self::default()
        }
    }

    pub fn with_category(mut self, category: AuditCategory) -> Self {
        self.category = Some(category);
        self
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = Some(severity);
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn matches(&self, entry: &AuditLogEntry) -> bool {
        self.actor_id.as_deref().is_none_or(|a| a == entry.actor_id)
            && self.category.is_none_or(|c| c == entry.category)
            && self.severity.is_none_or(|s| s == entry.severity)
    }
}

/// Append-only audit trail.
///
/// `append` assigns id and timestamp and is safe under concurrent writers;
/// the stored order is one consistent serialization of all appends.
/// `list` returns most-recent-first and is stable for a fixed state.
pub trait AuditLog: Send + Sync {
    fn append(&self, entry: NewAuditEntry) -> Result<AuditLogEntry, StoreError>;

    fn list(&self, filter: &AuditFilter) -> Result<Vec<AuditLogEntry>, StoreError>;
}

impl<L> AuditLog for Arc<L>
where
    L: AuditLog + ?Sized,
{
    fn append(&self, entry: NewAuditEntry) -> Result<AuditLogEntry, StoreError> {
        (**self).append(entry)
    }

    fn list(&self, filter: &AuditFilter) -> Result<Vec<AuditLogEntry>, StoreError> {
        (**self).list(filter)
    }
}
