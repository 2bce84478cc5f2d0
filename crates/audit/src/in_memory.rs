//! Bounded in-memory audit log.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use storegate_core::{Clock, StoreError, SystemClock};

use crate::archive::AuditArchive;
use crate::entry::{AuditLogEntry, NewAuditEntry, Severity};
use crate::log::{AuditFilter, AuditLog};

/// Number of entries kept when no explicit bound is configured.
pub const DEFAULT_RETENTION: usize = 1000;

/// In-memory audit log keeping the newest `capacity` entries.
///
/// Entries are stored newest-first. A single mutex serializes appends, so the
/// stored order is the order in which writers acquired it.
pub struct InMemoryAuditLog {
    entries: Mutex<VecDeque<AuditLogEntry>>,
    capacity: usize,
    clock: Arc<dyn Clock>,
    archive: Option<Arc<dyn AuditArchive>>,
}

impl InMemoryAuditLog {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(VecDeque::new()),
            capacity: DEFAULT_RETENTION,
            clock,
            archive: None,
        }
    }

    /// Override the retention bound (minimum 1).
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity.max(1);
        self
    }

    /// Hand evicted entries to `archive` instead of discarding them.
    pub fn with_archive(mut self, archive: Arc<dyn AuditArchive>) -> Self {
        self.archive = Some(archive);
        self
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> Result<usize, StoreError> {
        Ok(self.lock()?.len())
    }

    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.lock()?.is_empty())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, VecDeque<AuditLogEntry>>, StoreError> {
        self.entries.lock().map_err(|_| StoreError::Poisoned("audit"))
    }
}

impl Default for InMemoryAuditLog {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Debug for InMemoryAuditLog {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("InMemoryAuditLog")
            .field("capacity", &self.capacity)
            .field("archive", &self.archive.is_some())
            .finish_non_exhaustive()
    }
}

impl AuditLog for InMemoryAuditLog {
    fn append(&self, entry: NewAuditEntry) -> Result<AuditLogEntry, StoreError> {
        let mut entries = self.lock()?;

        // Timestamps never go backwards, even if the wall clock does.
        let now = self.clock.now();
        let timestamp = entries
            .front()
            .map_or(now, |newest| now.max(newest.timestamp));
        let stored = AuditLogEntry::commit(entry, timestamp);

        let overflow = (entries.len() + 1).saturating_sub(self.capacity);
        if overflow > 0 {
            if let Some(archive) = &self.archive {
                let evicted: Vec<AuditLogEntry> =
                    entries.iter().rev().take(overflow).cloned().collect();
                archive.archive(&evicted)?;
            }
            let keep = entries.len() - overflow;
            entries.truncate(keep);
        }
        entries.push_front(stored.clone());
        drop(entries);

        mirror(&stored);
        Ok(stored)
    }

    fn list(&self, filter: &AuditFilter) -> Result<Vec<AuditLogEntry>, StoreError> {
        let entries = self.lock()?;
        let limit = filter.limit.unwrap_or(usize::MAX);
        Ok(entries
            .iter()
            .filter(|e| filter.matches(e))
            .take(limit)
            .cloned()
            .collect())
    }
}

fn mirror(entry: &AuditLogEntry) {
    match entry.severity {
        Severity::Info => tracing::info!(
            target: "storegate::audit",
            actor = %entry.actor_id,
            category = %entry.category,
            origin = %entry.origin,
            details = %entry.details,
            "{}",
            entry.action
        ),
        Severity::Warn => tracing::warn!(
            target: "storegate::audit",
            actor = %entry.actor_id,
            category = %entry.category,
            origin = %entry.origin,
            details = %entry.details,
            "{}",
            entry.action
        ),
        Severity::Critical => tracing::error!(
            target: "storegate::audit",
            actor = %entry.actor_id,
            category = %entry.category,
            origin = %entry.origin,
            details = %entry.details,
            "{}",
            entry.action
        ),
    }
}
