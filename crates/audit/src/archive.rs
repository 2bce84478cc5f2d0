//! Cold-storage hand-off for entries that fall out of the retention window.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

use storegate_core::StoreError;

use crate::entry::AuditLogEntry;

/// Receives entries evicted by the retention bound, oldest first.
///
/// If `archive` fails, the append that triggered the eviction fails too and
/// the log is left unchanged.
pub trait AuditArchive: Send + Sync {
    fn archive(&self, evicted: &[AuditLogEntry]) -> Result<(), StoreError>;
}

/// Keeps evicted entries in memory (tests/dev).
#[derive(Debug, Default)]
pub struct InMemoryArchive {
    entries: Mutex<Vec<AuditLogEntry>>,
}

impl InMemoryArchive {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<AuditLogEntry> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl AuditArchive for InMemoryArchive {
    fn archive(&self, evicted: &[AuditLogEntry]) -> Result<(), StoreError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| StoreError::Poisoned("audit archive"))?;
        entries.extend_from_slice(evicted);
        Ok(())
    }
}

/// Appends evicted entries to a file, one JSON document per line.
#[derive(Debug)]
pub struct JsonLinesArchive {
    path: PathBuf,
    // Serializes writers so lines from concurrent evictions never interleave.
    write_lock: Mutex<()>,
}

impl JsonLinesArchive {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

impl AuditArchive for JsonLinesArchive {
    fn archive(&self, evicted: &[AuditLogEntry]) -> Result<(), StoreError> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| StoreError::Poisoned("audit archive"))?;

        let mut buf = Vec::new();
        for entry in evicted {
            serde_json::to_writer(&mut buf, entry)
                .map_err(|e| StoreError::unavailable(format!("encode audit entry: {e}")))?;
            buf.push(b'\n');
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| StoreError::unavailable(format!("open {}: {e}", self.path.display())))?;
        file.write_all(&buf)
            .map_err(|e| StoreError::unavailable(format!("write {}: {e}", self.path.display())))?;

        tracing::debug!(
            path = %self.path.display(),
            count = evicted.len(),
            "archived evicted audit entries"
        );
        Ok(())
    }
}
