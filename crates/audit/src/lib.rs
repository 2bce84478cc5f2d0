//! `storegate-audit`: append-only, severity-tagged audit trail.
//!
//! Every identity component (and any collaborator recording domain events)
//! writes here. Entries are never edited; only the retention bound removes
//! them, oldest first, optionally handing them to an [`AuditArchive`].

pub mod archive;
pub mod entry;
pub mod in_memory;
pub mod log;

pub use archive::{AuditArchive, InMemoryArchive, JsonLinesArchive};
pub use entry::{AuditActor, AuditCategory, AuditLogEntry, NewAuditEntry, Severity};
pub use in_memory::{DEFAULT_RETENTION, InMemoryAuditLog};
pub use log::{AuditFilter, AuditLog};
