//! `storegate-core`: identity-subsystem building blocks.
//!
//! This crate holds identifiers, time, and store-level error types shared by
//! the audit and auth crates. It performs no IO.

pub mod clock;
pub mod error;
pub mod id;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{DomainError, DomainResult, StoreError};
pub use id::{AuditEntryId, PrincipalId, SessionId};
