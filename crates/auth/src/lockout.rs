//! Brute-force lockout policy engine.
//!
//! Tracks consecutive failed logins per handle and engages a timed lock once
//! the policy threshold is reached. Remaining lock time is always computed
//! from the stored expiry against the clock at read time; nothing runs in the
//! background.
//!
//! Expired locks reset: the first failure after expiry counts as attempt 1.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use storegate_audit::{AuditActor, AuditCategory, AuditLog, NewAuditEntry, Severity};
use storegate_core::{Clock, StoreError};

use crate::policy::SecurityPolicy;

/// Per-handle counter state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LockoutRecord {
    pub attempts: u32,
    pub locked_until: Option<DateTime<Utc>>,
}

/// Result of recording a failed attempt.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub struct AttemptOutcome {
    pub attempts: u32,
    pub is_locked: bool,
    pub remaining_seconds: u64,
}

/// Result of a read-only lock check.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub struct LockStatus {
    pub is_locked: bool,
    pub remaining_seconds: u64,
}

impl LockStatus {
    pub const UNLOCKED: LockStatus = LockStatus {
        is_locked: false,
        remaining_seconds: 0,
    };
}

/// Whole seconds until `until`, rounded up.
fn remaining_seconds(until: DateTime<Utc>, now: DateTime<Utc>) -> u64 {
    let ms = (until - now).num_milliseconds();
    if ms <= 0 {
        0
    } else {
        (ms as u64).div_ceil(1000)
    }
}

pub struct LockoutEngine {
    // One mutex over all records: increment-and-compare is a single critical
    // section, so racing failures for a handle observe n and n+1.
    records: Mutex<HashMap<String, LockoutRecord>>,
    max_attempts: u32,
    lock_duration: Duration,
    clock: Arc<dyn Clock>,
    audit: Arc<dyn AuditLog>,
}

impl core::fmt::Debug for LockoutEngine {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("LockoutEngine")
            .field("max_attempts", &self.max_attempts)
            .field("lock_duration", &self.lock_duration)
            .finish_non_exhaustive()
    }
}

impl LockoutEngine {
    pub fn new(policy: &SecurityPolicy, clock: Arc<dyn Clock>, audit: Arc<dyn AuditLog>) -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
            max_attempts: policy.effective_max_attempts(),
            lock_duration: policy.lockout_duration(),
            clock,
            audit,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, LockoutRecord>>, StoreError> {
        self.records
            .lock()
            .map_err(|_| StoreError::Poisoned("lockout"))
    }

    /// Count one failed attempt for `handle`.
    pub fn record_failed_attempt(&self, handle: &str) -> Result<AttemptOutcome, StoreError> {
        self.record_failed_attempt_from(handle, NewAuditEntry::UNKNOWN_ORIGIN)
    }

    /// Count one failed attempt, stamping `origin` on the lock audit entry.
    ///
    /// While a lock is in force the counter is left alone and the lock is not
    /// extended. When the threshold trips, one security entry is written
    /// before the lock is committed; if that write fails nothing changes.
    pub fn record_failed_attempt_from(
        &self,
        handle: &str,
        origin: &str,
    ) -> Result<AttemptOutcome, StoreError> {
        let now = self.clock.now();
        let mut records = self.lock()?;

        let mut record = records.get(handle).cloned().unwrap_or_default();
        if let Some(until) = record.locked_until {
            if until > now {
                return Ok(AttemptOutcome {
                    attempts: record.attempts,
                    is_locked: true,
                    remaining_seconds: remaining_seconds(until, now),
                });
            }
            record = LockoutRecord::default();
        }

        record.attempts = record.attempts.saturating_add(1);

        let outcome = if record.attempts >= self.max_attempts {
            let until = now + self.lock_duration;
            record.locked_until = Some(until);

            self.audit.append(
                NewAuditEntry::new(
                    AuditActor::anonymous(),
                    "Account locked",
                    AuditCategory::Security,
                    Severity::Warn,
                )
                .details(format!(
                    "Handle '{handle}' locked for {}s after {} failed attempts",
                    self.lock_duration.num_seconds(),
                    record.attempts
                ))
                .origin(origin),
            )?;
            tracing::warn!(handle, attempts = record.attempts, "lockout engaged");

            AttemptOutcome {
                attempts: record.attempts,
                is_locked: true,
                remaining_seconds: remaining_seconds(until, now),
            }
        } else {
            AttemptOutcome {
                attempts: record.attempts,
                is_locked: false,
                remaining_seconds: 0,
            }
        };

        records.insert(handle.to_string(), record);
        Ok(outcome)
    }

    /// Whether an unexpired lock exists. No side effects.
    pub fn check_lockout(&self, handle: &str) -> Result<LockStatus, StoreError> {
        let now = self.clock.now();
        let records = self.lock()?;
        Ok(match records.get(handle).and_then(|r| r.locked_until) {
            Some(until) if until > now => LockStatus {
                is_locked: true,
                remaining_seconds: remaining_seconds(until, now),
            },
            _ => LockStatus::UNLOCKED,
        })
    }

    /// Forget everything about `handle`.
    pub fn reset(&self, handle: &str) -> Result<(), StoreError> {
        self.lock()?.remove(handle);
        Ok(())
    }

    /// Clear `handle` after a successful login unless a lock is in force.
    ///
    /// Check and clear share one critical section, so a lock engaged by a
    /// racing failure after the caller's earlier check is kept and reported.
    pub fn reset_unless_locked(&self, handle: &str) -> Result<LockStatus, StoreError> {
        let now = self.clock.now();
        let mut records = self.lock()?;
        if let Some(until) = records.get(handle).and_then(|r| r.locked_until) {
            if until > now {
                return Ok(LockStatus {
                    is_locked: true,
                    remaining_seconds: remaining_seconds(until, now),
                });
            }
        }
        records.remove(handle);
        Ok(LockStatus::UNLOCKED)
    }

    /// Raw record for diagnostics.
    pub fn snapshot(&self, handle: &str) -> Result<Option<LockoutRecord>, StoreError> {
        Ok(self.lock()?.get(handle).cloned())
    }
}
