//! Authentication engine.
//!
//! `login` walks a session from unauthenticated to authenticated. Every
//! rejection returns the session to unauthenticated; the only way out of
//! authenticated is `logout`.
//!
//! The whole login runs with the session locked, so two logins racing on
//! one session cannot both succeed.

use std::sync::Arc;

use storegate_audit::{AuditActor, AuditCategory, AuditLog, NewAuditEntry, Severity};
use storegate_core::Clock;

use crate::credentials::CredentialVerifier;
use crate::directory::IdentityDirectory;
use crate::error::AuthError;
use crate::lockout::LockoutEngine;
use crate::notify::SessionEventKind;
use crate::principal::Principal;
use crate::session::Session;

pub struct AuthService {
    directory: Arc<dyn IdentityDirectory>,
    credentials: Arc<dyn CredentialVerifier>,
    lockout: Arc<LockoutEngine>,
    audit: Arc<dyn AuditLog>,
    clock: Arc<dyn Clock>,
}

impl core::fmt::Debug for AuthService {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AuthService")
            .field("lockout", &self.lockout)
            .finish_non_exhaustive()
    }
}

impl AuthService {
    pub fn new(
        directory: Arc<dyn IdentityDirectory>,
        credentials: Arc<dyn CredentialVerifier>,
        lockout: Arc<LockoutEngine>,
        audit: Arc<dyn AuditLog>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            directory,
            credentials,
            lockout,
            audit,
            clock,
        }
    }

    pub fn lockout(&self) -> &LockoutEngine {
        &self.lockout
    }

    /// Authenticate `handle` and bind the principal to `session`.
    pub fn login(
        &self,
        session: &Session,
        handle: &str,
        credential: &str,
        origin: &str,
    ) -> Result<Principal, AuthError> {
        let principal = session.transition(|slots| -> Result<Principal, AuthError> {
            if slots.current.is_some() {
                return Err(AuthError::SessionActive);
            }

            let status = self.lockout.check_lockout(handle)?;
            if status.is_locked {
                tracing::info!(handle, remaining = status.remaining_seconds, "login bounced by lockout");
                return Err(AuthError::AccountLocked {
                    remaining_seconds: status.remaining_seconds,
                });
            }

            // The credential belongs to whoever holds the handle now; a
            // previous holder's credential never carries over.
            let holder = self.directory.find_by_handle(handle)?;
            let verified = match &holder {
                Some(p) => self.credentials.verify(&p.id, credential)?,
                None => false,
            };

            let Some(principal) = holder.filter(|_| verified) else {
                let outcome = self.lockout.record_failed_attempt_from(handle, origin)?;
                self.audit.append(
                    NewAuditEntry::new(
                        AuditActor::anonymous(),
                        "Login failed",
                        AuditCategory::Authentication,
                        Severity::Warn,
                    )
                    .details(format!(
                        "Invalid credentials for handle '{handle}' (attempt {})",
                        outcome.attempts
                    ))
                    .origin(origin),
                )?;
                tracing::warn!(handle, attempts = outcome.attempts, origin, "login failed");

                return Err(if outcome.is_locked {
                    AuthError::AccountLocked {
                        remaining_seconds: outcome.remaining_seconds,
                    }
                } else {
                    AuthError::InvalidCredentials
                });
            };

            if principal.is_suspended() {
                self.audit.append(
                    NewAuditEntry::new(
                        AuditActor::principal(&principal.id, &principal.display_name),
                        "Login blocked",
                        AuditCategory::Authentication,
                        Severity::Warn,
                    )
                    .details(format!("Suspended account '{handle}' attempted to log in"))
                    .origin(origin),
                )?;
                tracing::warn!(handle, principal = %principal.id, "suspended account bounced");
                return Err(AuthError::AccountSuspended);
            }

            let status = self.lockout.reset_unless_locked(handle)?;
            if status.is_locked {
                tracing::info!(handle, remaining = status.remaining_seconds, "lock engaged during login");
                return Err(AuthError::AccountLocked {
                    remaining_seconds: status.remaining_seconds,
                });
            }

            let now = self.clock.now();
            let principal = self.directory.record_login(&principal.id, now, origin)?;
            self.audit.append(
                NewAuditEntry::new(
                    AuditActor::principal(&principal.id, &principal.display_name),
                    "Login",
                    AuditCategory::Authentication,
                    Severity::Info,
                )
                .details(format!("Authenticated as {}", principal.role))
                .origin(origin),
            )?;

            slots.set_current(principal.clone());
            Ok(principal)
        })?;

        tracing::info!(handle, principal = %principal.id, role = %principal.role, "login succeeded");
        session.notify(SessionEventKind::LoggedIn, self.clock.now());
        Ok(principal)
    }

    /// Tear the session down. Returns the principal that was logged out, if any.
    pub fn logout(&self, session: &Session, origin: &str) -> Result<Option<Principal>, AuthError> {
        let ended = session.transition(|slots| {
            let Some(principal) = slots.authenticated().cloned() else {
                return Ok::<_, AuthError>(None);
            };

            self.audit.append(
                NewAuditEntry::new(
                    AuditActor::principal(&principal.id, &principal.display_name),
                    "Logout",
                    AuditCategory::Authentication,
                    Severity::Info,
                )
                .details(match &slots.original {
                    Some(_) => "Session ended during impersonation".to_string(),
                    None => "Session ended".to_string(),
                })
                .origin(origin),
            )?;

            slots.clear();
            Ok(Some(principal))
        })?;

        if let Some(principal) = &ended {
            tracing::info!(principal = %principal.id, "logout");
            session.notify(SessionEventKind::LoggedOut, self.clock.now());
        }
        Ok(ended)
    }
}
