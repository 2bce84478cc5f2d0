//! Impersonation manager.
//!
//! A super-admin may act as one other principal for the rest of a session.
//! Nesting is refused. Start and stop run with the session locked, and each
//! writes its audit entry before touching the session.

use std::sync::Arc;

use storegate_audit::{AuditActor, AuditCategory, AuditLog, NewAuditEntry, Severity};
use storegate_core::{Clock, PrincipalId};

use crate::authorize::{Capability, authorize};
use crate::directory::IdentityDirectory;
use crate::error::ImpersonationError;
use crate::notify::SessionEventKind;
use crate::principal::Principal;
use crate::session::Session;

pub struct ImpersonationManager {
    directory: Arc<dyn IdentityDirectory>,
    audit: Arc<dyn AuditLog>,
    clock: Arc<dyn Clock>,
    audit_denied: bool,
}

impl core::fmt::Debug for ImpersonationManager {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ImpersonationManager")
            .field("audit_denied", &self.audit_denied)
            .finish_non_exhaustive()
    }
}

impl ImpersonationManager {
    pub fn new(
        directory: Arc<dyn IdentityDirectory>,
        audit: Arc<dyn AuditLog>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            directory,
            audit,
            clock,
            audit_denied: false,
        }
    }

    /// Also write a security warning when a start is refused for role.
    pub fn audit_denied(mut self, enabled: bool) -> Self {
        self.audit_denied = enabled;
        self
    }

    pub fn start(
        &self,
        session: &Session,
        acting: &Principal,
        target_id: &PrincipalId,
    ) -> Result<Principal, ImpersonationError> {
        self.start_from(session, acting, target_id, NewAuditEntry::UNKNOWN_ORIGIN)
    }

    /// Substitute `target_id` for the session's principal.
    ///
    /// `acting` must be the principal that authenticated the session.
    pub fn start_from(
        &self,
        session: &Session,
        acting: &Principal,
        target_id: &PrincipalId,
        origin: &str,
    ) -> Result<Principal, ImpersonationError> {
        let target = session.transition(|slots| -> Result<Principal, ImpersonationError> {
            let authenticated = slots
                .authenticated()
                .cloned()
                .ok_or(ImpersonationError::NotAuthenticated)?;

            // The session's own record decides the role, not the caller's copy.
            let permitted = authenticated.id == acting.id
                && authorize(Some(&authenticated), Capability::Impersonate).is_ok();
            if !permitted {
                self.deny(acting, target_id, origin)?;
                return Err(ImpersonationError::Forbidden);
            }

            if slots.original.is_some() {
                return Err(ImpersonationError::AlreadyImpersonating);
            }

            let target = self
                .directory
                .find_by_id(target_id)?
                .ok_or_else(|| ImpersonationError::NotFound(target_id.clone()))?;

            self.audit.append(
                NewAuditEntry::new(
                    AuditActor::principal(&authenticated.id, &authenticated.display_name),
                    "Impersonation started",
                    AuditCategory::Security,
                    Severity::Critical,
                )
                .details(format!(
                    "Now acting as {} ({}, {})",
                    target.display_name, target.id, target.role
                ))
                .origin(origin),
            )?;

            slots.original = slots.current.replace(target.clone());
            Ok(target)
        })?;

        tracing::warn!(actor = %acting.id, target = %target.id, "impersonation started");
        session.notify(SessionEventKind::ImpersonationStarted, self.clock.now());
        Ok(target)
    }

    pub fn stop(&self, session: &Session) -> Result<Principal, ImpersonationError> {
        self.stop_from(session, NewAuditEntry::UNKNOWN_ORIGIN)
    }

    /// Restore the original principal. Returns the restored principal.
    pub fn stop_from(&self, session: &Session, origin: &str) -> Result<Principal, ImpersonationError> {
        let restored = session.transition(|slots| {
            let (Some(original), Some(current)) = (slots.original.clone(), slots.current.clone())
            else {
                return Err(ImpersonationError::NotImpersonating);
            };

            self.audit.append(
                NewAuditEntry::new(
                    AuditActor::principal(&original.id, &original.display_name),
                    "Impersonation stopped",
                    AuditCategory::Security,
                    Severity::Info,
                )
                .details(format!(
                    "{} ({}) stopped acting as {} ({})",
                    original.display_name, original.id, current.display_name, current.id
                ))
                .origin(origin),
            )?;

            slots.current = slots.original.take();
            Ok(original)
        })?;

        tracing::info!(actor = %restored.id, "impersonation stopped");
        session.notify(SessionEventKind::ImpersonationStopped, self.clock.now());
        Ok(restored)
    }

    fn deny(
        &self,
        acting: &Principal,
        target_id: &PrincipalId,
        origin: &str,
    ) -> Result<(), ImpersonationError> {
        tracing::warn!(actor = %acting.id, target = %target_id, "impersonation refused");
        if self.audit_denied {
            self.audit.append(
                NewAuditEntry::new(
                    AuditActor::principal(&acting.id, &acting.display_name),
                    "Impersonation denied",
                    AuditCategory::Security,
                    Severity::Warn,
                )
                .details(format!("Role '{}' may not impersonate {target_id}", acting.role))
                .origin(origin),
            )?;
        }
        Ok(())
    }
}
