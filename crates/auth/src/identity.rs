//! The identity facade other subsystems talk to.
//!
//! Bundles the directory, credential store, lockout engine, authentication,
//! impersonation and audit log behind one type. Every operation takes the
//! caller's [`Session`] explicitly.

use std::sync::Arc;

use storegate_audit::{
    AuditActor, AuditCategory, AuditFilter, AuditLog, AuditLogEntry, InMemoryAuditLog,
    NewAuditEntry, Severity,
};
use storegate_core::{Clock, PrincipalId};

use crate::authn::AuthService;
use crate::authorize::{Capability, authorize};
use crate::credentials::{CredentialStore, InMemoryCredentialStore};
use crate::directory::{IdentityDirectory, InMemoryDirectory};
use crate::error::IdentityError;
use crate::impersonation::ImpersonationManager;
use crate::lockout::LockoutEngine;
use crate::notify::{SessionEvent, SessionNotifier, Subscription};
use crate::policy::SecurityPolicy;
use crate::principal::{AccountStatus, NewPrincipal, Principal};
use crate::seed::default_accounts;
use crate::session::{Session, SessionRegistry};

pub struct IdentityService {
    policy: SecurityPolicy,
    clock: Arc<dyn Clock>,
    directory: Arc<dyn IdentityDirectory>,
    credentials: Arc<dyn CredentialStore>,
    audit: Arc<dyn AuditLog>,
    auth: AuthService,
    impersonation: ImpersonationManager,
    notifier: Arc<SessionNotifier>,
}

impl core::fmt::Debug for IdentityService {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("IdentityService")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl IdentityService {
    pub fn new<C>(
        policy: SecurityPolicy,
        clock: Arc<dyn Clock>,
        directory: Arc<dyn IdentityDirectory>,
        credentials: Arc<C>,
        audit: Arc<dyn AuditLog>,
    ) -> Self
    where
        C: CredentialStore + 'static,
    {
        let lockout = Arc::new(LockoutEngine::new(&policy, clock.clone(), audit.clone()));
        let auth = AuthService::new(
            directory.clone(),
            credentials.clone(),
            lockout,
            audit.clone(),
            clock.clone(),
        );
        let impersonation = ImpersonationManager::new(directory.clone(), audit.clone(), clock.clone())
            .audit_denied(policy.audit_denied_impersonation);

        Self {
            policy,
            clock,
            directory,
            credentials,
            audit,
            auth,
            impersonation,
            notifier: Arc::new(SessionNotifier::new()),
        }
    }

    /// A self-contained service over seeded in-memory stores.
    pub fn in_memory(policy: SecurityPolicy, clock: Arc<dyn Clock>) -> Result<Self, IdentityError> {
        let directory = Arc::new(InMemoryDirectory::seeded()?);
        let credentials =
            Arc::new(InMemoryCredentialStore::for_policy(&policy)?.seeded(&default_accounts())?);
        let audit = Arc::new(
            InMemoryAuditLog::with_clock(clock.clone()).with_capacity(policy.audit_retention),
        );
        Ok(Self::new(policy, clock, directory, credentials, audit))
    }

    pub fn policy(&self) -> &SecurityPolicy {
        &self.policy
    }

    pub fn lockout(&self) -> &LockoutEngine {
        self.auth.lockout()
    }

    /// A fresh session wired to this service's notifier.
    pub fn open_session(&self) -> Session {
        Session::new().with_notifier(self.notifier.clone())
    }

    /// A token registry whose sessions expire after the policy's idle timeout.
    pub fn session_registry(&self) -> SessionRegistry {
        SessionRegistry::new(self.clock.clone(), self.policy.session_timeout())
            .with_notifier(self.notifier.clone())
    }

    pub fn subscribe(&self) -> Subscription<SessionEvent> {
        self.notifier.subscribe()
    }

    /// Push session events into `sink` as they are published.
    pub fn forward_events<F>(&self, sink: F)
    where
        F: Fn(&SessionEvent) -> bool + Send + Sync + 'static,
    {
        self.notifier.attach(Box::new(sink));
    }

    // --- session operations ---

    pub fn current_principal(&self, session: &Session) -> Option<Principal> {
        session.current()
    }

    pub fn is_impersonating(&self, session: &Session) -> bool {
        session.is_impersonating()
    }

    pub fn login(
        &self,
        session: &Session,
        handle: &str,
        credential: &str,
        origin: &str,
    ) -> Result<Principal, IdentityError> {
        Ok(self.auth.login(session, handle, credential, origin)?)
    }

    pub fn logout(&self, session: &Session, origin: &str) -> Result<Option<Principal>, IdentityError> {
        Ok(self.auth.logout(session, origin)?)
    }

    /// Impersonate `target_id` as the session's authenticated principal.
    pub fn start_impersonation(
        &self,
        session: &Session,
        target_id: &PrincipalId,
        origin: &str,
    ) -> Result<Principal, IdentityError> {
        let acting = Self::authenticated(session)?;
        Ok(self
            .impersonation
            .start_from(session, &acting, target_id, origin)?)
    }

    pub fn stop_impersonation(&self, session: &Session, origin: &str) -> Result<Principal, IdentityError> {
        Ok(self.impersonation.stop_from(session, origin)?)
    }

    // --- audit ---

    /// Record a domain event on behalf of a collaborator.
    pub fn append_audit_entry(&self, entry: NewAuditEntry) -> Result<AuditLogEntry, IdentityError> {
        Ok(self.audit.append(entry)?)
    }

    pub fn audit_entries(&self, filter: &AuditFilter) -> Result<Vec<AuditLogEntry>, IdentityError> {
        Ok(self.audit.list(filter)?)
    }

    /// Audit entries for a super-admin session.
    pub fn review_audit(
        &self,
        session: &Session,
        filter: &AuditFilter,
    ) -> Result<Vec<AuditLogEntry>, IdentityError> {
        let reviewer = Self::authenticated(session)?;
        authorize(Some(&reviewer), Capability::ReviewAudit)?;
        self.audit_entries(filter)
    }

    // --- directory ---

    pub fn list_principals(&self) -> Result<Vec<Principal>, IdentityError> {
        Ok(self.directory.list()?)
    }

    pub fn find_principal(&self, id: &PrincipalId) -> Result<Principal, IdentityError> {
        self.directory
            .find_by_id(id)?
            .ok_or_else(|| IdentityError::NotFound(id.to_string()))
    }

    /// The directory listing for a workforce manager's session.
    pub fn browse_principals(&self, session: &Session) -> Result<Vec<Principal>, IdentityError> {
        let viewer = Self::authenticated(session)?;
        authorize(Some(&viewer), Capability::ManageWorkforce)?;
        self.list_principals()
    }

    /// One principal's record; anyone may read their own, managers any.
    pub fn view_principal(
        &self,
        session: &Session,
        id: &PrincipalId,
    ) -> Result<Principal, IdentityError> {
        let viewer = Self::authenticated(session)?;
        if viewer.id != *id {
            authorize(Some(&viewer), Capability::ManageWorkforce)?;
        }
        self.find_principal(id)
    }

    /// Create a principal, optionally enrolling its first credential.
    ///
    /// Customers and store owners may sign up from an unauthenticated
    /// session; staff roles need a workforce manager and super-admins need a
    /// super-admin.
    pub fn register_principal(
        &self,
        session: &Session,
        input: NewPrincipal,
        credential: Option<&str>,
        origin: &str,
    ) -> Result<Principal, IdentityError> {
        let registrar = session.authenticated_principal();
        if let Some(capability) = Capability::to_register(input.role) {
            authorize(registrar.as_ref(), capability)?;
        }
        if let Some(credential) = credential {
            let min = self.policy.min_credential_length;
            if credential.chars().count() < min {
                return Err(IdentityError::Validation(format!(
                    "credential must be at least {min} characters"
                )));
            }
        }

        let principal = self.directory.register(input)?;
        if let Some(credential) = credential {
            if let Err(err) = self.credentials.enroll(&principal.id, credential) {
                if let Err(rollback) = self.directory.remove(&principal.id) {
                    tracing::error!(principal = %principal.id, error = %rollback, "registration rollback failed");
                }
                return Err(err.into());
            }
        }

        let actor = registrar
            .as_ref()
            .map(|p| AuditActor::principal(&p.id, &p.display_name))
            .unwrap_or_else(AuditActor::anonymous);
        self.audit.append(
            NewAuditEntry::new(actor, "Principal registered", AuditCategory::System, Severity::Info)
                .details(format!(
                    "{} ({}) registered as {} with status {}",
                    principal.display_name, principal.handle, principal.role, principal.status
                ))
                .origin(origin),
        )?;
        tracing::info!(principal = %principal.id, role = %principal.role, "principal registered");
        Ok(principal)
    }

    pub fn set_status(
        &self,
        session: &Session,
        id: &PrincipalId,
        status: AccountStatus,
        origin: &str,
    ) -> Result<Principal, IdentityError> {
        let actor = self.require_manager_of(session, id)?;
        let principal = self.directory.set_status(id, status)?;

        let severity = if status == AccountStatus::Suspended {
            Severity::Warn
        } else {
            Severity::Info
        };
        self.audit.append(
            NewAuditEntry::new(
                AuditActor::principal(&actor.id, &actor.display_name),
                "Status changed",
                AuditCategory::Authorization,
                severity,
            )
            .details(format!("{} ({}) is now {status}", principal.display_name, principal.id))
            .origin(origin),
        )?;
        tracing::info!(actor = %actor.id, principal = %id, %status, "status changed");
        Ok(principal)
    }

    /// Assign a store owner's account manager; an empty name clears it.
    pub fn set_account_manager(
        &self,
        session: &Session,
        id: &PrincipalId,
        manager: &str,
        origin: &str,
    ) -> Result<Principal, IdentityError> {
        let actor = self.require_manager_of(session, id)?;
        let principal = self.directory.set_account_manager(id, manager)?;

        let details = match principal.account_manager() {
            Some(name) => format!("{} assigned to account manager {name}", principal.id),
            None => format!("{} account manager cleared", principal.id),
        };
        self.audit.append(
            NewAuditEntry::new(
                AuditActor::principal(&actor.id, &actor.display_name),
                "Account manager assigned",
                AuditCategory::System,
                Severity::Info,
            )
            .details(details)
            .origin(origin),
        )?;
        Ok(principal)
    }

    /// Delete a principal together with its own credential.
    pub fn remove_principal(
        &self,
        session: &Session,
        id: &PrincipalId,
        origin: &str,
    ) -> Result<Principal, IdentityError> {
        let actor = self.require_manager_of(session, id)?;
        let removed = self.directory.remove(id)?;
        self.credentials.revoke(&removed.id)?;

        self.audit.append(
            NewAuditEntry::new(
                AuditActor::principal(&actor.id, &actor.display_name),
                "Principal removed",
                AuditCategory::Security,
                Severity::Warn,
            )
            .details(format!(
                "{} ({}, {}) removed",
                removed.display_name, removed.id, removed.role
            ))
            .origin(origin),
        )?;
        tracing::warn!(actor = %actor.id, principal = %id, "principal removed");
        Ok(removed)
    }

    fn authenticated(session: &Session) -> Result<Principal, IdentityError> {
        session
            .authenticated_principal()
            .ok_or(IdentityError::Unauthenticated)
    }

    /// The session's authenticated principal, if it may manage `target`.
    /// Super-admin records are only managed by super-admins.
    fn require_manager_of(
        &self,
        session: &Session,
        target: &PrincipalId,
    ) -> Result<Principal, IdentityError> {
        let actor = Self::authenticated(session)?;
        authorize(Some(&actor), Capability::ManageWorkforce)?;
        if let Some(existing) = self.directory.find_by_id(target)? {
            if existing.is_super_admin() {
                authorize(Some(&actor), Capability::AppointSuperAdmin)?;
            }
        }
        Ok(actor)
    }
}
