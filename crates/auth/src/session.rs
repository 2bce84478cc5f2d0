//! Session manager.
//!
//! A [`Session`] belongs to one connection or bearer token. It holds the
//! current principal and, while an impersonation is active, the original
//! principal beneath it (never more than one level deep). Sessions are passed
//! explicitly to every operation; there is no process-wide current user.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use storegate_core::{Clock, SessionId, StoreError};

use crate::notify::{SessionEvent, SessionEventKind, SessionNotifier};
use crate::principal::Principal;

/// Where a session sits in the authentication state machine.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Unauthenticated,
    Authenticated,
    Impersonating,
}

/// The mutable part of a session.
///
/// Invariant: `original` is `Some` only while `current` is `Some`.
#[derive(Debug, Clone)]
pub(crate) struct SessionSlots {
    pub(crate) current: Option<Principal>,
    pub(crate) original: Option<Principal>,
    last_seen: DateTime<Utc>,
}

impl SessionSlots {
    pub(crate) fn authenticated(&self) -> Option<&Principal> {
        self.original.as_ref().or(self.current.as_ref())
    }

    /// Install `principal` as current with no original beneath it.
    pub(crate) fn set_current(&mut self, principal: Principal) {
        self.current = Some(principal);
        self.original = None;
    }

    /// Drop both slots, returning the authenticated principal if there was one.
    pub(crate) fn clear(&mut self) -> Option<Principal> {
        let authenticated = self.original.take().or_else(|| self.current.take());
        self.current = None;
        authenticated
    }
}

/// Cloneable handle to one session's state.
#[derive(Debug, Clone)]
pub struct Session {
    id: SessionId,
    slots: Arc<Mutex<SessionSlots>>,
    notifier: Option<Arc<SessionNotifier>>,
}

impl Session {
    pub fn new() -> Self {
        Self::opened_at(Utc::now())
    }

    pub(crate) fn opened_at(now: DateTime<Utc>) -> Self {
        Self {
            id: SessionId::random(),
            slots: Arc::new(Mutex::new(SessionSlots {
                current: None,
                original: None,
                last_seen: now,
            })),
            notifier: None,
        }
    }

    /// Publish this session's transitions to `notifier`.
    pub fn with_notifier(mut self, notifier: Arc<SessionNotifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    // Every write is a plain field assignment, so a poisoned guard still holds
    // a coherent state.
    fn slots(&self) -> MutexGuard<'_, SessionSlots> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The effective acting principal: the impersonated target while an
    /// impersonation is active, otherwise the authenticated principal.
    pub fn current(&self) -> Option<Principal> {
        self.slots().current.clone()
    }

    pub fn is_impersonating(&self) -> bool {
        self.slots().original.is_some()
    }

    /// The principal that actually authenticated this session.
    pub fn authenticated_principal(&self) -> Option<Principal> {
        self.slots().authenticated().cloned()
    }

    pub fn state(&self) -> SessionState {
        let slots = self.slots();
        match (&slots.current, &slots.original) {
            (None, _) => SessionState::Unauthenticated,
            (Some(_), None) => SessionState::Authenticated,
            (Some(_), Some(_)) => SessionState::Impersonating,
        }
    }

    #[cfg(test)]
    pub(crate) fn set_current(&self, principal: Principal) {
        self.slots().set_current(principal);
    }

    #[cfg(test)]
    pub(crate) fn clear(&self) -> Option<Principal> {
        self.slots().clear()
    }

    /// Run a check-then-mutate transition with the session locked throughout.
    pub(crate) fn transition<T, E>(
        &self,
        f: impl FnOnce(&mut SessionSlots) -> Result<T, E>,
    ) -> Result<T, E> {
        let mut slots = self.slots();
        f(&mut slots)
    }

    pub(crate) fn notify(&self, kind: SessionEventKind, at: DateTime<Utc>) {
        if let Some(notifier) = &self.notifier {
            notifier.publish(SessionEvent {
                session_id: self.id,
                kind,
                principal_id: self.current().map(|p| p.id),
                occurred_at: at,
            });
        }
    }

    fn idle_since(&self) -> DateTime<Utc> {
        self.slots().last_seen
    }

    fn touch(&self, now: DateTime<Utc>) {
        self.slots().last_seen = now;
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

/// Maps bearer tokens to live sessions and expires idle ones on access.
pub struct SessionRegistry {
    sessions: RwLock<HashMap<SessionId, Session>>,
    clock: Arc<dyn Clock>,
    idle_timeout: Duration,
    notifier: Option<Arc<SessionNotifier>>,
}

impl core::fmt::Debug for SessionRegistry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SessionRegistry")
            .field("idle_timeout", &self.idle_timeout)
            .finish_non_exhaustive()
    }
}

impl SessionRegistry {
    pub fn new(clock: Arc<dyn Clock>, idle_timeout: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            clock,
            idle_timeout,
            notifier: None,
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<SessionNotifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    fn is_expired(&self, session: &Session, now: DateTime<Utc>) -> bool {
        now - session.idle_since() > self.idle_timeout
    }

    /// Open a fresh, unauthenticated session.
    pub fn open(&self) -> Result<Session, StoreError> {
        let mut session = Session::opened_at(self.clock.now());
        if let Some(notifier) = &self.notifier {
            session = session.with_notifier(notifier.clone());
        }
        self.sessions
            .write()
            .map_err(|_| StoreError::Poisoned("session"))?
            .insert(session.id(), session.clone());
        Ok(session)
    }

    /// Resolve a token, refreshing its idle timer. Expired sessions are dropped.
    pub fn get(&self, id: SessionId) -> Result<Option<Session>, StoreError> {
        let now = self.clock.now();
        let mut sessions = self
            .sessions
            .write()
            .map_err(|_| StoreError::Poisoned("session"))?;

        let Some(session) = sessions.get(&id).cloned() else {
            return Ok(None);
        };
        if self.is_expired(&session, now) {
            sessions.remove(&id);
            tracing::info!(session = %id, "session expired");
            return Ok(None);
        }
        session.touch(now);
        Ok(Some(session))
    }

    pub fn close(&self, id: SessionId) -> Result<Option<Session>, StoreError> {
        Ok(self
            .sessions
            .write()
            .map_err(|_| StoreError::Poisoned("session"))?
            .remove(&id))
    }

    /// Drop every idle session; returns how many were removed.
    pub fn purge_expired(&self) -> Result<usize, StoreError> {
        let now = self.clock.now();
        let mut sessions = self
            .sessions
            .write()
            .map_err(|_| StoreError::Poisoned("session"))?;
        let before = sessions.len();
        sessions.retain(|_, s| !self.is_expired(s, now));
        Ok(before - sessions.len())
    }

    pub fn len(&self) -> Result<usize, StoreError> {
        Ok(self
            .sessions
            .read()
            .map_err(|_| StoreError::Poisoned("session"))?
            .len())
    }

    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len()? == 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::principal::Role;
    use storegate_core::ManualClock;

    fn principal(id: &str, role: Role) -> Principal {
        Principal::new(id.into(), id, id, format!("{id}@x.io"), role)
    }

    #[test]
    fn new_session_is_unauthenticated() {
        let s = Session::new();
        assert!(s.current().is_none());
        assert!(!s.is_impersonating());
        assert_eq!(s.state(), SessionState::Unauthenticated);
    }

    #[test]
    fn set_current_and_clear() {
        let s = Session::new();
        s.set_current(principal("u1", Role::SuperAdmin));
        assert_eq!(s.state(), SessionState::Authenticated);
        assert_eq!(s.current().unwrap().id.as_str(), "u1");

        let cleared = s.clear().unwrap();
        assert_eq!(cleared.id.as_str(), "u1");
        assert!(s.current().is_none());
        assert!(s.clear().is_none());
    }

    #[test]
    fn clear_returns_original_while_impersonating() {
        let s = Session::new();
        s.set_current(principal("u1", Role::SuperAdmin));
        s.transition::<(), ()>(|slots| {
            slots.original = slots.current.take();
            slots.current = Some(principal("u6", Role::Customer));
            Ok(())
        })
        .unwrap();

        assert_eq!(s.state(), SessionState::Impersonating);
        assert_eq!(s.authenticated_principal().unwrap().id.as_str(), "u1");
        assert_eq!(s.clear().unwrap().id.as_str(), "u1");
        assert!(!s.is_impersonating());
    }

    #[test]
    fn clones_share_state() {
        let a = Session::new();
        let b = a.clone();
        a.set_current(principal("u3", Role::StaffAdmin));
        assert_eq!(b.current().unwrap().id.as_str(), "u3");
        assert_eq!(a.id(), b.id());
    }

    #[test]
    fn separate_sessions_never_share_state() {
        let a = Session::new();
        let b = Session::new();
        a.set_current(principal("u3", Role::StaffAdmin));
        assert!(b.current().is_none());
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn registry_expires_idle_sessions() {
        let clock = Arc::new(ManualClock::starting_now());
        let registry = SessionRegistry::new(clock.clone(), Duration::minutes(30));

        let s = registry.open().unwrap();
        clock.advance(Duration::minutes(20));
        assert!(registry.get(s.id()).unwrap().is_some());

        // Access refreshed the idle timer.
        clock.advance(Duration::minutes(20));
        assert!(registry.get(s.id()).unwrap().is_some());

        clock.advance(Duration::minutes(31));
        assert!(registry.get(s.id()).unwrap().is_none());
        assert!(registry.is_empty().unwrap());
    }

    #[test]
    fn registry_close_and_purge() {
        let clock = Arc::new(ManualClock::starting_now());
        let registry = SessionRegistry::new(clock.clone(), Duration::minutes(5));

        let a = registry.open().unwrap();
        let _b = registry.open().unwrap();
        assert_eq!(registry.len().unwrap(), 2);

        assert!(registry.close(a.id()).unwrap().is_some());
        assert!(registry.get(a.id()).unwrap().is_none());

        clock.advance(Duration::minutes(6));
        assert_eq!(registry.purge_expired().unwrap(), 1);
        assert_eq!(registry.len().unwrap(), 0);
    }
}
