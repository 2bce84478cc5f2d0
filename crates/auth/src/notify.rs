//! Session-change notifications.
//!
//! Anything rendering per-principal views subscribes here instead of polling
//! the session: every login, logout and impersonation transition publishes one
//! [`SessionEvent`] after the session has changed.

use std::sync::{Mutex, mpsc};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use storegate_core::{PrincipalId, SessionId};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionEventKind {
    LoggedIn,
    LoggedOut,
    ImpersonationStarted,
    ImpersonationStopped,
}

/// A session changed; `principal_id` is the effective principal afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionEvent {
    pub session_id: SessionId,
    pub kind: SessionEventKind,
    pub principal_id: Option<PrincipalId>,
    pub occurred_at: DateTime<Utc>,
}

/// Receiving end of a notifier subscription.
#[derive(Debug)]
pub struct Subscription<M> {
    receiver: mpsc::Receiver<M>,
}

impl<M> Subscription<M> {
    /// Block until the next message is available.
    pub fn recv(&self) -> Result<M, mpsc::RecvError> {
        self.receiver.recv()
    }

    pub fn try_recv(&self) -> Result<M, mpsc::TryRecvError> {
        self.receiver.try_recv()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Result<M, mpsc::RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }

    /// Everything already delivered, without blocking.
    pub fn drain(&self) -> Vec<M> {
        self.receiver.try_iter().collect()
    }
}

/// Push-style receiver run inline on publish. Returning `false` detaches it.
///
/// Sinks run on the publishing thread and must not block.
pub type EventSink = Box<dyn Fn(&SessionEvent) -> bool + Send + Sync>;

/// In-process fan-out of session events.
///
/// Delivery is best-effort: a dropped subscription is pruned on the next
/// publish and never blocks the session transition that produced the event.
#[derive(Default)]
pub struct SessionNotifier {
    subscribers: Mutex<Vec<mpsc::Sender<SessionEvent>>>,
    sinks: Mutex<Vec<EventSink>>,
}

impl core::fmt::Debug for SessionNotifier {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SessionNotifier")
            .field("subscribers", &self.subscriber_count())
            .field("sinks", &self.sinks.lock().map(|s| s.len()).unwrap_or(0))
            .finish()
    }
}

impl SessionNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> Subscription<SessionEvent> {
        let (tx, rx) = mpsc::channel();
        match self.subscribers.lock() {
            Ok(mut subs) => subs.push(tx),
            Err(_) => tracing::warn!("session notifier poisoned; subscription will stay idle"),
        }
        Subscription { receiver: rx }
    }

    /// Deliver every event to `sink` on the publishing thread.
    pub fn attach(&self, sink: EventSink) {
        match self.sinks.lock() {
            Ok(mut sinks) => sinks.push(sink),
            Err(_) => tracing::warn!("session notifier poisoned; sink not attached"),
        }
    }

    pub fn publish(&self, event: SessionEvent) {
        match self.sinks.lock() {
            Ok(mut sinks) => sinks.retain(|sink| sink(&event)),
            Err(_) => tracing::warn!(kind = ?event.kind, "session notifier poisoned; sinks skipped"),
        }
        let Ok(mut subs) = self.subscribers.lock() else {
            tracing::warn!(kind = ?event.kind, "session notifier poisoned; event dropped");
            return;
        };
        subs.retain(|tx| tx.send(event.clone()).is_ok());
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().map(|s| s.len()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(kind: SessionEventKind) -> SessionEvent {
        SessionEvent {
            session_id: SessionId::new(),
            kind,
            principal_id: Some("u1".into()),
            occurred_at: Utc::now(),
        }
    }

    #[test]
    fn every_subscriber_receives_each_event() {
        let notifier = SessionNotifier::new();
        let a = notifier.subscribe();
        let b = notifier.subscribe();

        notifier.publish(event(SessionEventKind::LoggedIn));

        assert_eq!(a.try_recv().unwrap().kind, SessionEventKind::LoggedIn);
        assert_eq!(b.try_recv().unwrap().kind, SessionEventKind::LoggedIn);
    }

    #[test]
    fn dropped_subscribers_are_pruned() {
        let notifier = SessionNotifier::new();
        let kept = notifier.subscribe();
        drop(notifier.subscribe());
        assert_eq!(notifier.subscriber_count(), 2);

        notifier.publish(event(SessionEventKind::LoggedOut));
        assert_eq!(notifier.subscriber_count(), 1);
        assert_eq!(kept.drain().len(), 1);
    }

    #[test]
    fn sinks_run_inline_until_they_detach() {
        use std::sync::Arc;
        use std::sync::atomic::{AtomicUsize, Ordering};

        let notifier = SessionNotifier::new();
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = seen.clone();
        notifier.attach(Box::new(move |_| counter.fetch_add(1, Ordering::SeqCst) < 1));

        notifier.publish(event(SessionEventKind::LoggedIn));
        notifier.publish(event(SessionEventKind::LoggedOut));
        notifier.publish(event(SessionEventKind::LoggedIn));
        assert_eq!(seen.load(Ordering::SeqCst), 2);
    }
}
