//! Service wiring for the HTTP layer.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::response::sse::{Event as SseEvent, KeepAlive, Sse};
use tokio::sync::broadcast;
use tokio_stream::{StreamExt, wrappers::BroadcastStream};

use storegate_auth::{IdentityError, IdentityService, SecurityPolicy, SessionEvent, SessionRegistry};
use storegate_core::{Clock, SessionId, SystemClock};

/// Everything a handler needs.
pub struct AppServices {
    pub identity: Arc<IdentityService>,
    pub sessions: Arc<SessionRegistry>,
    events_tx: broadcast::Sender<SessionEvent>,
}

impl AppServices {
    pub fn events_tx(&self) -> &broadcast::Sender<SessionEvent> {
        &self.events_tx
    }
}

/// Seeded in-memory identity service on the system clock.
pub fn build_services(policy: SecurityPolicy) -> Result<AppServices, IdentityError> {
    build_services_with_clock(policy, Arc::new(SystemClock))
}

pub fn build_services_with_clock(
    policy: SecurityPolicy,
    clock: Arc<dyn Clock>,
) -> Result<AppServices, IdentityError> {
    let identity = Arc::new(IdentityService::in_memory(policy, clock)?);
    let sessions = Arc::new(identity.session_registry());

    // Forward session events onto a lossy broadcast for SSE subscribers. A
    // send with no live receivers is not an error here.
    let (events_tx, _events_rx) = broadcast::channel::<SessionEvent>(256);
    let forward_tx = events_tx.clone();
    identity.forward_events(move |event| {
        let _ = forward_tx.send(event.clone());
        true
    });

    Ok(AppServices {
        identity,
        sessions,
        events_tx,
    })
}

/// SSE stream of one session's change notifications (used by `/events`).
pub fn session_sse_stream(
    services: Arc<AppServices>,
    session_id: SessionId,
) -> Sse<impl tokio_stream::Stream<Item = Result<SseEvent, Infallible>>> {
    let rx = services.events_tx().subscribe();
    let stream = BroadcastStream::new(rx).filter_map(move |msg| match msg {
        Ok(event) if event.session_id == session_id => {
            let data = serde_json::to_string(&event).unwrap_or_else(|_| "{}".to_string());
            let topic = serde_json::to_value(event.kind)
                .ok()
                .and_then(|v| v.as_str().map(str::to_string))
                .unwrap_or_else(|| "session".to_string());
            Some(Ok(SseEvent::default().event(topic).data(data)))
        }
        _ => None,
    });

    Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)))
}
