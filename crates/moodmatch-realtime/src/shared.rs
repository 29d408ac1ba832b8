//! State shared by the client facade, the supervisor, and sessions.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use moodmatch_core::{ConnectionState, DomainEvent};
use parking_lot::Mutex;
use tokio::sync::{broadcast, watch};
use tracing::{debug, trace};

use crate::connection::Transport;

pub(crate) struct Shared {
    events: broadcast::Sender<DomainEvent>,
    state: watch::Sender<ConnectionState>,
    /// The transport commands are routed to. At most one at a time.
    active: Mutex<Option<Arc<Transport>>>,
    manual_disconnect: AtomicBool,
}

impl Shared {
    pub(crate) fn new(event_capacity: usize) -> Self {
        let (events, _) = broadcast::channel(event_capacity.max(1));
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            events,
            state,
            active: Mutex::new(None),
            manual_disconnect: AtomicBool::new(false),
        }
    }

    // ── Events ──────────────────────────────────────────────────────

    pub(crate) fn emit(&self, event: DomainEvent) {
        trace!(kind = event.kind(), "emit");
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    pub(crate) fn subscribe(&self) -> broadcast::Receiver<DomainEvent> {
        self.events.subscribe()
    }

    // ── Connection state ────────────────────────────────────────────

    pub(crate) fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Publish `next`. Watchers are only woken on an actual change.
    pub(crate) fn set_state(&self, next: ConnectionState) {
        let changed = self.state.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
        if changed {
            debug!(state = %next, "connection state changed");
        }
    }

    pub(crate) fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    // ── Active transport ────────────────────────────────────────────

    pub(crate) fn attach(&self, transport: Arc<Transport>) {
        *self.active.lock() = Some(transport);
    }

    /// Clear the slot if it still holds `transport`.
    pub(crate) fn detach(&self, transport: &Arc<Transport>) -> bool {
        let mut slot = self.active.lock();
        if slot.as_ref().is_some_and(|t| Arc::ptr_eq(t, transport)) {
            *slot = None;
            true
        } else {
            false
        }
    }

    pub(crate) fn active(&self) -> Option<Arc<Transport>> {
        self.active.lock().clone()
    }

    // ── Manual disconnect flag ──────────────────────────────────────

    pub(crate) fn is_manual_disconnect(&self) -> bool {
        self.manual_disconnect.load(Ordering::SeqCst)
    }

    pub(crate) fn set_manual_disconnect(&self, value: bool) {
        self.manual_disconnect.store(value, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use moodmatch_core::ConnectionId;
    use tokio::sync::mpsc;
    use tokio_util::sync::CancellationToken;

    fn transport() -> Arc<Transport> {
        let (tx, _rx) = mpsc::channel(1);
        Arc::new(Transport::new(ConnectionId::new(), tx, CancellationToken::new()))
    }

    #[test]
    fn starts_disconnected() {
        let shared = Shared::new(8);
        assert_eq!(shared.state(), ConnectionState::Disconnected);
        assert!(shared.active().is_none());
        assert!(!shared.is_manual_disconnect());
    }

    #[tokio::test]
    async fn repeated_state_does_not_wake_watchers() {
        let shared = Shared::new(8);
        let mut rx = shared.watch_state();
        shared.set_state(ConnectionState::Disconnected);
        assert!(!rx.has_changed().unwrap());
        shared.set_state(ConnectionState::Connecting);
        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), ConnectionState::Connecting);
    }

    #[test]
    fn detach_only_clears_own_transport() {
        let shared = Shared::new(8);
        let first = transport();
        let second = transport();
        shared.attach(second.clone());
        assert!(!shared.detach(&first));
        assert!(shared.active().is_some());
        assert!(shared.detach(&second));
        assert!(shared.active().is_none());
    }

    #[tokio::test]
    async fn emit_reaches_every_subscriber() {
        let shared = Shared::new(8);
        let mut a = shared.subscribe();
        let mut b = shared.subscribe();
        shared.emit(DomainEvent::QueueLeft);
        assert_eq!(a.recv().await.unwrap(), DomainEvent::QueueLeft);
        assert_eq!(b.recv().await.unwrap(), DomainEvent::QueueLeft);
    }

    #[test]
    fn emit_without_subscribers_is_fine() {
        let shared = Shared::new(8);
        shared.emit(DomainEvent::ConnectionOpened);
    }

    #[tokio::test]
    async fn slow_subscriber_loses_oldest() {
        let shared = Shared::new(2);
        let mut rx = shared.subscribe();
        for room in ["a", "b", "c"] {
            shared.emit(DomainEvent::PartnerLeft {
                room_id: room.into(),
            });
        }
        assert!(matches!(
            rx.recv().await,
            Err(broadcast::error::RecvError::Lagged(1))
        ));
        assert_eq!(
            rx.recv().await.unwrap(),
            DomainEvent::PartnerLeft {
                room_id: "b".into()
            }
        );
    }
}
