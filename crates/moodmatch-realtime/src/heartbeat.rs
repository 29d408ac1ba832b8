//! Application-level heartbeat and liveness check.
//!
//! While a session is connected, a `heartbeat` command goes out every
//! interval (the first one immediately). Each `heartbeat_ack` the reader sees
//! refreshes the transport's ack clock. If the clock shows more than the
//! timeout at a tick, the link is declared dead.

use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use moodmatch_core::{ConnectionState, DomainEvent, OutgoingCommand, error_codes};
use tokio::time;
use tracing::{debug, warn};

use crate::connection::{CloseCause, Transport};
use crate::shared::Shared;

/// User-facing message for a liveness timeout.
pub const HEARTBEAT_TIMEOUT_MESSAGE: &str = "Connection lost (heartbeat timeout).";

/// Outcome of the heartbeat loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeartbeatResult {
    /// No ack within the timeout; the transport was closed.
    TimedOut,
    /// The transport was closed by someone else.
    Cancelled,
    /// Connection state left `Connected`.
    Stopped,
}

/// Run heartbeats for `transport` until it dies or is closed.
///
/// On timeout this emits a `HEARTBEAT_TIMEOUT` error, closes the transport,
/// clears it from the active slot, and publishes `Disconnected`.
pub(crate) async fn run_heartbeat(
    transport: Arc<Transport>,
    shared: Arc<Shared>,
    interval: Duration,
    timeout: Duration,
) -> HeartbeatResult {
    loop {
        if transport.is_closed() {
            return HeartbeatResult::Cancelled;
        }
        if shared.state() != ConnectionState::Connected {
            return HeartbeatResult::Stopped;
        }

        let silent_for = transport.since_last_ack();
        if silent_for > timeout {
            #[allow(clippy::cast_possible_truncation)]
            let silent_ms = silent_for.as_millis() as u64;
            warn!(connection_id = %transport.id(), silent_ms, "no heartbeat ack, closing transport");
            counter!("realtime_heartbeat_timeouts_total").increment(1);
            shared.emit(DomainEvent::error(
                error_codes::HEARTBEAT_TIMEOUT,
                HEARTBEAT_TIMEOUT_MESSAGE,
            ));
            transport.close(CloseCause::HeartbeatTimeout);
            let _ = shared.detach(&transport);
            shared.set_state(ConnectionState::Disconnected);
            return HeartbeatResult::TimedOut;
        }

        if !transport.send_command(&OutgoingCommand::SendHeartbeat) {
            debug!(connection_id = %transport.id(), "heartbeat dropped");
        }

        tokio::select! {
            () = time::sleep(interval) => {}
            () = transport.closed() => return HeartbeatResult::Cancelled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use moodmatch_core::ConnectionId;
    use tokio::sync::mpsc;
    use tokio_tungstenite::tungstenite::Message;
    use tokio_util::sync::CancellationToken;

    const INTERVAL: Duration = Duration::from_secs(25);
    const TIMEOUT: Duration = Duration::from_secs(60);

    fn connected() -> (Arc<Shared>, Arc<Transport>, mpsc::Receiver<Message>) {
        let shared = Arc::new(Shared::new(16));
        let (tx, rx) = mpsc::channel(64);
        let transport = Arc::new(Transport::new(ConnectionId::new(), tx, CancellationToken::new()));
        shared.attach(transport.clone());
        shared.set_state(ConnectionState::Connected);
        (shared, transport, rx)
    }

    fn is_heartbeat(frame: &Message) -> bool {
        match frame {
            Message::Text(text) => {
                let value: serde_json::Value = serde_json::from_str(text.as_str()).unwrap();
                value["type"] == "heartbeat"
            }
            _ => false,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn first_heartbeat_is_immediate() {
        let (shared, transport, mut rx) = connected();
        let start = time::Instant::now();
        let handle = tokio::spawn(run_heartbeat(transport.clone(), shared, INTERVAL, TIMEOUT));

        let first = rx.recv().await.unwrap();
        assert!(is_heartbeat(&first));
        assert_eq!(start.elapsed(), Duration::ZERO);

        transport.mark_ack();
        let second = rx.recv().await.unwrap();
        assert!(is_heartbeat(&second));
        assert_eq!(start.elapsed(), INTERVAL);

        transport.shutdown();
        assert_eq!(handle.await.unwrap(), HeartbeatResult::Cancelled);
    }

    #[tokio::test(start_paused = true)]
    async fn silence_times_out_at_first_tick_past_deadline() {
        let (shared, transport, _rx) = connected();
        let mut events = shared.subscribe();
        let start = time::Instant::now();

        let result = run_heartbeat(transport.clone(), shared.clone(), INTERVAL, TIMEOUT).await;

        assert_eq!(result, HeartbeatResult::TimedOut);
        // Ticks at 0, 25, 50, 75 seconds; 75 is the first past 60.
        assert_eq!(start.elapsed(), Duration::from_secs(75));
        assert_eq!(
            events.recv().await.unwrap(),
            DomainEvent::error(error_codes::HEARTBEAT_TIMEOUT, HEARTBEAT_TIMEOUT_MESSAGE)
        );
        assert_eq!(shared.state(), ConnectionState::Disconnected);
        assert!(shared.active().is_none());
        assert_eq!(transport.close_cause(), Some(CloseCause::HeartbeatTimeout));
    }

    #[tokio::test(start_paused = true)]
    async fn acks_keep_link_alive() {
        let (shared, transport, mut rx) = connected();
        let acker = transport.clone();
        let _drain = tokio::spawn(async move {
            while let Some(frame) = rx.recv().await {
                if is_heartbeat(&frame) {
                    acker.mark_ack();
                }
            }
        });

        let heartbeat = run_heartbeat(transport.clone(), shared.clone(), INTERVAL, TIMEOUT);
        tokio::select! {
            result = heartbeat => panic!("heartbeat ended early: {result:?}"),
            () = time::sleep(Duration::from_secs(600)) => {}
        }
        assert_eq!(shared.state(), ConnectionState::Connected);
        assert!(!transport.is_closed());
    }

    #[tokio::test(start_paused = true)]
    async fn stops_when_state_changes() {
        let (shared, transport, _rx) = connected();
        let handle = tokio::spawn(run_heartbeat(
            transport.clone(),
            shared.clone(),
            INTERVAL,
            TIMEOUT,
        ));
        tokio::task::yield_now().await;
        shared.set_state(ConnectionState::Reconnecting);
        assert_eq!(handle.await.unwrap(), HeartbeatResult::Stopped);
        assert!(!transport.is_closed());
    }

    #[tokio::test(start_paused = true)]
    async fn closed_transport_cancels_promptly() {
        let (shared, transport, _rx) = connected();
        let handle = tokio::spawn(run_heartbeat(
            transport.clone(),
            shared.clone(),
            INTERVAL,
            TIMEOUT,
        ));
        tokio::task::yield_now().await;
        let start = time::Instant::now();
        transport.close(CloseCause::Manual);
        assert_eq!(handle.await.unwrap(), HeartbeatResult::Cancelled);
        assert!(start.elapsed() < INTERVAL);
        assert_eq!(shared.state(), ConnectionState::Connected);
    }
}
