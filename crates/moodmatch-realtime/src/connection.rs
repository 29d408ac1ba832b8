//! Handle to one open transport.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use metrics::counter;
use moodmatch_core::{ConnectionId, OutgoingCommand};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_util::sync::CancellationToken;

use crate::codec;

/// Why the client closed a transport itself.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CloseCause {
    /// The application called `disconnect()`.
    Manual,
    /// No heartbeat ack within the liveness timeout.
    HeartbeatTimeout,
    /// The application called `retry()` or `connect()` over a running loop.
    Restart,
    /// The owning client was dropped.
    Shutdown,
}

impl CloseCause {
    /// Reason text sent in the close frame.
    pub fn reason(self) -> &'static str {
        match self {
            Self::Manual => "Manual disconnect",
            Self::HeartbeatTimeout => "Heartbeat timeout",
            Self::Restart => "Reconnect requested",
            Self::Shutdown => "Client shutdown",
        }
    }
}

/// One open WebSocket, as seen by everything except its reader and writer.
///
/// Sends never block: frames go to a bounded queue drained by the writer task,
/// and a full or closed queue drops the frame.
pub struct Transport {
    id: ConnectionId,
    tx: mpsc::Sender<Message>,
    opened_at: Instant,
    last_ack: Mutex<Instant>,
    close_cause: Mutex<Option<CloseCause>>,
    cancel: CancellationToken,
    dropped_frames: AtomicU64,
}

impl Transport {
    /// Wrap the writer queue of a freshly opened socket.
    pub fn new(id: ConnectionId, tx: mpsc::Sender<Message>, cancel: CancellationToken) -> Self {
        let now = Instant::now();
        Self {
            id,
            tx,
            opened_at: now,
            last_ack: Mutex::new(now),
            close_cause: Mutex::new(None),
            cancel,
            dropped_frames: AtomicU64::new(0),
        }
    }

    /// Connection ID for logs.
    pub fn id(&self) -> &ConnectionId {
        &self.id
    }

    /// Queue a command. Returns `false` if it was dropped.
    pub fn send_command(&self, command: &OutgoingCommand) -> bool {
        self.send_text(codec::encode(command))
    }

    /// Queue a raw text frame. Returns `false` if it was dropped.
    pub fn send_text(&self, text: String) -> bool {
        if self.is_closed() {
            return false;
        }
        if self.tx.try_send(Message::Text(text.into())).is_ok() {
            true
        } else {
            let _ = self.dropped_frames.fetch_add(1, Ordering::Relaxed);
            counter!("realtime_frames_dropped_total").increment(1);
            false
        }
    }

    /// Total frames dropped because the queue was full or closed.
    pub fn drop_count(&self) -> u64 {
        self.dropped_frames.load(Ordering::Relaxed)
    }

    /// Record a heartbeat ack.
    pub fn mark_ack(&self) {
        *self.last_ack.lock() = Instant::now();
    }

    /// Time since the last ack, or since open if none arrived yet.
    pub fn since_last_ack(&self) -> Duration {
        self.last_ack.lock().elapsed()
    }

    /// Time since open.
    pub fn age(&self) -> Duration {
        self.opened_at.elapsed()
    }

    /// Send a normal-closure frame with the cause's reason and stop the
    /// session. Only the first call has any effect.
    pub fn close(&self, cause: CloseCause) {
        {
            let mut slot = self.close_cause.lock();
            if slot.is_some() || self.cancel.is_cancelled() {
                return;
            }
            *slot = Some(cause);
        }
        let frame = CloseFrame {
            code: CloseCode::Normal,
            reason: String::from(cause.reason()).into(),
        };
        if self.tx.try_send(Message::Close(Some(frame))).is_err() {
            tracing::debug!(connection_id = %self.id, "close frame not queued");
        }
        self.cancel.cancel();
    }

    /// Stop the session without sending a close frame.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    /// Whether the transport has been closed or shut down.
    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// The cause passed to [`close`](Self::close), if any.
    pub fn close_cause(&self) -> Option<CloseCause> {
        *self.close_cause.lock()
    }

    /// Resolves once the transport is closed or its owner is cancelled.
    pub async fn closed(&self) {
        self.cancel.cancelled().await;
    }
}
