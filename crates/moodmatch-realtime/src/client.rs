//! Client facade.
//!
//! [`MoodMatchClient`] is the only type the application talks to. It owns the
//! event fan-out, the connection-state watch, and at most one supervisor run.
//! `connect`, `disconnect`, and `retry` serialize on the supervisor slot, and
//! each waits for the previous run to finish before starting the next, so two
//! loops never overlap.

use std::sync::Arc;

use futures::Stream;
use moodmatch_auth::TokenProvider;
use moodmatch_core::{ConnectionState, DomainEvent, OutgoingCommand};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, broadcast, watch};
use tokio::task::JoinHandle;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::{BroadcastStream, WatchStream};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, info_span, warn};

use crate::config::ClientConfig;
use crate::connection::CloseCause;
use crate::shared::Shared;
use crate::supervisor::{Supervisor, SupervisorExit};

/// Who is connecting, and for what.
///
/// Only used to label logs; the server identifies the user by token.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectContext {
    /// User ID the token was issued to.
    pub user_id: String,
    /// Display name.
    pub nickname: String,
    /// Mood the user intends to queue for.
    pub mood: String,
    /// Avatar, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

struct SupervisorHandle {
    cancel: CancellationToken,
    task: JoinHandle<SupervisorExit>,
}

impl SupervisorHandle {
    async fn stop(self) {
        self.cancel.cancel();
        match self.task.await {
            Ok(exit) => debug!(?exit, "previous supervisor finished"),
            Err(e) => warn!(error = %e, "supervisor task failed"),
        }
    }
}

/// Realtime connection manager for one signed-in user.
///
/// Must be created inside a Tokio runtime. Dropping the client cancels any
/// running supervisor and closes the active transport.
pub struct MoodMatchClient {
    shared: Arc<Shared>,
    config: Arc<ClientConfig>,
    tokens: Arc<dyn TokenProvider>,
    context: parking_lot::Mutex<ConnectContext>,
    supervisor: Mutex<Option<SupervisorHandle>>,
}

impl MoodMatchClient {
    /// Create a disconnected client.
    pub fn new(config: ClientConfig, tokens: Arc<dyn TokenProvider>) -> Self {
        Self {
            shared: Arc::new(Shared::new(config.event_buffer_capacity)),
            config: Arc::new(config),
            tokens,
            context: parking_lot::Mutex::new(ConnectContext::default()),
            supervisor: Mutex::new(None),
        }
    }

    /// Configuration this client runs with.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    // ── Observation ─────────────────────────────────────────────────

    /// Subscribe to events. Each subscriber sees every event emitted after
    /// it subscribed, unless it falls more than the buffer capacity behind,
    /// in which case the oldest are dropped.
    pub fn subscribe(&self) -> broadcast::Receiver<DomainEvent> {
        self.shared.subscribe()
    }

    /// Events as a stream. Lag is logged and skipped.
    pub fn events(&self) -> impl Stream<Item = DomainEvent> + Send + 'static {
        BroadcastStream::new(self.shared.subscribe()).filter_map(|item| match item {
            Ok(event) => Some(event),
            Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                warn!(skipped, "event subscriber lagged, oldest events dropped");
                None
            }
        })
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        self.shared.state()
    }

    /// Watch the connection state. The receiver starts at the current value.
    pub fn connection_state(&self) -> watch::Receiver<ConnectionState> {
        self.shared.watch_state()
    }

    /// Connection state as a stream, starting with the current value.
    pub fn state_stream(&self) -> WatchStream<ConnectionState> {
        WatchStream::new(self.shared.watch_state())
    }

    // ── Control ─────────────────────────────────────────────────────

    /// Start connecting. No-op while `Connected` or `Connecting`.
    ///
    /// From `Disconnected` or `Reconnecting` this clears the manual-disconnect
    /// flag and starts a fresh supervisor run from attempt 0, replacing any
    /// run that was backing off.
    pub async fn connect(&self, context: ConnectContext) {
        let mut slot = self.supervisor.lock().await;
        let state = self.shared.state();
        if state.is_active() {
            debug!(%state, "connect ignored, already active");
            return;
        }
        *self.context.lock() = context;
        self.shared.set_manual_disconnect(false);
        if let Some(previous) = slot.take() {
            previous.stop().await;
        }
        self.shared.set_state(ConnectionState::Connecting);
        *slot = Some(self.spawn_supervisor());
    }

    /// Queue a command on the active transport.
    ///
    /// Never blocks and never fails loudly: returns `false` (and logs) when
    /// there is no open transport or its outbound queue is full.
    pub fn send(&self, command: &OutgoingCommand) -> bool {
        let Some(transport) = self.shared.active() else {
            debug!(kind = command.kind(), "no active transport, command dropped");
            metrics::counter!("realtime_commands_dropped_total").increment(1);
            return false;
        };
        let sent = transport.send_command(command);
        if !sent {
            debug!(kind = command.kind(), connection_id = %transport.id(), "command dropped");
            metrics::counter!("realtime_commands_dropped_total").increment(1);
        }
        sent
    }

    /// Close the connection and stop reconnecting until the next
    /// [`connect`](Self::connect) or [`retry`](Self::retry).
    ///
    /// Emits exactly one `ConnectionClosed` and leaves the state
    /// `Disconnected`.
    pub async fn disconnect(&self) {
        let mut slot = self.supervisor.lock().await;
        self.shared.set_manual_disconnect(true);
        if let Some(transport) = self.shared.active() {
            transport.close(CloseCause::Manual);
        }
        if let Some(previous) = slot.take() {
            previous.stop().await;
        }
        self.shared.set_state(ConnectionState::Disconnected);
        self.shared.emit(DomainEvent::ConnectionClosed);
        info!("disconnected");
    }

    /// Drop whatever is running and start a fresh supervisor run from
    /// attempt 0, with the context of the last `connect`.
    pub async fn retry(&self) {
        let mut slot = self.supervisor.lock().await;
        self.shared.set_manual_disconnect(false);
        if let Some(transport) = self.shared.active() {
            transport.close(CloseCause::Restart);
        }
        if let Some(previous) = slot.take() {
            previous.stop().await;
        }
        self.shared.set_state(ConnectionState::Connecting);
        *slot = Some(self.spawn_supervisor());
        info!("retrying connection");
    }

    fn spawn_supervisor(&self) -> SupervisorHandle {
        let cancel = CancellationToken::new();
        let context = self.context.lock().clone();
        let span = info_span!(
            "supervisor",
            user_id = %context.user_id,
            nickname = %context.nickname,
            mood = %context.mood,
        );
        let supervisor = Supervisor {
            shared: self.shared.clone(),
            config: self.config.clone(),
            tokens: self.tokens.clone(),
            cancel: cancel.clone(),
        };
        let task = tokio::spawn(supervisor.run().instrument(span));
        SupervisorHandle { cancel, task }
    }
}

impl Drop for MoodMatchClient {
    fn drop(&mut self) {
        if let Some(handle) = self.supervisor.get_mut().take() {
            handle.cancel.cancel();
        }
        if let Some(transport) = self.shared.active() {
            transport.close(CloseCause::Shutdown);
        }
    }
}
