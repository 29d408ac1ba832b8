//! Reconnection supervisor.
//!
//! One run of [`Supervisor::run`] owns the connect/reconnect cycle for the
//! client: it fetches a token, opens a session, and after the session ends
//! waits a linear, capped backoff before the next attempt. A run ends when
//! the attempt budget is spent, when no token is available, or when the
//! facade cancels it.

use std::sync::Arc;

use metrics::counter;
use moodmatch_auth::{TokenProvider, usable_token};
use moodmatch_core::{ConnectionState, DomainEvent, error_codes};
use tokio::time;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::session::run_session;
use crate::shared::Shared;

/// User-facing message when the attempt budget is spent.
pub const RECONNECT_EXHAUSTED_MESSAGE: &str = "Unable to reconnect. Please try again.";
/// User-facing message when there is no token to connect with.
pub const NO_TOKEN_MESSAGE: &str = "Missing auth token. Please sign in again.";

/// Why a supervisor run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorExit {
    /// The attempt budget was spent.
    Exhausted,
    /// The credential provider had no usable token.
    NoToken,
    /// Cancelled by the facade (disconnect, retry, or drop).
    Stopped,
}

pub(crate) struct Supervisor {
    pub(crate) shared: Arc<Shared>,
    pub(crate) config: Arc<ClientConfig>,
    pub(crate) tokens: Arc<dyn TokenProvider>,
    pub(crate) cancel: CancellationToken,
}

impl Supervisor {
    fn should_stop(&self) -> bool {
        self.cancel.is_cancelled() || self.shared.is_manual_disconnect()
    }

    pub(crate) async fn run(self) -> SupervisorExit {
        let policy = self.config.retry;
        let mut attempt: u32 = 0;

        while !self.should_stop() {
            if policy.is_exhausted(attempt) {
                warn!(attempt, "reconnect budget exhausted");
                self.shared.set_state(ConnectionState::Disconnected);
                self.shared.emit(DomainEvent::error(
                    error_codes::RECONNECT_EXHAUSTED,
                    RECONNECT_EXHAUSTED_MESSAGE,
                ));
                return SupervisorExit::Exhausted;
            }

            // Read fresh on every attempt so token changes apply to the next one.
            let Some(token) = usable_token(self.tokens.current_token()) else {
                warn!("no auth token available, not connecting");
                self.shared.set_state(ConnectionState::Disconnected);
                self.shared
                    .emit(DomainEvent::error(error_codes::NO_TOKEN, NO_TOKEN_MESSAGE));
                return SupervisorExit::NoToken;
            };

            self.shared.set_state(if attempt == 0 {
                ConnectionState::Connecting
            } else {
                ConnectionState::Reconnecting
            });
            counter!("realtime_connect_attempts_total").increment(1);
            debug!(attempt, "connection attempt");

            match run_session(&self.shared, &self.config, &token, &self.cancel).await {
                Ok(end) => info!(attempt, ?end, "session ended"),
                Err(e) => warn!(
                    attempt,
                    error = %e,
                    auth_rejected = e.is_auth_rejected(),
                    "connection attempt failed"
                ),
            }

            if self.should_stop() {
                break;
            }

            self.shared.set_state(ConnectionState::Disconnected);
            attempt += 1;
            let delay = policy.delay_for(attempt);
            debug!(attempt, ?delay, "backing off");

            tokio::select! {
                () = time::sleep(delay) => {}
                () = self.cancel.cancelled() => break,
            }
        }

        debug!("supervisor stopped");
        SupervisorExit::Stopped
    }
}
