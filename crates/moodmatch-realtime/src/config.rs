//! Client configuration.

use std::time::Duration;

use moodmatch_core::RetryPolicy;
use moodmatch_settings::RealtimeSettings;

/// Runtime configuration for [`MoodMatchClient`](crate::MoodMatchClient).
///
/// Usually built from [`RealtimeSettings`]; tests construct it directly with
/// short intervals.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientConfig {
    /// WebSocket endpoint.
    pub ws_url: String,
    /// How often a heartbeat is sent while connected.
    pub heartbeat_interval: Duration,
    /// Silence since the last ack after which the link is considered dead.
    pub heartbeat_timeout: Duration,
    /// Attempt budget and backoff for one supervisor run.
    pub retry: RetryPolicy,
    /// Upper bound on opening a transport.
    pub connect_timeout: Duration,
    /// Events buffered per subscriber before the oldest are dropped.
    pub event_buffer_capacity: usize,
    /// Outbound frames queued per transport before sends are dropped.
    pub outbound_buffer_capacity: usize,
}

impl ClientConfig {
    /// Defaults pointed at a different endpoint.
    pub fn with_url(ws_url: impl Into<String>) -> Self {
        Self {
            ws_url: ws_url.into(),
            ..Self::default()
        }
    }
}

impl From<&RealtimeSettings> for ClientConfig {
    fn from(settings: &RealtimeSettings) -> Self {
        Self {
            ws_url: settings.ws_url.clone(),
            heartbeat_interval: Duration::from_millis(settings.heartbeat_interval_ms),
            heartbeat_timeout: Duration::from_millis(settings.heartbeat_timeout_ms),
            retry: settings.retry_policy(),
            connect_timeout: Duration::from_millis(settings.connect_timeout_ms),
            event_buffer_capacity: settings.event_buffer_capacity.max(1),
            outbound_buffer_capacity: settings.outbound_buffer_capacity.max(1),
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::from(&RealtimeSettings::default())
    }
}
