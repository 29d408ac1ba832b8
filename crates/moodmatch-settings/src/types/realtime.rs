//! Realtime connection settings.

use moodmatch_core::RetryPolicy;
use serde::{Deserialize, Serialize};

/// Production realtime endpoint.
pub const DEFAULT_WS_URL: &str = "wss://moodmatch-backend-dr9e.onrender.com/ws";

/// Realtime connection, heartbeat, and reconnection settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RealtimeSettings {
    /// WebSocket endpoint of the matchmaking/chat backend.
    pub ws_url: String,
    /// How often a heartbeat is sent while connected, in milliseconds.
    pub heartbeat_interval_ms: u64,
    /// Silence since the last heartbeat ack after which the link is dead.
    pub heartbeat_timeout_ms: u64,
    /// Attempts per supervisor run before giving up.
    pub max_reconnect_attempts: u32,
    /// Backoff step per failed attempt, in milliseconds.
    pub backoff_base_ms: u64,
    /// Backoff ceiling, in milliseconds.
    pub backoff_max_ms: u64,
    /// Upper bound on opening a transport (TCP + TLS + upgrade).
    pub connect_timeout_ms: u64,
    /// Events buffered per subscriber before the oldest are dropped.
    pub event_buffer_capacity: usize,
    /// Outbound frames queued per transport before sends are dropped.
    pub outbound_buffer_capacity: usize,
}

impl Default for RealtimeSettings {
    fn default() -> Self {
        Self {
            ws_url: DEFAULT_WS_URL.to_string(),
            heartbeat_interval_ms: 25_000,
            heartbeat_timeout_ms: 60_000,
            max_reconnect_attempts: 5,
            backoff_base_ms: 1000,
            backoff_max_ms: 10_000,
            connect_timeout_ms: 15_000,
            event_buffer_capacity: 64,
            outbound_buffer_capacity: 64,
        }
    }
}

impl RealtimeSettings {
    /// Reconnection budget derived from these settings.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_reconnect_attempts,
            base_delay_ms: self.backoff_base_ms,
            max_delay_ms: self.backoff_max_ms,
        }
    }
}
