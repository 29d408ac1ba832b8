//! # moodmatch-realtime
//!
//! Realtime connection manager for the MoodMatch chat backend.
//!
//! - **Codec**: [`codec`] maps JSON envelopes to [`DomainEvent`]s and
//!   [`OutgoingCommand`]s to JSON envelopes
//! - **Session**: one authenticated WebSocket lifetime with an application
//!   heartbeat and liveness timeout
//! - **Supervisor**: bounded reconnection with linear capped backoff
//! - **Facade**: [`MoodMatchClient`], the connect/send/disconnect/retry surface
//!   plus event and state subscriptions
//!
//! [`DomainEvent`]: moodmatch_core::DomainEvent
//! [`OutgoingCommand`]: moodmatch_core::OutgoingCommand

#![deny(unsafe_code)]

pub mod client;
pub mod codec;
pub mod config;
pub mod connection;
pub mod error;
mod heartbeat;
mod session;
mod shared;
mod supervisor;

pub use client::{ConnectContext, MoodMatchClient};
pub use codec::{WireEnvelope, decode, encode};
pub use config::ClientConfig;
pub use connection::CloseCause;
pub use error::RealtimeError;
pub use heartbeat::{HEARTBEAT_TIMEOUT_MESSAGE, HeartbeatResult};
pub use session::SessionEnd;
pub use supervisor::{NO_TOKEN_MESSAGE, RECONNECT_EXHAUSTED_MESSAGE, SupervisorExit};
