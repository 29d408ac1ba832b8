//! # moodmatch-core
//!
//! Foundation types shared by every MoodMatch crate:
//!
//! - **Connection state**: [`ConnectionState`], the four externally visible states
//! - **Domain events**: [`DomainEvent`], the closed set of things the server can push
//! - **Commands**: [`OutgoingCommand`], the closed set of things the client can send
//! - **Branded IDs**: [`ConnectionId`] for tagging transport lifetimes in logs
//! - **Retry**: [`RetryPolicy`] and the linear capped backoff math
//! - **Logging**: `tracing` subscriber setup

#![deny(unsafe_code)]

pub mod commands;
pub mod events;
pub mod ids;
pub mod logging;
pub mod retry;
pub mod state;

pub use commands::OutgoingCommand;
pub use events::{DomainEvent, error_codes};
pub use ids::ConnectionId;
pub use retry::{RetryPolicy, backoff_delay_ms};
pub use state::ConnectionState;
