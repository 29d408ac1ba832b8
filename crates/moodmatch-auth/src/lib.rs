//! # moodmatch-auth
//!
//! Supplies the bearer credential the realtime client attaches to every
//! connection attempt.
//!
//! - [`TokenProvider`]: synchronous "give me the current token" snapshot
//! - [`MemoryTokenProvider`]: in-memory token with change notifications
//! - [`FileTokenProvider`]: token persisted in `~/.moodmatch/auth.json`
//! - [`storage`]: auth file I/O with 0600 permissions

#![deny(unsafe_code)]

pub mod errors;
pub mod provider;
pub mod storage;

pub use errors::AuthError;
pub use provider::{FileTokenProvider, MemoryTokenProvider, TokenProvider, usable_token};
pub use storage::{AuthStorage, auth_file_path};
