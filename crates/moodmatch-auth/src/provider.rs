//! Credential providers.
//!
//! The realtime client asks its provider for a token immediately before every
//! connection attempt and never caches the answer, so a token that is updated
//! or cleared between attempts takes effect on the next one.

use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use tokio::sync::watch;

use crate::errors::AuthError;
use crate::storage::{AuthStorage, load_auth_storage, save_auth_storage};

/// Source of the bearer credential.
pub trait TokenProvider: Send + Sync {
    /// Snapshot of the current token, if any.
    fn current_token(&self) -> Option<String>;
}

/// Normalize a token snapshot: blank counts as absent.
pub fn usable_token(token: Option<String>) -> Option<String> {
    token.filter(|t| !t.trim().is_empty())
}

// ─────────────────────────────────────────────────────────────────────────────
// MemoryTokenProvider
// ─────────────────────────────────────────────────────────────────────────────

/// In-memory token holder with change notifications.
pub struct MemoryTokenProvider {
    tx: watch::Sender<Option<String>>,
}

impl MemoryTokenProvider {
    /// Create a provider holding `token`.
    pub fn new(token: Option<String>) -> Self {
        let (tx, _rx) = watch::channel(token);
        Self { tx }
    }

    /// Replace the token. Subscribers see the new value.
    pub fn update_token(&self, token: Option<String>) {
        let _ = self.tx.send_replace(token);
    }

    /// Observe token changes.
    pub fn subscribe(&self) -> watch::Receiver<Option<String>> {
        self.tx.subscribe()
    }
}

impl Default for MemoryTokenProvider {
    fn default() -> Self {
        Self::new(None)
    }
}

impl TokenProvider for MemoryTokenProvider {
    fn current_token(&self) -> Option<String> {
        self.tx.borrow().clone()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// FileTokenProvider
// ─────────────────────────────────────────────────────────────────────────────

/// Token persisted in an auth file, cached in memory.
///
/// The file is read once at construction (and again on [`reload`]); reads of
/// the current token never touch the disk.
///
/// [`reload`]: FileTokenProvider::reload
pub struct FileTokenProvider {
    path: PathBuf,
    cached: RwLock<AuthStorage>,
}

impl FileTokenProvider {
    /// Open the auth file at `path`. A missing or unreadable file means "no token".
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let cached = load_auth_storage(&path).unwrap_or_default();
        tracing::debug!(path = %path.display(), has_token = cached.auth_token.is_some(), "auth file loaded");
        Self {
            path,
            cached: RwLock::new(cached),
        }
    }

    /// Location of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// User the stored token belongs to, if recorded.
    pub fn user_id(&self) -> Option<String> {
        self.cached.read().user_id.clone()
    }

    /// Re-read the backing file.
    pub fn reload(&self) {
        *self.cached.write() = load_auth_storage(&self.path).unwrap_or_default();
    }

    /// Replace the token (and optionally the user) and persist it.
    ///
    /// The in-memory value changes even if the write fails.
    pub fn update_token(
        &self,
        user_id: Option<String>,
        token: Option<String>,
    ) -> Result<(), AuthError> {
        let mut snapshot = {
            let mut cached = self.cached.write();
            if user_id.is_some() {
                cached.user_id = user_id;
            }
            cached.auth_token = token;
            cached.clone()
        };
        save_auth_storage(&self.path, &mut snapshot)
    }
}

impl TokenProvider for FileTokenProvider {
    fn current_token(&self) -> Option<String> {
        self.cached.read().auth_token.clone()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
