//! # moodmatch-settings
//!
//! Configuration management with layered sources for the MoodMatch client.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults**: [`MoodMatchSettings::default()`]
//! 2. **User file**: `~/.moodmatch/settings.json` (deep-merged over defaults)
//! 3. **Environment variables**: `MOODMATCH_*` overrides (highest priority)
//!
//! # Usage
//!
//! ```no_run
//! use moodmatch_settings::load_settings;
//!
//! let settings = load_settings().unwrap_or_default();
//! println!("realtime endpoint: {}", settings.realtime.ws_url);
//! ```

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{deep_merge, load_settings, load_settings_from_path, settings_dir, settings_path};
pub use types::*;

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
