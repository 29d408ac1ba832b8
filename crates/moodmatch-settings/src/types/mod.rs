//! Settings type definitions.
//!
//! All types use `#[serde(rename_all = "camelCase")]` and `#[serde(default)]`,
//! so a partial JSON file only needs the keys it overrides.

mod realtime;

pub use realtime::*;

use serde::{Deserialize, Serialize};

use crate::errors::{Result, SettingsError};

/// Root settings type for the MoodMatch client.
///
/// # JSON Format
///
/// ```json
/// {
///   "version": "0.1.0",
///   "realtime": { "wsUrl": "ws://10.0.2.2:8080/ws" },
///   "logging": { "level": "debug" }
/// }
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MoodMatchSettings {
    /// Settings schema version.
    pub version: String,
    /// Realtime connection settings.
    pub realtime: RealtimeSettings,
    /// Credential storage settings.
    pub auth: AuthSettings,
    /// Logging configuration.
    pub logging: LoggingSettings,
}

impl Default for MoodMatchSettings {
    fn default() -> Self {
        Self {
            version: "0.1.0".to_string(),
            realtime: RealtimeSettings::default(),
            auth: AuthSettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

impl MoodMatchSettings {
    /// Reject values the realtime client cannot run with.
    pub fn validate(&self) -> Result<()> {
        let rt = &self.realtime;
        if rt.ws_url.trim().is_empty() {
            return Err(SettingsError::InvalidValue("realtime.wsUrl is empty".into()));
        }
        if rt.event_buffer_capacity == 0 || rt.outbound_buffer_capacity == 0 {
            return Err(SettingsError::InvalidValue(
                "realtime buffer capacities must be at least 1".into(),
            ));
        }
        if rt.heartbeat_interval_ms == 0 {
            return Err(SettingsError::InvalidValue(
                "realtime.heartbeatIntervalMs must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Credential storage settings.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AuthSettings {
    /// Path of the auth file; `~/.moodmatch/auth.json` when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_file: Option<String>,
}

/// Log verbosity.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Trace-level (most verbose).
    Trace,
    /// Debug-level.
    Debug,
    /// Info-level.
    Info,
    /// Warning-level (default).
    #[default]
    Warn,
    /// Error-level.
    Error,
}

impl LogLevel {
    /// Convert to a tracing filter string.
    pub fn as_filter_str(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// Logging configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Minimum level written to stderr.
    pub level: LogLevel,
    /// Emit JSON lines instead of compact text.
    pub json: bool,
}
