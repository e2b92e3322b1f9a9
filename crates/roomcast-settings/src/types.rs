//! Settings sections and their compiled defaults.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::errors::{Result, SettingsError};

/// Root settings object, one field per section of `settings.json`.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RoomcastSettings {
    /// HTTP/WebSocket listener.
    pub server: ServerSettings,
    /// Hub tuning.
    pub hub: HubSettings,
    /// Token verification.
    pub auth: AuthSettings,
    /// Log output.
    pub logging: LoggingSettings,
}

impl RoomcastSettings {
    /// Reject combinations the server cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.hub.queue_capacity == 0 {
            return Err(SettingsError::InvalidValue(
                "hub.queue_capacity must be at least 1".into(),
            ));
        }
        if self.server.max_message_size == 0 {
            return Err(SettingsError::InvalidValue(
                "server.max_message_size must be at least 1".into(),
            ));
        }
        let server = &self.server;
        if server.heartbeat_interval_secs > 0
            && server.heartbeat_timeout_secs < server.heartbeat_interval_secs
        {
            return Err(SettingsError::InvalidValue(format!(
                "server.heartbeat_timeout_secs ({}) is shorter than heartbeat_interval_secs ({})",
                server.heartbeat_timeout_secs, server.heartbeat_interval_secs
            )));
        }
        if self.auth.token_ttl_secs == 0 {
            return Err(SettingsError::InvalidValue(
                "auth.token_ttl_secs must be at least 1".into(),
            ));
        }
        for (module, level) in &self.logging.module_levels {
            if module.trim().is_empty() || level.trim().is_empty() {
                return Err(SettingsError::InvalidValue(format!(
                    "logging.module_levels has an empty entry ({module:?} = {level:?})"
                )));
            }
        }
        Ok(())
    }
}

/// Listener settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Bind address.
    pub host: String,
    /// Bind port. `0` picks a free port.
    pub port: u16,
    /// Largest inbound WebSocket message accepted, in bytes.
    pub max_message_size: usize,
    /// Seconds between pings. `0` disables the heartbeat.
    pub heartbeat_interval_secs: u64,
    /// Seconds without any inbound traffic before a connection is dropped.
    pub heartbeat_timeout_secs: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            max_message_size: 64 * 1024,
            heartbeat_interval_secs: 30,
            heartbeat_timeout_secs: 90,
        }
    }
}

/// Hub settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct HubSettings {
    /// Outbound frames buffered per connection before it is evicted.
    pub queue_capacity: usize,
}

impl Default for HubSettings {
    fn default() -> Self {
        Self { queue_capacity: 64 }
    }
}

/// Token settings.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthSettings {
    /// HS256 signing secret. Empty until configured.
    pub jwt_secret: String,
    /// Lifetime of tokens minted by `roomcast token`.
    pub token_ttl_secs: u64,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            token_ttl_secs: 24 * 60 * 60,
        }
    }
}

impl std::fmt::Debug for AuthSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSettings")
            .field("jwt_secret", &if self.jwt_secret.is_empty() { "" } else { "<redacted>" })
            .field("token_ttl_secs", &self.token_ttl_secs)
            .finish()
    }
}

/// Logging settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Default filter directive, e.g. `info` or `roomcast_hub=debug,info`.
    pub level: String,
    /// Per-module overrides, e.g. `{"roomcast_hub": "debug"}`.
    pub module_levels: BTreeMap<String, String>,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            module_levels: BTreeMap::new(),
            json: false,
        }
    }
}
