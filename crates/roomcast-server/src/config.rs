//! Server configuration.

use std::time::Duration;

use roomcast_settings::RoomcastSettings;
use serde::{Deserialize, Serialize};

/// Configuration for the roomcast server.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind (default `"127.0.0.1"`).
    pub host: String,
    /// Port to bind (default `0` for auto-assign).
    pub port: u16,
    /// Heartbeat interval in seconds. `0` disables pings.
    pub heartbeat_interval_secs: u64,
    /// Seconds of inbound silence before a connection is dropped.
    pub heartbeat_timeout_secs: u64,
    /// Max WebSocket message size in bytes.
    pub max_message_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 0,
            heartbeat_interval_secs: 30,
            heartbeat_timeout_secs: 90,
            max_message_size: 64 * 1024,
        }
    }
}

impl ServerConfig {
    /// Ping interval and silence timeout, or `None` when disabled.
    pub fn heartbeat(&self) -> Option<Heartbeat> {
        (self.heartbeat_interval_secs > 0).then(|| Heartbeat {
            interval: Duration::from_secs(self.heartbeat_interval_secs),
            timeout: Duration::from_secs(self.heartbeat_timeout_secs.max(self.heartbeat_interval_secs)),
        })
    }
}

impl From<&RoomcastSettings> for ServerConfig {
    fn from(settings: &RoomcastSettings) -> Self {
        let server = &settings.server;
        Self {
            host: server.host.clone(),
            port: server.port,
            heartbeat_interval_secs: server.heartbeat_interval_secs,
            heartbeat_timeout_secs: server.heartbeat_timeout_secs,
            max_message_size: server.max_message_size,
        }
    }
}

/// Liveness parameters for one WebSocket connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Heartbeat {
    /// Time between pings.
    pub interval: Duration,
    /// Inbound silence tolerated before the connection is considered dead.
    pub timeout: Duration,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.host, "127.0.0.1");
        assert_eq!(cfg.port, 0);
        assert_eq!(cfg.heartbeat_interval_secs, 30);
        assert_eq!(cfg.heartbeat_timeout_secs, 90);
    }

    #[test]
    fn heartbeat_from_config() {
        let hb = ServerConfig::default().heartbeat().unwrap();
        assert_eq!(hb.interval, Duration::from_secs(30));
        assert_eq!(hb.timeout, Duration::from_secs(90));
    }

    #[test]
    fn zero_interval_disables_heartbeat() {
        let cfg = ServerConfig {
            heartbeat_interval_secs: 0,
            ..ServerConfig::default()
        };
        assert!(cfg.heartbeat().is_none());
    }

    #[test]
    fn timeout_never_shorter_than_interval() {
        let cfg = ServerConfig {
            heartbeat_interval_secs: 20,
            heartbeat_timeout_secs: 5,
            ..ServerConfig::default()
        };
        assert_eq!(cfg.heartbeat().unwrap().timeout, Duration::from_secs(20));
    }

    #[test]
    fn from_settings() {
        let mut settings = RoomcastSettings::default();
        settings.server.host = "10.0.0.1".into();
        settings.server.port = 3000;
        settings.server.max_message_size = 512;
        let cfg = ServerConfig::from(&settings);
        assert_eq!(cfg.host, "10.0.0.1");
        assert_eq!(cfg.port, 3000);
        assert_eq!(cfg.max_message_size, 512);
        assert_eq!(cfg.heartbeat_interval_secs, 30);
    }
}
