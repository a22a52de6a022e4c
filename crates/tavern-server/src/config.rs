//! Server configuration.

use serde::{Deserialize, Serialize};

/// Configuration for the Tavern server.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind (default `"127.0.0.1"`).
    pub host: String,
    /// Port to bind (default `0` for auto-assign).
    pub port: u16,
    /// Maximum concurrent WebSocket connections.
    pub max_connections: usize,
    /// Heartbeat ping interval in seconds.
    pub heartbeat_interval_secs: u64,
    /// Close a connection after this long without a pong.
    pub heartbeat_timeout_secs: u64,
    /// Max HTTP body / WebSocket message size in bytes. Generous because
    /// sheet and inventory payloads may embed base64 images.
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 0,
            max_connections: 100,
            heartbeat_interval_secs: 30,
            heartbeat_timeout_secs: 90,
            max_body_bytes: 50 * 1024 * 1024, // 50 MB
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_values() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.host, "127.0.0.1");
        assert_eq!(cfg.port, 0);
        assert_eq!(cfg.max_connections, 100);
        assert_eq!(cfg.heartbeat_interval_secs, 30);
        assert_eq!(cfg.heartbeat_timeout_secs, 90);
        assert_eq!(cfg.max_body_bytes, 50 * 1024 * 1024);
    }

    #[test]
    fn serde_roundtrip() {
        let cfg = ServerConfig::default();
        let json = serde_json::to_string(&cfg).unwrap();
        let back: ServerConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.host, cfg.host);
        assert_eq!(back.max_body_bytes, cfg.max_body_bytes);
    }

    #[test]
    fn deserialize_from_json_string() {
        let json = r#"{"host":"0.0.0.0","port":3000,"max_connections":5,"heartbeat_interval_secs":10,"heartbeat_timeout_secs":30,"max_body_bytes":1024}"#;
        let cfg: ServerConfig = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.host, "0.0.0.0");
        assert_eq!(cfg.port, 3000);
        assert_eq!(cfg.max_body_bytes, 1024);
    }
}
