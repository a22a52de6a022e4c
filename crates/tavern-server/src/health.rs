//! Health endpoint payload.

use std::time::Instant;

use serde::{Deserialize, Serialize};

/// Response of `GET /health`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Always `"ok"` while the process is serving.
    pub status: String,
    /// Seconds since the server started.
    pub uptime_secs: u64,
    /// Currently connected WebSocket clients.
    pub connections: usize,
}

/// Build the current health snapshot.
pub fn health_check(start_time: Instant, connections: usize) -> HealthResponse {
    HealthResponse {
        status: "ok".into(),
        uptime_secs: start_time.elapsed().as_secs(),
        connections,
    }
}
