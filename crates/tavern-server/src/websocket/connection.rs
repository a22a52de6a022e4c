//! WebSocket client connection state.
//!
//! A connection's lifecycle is `Connected → JoinedTable → Disconnected`:
//! it receives table-scoped broadcasts only after `join_table` binds it to
//! a table. Rejoining (same or another table) just rebinds — membership is
//! ephemeral and reconstructed on every connection.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::sync::mpsc;

/// Represents a connected WebSocket client.
pub struct ClientConnection {
    /// Unique connection ID.
    pub id: String,
    /// Bound table ID (set by `join_table`).
    table_id: Mutex<Option<String>>,
    /// Player identity announced at join, if any (GM connections and old
    /// clients may not announce one).
    player_id: Mutex<Option<String>>,
    /// Send channel to the connection's WebSocket write task.
    tx: mpsc::Sender<Arc<String>>,
    /// When this connection was established.
    pub connected_at: Instant,
    /// Whether the client has responded since the last heartbeat tick.
    pub is_alive: AtomicBool,
    /// When the last pong (or any activity) was received.
    last_pong: Mutex<Instant>,
    /// Count of messages dropped due to a full channel.
    pub dropped_messages: AtomicU64,
}

impl ClientConnection {
    /// Create a new connection.
    pub fn new(id: String, tx: mpsc::Sender<Arc<String>>) -> Self {
        let now = Instant::now();
        Self {
            id,
            table_id: Mutex::new(None),
            player_id: Mutex::new(None),
            tx,
            connected_at: now,
            is_alive: AtomicBool::new(true),
            last_pong: Mutex::new(now),
            dropped_messages: AtomicU64::new(0),
        }
    }

    /// Bind this connection to a table. Idempotent; a second join simply
    /// rebinds.
    pub fn join_table(&self, table_id: String) {
        *self.table_id.lock() = Some(table_id);
    }

    /// The currently bound table, if any.
    pub fn table_id(&self) -> Option<String> {
        self.table_id.lock().clone()
    }

    /// Record the player identity announced at join.
    pub fn set_player_id(&self, player_id: String) {
        *self.player_id.lock() = Some(player_id);
    }

    /// The announced player identity, if any.
    pub fn player_id(&self) -> Option<String> {
        self.player_id.lock().clone()
    }

    /// Send a text message to the client.
    ///
    /// Returns `false` if the channel is full or closed, and increments
    /// the dropped message counter.
    pub fn send(&self, message: Arc<String>) -> bool {
        if self.tx.try_send(message).is_ok() {
            true
        } else {
            let _ = self.dropped_messages.fetch_add(1, Ordering::Relaxed);
            false
        }
    }

    /// Total messages dropped for this connection.
    pub fn drop_count(&self) -> u64 {
        self.dropped_messages.load(Ordering::Relaxed)
    }

    /// Mark the connection as alive (pong or any inbound frame).
    pub fn mark_alive(&self) {
        self.is_alive.store(true, Ordering::Relaxed);
        *self.last_pong.lock() = Instant::now();
    }

    /// Duration since the last sign of life.
    pub fn last_pong_elapsed(&self) -> Duration {
        self.last_pong.lock().elapsed()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
