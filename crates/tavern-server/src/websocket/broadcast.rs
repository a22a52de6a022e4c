//! Table-scoped event fan-out to connected WebSocket clients.
//!
//! Delivery is at-most-once: a slow or disconnected member just misses the
//! event and recovers full state via a snapshot load on reconnect. A client
//! that keeps missing events gets forcibly unregistered so it cannot pin
//! buffer memory forever.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use metrics::counter;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use tavern_core::events::TableEvent;

use crate::rpc::types::ServerEvent;

use super::connection::ClientConnection;

/// Maximum total lifetime message drops before forcibly disconnecting a slow client.
const MAX_TOTAL_DROPS: u64 = 100;

/// Manages event broadcasting to table groups.
pub struct BroadcastManager {
    /// Connected clients indexed by connection ID.
    connections: RwLock<HashMap<String, Arc<ClientConnection>>>,
    /// Atomic counter tracking total connections (avoids read-locking for count queries).
    active_count: AtomicUsize,
}

impl BroadcastManager {
    /// Create a new broadcast manager.
    pub fn new() -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
            active_count: AtomicUsize::new(0),
        }
    }

    /// Register a connection.
    pub async fn add(&self, connection: Arc<ClientConnection>) {
        let mut conns = self.connections.write().await;
        if conns.insert(connection.id.clone(), connection).is_none() {
            let _ = self.active_count.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Unregister a connection by ID.
    pub async fn remove(&self, connection_id: &str) {
        let mut conns = self.connections.write().await;
        if conns.remove(connection_id).is_some() {
            let _ = self.active_count.fetch_sub(1, Ordering::Relaxed);
        }
    }

    /// Broadcast a state change to every current member of a table group.
    ///
    /// The event is serialized once and shared across all recipients.
    pub async fn broadcast_to_table(&self, table_id: &str, event: &TableEvent) {
        let wire = match ServerEvent::from_table_event(table_id, event) {
            Ok(w) => w,
            Err(e) => {
                warn!(event_type = event.event_type(), error = %e, "failed to build event payload");
                return;
            }
        };
        let json = match serde_json::to_string(&wire) {
            Ok(j) => Arc::new(j),
            Err(e) => {
                warn!(event_type = event.event_type(), error = %e, "failed to serialize event");
                return;
            }
        };

        let mut to_remove = Vec::new();
        {
            let conns = self.connections.read().await;
            let mut recipients = 0u32;
            for conn in conns.values() {
                if conn.table_id().as_deref() != Some(table_id) {
                    continue;
                }
                recipients += 1;
                if !conn.send(Arc::clone(&json)) {
                    counter!("ws_broadcast_drops_total").increment(1);
                    let drops = conn.drop_count();
                    if drops >= MAX_TOTAL_DROPS {
                        warn!(conn_id = %conn.id, table_id, drops, "disconnecting slow client");
                        to_remove.push(conn.id.clone());
                    } else {
                        warn!(conn_id = %conn.id, table_id, total_drops = drops, "event dropped (channel full)");
                    }
                }
            }
            debug!(
                event_type = event.event_type(),
                table_id, recipients, "broadcast event"
            );
        }

        if !to_remove.is_empty() {
            let mut conns = self.connections.write().await;
            for id in &to_remove {
                if conns.remove(id).is_some() {
                    let _ = self.active_count.fetch_sub(1, Ordering::Relaxed);
                }
            }
        }
    }

    /// Number of active connections.
    pub fn connection_count(&self) -> usize {
        self.active_count.load(Ordering::Relaxed)
    }

    /// Number of members currently subscribed to a table.
    pub async fn table_member_count(&self, table_id: &str) -> usize {
        let conns = self.connections.read().await;
        conns
            .values()
            .filter(|c| c.table_id().as_deref() == Some(table_id))
            .count()
    }
}

impl Default for BroadcastManager {
    fn default() -> Self {
        Self::new()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tavern_core::entities::{FeedEntry, FeedKind};
    use tokio::sync::mpsc;

    fn make_connection(
        id: &str,
        table: Option<&str>,
    ) -> (Arc<ClientConnection>, mpsc::Receiver<Arc<String>>) {
        let (tx, rx) = mpsc::channel(32);
        let conn = ClientConnection::new(id.into(), tx);
        if let Some(table_id) = table {
            conn.join_table(table_id.into());
        }
        (Arc::new(conn), rx)
    }

    fn feed_event(text: &str) -> TableEvent {
        TableEvent::NewFeedItem(FeedEntry {
            id: 1,
            table_id: "T1".into(),
            kind: FeedKind::Chat,
            sender: "Alice".into(),
            is_gm: false,
            content: json!(text),
            timestamp: "2026-08-07T12:00:00Z".into(),
        })
    }

    #[tokio::test]
    async fn add_and_remove_track_count() {
        let bm = BroadcastManager::new();
        let (conn, _rx) = make_connection("c1", None);
        bm.add(conn).await;
        assert_eq!(bm.connection_count(), 1);
        bm.remove("c1").await;
        assert_eq!(bm.connection_count(), 0);
    }

    #[tokio::test]
    async fn remove_nonexistent_is_noop() {
        let bm = BroadcastManager::new();
        bm.remove("no_such").await;
        assert_eq!(bm.connection_count(), 0);
    }

    #[tokio::test]
    async fn broadcast_reaches_only_table_members() {
        let bm = BroadcastManager::new();
        let (c1, mut rx1) = make_connection("c1", Some("T1"));
        let (c2, mut rx2) = make_connection("c2", Some("T2"));
        let (c3, mut rx3) = make_connection("c3", Some("T1"));
        bm.add(c1).await;
        bm.add(c2).await;
        bm.add(c3).await;

        bm.broadcast_to_table("T1", &feed_event("hello")).await;

        assert!(rx1.try_recv().is_ok());
        assert!(rx2.try_recv().is_err());
        assert!(rx3.try_recv().is_ok());
    }

    #[tokio::test]
    async fn unjoined_connections_receive_nothing() {
        let bm = BroadcastManager::new();
        let (c1, mut rx1) = make_connection("c1", None);
        bm.add(c1).await;

        bm.broadcast_to_table("T1", &feed_event("hello")).await;
        assert!(rx1.try_recv().is_err());
    }

    #[tokio::test]
    async fn broadcast_to_empty_table_does_not_panic() {
        let bm = BroadcastManager::new();
        bm.broadcast_to_table("T1", &feed_event("hello")).await;
    }

    #[tokio::test]
    async fn broadcast_payload_is_wire_event() {
        let bm = BroadcastManager::new();
        let (c1, mut rx1) = make_connection("c1", Some("T1"));
        bm.add(c1).await;

        bm.broadcast_to_table("T1", &feed_event("hello")).await;

        let msg = rx1.recv().await.unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&msg).unwrap();
        assert_eq!(parsed["type"], "new_feed_item");
        assert_eq!(parsed["tableId"], "T1");
        assert_eq!(parsed["data"]["content"], "hello");
        assert!(parsed["timestamp"].is_string());
    }

    #[tokio::test]
    async fn payload_serialized_once_and_shared() {
        let bm = BroadcastManager::new();
        let (c1, mut rx1) = make_connection("c1", Some("T1"));
        let (c2, mut rx2) = make_connection("c2", Some("T1"));
        bm.add(c1).await;
        bm.add(c2).await;

        bm.broadcast_to_table("T1", &feed_event("shared")).await;

        let msg1 = rx1.recv().await.unwrap();
        let msg2 = rx2.recv().await.unwrap();
        assert!(Arc::ptr_eq(&msg1, &msg2));
    }

    #[tokio::test]
    async fn slow_client_evicted_after_drop_threshold() {
        let bm = BroadcastManager::new();
        let (tx, _rx) = mpsc::channel(1);
        let slow = Arc::new(ClientConnection::new("slow".into(), tx));
        slow.join_table("T1".into());
        let (fast, mut fast_rx) = make_connection("fast", Some("T1"));
        bm.add(slow).await;
        bm.add(fast).await;

        let event = feed_event("spam");
        // First send fills the slow client's buffer, then exceed the threshold.
        for _ in 0..=MAX_TOTAL_DROPS {
            bm.broadcast_to_table("T1", &event).await;
        }

        assert_eq!(bm.connection_count(), 1);
        assert!(fast_rx.try_recv().is_ok());
    }

    #[tokio::test]
    async fn eviction_is_scoped_to_the_broadcast_table() {
        let bm = BroadcastManager::new();
        let (tx, _rx) = mpsc::channel(1);
        let slow_t1 = Arc::new(ClientConnection::new("slow_t1".into(), tx));
        slow_t1.join_table("T1".into());
        let (fast_t2, _rx2) = make_connection("fast_t2", Some("T2"));
        bm.add(slow_t1).await;
        bm.add(fast_t2).await;

        let event = feed_event("spam");
        for _ in 0..=MAX_TOTAL_DROPS {
            bm.broadcast_to_table("T1", &event).await;
        }

        assert_eq!(bm.connection_count(), 1);
        assert_eq!(bm.table_member_count("T2").await, 1);
    }

    #[tokio::test]
    async fn table_member_count_reflects_bindings() {
        let bm = BroadcastManager::new();
        let (c1, _rx1) = make_connection("c1", Some("T1"));
        let (c2, _rx2) = make_connection("c2", Some("T1"));
        let (c3, _rx3) = make_connection("c3", Some("T2"));
        bm.add(c1).await;
        bm.add(c2).await;
        bm.add(c3).await;

        assert_eq!(bm.table_member_count("T1").await, 2);
        assert_eq!(bm.table_member_count("T2").await, 1);
        assert_eq!(bm.table_member_count("T9").await, 0);
    }

    #[tokio::test]
    async fn add_with_same_id_overwrites() {
        let bm = BroadcastManager::new();
        let (c1, _rx1) = make_connection("same", Some("T1"));
        let (c2, _rx2) = make_connection("same", Some("T2"));
        bm.add(c1).await;
        bm.add(c2).await;
        assert_eq!(bm.connection_count(), 1);
        assert_eq!(bm.table_member_count("T2").await, 1);
    }
}
