//! The session coordinator — orchestration core.
//!
//! Every client intent flows through here as: validate → durable mutation
//! via the store → derive the broadcast payload → hand it to the
//! broadcaster. The mutation is awaited before the broadcast is issued, so
//! a client can never observe a broadcast for a write it cannot read back.
//!
//! The coordinator is constructed once at process start with its
//! dependencies injected; there are no module-level singletons. Store
//! failures surface to the originating request only — they never tear down
//! other connections, and broadcast delivery failures are swallowed
//! entirely (reconnecting clients recover via snapshot).

use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, instrument};

use tavern_core::entities::{FeedEntry, InventoryItem, NewFeedEntry, Player};
use tavern_core::events::TableEvent;
use tavern_core::schema::SchemaSection;
use tavern_core::values::SheetData;
use tavern_store::{
    CreatedTable, JoinOutcome, PlayerView, Result, SessionStore, TableSnapshot,
};

use crate::websocket::broadcast::BroadcastManager;
use crate::websocket::connection::ClientConnection;

/// Parameters of a `join_table` channel request.
///
/// Old clients send a bare table id string; current clients send the object
/// form with their resolved identity.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinTableParams {
    /// Table to subscribe to.
    pub table_id: String,
    /// Player identity resolved at the HTTP join, if announced.
    #[serde(default)]
    pub player_id: Option<String>,
    /// Display name, if announced.
    #[serde(default)]
    pub name: Option<String>,
}

/// Orchestrates client intents over the store and the broadcaster.
pub struct SessionCoordinator {
    store: Arc<SessionStore>,
    broadcast: Arc<BroadcastManager>,
}

impl SessionCoordinator {
    /// Create a coordinator over its injected dependencies.
    pub fn new(store: Arc<SessionStore>, broadcast: Arc<BroadcastManager>) -> Self {
        Self { store, broadcast }
    }

    /// The broadcaster, for connection registration.
    pub fn broadcast(&self) -> &Arc<BroadcastManager> {
        &self.broadcast
    }

    // ── Request/response intents (no broadcast) ─────────────────────────

    /// Create a new table.
    pub fn create_table(&self, name: Option<&str>) -> Result<CreatedTable> {
        self.store.create_table(name)
    }

    /// Resolve a join request (GM check, player identity, row creation).
    pub fn resolve_join(
        &self,
        table_id: &str,
        name: &str,
        gm_code: Option<&str>,
    ) -> Result<JoinOutcome> {
        self.store.resolve_join(table_id, name, gm_code)
    }

    /// The reconnect snapshot for one player of one table.
    pub fn load_snapshot(&self, table_id: &str, player_id: &str) -> Result<TableSnapshot> {
        self.store.load_snapshot(table_id, player_id)
    }

    /// A player's inventory. Private to the player and the GM's on-demand
    /// view — inventory intents never broadcast.
    pub fn get_inventory(&self, player_id: &str) -> Result<Vec<InventoryItem>> {
        self.store.get_inventory(player_id)
    }

    /// Overwrite a player's inventory.
    pub fn save_inventory(&self, player_id: &str, items: &[InventoryItem]) -> Result<()> {
        self.store.save_inventory(player_id, items)
    }

    /// Point-in-time GM view of one player.
    pub fn player_view(&self, player_id: &str) -> Result<PlayerView> {
        self.store.player_view(player_id)
    }

    // ── Mutate-then-broadcast intents ───────────────────────────────────

    /// Subscribe a connection to a table group, then refresh the roster for
    /// the whole group (so the GM's view updates whoever joined).
    ///
    /// Rejoining is idempotent: the connection is simply rebound. Identity
    /// resolution itself happens in the HTTP join — this intent only marks
    /// membership and announces the roster.
    #[instrument(skip(self, connection, params), fields(conn_id = %connection.id, table_id = %params.table_id))]
    pub async fn join_table(
        &self,
        connection: &Arc<ClientConnection>,
        params: JoinTableParams,
    ) -> Result<Vec<Player>> {
        connection.join_table(params.table_id.clone());
        if let Some(player_id) = params.player_id {
            connection.set_player_id(player_id);
        }

        let players = self.store.list_players(&params.table_id)?;
        debug!(members = players.len(), "connection joined table");
        self.broadcast
            .broadcast_to_table(&params.table_id, &TableEvent::PlayersUpdated(players.clone()))
            .await;
        Ok(players)
    }

    /// Persist a schema edit, then push the new schema to the table group.
    #[instrument(skip(self, schema))]
    pub async fn save_schema(&self, table_id: &str, schema: &[SchemaSection]) -> Result<()> {
        self.store.save_schema(table_id, schema)?;
        self.broadcast
            .broadcast_to_table(table_id, &TableEvent::SchemaUpdated(schema.to_vec()))
            .await;
        Ok(())
    }

    /// Persist a sheet edit, then refresh the full roster for the table
    /// group — every sheet edit re-announces all players, not a diff.
    #[instrument(skip(self, data))]
    pub async fn save_sheet(&self, player_id: &str, data: &SheetData) -> Result<()> {
        let table_id = self.store.save_sheet(player_id, data)?;
        let players = self.store.list_players(&table_id)?;
        self.broadcast
            .broadcast_to_table(&table_id, &TableEvent::PlayersUpdated(players))
            .await;
        Ok(())
    }

    /// Append a feed entry, then push exactly that entry (never the whole
    /// feed) to the table group.
    #[instrument(skip(self, message), fields(table_id = %message.table_id, kind = %message.kind))]
    pub async fn post_message(&self, message: NewFeedEntry) -> Result<FeedEntry> {
        let entry = self.store.append_feed(&message)?;
        self.broadcast
            .broadcast_to_table(&entry.table_id, &TableEvent::NewFeedItem(entry.clone()))
            .await;
        Ok(entry)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tavern_core::entities::FeedKind;
    use tavern_store::{new_in_memory, run_migrations, ConnectionConfig};
    use tokio::sync::mpsc;

    fn coordinator() -> SessionCoordinator {
        let pool = new_in_memory(&ConnectionConfig::default()).unwrap();
        {
            let conn = pool.get().unwrap();
            let _ = run_migrations(&conn).unwrap();
        }
        SessionCoordinator::new(
            Arc::new(SessionStore::new(pool)),
            Arc::new(BroadcastManager::new()),
        )
    }

    async fn member(
        coordinator: &SessionCoordinator,
        id: &str,
        table_id: &str,
    ) -> (Arc<ClientConnection>, mpsc::Receiver<Arc<String>>) {
        let (tx, rx) = mpsc::channel(32);
        let conn = Arc::new(ClientConnection::new(id.into(), tx));
        coordinator.broadcast().add(Arc::clone(&conn)).await;
        let _ = coordinator
            .join_table(
                &conn,
                JoinTableParams {
                    table_id: table_id.into(),
                    player_id: None,
                    name: None,
                },
            )
            .await
            .unwrap();
        (conn, rx)
    }

    fn recv_event(rx: &mut mpsc::Receiver<Arc<String>>) -> serde_json::Value {
        let msg = rx.try_recv().expect("expected a broadcast");
        serde_json::from_str(&msg).unwrap()
    }

    #[tokio::test]
    async fn join_table_broadcasts_roster_to_whole_group() {
        let coordinator = coordinator();
        let created = coordinator.create_table(None).unwrap();
        let _ = coordinator
            .resolve_join(&created.table_id, "Alice", None)
            .unwrap();

        let (_gm_conn, mut gm_rx) = member(&coordinator, "gm", &created.table_id).await;
        // Drain the roster broadcast triggered by the GM's own join.
        let _ = recv_event(&mut gm_rx);

        // A player joins; the GM's connection sees the refreshed roster.
        let (_player_conn, mut player_rx) = member(&coordinator, "p1", &created.table_id).await;
        let event = recv_event(&mut gm_rx);
        assert_eq!(event["type"], "players_updated");
        assert_eq!(event["data"][0]["name"], "Alice");

        // The joining connection receives the same roster.
        let event = recv_event(&mut player_rx);
        assert_eq!(event["type"], "players_updated");
    }

    #[tokio::test]
    async fn join_is_idempotent_for_a_connection() {
        let coordinator = coordinator();
        let created = coordinator.create_table(None).unwrap();
        let (conn, mut rx) = member(&coordinator, "c1", &created.table_id).await;
        let _ = recv_event(&mut rx);

        let players = coordinator
            .join_table(
                &conn,
                JoinTableParams {
                    table_id: created.table_id.clone(),
                    player_id: None,
                    name: None,
                },
            )
            .await
            .unwrap();
        assert!(players.is_empty());
        assert_eq!(conn.table_id().as_deref(), Some(created.table_id.as_str()));
        assert_eq!(
            coordinator.broadcast().table_member_count(&created.table_id).await,
            1
        );
    }

    #[tokio::test]
    async fn save_schema_broadcasts_new_schema() {
        let coordinator = coordinator();
        let created = coordinator.create_table(None).unwrap();
        let (_conn, mut rx) = member(&coordinator, "c1", &created.table_id).await;
        let _ = recv_event(&mut rx);

        let schema: Vec<SchemaSection> = serde_json::from_str(
            r#"[{"title":"Stats","fields":[{"name":"HP","type":"number"}]}]"#,
        )
        .unwrap();
        coordinator
            .save_schema(&created.table_id, &schema)
            .await
            .unwrap();

        let event = recv_event(&mut rx);
        assert_eq!(event["type"], "schema_updated");
        assert_eq!(event["data"][0]["title"], "Stats");
    }

    #[tokio::test]
    async fn save_schema_failure_broadcasts_nothing() {
        let coordinator = coordinator();
        let created = coordinator.create_table(None).unwrap();
        let (_conn, mut rx) = member(&coordinator, "c1", &created.table_id).await;
        let _ = recv_event(&mut rx);

        let err = coordinator.save_schema("NOPE42", &[]).await;
        assert!(err.is_err());
        assert!(rx.try_recv().is_err(), "failed mutation must not broadcast");
    }

    #[tokio::test]
    async fn save_sheet_refreshes_roster() {
        let coordinator = coordinator();
        let created = coordinator.create_table(None).unwrap();
        let join = coordinator
            .resolve_join(&created.table_id, "Alice", None)
            .unwrap();
        let (_conn, mut rx) = member(&coordinator, "c1", &created.table_id).await;
        let _ = recv_event(&mut rx);

        let data: SheetData = serde_json::from_str(r#"{"HP":12}"#).unwrap();
        coordinator.save_sheet(&join.player_id, &data).await.unwrap();

        let event = recv_event(&mut rx);
        assert_eq!(event["type"], "players_updated");
        assert_eq!(event["data"][0]["data"]["HP"], 12);
    }

    #[tokio::test]
    async fn post_message_broadcasts_exactly_the_new_entry() {
        let coordinator = coordinator();
        let created = coordinator.create_table(None).unwrap();
        let (_conn, mut rx) = member(&coordinator, "c1", &created.table_id).await;
        let _ = recv_event(&mut rx);

        let entry = coordinator
            .post_message(NewFeedEntry {
                table_id: created.table_id.clone(),
                kind: FeedKind::Monster,
                sender: "GM".into(),
                is_gm: true,
                content: json!({"name": "Goblin", "hp": 7}),
            })
            .await
            .unwrap();

        let event = recv_event(&mut rx);
        assert_eq!(event["type"], "new_feed_item");
        assert_eq!(event["data"]["id"], entry.id);
        assert_eq!(event["data"]["content"]["hp"], 7);

        // The durable write happened before the broadcast: a snapshot
        // taken now already contains the entry.
        let snapshot = coordinator
            .load_snapshot(&created.table_id, "whoever")
            .unwrap();
        assert_eq!(snapshot.feed.last().unwrap().id, entry.id);
    }

    #[tokio::test]
    async fn events_stay_within_their_table_group() {
        let coordinator = coordinator();
        let table_a = coordinator.create_table(None).unwrap();
        let table_b = coordinator.create_table(None).unwrap();
        let (_conn_a, mut rx_a) = member(&coordinator, "a", &table_a.table_id).await;
        let (_conn_b, mut rx_b) = member(&coordinator, "b", &table_b.table_id).await;
        let _ = recv_event(&mut rx_a);
        let _ = recv_event(&mut rx_b);

        let _ = coordinator
            .post_message(NewFeedEntry {
                table_id: table_a.table_id.clone(),
                kind: FeedKind::Chat,
                sender: "Alice".into(),
                is_gm: false,
                content: json!("only for table A"),
            })
            .await
            .unwrap();

        assert_eq!(recv_event(&mut rx_a)["type"], "new_feed_item");
        assert!(rx_b.try_recv().is_err());
    }

    #[tokio::test]
    async fn inventory_intents_do_not_broadcast() {
        let coordinator = coordinator();
        let created = coordinator.create_table(None).unwrap();
        let join = coordinator
            .resolve_join(&created.table_id, "Alice", None)
            .unwrap();
        let (_conn, mut rx) = member(&coordinator, "c1", &created.table_id).await;
        let _ = recv_event(&mut rx);

        let items: Vec<InventoryItem> = serde_json::from_str(r#"[{"name":"Rope"}]"#).unwrap();
        coordinator.save_inventory(&join.player_id, &items).unwrap();
        assert_eq!(coordinator.get_inventory(&join.player_id).unwrap(), items);

        assert!(rx.try_recv().is_err(), "inventories are private");
    }
}
