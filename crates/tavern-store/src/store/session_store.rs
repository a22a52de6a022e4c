//! The high-level session repository.
//!
//! Every method gets a pooled connection, performs its SQL through the
//! stateless repositories, and (de)serializes JSON columns at this boundary —
//! callers never see raw serialized text.
//!
//! INVARIANT: mutations take the in-process write lock for their full
//! duration, so a save never interleaves with another save's partial state
//! and the one-row-per-player inventory invariant holds even under
//! concurrent saves from the same player's multiple connections. Lock
//! ordering is fixed: write lock first, pooled connection second. The
//! unique index remains the backstop for a second process on the same
//! database file.

use std::sync::{Mutex, MutexGuard};

use serde::Serialize;
use tracing::{debug, instrument};

use tavern_core::entities::{FeedEntry, InventoryItem, NewFeedEntry, Player};
use tavern_core::ids;
use tavern_core::schema::{SchemaSection, SheetSchema};
use tavern_core::values::SheetData;

use crate::errors::{Result, StoreError};
use crate::sqlite::connection::ConnectionPool;
use crate::sqlite::repositories::feed::FeedRepo;
use crate::sqlite::repositories::inventory::InventoryRepo;
use crate::sqlite::repositories::player::PlayerRepo;
use crate::sqlite::repositories::table::TableRepo;
use crate::sqlite::row_types::{FeedRow, PlayerRow};

/// Result of creating a new table.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedTable {
    /// The share code players join with.
    pub table_id: String,
    /// The GM secret. Returned exactly once, at creation.
    pub gm_code: String,
    /// Display name (defaulted when none was supplied).
    pub name: String,
}

/// Result of resolving a join request.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinOutcome {
    /// Echoed table id.
    pub table_id: String,
    /// Whether the supplied code matched the stored GM secret.
    pub is_gm: bool,
    /// Deterministic player identity for this join.
    pub player_id: String,
    /// Current sheet schema.
    pub schema: SheetSchema,
    /// Table display name.
    pub table_name: Option<String>,
}

/// The state a newly joined or reconnecting client needs to render.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableSnapshot {
    /// Current sheet schema (empty when the table is unknown).
    pub schema: SheetSchema,
    /// Table display name.
    pub table_name: Option<String>,
    /// The requesting player's sheet (empty mapping when absent).
    pub sheet_data: SheetData,
    /// Full feed history in ascending id order.
    pub feed: Vec<FeedEntry>,
}

/// Reduced player shape for the GM's inspection view.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerProfile {
    /// Player id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Current sheet data.
    pub data: SheetData,
}

/// Point-in-time GM view of one player: sheet plus inventory.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerView {
    /// The player's identity and sheet.
    pub player: PlayerProfile,
    /// The player's current items.
    pub inventory: Vec<InventoryItem>,
}

/// How many times table creation re-derives the code on a key collision.
const CREATE_TABLE_MAX_ATTEMPTS: u32 = 16;

/// High-level session store wrapping a connection pool and all repositories.
pub struct SessionStore {
    pool: ConnectionPool,
    write_lock: Mutex<()>,
}

impl SessionStore {
    /// Create a new store over the given pool.
    pub fn new(pool: ConnectionPool) -> Self {
        Self {
            pool,
            write_lock: Mutex::new(()),
        }
    }

    fn lock_write(&self) -> Result<MutexGuard<'_, ()>> {
        self.write_lock
            .lock()
            .map_err(|_| StoreError::Internal("write lock poisoned".into()))
    }

    /// Create a table with freshly generated codes and an empty schema.
    ///
    /// Re-derives the table code on a detected primary-key collision.
    #[instrument(skip(self))]
    pub fn create_table(&self, name: Option<&str>) -> Result<CreatedTable> {
        let _guard = self.lock_write()?;
        let conn = self.pool.get()?;

        for _ in 0..CREATE_TABLE_MAX_ATTEMPTS {
            let table_id = ids::generate_table_code();
            let gm_code = ids::generate_gm_code();
            let resolved_name = name.map_or_else(|| format!("Table {table_id}"), str::to_owned);

            match TableRepo::create(&conn, &table_id, Some(resolved_name.as_str()), &gm_code) {
                Ok(()) => {
                    debug!(table_id, "table created");
                    return Ok(CreatedTable {
                        table_id,
                        gm_code,
                        name: resolved_name,
                    });
                }
                Err(StoreError::Sqlite(e)) if is_constraint_violation(&e) => {
                    debug!(table_id, "table code collision, re-deriving");
                }
                Err(e) => return Err(e),
            }
        }

        Err(StoreError::Internal(
            "could not allocate a unique table code".into(),
        ))
    }

    /// Resolve a join: GM check, deterministic player id, row creation.
    ///
    /// The player row is insert-if-absent — reconnecting with the same name
    /// never overwrites previously saved sheet data.
    #[instrument(skip(self, gm_code))]
    pub fn resolve_join(
        &self,
        table_id: &str,
        name: &str,
        gm_code: Option<&str>,
    ) -> Result<JoinOutcome> {
        // Lock before the connection, like every mutating path: the
        // non-GM branch inserts the player row.
        let _guard = self.lock_write()?;
        let conn = self.pool.get()?;
        let table = TableRepo::get_by_id(&conn, table_id)?
            .ok_or_else(|| StoreError::TableNotFound(table_id.to_owned()))?;

        let is_gm = gm_code == Some(table.gm_code.as_str());
        let player_id = if is_gm {
            ids::gm_player_id(table_id)
        } else {
            ids::player_id(name, table_id)
        };

        if !is_gm {
            let _ = PlayerRepo::insert_if_absent(&conn, &player_id, table_id, name)?;
        }

        let schema: SheetSchema = serde_json::from_str(&table.schema)?;
        debug!(table_id, player_id, is_gm, "join resolved");

        Ok(JoinOutcome {
            table_id: table_id.to_owned(),
            is_gm,
            player_id,
            schema,
            table_name: table.name,
        })
    }

    /// Aggregate the reconnect snapshot: schema, the player's sheet, and the
    /// full ordered feed.
    ///
    /// Permissive on an unknown table (empty schema, no name) so a stale
    /// client bookmark renders an empty table instead of an error page.
    #[instrument(skip(self))]
    pub fn load_snapshot(&self, table_id: &str, player_id: &str) -> Result<TableSnapshot> {
        let conn = self.pool.get()?;

        let (schema, table_name) = match TableRepo::get_by_id(&conn, table_id)? {
            Some(table) => (serde_json::from_str(&table.schema)?, table.name),
            None => (SheetSchema::new(), None),
        };

        let sheet_data = match PlayerRepo::get_by_id(&conn, player_id)? {
            Some(row) => serde_json::from_str(&row.data)?,
            None => SheetData::new(),
        };

        let feed = FeedRepo::list_by_table(&conn, table_id)?
            .into_iter()
            .map(feed_entry_from_row)
            .collect::<Result<Vec<_>>>()?;

        Ok(TableSnapshot {
            schema,
            table_name,
            sheet_data,
            feed,
        })
    }

    /// Overwrite the table's schema. Existing sheet data is untouched — old
    /// field values persist even when their fields are removed.
    #[instrument(skip(self, schema))]
    pub fn save_schema(&self, table_id: &str, schema: &[SchemaSection]) -> Result<()> {
        let json = serde_json::to_string(schema)?;
        let _guard = self.lock_write()?;
        let conn = self.pool.get()?;

        if !TableRepo::update_schema(&conn, table_id, &json)? {
            return Err(StoreError::TableNotFound(table_id.to_owned()));
        }
        Ok(())
    }

    /// Overwrite a player's sheet data. Returns the owning table id so the
    /// caller can broadcast the roster update.
    #[instrument(skip(self, data))]
    pub fn save_sheet(&self, player_id: &str, data: &SheetData) -> Result<String> {
        let json = serde_json::to_string(data)?;
        let _guard = self.lock_write()?;
        let conn = self.pool.get()?;

        if !PlayerRepo::update_data(&conn, player_id, &json)? {
            return Err(StoreError::PlayerNotFound(player_id.to_owned()));
        }

        PlayerRepo::table_id(&conn, player_id)?
            .ok_or_else(|| StoreError::Internal(format!("player {player_id} lost its table")))
    }

    /// All players of a table with parsed sheet data.
    #[instrument(skip(self))]
    pub fn list_players(&self, table_id: &str) -> Result<Vec<Player>> {
        let conn = self.pool.get()?;
        PlayerRepo::list_by_table(&conn, table_id)?
            .into_iter()
            .map(player_from_row)
            .collect()
    }

    /// The player's current items; lazily creates an empty inventory for a
    /// known player, and returns an empty list for an unknown one.
    #[instrument(skip(self))]
    pub fn get_inventory(&self, player_id: &str) -> Result<Vec<InventoryItem>> {
        // Lock before the connection: the miss path inserts the empty row.
        let _guard = self.lock_write()?;
        let conn = self.pool.get()?;

        if let Some(row) = InventoryRepo::latest_by_player(&conn, player_id)? {
            return Ok(serde_json::from_str(&row.items)?);
        }

        if let Some(table_id) = PlayerRepo::table_id(&conn, player_id)? {
            InventoryRepo::insert(&conn, player_id, &table_id, "[]")?;
        }

        Ok(Vec::new())
    }

    /// Overwrite a player's inventory, guaranteeing exactly one row per
    /// player afterwards (update, then conditional insert, then last-write
    /// update if the insert lost a race against a concurrent save).
    #[instrument(skip(self, items))]
    pub fn save_inventory(&self, player_id: &str, items: &[InventoryItem]) -> Result<()> {
        let json = serde_json::to_string(items)?;
        let _guard = self.lock_write()?;
        let conn = self.pool.get()?;
        let table_id = PlayerRepo::table_id(&conn, player_id)?
            .ok_or_else(|| StoreError::PlayerNotFound(player_id.to_owned()))?;

        if InventoryRepo::update_items(&conn, player_id, &json)? {
            return Ok(());
        }
        match InventoryRepo::insert(&conn, player_id, &table_id, &json) {
            Ok(()) => Ok(()),
            Err(StoreError::Sqlite(e)) if is_constraint_violation(&e) => {
                let _ = InventoryRepo::update_items(&conn, player_id, &json)?;
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Append a feed entry; returns it with its assigned id and timestamp.
    #[instrument(skip(self, entry), fields(table_id = %entry.table_id, kind = %entry.kind))]
    pub fn append_feed(&self, entry: &NewFeedEntry) -> Result<FeedEntry> {
        let content_json = serde_json::to_string(&entry.content)?;
        let timestamp = chrono::Utc::now().to_rfc3339();

        let _guard = self.lock_write()?;
        let conn = self.pool.get()?;
        let row = FeedRepo::append(
            &conn,
            &entry.table_id,
            entry.kind.as_str(),
            &entry.sender,
            entry.is_gm,
            &content_json,
            &timestamp,
        )?;

        Ok(FeedEntry {
            id: row.id,
            table_id: row.table_id,
            kind: entry.kind,
            sender: row.sender,
            is_gm: row.is_gm,
            content: entry.content.clone(),
            timestamp: row.timestamp,
        })
    }

    /// Point-in-time GM view of one player: sheet plus inventory.
    #[instrument(skip(self))]
    pub fn player_view(&self, player_id: &str) -> Result<PlayerView> {
        let conn = self.pool.get()?;
        let row = PlayerRepo::get_by_id(&conn, player_id)?
            .ok_or_else(|| StoreError::PlayerNotFound(player_id.to_owned()))?;

        let inventory = match InventoryRepo::latest_by_player(&conn, player_id)? {
            Some(inv) => serde_json::from_str(&inv.items)?,
            None => Vec::new(),
        };

        Ok(PlayerView {
            player: PlayerProfile {
                id: row.id,
                name: row.name,
                data: serde_json::from_str(&row.data)?,
            },
            inventory,
        })
    }
}

fn player_from_row(row: PlayerRow) -> Result<Player> {
    Ok(Player {
        id: row.id,
        table_id: row.table_id,
        name: row.name,
        data: serde_json::from_str(&row.data)?,
    })
}

fn feed_entry_from_row(row: FeedRow) -> Result<FeedEntry> {
    let kind = row
        .kind
        .parse()
        .map_err(|e| StoreError::Internal(format!("corrupt feed row {}: {e}", row.id)))?;
    Ok(FeedEntry {
        id: row.id,
        table_id: row.table_id,
        kind,
        sender: row.sender,
        is_gm: row.is_gm,
        content: serde_json::from_str(&row.content)?,
        timestamp: row.timestamp,
    })
}

fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
