//! Inventory repository — one live row per player.
//!
//! Historical deployments could hold duplicate rows per player; reads
//! therefore take the highest internal id (the most recent write). The
//! migration collapses old duplicates and installs a unique index, so
//! writes after that see exactly one row.

use rusqlite::{params, Connection, OptionalExtension};

use crate::errors::Result;
use crate::sqlite::row_types::InventoryRow;

/// Inventory repository — stateless, every method takes `&Connection`.
pub struct InventoryRepo;

impl InventoryRepo {
    /// The latest inventory row for a player (highest id wins on duplicates).
    pub fn latest_by_player(conn: &Connection, player_id: &str) -> Result<Option<InventoryRow>> {
        let row = conn
            .query_row(
                "SELECT id, player_id, table_id, items FROM inventories
                 WHERE player_id = ?1 ORDER BY id DESC LIMIT 1",
                params![player_id],
                |row| {
                    Ok(InventoryRow {
                        id: row.get(0)?,
                        player_id: row.get(1)?,
                        table_id: row.get(2)?,
                        items: row.get(3)?,
                    })
                },
            )
            .optional()?;
        Ok(row)
    }

    /// Overwrite a player's items. Returns `true` if a row was updated.
    pub fn update_items(conn: &Connection, player_id: &str, items_json: &str) -> Result<bool> {
        let changed = conn.execute(
            "UPDATE inventories SET items = ?1 WHERE player_id = ?2",
            params![items_json, player_id],
        )?;
        Ok(changed > 0)
    }

    /// Insert a fresh inventory row.
    ///
    /// Fails with a constraint violation if one already exists for the
    /// player; the store layer treats that as a lost race and retries as an
    /// update.
    pub fn insert(
        conn: &Connection,
        player_id: &str,
        table_id: &str,
        items_json: &str,
    ) -> Result<()> {
        let _ = conn.execute(
            "INSERT INTO inventories (player_id, table_id, items) VALUES (?1, ?2, ?3)",
            params![player_id, table_id, items_json],
        )?;
        Ok(())
    }

    /// Count rows for a player (should be 0 or 1 after the migration).
    pub fn count_for_player(conn: &Connection, player_id: &str) -> Result<i64> {
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM inventories WHERE player_id = ?1",
            params![player_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
