//! Player repository — CRUD for the `players` table.
//!
//! Player ids are caller-derived (see `tavern_core::ids`), so inserts are
//! `INSERT OR IGNORE`: joining twice with the same name never clobbers the
//! sheet data saved under that identity.

use rusqlite::{params, Connection, OptionalExtension};

use crate::errors::Result;
use crate::sqlite::row_types::PlayerRow;

/// Player repository — stateless, every method takes `&Connection`.
pub struct PlayerRepo;

impl PlayerRepo {
    /// Insert a player row if absent. Existing sheet data is never touched.
    ///
    /// Returns `true` if a new row was inserted.
    pub fn insert_if_absent(
        conn: &Connection,
        id: &str,
        table_id: &str,
        name: &str,
    ) -> Result<bool> {
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO players (id, table_id, name, data) VALUES (?1, ?2, ?3, '{}')",
            params![id, table_id, name],
        )?;
        Ok(inserted > 0)
    }

    /// Get a player by id.
    pub fn get_by_id(conn: &Connection, player_id: &str) -> Result<Option<PlayerRow>> {
        let row = conn
            .query_row(
                "SELECT id, table_id, name, data FROM players WHERE id = ?1",
                params![player_id],
                Self::map_row,
            )
            .optional()?;
        Ok(row)
    }

    /// Overwrite a player's sheet data. Returns `true` if a row was updated.
    pub fn update_data(conn: &Connection, player_id: &str, data_json: &str) -> Result<bool> {
        let changed = conn.execute(
            "UPDATE players SET data = ?1 WHERE id = ?2",
            params![data_json, player_id],
        )?;
        Ok(changed > 0)
    }

    /// The owning table id for a player, if the player exists.
    pub fn table_id(conn: &Connection, player_id: &str) -> Result<Option<String>> {
        let table_id = conn
            .query_row(
                "SELECT table_id FROM players WHERE id = ?1",
                params![player_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(table_id)
    }

    /// All players of a table, in insertion (rowid) order.
    pub fn list_by_table(conn: &Connection, table_id: &str) -> Result<Vec<PlayerRow>> {
        let mut stmt = conn.prepare(
            "SELECT id, table_id, name, data FROM players WHERE table_id = ?1 ORDER BY rowid",
        )?;
        let rows = stmt
            .query_map(params![table_id], Self::map_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn map_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<PlayerRow> {
        Ok(PlayerRow {
            id: row.get(0)?,
            table_id: row.get(1)?,
            name: row.get(2)?,
            data: row.get(3)?,
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
