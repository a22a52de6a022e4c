//! Database row types for mapping between `SQLite` rows and Rust structs.
//!
//! These represent the raw row shape — JSON-bearing columns are still
//! serialized text here. Conversion to the public types (e.g.
//! [`tavern_core::entities::Player`]) happens in the repository layer.

/// Raw table row from the `tables` table.
#[derive(Clone, Debug)]
pub struct TableRow {
    /// Table code.
    pub id: String,
    /// Display name.
    pub name: Option<String>,
    /// GM secret code.
    pub gm_code: String,
    /// Sheet schema as a JSON array string.
    pub schema: String,
}

/// Raw player row from the `players` table.
#[derive(Clone, Debug)]
pub struct PlayerRow {
    /// Player id.
    pub id: String,
    /// Owning table.
    pub table_id: String,
    /// Display name.
    pub name: String,
    /// Sheet data as a JSON object string.
    pub data: String,
}

/// Raw inventory row from the `inventories` table.
#[derive(Clone, Debug)]
pub struct InventoryRow {
    /// Internal autoincrement id; the highest id per player is the live row.
    pub id: i64,
    /// Owning player.
    pub player_id: String,
    /// Owning table.
    pub table_id: String,
    /// Items as a JSON array string.
    pub items: String,
}

/// Raw feed row from the `feed` table.
#[derive(Clone, Debug)]
pub struct FeedRow {
    /// Autoincrement id; ascending order is replay order.
    pub id: i64,
    /// Owning table.
    pub table_id: String,
    /// Kind tag.
    pub kind: String,
    /// Sender display name.
    pub sender: String,
    /// GM flag (0/1 in the database).
    pub is_gm: bool,
    /// Content as a JSON string.
    pub content: String,
    /// RFC 3339 timestamp.
    pub timestamp: String,
}
