//! Persisted domain entities: players, inventory items, and feed entries.
//!
//! These are the public shapes the store returns and the server broadcasts.
//! Raw database rows (JSON still serialized as text) live in the store crate;
//! conversion happens at the repository boundary.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::values::{AttrMap, SheetData};

/// A participant's persistent identity within one table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    /// Deterministic id — `"{name}-{tableId}"`, or `"GM-{tableId}"` for the GM.
    pub id: String,
    /// Owning table.
    pub table_id: String,
    /// Display name chosen at join.
    pub name: String,
    /// Filled-in sheet values keyed by field name. May hold keys for fields
    /// no longer in the current schema.
    pub data: SheetData,
}

/// One item in a player's inventory.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryItem {
    /// Item name.
    pub name: String,
    /// Short description.
    #[serde(default)]
    pub desc: String,
    /// Image URL or embedded base64 data.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Free-form attributes (damage, weight, charges, ...).
    #[serde(default)]
    pub attributes: AttrMap,
    /// Player notes.
    #[serde(default)]
    pub notes: String,
}

/// The kind tag of a feed entry; decides how clients render `content`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedKind {
    /// Plain chat message.
    Chat,
    /// Shared image.
    Image,
    /// Monster card.
    Monster,
    /// Item card.
    Item,
    /// Condition applied to a player.
    Condition,
    /// Scenario description.
    Scenario,
}

impl FeedKind {
    /// Stable string form, used as the database tag.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Chat => "chat",
            Self::Image => "image",
            Self::Monster => "monster",
            Self::Item => "item",
            Self::Condition => "condition",
            Self::Scenario => "scenario",
        }
    }
}

impl fmt::Display for FeedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for an unrecognized feed kind tag.
#[derive(Debug, thiserror::Error)]
#[error("unknown feed kind: {0}")]
pub struct UnknownFeedKind(pub String);

impl FromStr for FeedKind {
    type Err = UnknownFeedKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "chat" => Ok(Self::Chat),
            "image" => Ok(Self::Image),
            "monster" => Ok(Self::Monster),
            "item" => Ok(Self::Item),
            "condition" => Ok(Self::Condition),
            "scenario" => Ok(Self::Scenario),
            other => Err(UnknownFeedKind(other.to_owned())),
        }
    }
}

/// An immutable, append-only event in a table's feed.
///
/// `id` is assigned by the store and defines the canonical replay order
/// within the table. Entries are never mutated or deleted.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedEntry {
    /// Auto-incrementing id; ascending order is replay order.
    pub id: i64,
    /// Owning table.
    pub table_id: String,
    /// Kind tag.
    #[serde(rename = "type")]
    pub kind: FeedKind,
    /// Sender display name.
    pub sender: String,
    /// Whether the sender was the GM.
    pub is_gm: bool,
    /// Free-form structured payload; shape depends on `kind`.
    pub content: Value,
    /// RFC 3339 creation timestamp.
    pub timestamp: String,
}

/// Input for appending a feed entry (id and timestamp are store-assigned).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewFeedEntry {
    /// Target table.
    pub table_id: String,
    /// Kind tag.
    #[serde(rename = "type")]
    pub kind: FeedKind,
    /// Sender display name.
    pub sender: String,
    /// Whether the sender is the GM.
    #[serde(default)]
    pub is_gm: bool,
    /// Free-form payload.
    pub content: Value,
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
