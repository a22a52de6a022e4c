//! State-change events broadcast to a table group.
//!
//! The coordinator produces one [`TableEvent`] per durable mutation; the
//! broadcaster serializes it once and fans it out to every connection
//! subscribed to the table. Events are transient — clients that miss one
//! recover via a full snapshot load on reconnect, never via replay.

use serde_json::Value;

use crate::entities::{FeedEntry, Player};
use crate::schema::SheetSchema;

/// Event type tag for a roster update.
pub const PLAYERS_UPDATED: &str = "players_updated";
/// Event type tag for a schema change.
pub const SCHEMA_UPDATED: &str = "schema_updated";
/// Event type tag for a freshly appended feed entry.
pub const NEW_FEED_ITEM: &str = "new_feed_item";

/// A state change to push to every member of a table group.
#[derive(Clone, Debug, PartialEq)]
pub enum TableEvent {
    /// The full current roster, sent after any join or sheet save.
    PlayersUpdated(Vec<Player>),
    /// The complete new schema after a GM edit.
    SchemaUpdated(SheetSchema),
    /// Exactly the one new feed entry (never the whole feed).
    NewFeedItem(FeedEntry),
}

impl TableEvent {
    /// The wire type tag for this event.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::PlayersUpdated(_) => PLAYERS_UPDATED,
            Self::SchemaUpdated(_) => SCHEMA_UPDATED,
            Self::NewFeedItem(_) => NEW_FEED_ITEM,
        }
    }

    /// The wire payload for this event.
    pub fn payload(&self) -> serde_json::Result<Value> {
        match self {
            Self::PlayersUpdated(players) => serde_json::to_value(players),
            Self::SchemaUpdated(schema) => serde_json::to_value(schema),
            Self::NewFeedItem(entry) => serde_json::to_value(entry),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::FeedKind;
    use serde_json::json;

    #[test]
    fn event_types_match_wire_names() {
        assert_eq!(TableEvent::PlayersUpdated(vec![]).event_type(), "players_updated");
        assert_eq!(TableEvent::SchemaUpdated(vec![]).event_type(), "schema_updated");
    }

    #[test]
    fn players_payload_is_array() {
        let event = TableEvent::PlayersUpdated(vec![]);
        assert_eq!(event.payload().unwrap(), json!([]));
    }

    #[test]
    fn new_feed_item_payload_is_single_entry() {
        let entry = FeedEntry {
            id: 1,
            table_id: "T".into(),
            kind: FeedKind::Chat,
            sender: "Alice".into(),
            is_gm: false,
            content: json!("hello"),
            timestamp: "2026-08-07T12:00:00Z".into(),
        };
        let event = TableEvent::NewFeedItem(entry);
        assert_eq!(event.event_type(), "new_feed_item");
        let payload = event.payload().unwrap();
        assert_eq!(payload["id"], 1);
        assert_eq!(payload["content"], "hello");
    }
}
