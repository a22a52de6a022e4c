//! Feed repository — the append-only, table-scoped event log.
//!
//! Rows are never updated or deleted; the autoincrement id is the canonical
//! replay order within a table.

use rusqlite::{params, Connection};

use crate::errors::Result;
use crate::sqlite::row_types::FeedRow;

/// Feed repository — stateless, every method takes `&Connection`.
pub struct FeedRepo;

impl FeedRepo {
    /// Append an entry and return it with its assigned id.
    pub fn append(
        conn: &Connection,
        table_id: &str,
        kind: &str,
        sender: &str,
        is_gm: bool,
        content_json: &str,
        timestamp: &str,
    ) -> Result<FeedRow> {
        let _ = conn.execute(
            "INSERT INTO feed (table_id, type, sender, is_gm, content, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![table_id, kind, sender, is_gm, content_json, timestamp],
        )?;
        Ok(FeedRow {
            id: conn.last_insert_rowid(),
            table_id: table_id.to_owned(),
            kind: kind.to_owned(),
            sender: sender.to_owned(),
            is_gm,
            content: content_json.to_owned(),
            timestamp: timestamp.to_owned(),
        })
    }

    /// The full feed of a table in ascending id order.
    pub fn list_by_table(conn: &Connection, table_id: &str) -> Result<Vec<FeedRow>> {
        let mut stmt = conn.prepare(
            "SELECT id, table_id, type, sender, is_gm, content, timestamp
             FROM feed WHERE table_id = ?1 ORDER BY id ASC",
        )?;
        let rows = stmt
            .query_map(params![table_id], |row| {
                Ok(FeedRow {
                    id: row.get(0)?,
                    table_id: row.get(1)?,
                    kind: row.get(2)?,
                    sender: row.get(3)?,
                    is_gm: row.get(4)?,
                    content: row.get(5)?,
                    timestamp: row.get(6)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(unused_results)]
mod tests {
    use super::*;
    use crate::sqlite::repositories::test_support::setup;

    const TS: &str = "2026-08-07T12:00:00Z";

    #[test]
    fn append_assigns_increasing_ids() {
        let conn = setup();
        let a = FeedRepo::append(&conn, "T1", "chat", "Alice", false, "\"hi\"", TS).unwrap();
        let b = FeedRepo::append(&conn, "T1", "chat", "Bob", false, "\"yo\"", TS).unwrap();
        assert!(b.id > a.id);
    }

    #[test]
    fn list_returns_ascending_order() {
        let conn = setup();
        for i in 0..5 {
            FeedRepo::append(&conn, "T1", "chat", "Alice", false, &format!("\"m{i}\""), TS)
                .unwrap();
        }

        let feed = FeedRepo::list_by_table(&conn, "T1").unwrap();
        assert_eq!(feed.len(), 5);
        let ids: Vec<i64> = feed.iter().map(|r| r.id).collect();
        let mut sorted = ids.clone();
        sorted.sort_unstable();
        assert_eq!(ids, sorted);
    }

    #[test]
    fn list_is_table_scoped() {
        let conn = setup();
        FeedRepo::append(&conn, "T1", "chat", "Alice", false, "\"a\"", TS).unwrap();
        FeedRepo::append(&conn, "T2", "chat", "Bob", false, "\"b\"", TS).unwrap();

        let feed = FeedRepo::list_by_table(&conn, "T1").unwrap();
        assert_eq!(feed.len(), 1);
        assert_eq!(feed[0].sender, "Alice");
    }

    #[test]
    fn gm_flag_roundtrips() {
        let conn = setup();
        FeedRepo::append(&conn, "T1", "monster", "GM", true, "{}", TS).unwrap();
        let feed = FeedRepo::list_by_table(&conn, "T1").unwrap();
        assert!(feed[0].is_gm);
        assert_eq!(feed[0].kind, "monster");
    }

    #[test]
    fn empty_table_feed() {
        let conn = setup();
        assert!(FeedRepo::list_by_table(&conn, "T1").unwrap().is_empty());
    }
}
