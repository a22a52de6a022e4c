//! Table repository — CRUD for the `tables` table.
//!
//! A table is one game session: the share code, the GM secret, the display
//! name, and the sheet schema (stored as a JSON array string).

use rusqlite::{params, Connection, OptionalExtension};

use crate::errors::Result;
use crate::sqlite::row_types::TableRow;

/// Table repository — stateless, every method takes `&Connection`.
pub struct TableRepo;

impl TableRepo {
    /// Insert a new table with an empty schema.
    ///
    /// Fails with a constraint violation if the id already exists; the
    /// store layer re-derives the code and retries.
    pub fn create(conn: &Connection, id: &str, name: Option<&str>, gm_code: &str) -> Result<()> {
        let _ = conn.execute(
            "INSERT INTO tables (id, name, gm_code, schema) VALUES (?1, ?2, ?3, '[]')",
            params![id, name, gm_code],
        )?;
        Ok(())
    }

    /// Get a table by id.
    pub fn get_by_id(conn: &Connection, table_id: &str) -> Result<Option<TableRow>> {
        let row = conn
            .query_row(
                "SELECT id, name, gm_code, schema FROM tables WHERE id = ?1",
                params![table_id],
                |row| {
                    Ok(TableRow {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        gm_code: row.get(2)?,
                        schema: row.get(3)?,
                    })
                },
            )
            .optional()?;
        Ok(row)
    }

    /// Overwrite the table's schema. Returns `true` if a row was updated.
    pub fn update_schema(conn: &Connection, table_id: &str, schema_json: &str) -> Result<bool> {
        let changed = conn.execute(
            "UPDATE tables SET schema = ?1 WHERE id = ?2",
            params![schema_json, table_id],
        )?;
        Ok(changed > 0)
    }

    /// Check if a table exists.
    pub fn exists(conn: &Connection, table_id: &str) -> Result<bool> {
        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM tables WHERE id = ?1)",
            params![table_id],
            |row| row.get(0),
        )?;
        Ok(exists)
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

    #[test]
    fn create_and_get() {
        let conn = setup();
        TableRepo::create(&conn, "AB12CD", Some("Friday Night"), "secret99").unwrap();

        let row = TableRepo::get_by_id(&conn, "AB12CD").unwrap().unwrap();
        assert_eq!(row.id, "AB12CD");
        assert_eq!(row.name.as_deref(), Some("Friday Night"));
        assert_eq!(row.gm_code, "secret99");
        assert_eq!(row.schema, "[]");
    }

    #[test]
    fn create_without_name() {
        let conn = setup();
        TableRepo::create(&conn, "AB12CD", None, "secret99").unwrap();
        let row = TableRepo::get_by_id(&conn, "AB12CD").unwrap().unwrap();
        assert!(row.name.is_none());
    }

    #[test]
    fn duplicate_id_fails() {
        let conn = setup();
        TableRepo::create(&conn, "AB12CD", None, "a").unwrap();
        assert!(TableRepo::create(&conn, "AB12CD", None, "b").is_err());
    }

    #[test]
    fn get_missing_returns_none() {
        let conn = setup();
        assert!(TableRepo::get_by_id(&conn, "NOPE").unwrap().is_none());
    }

    #[test]
    fn update_schema_overwrites() {
        let conn = setup();
        TableRepo::create(&conn, "AB12CD", None, "a").unwrap();

        let updated =
            TableRepo::update_schema(&conn, "AB12CD", r#"[{"title":"Stats","fields":[]}]"#)
                .unwrap();
        assert!(updated);

        let row = TableRepo::get_by_id(&conn, "AB12CD").unwrap().unwrap();
        assert!(row.schema.contains("Stats"));
    }

    #[test]
    fn update_schema_missing_table() {
        let conn = setup();
        let updated = TableRepo::update_schema(&conn, "NOPE", "[]").unwrap();
        assert!(!updated);
    }

    #[test]
    fn exists_reflects_rows() {
        let conn = setup();
        assert!(!TableRepo::exists(&conn, "AB12CD").unwrap());
        TableRepo::create(&conn, "AB12CD", None, "a").unwrap();
        assert!(TableRepo::exists(&conn, "AB12CD").unwrap());
    }
}
