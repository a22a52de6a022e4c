//! # tavern-store
//!
//! `SQLite` persistence for the Tavern session server.
//!
//! Responsible for:
//!
//! - **Connection pooling**: `r2d2` + `rusqlite` with WAL mode, foreign keys,
//!   and a busy timeout on every connection
//! - **Migrations**: version-tracked SQL schema evolution, embedded at compile
//!   time — including the duplicate-inventory collapse that precedes the
//!   per-player uniqueness constraint
//! - **Repositories**: stateless structs over `&Connection` for tables,
//!   players, inventories, and the feed
//! - **[`SessionStore`]**: the high-level session repository — join
//!   resolution, snapshot aggregation, schema/sheet/inventory saves, feed
//!   append — with JSON (de)serialization confined to this boundary
//!
//! Callers never see raw serialized text: every JSON-bearing column is
//! deserialized before it is returned and serialized before it is stored.

#![deny(unsafe_code)]

pub mod errors;
pub mod sqlite;
pub mod store;

pub use errors::{Result, StoreError};
pub use sqlite::connection::{
    new_file, new_in_memory, ConnectionConfig, ConnectionPool, PooledConnection,
};
pub use sqlite::migrations::run_migrations;
pub use store::{
    CreatedTable, JoinOutcome, PlayerView, SessionStore, TableSnapshot,
};
