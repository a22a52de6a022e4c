//! # tavern-core
//!
//! Foundation types for the Tavern session server.
//!
//! This crate provides the shared vocabulary the store and server crates
//! depend on:
//!
//! - **Ids**: [`ids`] — short table codes, GM secrets, deterministic player ids
//! - **Schema**: [`schema::SchemaSection`] and [`schema::SchemaField`] — the
//!   GM-defined character-sheet structure
//! - **Values**: [`values::FieldValue`] — the closed shape for sheet data and
//!   item attributes (string, number, nested string-keyed mapping)
//! - **Entities**: [`entities::Player`], [`entities::InventoryItem`],
//!   [`entities::FeedEntry`] — the persisted domain objects
//! - **Events**: [`events::TableEvent`] — state-change events broadcast to a
//!   table group
//!
//! ## Crate Position
//!
//! Foundation crate. Depended on by `tavern-store` and `tavern-server`.

#![deny(unsafe_code)]

pub mod entities;
pub mod events;
pub mod ids;
pub mod schema;
pub mod values;
