//! # tavern-server
//!
//! HTTP + WebSocket transport, the session coordinator, and table broadcast
//! for the Tavern session server.
//!
//! - **[`coordinator`]**: the orchestration core — every client intent is
//!   validate → durable mutation → broadcast, in that order
//! - **[`websocket`]**: per-connection state, upgrade/read/write loops with
//!   heartbeat, and the table-scoped fan-out manager
//! - **[`rpc`]**: the WebSocket channel protocol — request/response framing,
//!   error codes, and the `join_table` / `send_message` methods
//! - **[`api`]**: the JSON HTTP API (create/join/snapshot/saves/inventory/view)
//! - **[`server`]**: router assembly, shared state, listen/serve
//! - **[`config`]**, **[`health`]**, **[`shutdown`]**: ambient plumbing

#![deny(unsafe_code)]

pub mod api;
pub mod config;
pub mod coordinator;
pub mod health;
pub mod rpc;
pub mod server;
pub mod shutdown;
pub mod websocket;
