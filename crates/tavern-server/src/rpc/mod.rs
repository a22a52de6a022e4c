//! WebSocket channel protocol.
//!
//! Requests are framed as `{id, method, params}` and answered with
//! `{id, success, result|error}`; the server additionally pushes
//! `{type, tableId, timestamp, data}` events to table groups.
//!
//! | Module | Purpose |
//! |--------|---------|
//! | `types` | Wire-format request/response/event structs |
//! | `errors` | Error codes and the handler error type |
//! | `registry` | Method name → handler dispatch with timeout |
//! | `handlers` | `join_table` and `send_message` |

pub mod errors;
pub mod handlers;
pub mod registry;
pub mod types;
