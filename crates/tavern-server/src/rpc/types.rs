//! RPC wire-format types for the WebSocket channel.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use tavern_core::events::TableEvent;

/// Incoming RPC request from a client.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcRequest {
    /// Unique request identifier.
    pub id: String,
    /// Method name (`join_table`, `send_message`).
    pub method: String,
    /// Optional parameters value. `join_table` accepts either a bare table
    /// id string or an object, so this stays opaque here.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

/// Outgoing RPC response to a client.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RpcResponse {
    /// Echoed request identifier.
    pub id: String,
    /// Whether the call succeeded.
    pub success: bool,
    /// Result payload (present when `success == true`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Error payload (present when `success == false`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcErrorBody>,
}

/// Structured error body inside an [`RpcResponse`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RpcErrorBody {
    /// Machine-readable error code (e.g. `TABLE_NOT_FOUND`).
    pub code: String,
    /// Human-readable message.
    pub message: String,
}

/// Server-pushed event delivered to every member of a table group.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerEvent {
    /// Event type (`players_updated`, `schema_updated`, `new_feed_item`).
    #[serde(rename = "type")]
    pub event_type: String,
    /// The table this event belongs to.
    pub table_id: String,
    /// ISO-8601 timestamp.
    pub timestamp: String,
    /// Event payload.
    pub data: Value,
}

impl RpcResponse {
    /// Build a success response.
    pub fn success(id: impl Into<String>, result: Value) -> Self {
        Self {
            id: id.into(),
            success: true,
            result: Some(result),
            error: None,
        }
    }

    /// Build an error response.
    pub fn error(
        id: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            success: false,
            result: None,
            error: Some(RpcErrorBody {
                code: code.into(),
                message: message.into(),
            }),
        }
    }
}

impl ServerEvent {
    /// Wrap a [`TableEvent`] for the wire with the current UTC timestamp.
    pub fn from_table_event(table_id: &str, event: &TableEvent) -> serde_json::Result<Self> {
        Ok(Self {
            event_type: event.event_type().to_owned(),
            table_id: table_id.to_owned(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            data: event.payload()?,
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
