//! Channel method handlers: `join_table` and `send_message`.

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::instrument;

use tavern_core::entities::NewFeedEntry;

use crate::coordinator::JoinTableParams;
use crate::rpc::errors::RpcError;
use crate::rpc::registry::{MethodHandler, MethodRegistry, WsContext};

/// Register every channel method.
pub fn register_all(registry: &mut MethodRegistry) {
    registry.register("join_table", JoinTableHandler);
    registry.register("send_message", SendMessageHandler);
}

fn parse_join_params(params: Option<Value>) -> Result<JoinTableParams, RpcError> {
    match params {
        // Old clients send the table id as a bare string.
        Some(Value::String(table_id)) => Ok(JoinTableParams {
            table_id,
            player_id: None,
            name: None,
        }),
        Some(value) => serde_json::from_value(value).map_err(|e| RpcError::InvalidParams {
            message: format!("invalid join_table params: {e}"),
        }),
        None => Err(RpcError::InvalidParams {
            message: "join_table requires a table id".into(),
        }),
    }
}

/// Subscribe the connection to a table group and announce the roster.
pub struct JoinTableHandler;

#[async_trait]
impl MethodHandler for JoinTableHandler {
    #[instrument(skip_all, fields(method = "join_table"))]
    async fn handle(&self, params: Option<Value>, ctx: &WsContext) -> Result<Value, RpcError> {
        let params = parse_join_params(params)?;
        let table_id = params.table_id.clone();
        let players = ctx.coordinator.join_table(&ctx.connection, params).await?;
        Ok(json!({ "tableId": table_id, "players": players }))
    }
}

/// Append a feed entry and push it to the table group.
pub struct SendMessageHandler;

#[async_trait]
impl MethodHandler for SendMessageHandler {
    #[instrument(skip_all, fields(method = "send_message"))]
    async fn handle(&self, params: Option<Value>, ctx: &WsContext) -> Result<Value, RpcError> {
        let value = params.ok_or_else(|| RpcError::InvalidParams {
            message: "send_message requires a message".into(),
        })?;
        let message: NewFeedEntry =
            serde_json::from_value(value).map_err(|e| RpcError::InvalidParams {
                message: format!("invalid send_message params: {e}"),
            })?;

        let entry = ctx.coordinator.post_message(message).await?;
        serde_json::to_value(&entry).map_err(|e| RpcError::Internal {
            message: e.to_string(),
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
