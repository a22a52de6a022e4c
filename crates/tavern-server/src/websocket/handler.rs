//! WebSocket message dispatch — parses incoming text as an `RpcRequest` and
//! routes it through the `MethodRegistry`.

use tracing::{debug, instrument, warn};

use crate::rpc::registry::{MethodRegistry, WsContext};
use crate::rpc::types::{RpcRequest, RpcResponse};

/// Result of handling a WebSocket message.
pub struct HandleResult {
    /// Serialized JSON response to send back.
    pub response_json: String,
    /// The method that was called (empty if parsing failed).
    pub method: String,
}

/// Handle an incoming WebSocket text message.
///
/// Parses the message as an [`RpcRequest`], dispatches it through the
/// registry, and returns the serialized [`RpcResponse`].
#[instrument(skip_all, fields(method))]
pub async fn handle_message(
    message: &str,
    registry: &MethodRegistry,
    ctx: &WsContext,
) -> HandleResult {
    let request: RpcRequest = match serde_json::from_str(message) {
        Ok(r) => r,
        Err(e) => {
            warn!("invalid JSON received");
            let resp = RpcResponse::error("unknown", "INVALID_PARAMS", format!("invalid JSON: {e}"));
            return HandleResult {
                response_json: serialize_response(&resp),
                method: String::new(),
            };
        }
    };

    let method = request.method.clone();
    let _ = tracing::Span::current().record("method", method.as_str());
    debug!(method, id = request.id, "dispatching RPC");

    let response = registry.dispatch(request, ctx).await;
    HandleResult {
        response_json: serialize_response(&response),
        method,
    }
}

fn serialize_response(response: &RpcResponse) -> String {
    serde_json::to_string(response).unwrap_or_else(|e| {
        tracing::error!(error = %e, "failed to serialize response");
        String::new()
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
