//! Method registry and async dispatch for the WebSocket channel.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use metrics::{counter, histogram};
use serde_json::Value;
use tracing::warn;

use crate::coordinator::SessionCoordinator;
use crate::rpc::errors::{self, RpcError};
use crate::rpc::types::{RpcRequest, RpcResponse};
use crate::websocket::connection::ClientConnection;

/// Per-request context handed to channel method handlers.
pub struct WsContext {
    /// The orchestration core.
    pub coordinator: Arc<SessionCoordinator>,
    /// The connection the request arrived on.
    pub connection: Arc<ClientConnection>,
}

/// Trait implemented by every channel method handler.
#[async_trait]
pub trait MethodHandler: Send + Sync {
    /// Execute the handler with the given params and context.
    async fn handle(&self, params: Option<Value>, ctx: &WsContext) -> Result<Value, RpcError>;
}

/// Registry mapping method names to handlers.
pub struct MethodRegistry {
    handlers: HashMap<String, Arc<dyn MethodHandler>>,
}

impl MethodRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Register a handler for a method name.
    pub fn register(&mut self, method: &str, handler: impl MethodHandler + 'static) {
        let _ = self.handlers.insert(method.to_owned(), Arc::new(handler));
    }

    /// Whether a method is registered.
    pub fn has_method(&self, method: &str) -> bool {
        self.handlers.contains_key(method)
    }

    /// Registered method names.
    pub fn methods(&self) -> Vec<&str> {
        self.handlers.keys().map(String::as_str).collect()
    }

    /// Maximum time a single handler is allowed to run. A hung store call
    /// stalls only the issuing intent; the timeout turns it into an error
    /// response instead of a silently dead request.
    const HANDLER_TIMEOUT: Duration = Duration::from_secs(30);

    /// Dispatch a request to the appropriate handler.
    pub async fn dispatch(&self, request: RpcRequest, ctx: &WsContext) -> RpcResponse {
        let method = request.method.clone();
        counter!("rpc_requests_total", "method" => method.clone()).increment(1);

        let Some(handler) = self.handlers.get(&method) else {
            counter!("rpc_errors_total", "method" => method.clone(), "error_type" => "method_not_found").increment(1);
            return RpcResponse::error(
                &request.id,
                errors::METHOD_NOT_FOUND,
                format!("method '{method}' not found"),
            );
        };

        let start = std::time::Instant::now();
        let result =
            tokio::time::timeout(Self::HANDLER_TIMEOUT, handler.handle(request.params, ctx)).await;

        let response = match result {
            Ok(Ok(result)) => RpcResponse::success(&request.id, result),
            Ok(Err(err)) => {
                counter!("rpc_errors_total", "method" => method.clone(), "error_type" => err.code().to_owned()).increment(1);
                let body = err.to_error_body();
                RpcResponse {
                    id: request.id,
                    success: false,
                    result: None,
                    error: Some(body),
                }
            }
            Err(_elapsed) => {
                counter!("rpc_errors_total", "method" => method.clone(), "error_type" => "timeout").increment(1);
                tracing::error!(method, "handler timed out after {:?}", Self::HANDLER_TIMEOUT);
                RpcResponse::error(
                    &request.id,
                    errors::INTERNAL_ERROR,
                    format!("handler for '{method}' timed out"),
                )
            }
        };

        let duration = start.elapsed();
        histogram!("rpc_request_duration_seconds", "method" => method.clone())
            .record(duration.as_secs_f64());

        if duration.as_secs() >= 5 {
            warn!(method, duration_secs = duration.as_secs_f64(), "slow RPC request");
        }

        response
    }
}

impl Default for MethodRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
