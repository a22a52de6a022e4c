//! WebSocket connection management, message dispatch, heartbeat, and
//! table-scoped broadcasting.
//!
//! ## Submodules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | `connection` | Per-connection state: table membership, send channel, liveness |
//! | `handler` | Channel message parsing and method dispatch |
//! | `broadcast` | Fan-out manager: registration, per-table filtering, slow-client eviction |
//!
//! ## Data Flow
//!
//! Upgrade → [`serve_connection`] loop: inbound text frames dispatch through
//! the registry and answer on the socket; broadcasts arrive on the
//! connection's channel and are forwarded; a ping interval enforces
//! liveness. The loop owns the socket, so per-connection ordering of
//! responses and broadcasts is the order they were issued.

pub mod broadcast;
pub mod connection;
pub mod handler;

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::rpc::registry::WsContext;
use crate::server::AppState;

use connection::ClientConnection;

/// Outbound channel depth per connection; a full channel drops broadcasts
/// rather than blocking the broadcaster.
const OUTBOUND_BUFFER: usize = 64;

/// GET /ws — WebSocket upgrade.
pub async fn ws_handler(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    if state.broadcast.connection_count() >= state.config.max_connections {
        warn!("connection limit reached, refusing upgrade");
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    }
    ws.max_message_size(state.config.max_body_bytes)
        .on_upgrade(move |socket| serve_connection(socket, state))
        .into_response()
}

/// Drive one client connection to completion.
async fn serve_connection(socket: WebSocket, state: AppState) {
    let conn_id = format!("conn_{}", Uuid::now_v7());
    let (tx, mut outbound) = mpsc::channel::<Arc<String>>(OUTBOUND_BUFFER);
    let connection = Arc::new(ClientConnection::new(conn_id, tx));
    state.broadcast.add(Arc::clone(&connection)).await;
    info!(conn_id = %connection.id, "connection established");

    let ctx = WsContext {
        coordinator: Arc::clone(&state.coordinator),
        connection: Arc::clone(&connection),
    };

    let (mut sink, mut stream) = socket.split();
    let mut ping_interval =
        tokio::time::interval(Duration::from_secs(state.config.heartbeat_interval_secs));
    let heartbeat_timeout = Duration::from_secs(state.config.heartbeat_timeout_secs);
    let cancel = state.shutdown.token();

    loop {
        tokio::select! {
            event = outbound.recv() => {
                let Some(text) = event else { break };
                if sink.send(Message::Text(text.as_str().into())).await.is_err() {
                    break;
                }
            }
            frame = stream.next() => {
                match frame {
                    Some(Ok(Message::Text(text))) => {
                        connection.mark_alive();
                        let result =
                            handler::handle_message(text.as_str(), &state.registry, &ctx).await;
                        if sink.send(Message::Text(result.response_json.into())).await.is_err() {
                            break;
                        }
                    }
                    // Axum answers pings itself; both directions count as life.
                    Some(Ok(Message::Ping(_) | Message::Pong(_))) => connection.mark_alive(),
                    Some(Ok(Message::Binary(_))) => {
                        debug!(conn_id = %connection.id, "ignoring binary frame");
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        debug!(conn_id = %connection.id, error = %e, "read error");
                        break;
                    }
                }
            }
            _ = ping_interval.tick() => {
                if connection.last_pong_elapsed() > heartbeat_timeout {
                    warn!(conn_id = %connection.id, "heartbeat timeout, closing");
                    break;
                }
                if sink.send(Message::Ping(Vec::new().into())).await.is_err() {
                    break;
                }
            }
            () = cancel.cancelled() => {
                let _ = sink.send(Message::Close(None)).await;
                break;
            }
        }
    }

    state.broadcast.remove(&connection.id).await;
    info!(conn_id = %connection.id, "connection closed");
}
