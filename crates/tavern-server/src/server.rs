//! `TavernServer` — Axum HTTP + WebSocket server.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::{DefaultBodyLimit, State};
use axum::response::Json;
use axum::routing::{get, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tokio::task::JoinHandle;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::api;
use crate::config::ServerConfig;
use crate::coordinator::SessionCoordinator;
use crate::health::{self, HealthResponse};
use crate::rpc::registry::MethodRegistry;
use crate::shutdown::ShutdownCoordinator;
use crate::websocket;
use crate::websocket::broadcast::BroadcastManager;

/// Shared state accessible from Axum handlers.
#[derive(Clone)]
pub struct AppState {
    /// The orchestration core.
    pub coordinator: Arc<SessionCoordinator>,
    /// Broadcast manager for table fan-out.
    pub broadcast: Arc<BroadcastManager>,
    /// Channel method registry.
    pub registry: Arc<MethodRegistry>,
    /// Shutdown coordinator.
    pub shutdown: Arc<ShutdownCoordinator>,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// When the server started.
    pub start_time: Instant,
    /// Prometheus metrics handle.
    pub metrics: PrometheusHandle,
}

/// The main Tavern server.
pub struct TavernServer {
    config: Arc<ServerConfig>,
    coordinator: Arc<SessionCoordinator>,
    registry: Arc<MethodRegistry>,
    shutdown: Arc<ShutdownCoordinator>,
    start_time: Instant,
    metrics: PrometheusHandle,
}

impl TavernServer {
    /// Create a new server over an already-wired coordinator.
    pub fn new(
        config: ServerConfig,
        coordinator: Arc<SessionCoordinator>,
        registry: MethodRegistry,
        metrics: PrometheusHandle,
    ) -> Self {
        Self {
            config: Arc::new(config),
            coordinator,
            registry: Arc::new(registry),
            shutdown: Arc::new(ShutdownCoordinator::new()),
            start_time: Instant::now(),
            metrics,
        }
    }

    /// Build the Axum router with all routes.
    pub fn router(&self) -> Router {
        let state = AppState {
            coordinator: Arc::clone(&self.coordinator),
            broadcast: Arc::clone(self.coordinator.broadcast()),
            registry: Arc::clone(&self.registry),
            shutdown: Arc::clone(&self.shutdown),
            config: Arc::clone(&self.config),
            start_time: self.start_time,
            metrics: self.metrics.clone(),
        };

        Router::new()
            .route("/health", get(health_handler))
            .route("/metrics", get(metrics_handler))
            .route("/ws", get(websocket::ws_handler))
            .route("/api/create-table", post(api::create_table))
            .route("/api/join", post(api::join))
            .route("/api/table/{id}/data", get(api::table_data))
            .route("/api/save-schema", post(api::save_schema))
            .route("/api/save-sheet", post(api::save_sheet))
            .route(
                "/api/inventory/{player_id}",
                get(api::get_inventory).post(api::save_inventory),
            )
            .route("/api/player/{player_id}/view", get(api::player_view))
            .layer(DefaultBodyLimit::max(self.config.max_body_bytes))
            .layer(CorsLayer::permissive())
            .layer(TraceLayer::new_for_http())
            .with_state(state)
    }

    /// Bind the configured address and serve until shutdown.
    ///
    /// Returns the bound address (useful with port 0) and the serve task.
    pub async fn listen(&self) -> std::io::Result<(SocketAddr, JoinHandle<()>)> {
        let listener =
            tokio::net::TcpListener::bind((self.config.host.as_str(), self.config.port)).await?;
        let addr = listener.local_addr()?;
        info!(%addr, "listening");

        let app = self.router();
        let token = self.shutdown.token();
        let handle = tokio::spawn(async move {
            let result = axum::serve(listener, app)
                .with_graceful_shutdown(async move { token.cancelled().await })
                .await;
            if let Err(e) = result {
                error!(error = %e, "server error");
            }
        });

        Ok((addr, handle))
    }

    /// Get the shutdown coordinator.
    pub fn shutdown(&self) -> &Arc<ShutdownCoordinator> {
        &self.shutdown
    }

    /// Get the server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Get the coordinator.
    pub fn coordinator(&self) -> &Arc<SessionCoordinator> {
        &self.coordinator
    }
}

/// GET /health
async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let connections = state.broadcast.connection_count();
    Json(health::health_check(state.start_time, connections))
}

/// GET /metrics
async fn metrics_handler(State(state): State<AppState>) -> String {
    state.metrics.render()
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use metrics_exporter_prometheus::PrometheusBuilder;
    use serde_json::{json, Value};
    use tavern_store::{new_in_memory, run_migrations, ConnectionConfig, SessionStore};
    use tower::ServiceExt;

    use crate::rpc::handlers::register_all;

    fn make_server() -> TavernServer {
        let pool = new_in_memory(&ConnectionConfig::default()).unwrap();
        {
            let conn = pool.get().unwrap();
            let _ = run_migrations(&conn).unwrap();
        }
        let coordinator = Arc::new(SessionCoordinator::new(
            Arc::new(SessionStore::new(pool)),
            Arc::new(BroadcastManager::new()),
        ));
        let mut registry = MethodRegistry::new();
        register_all(&mut registry);
        let metrics = PrometheusBuilder::new().build_recorder().handle();
        TavernServer::new(ServerConfig::default(), coordinator, registry, metrics)
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(resp: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(resp.into_body(), 10_000_000).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_endpoint_returns_ok() {
        let app = make_server().router();
        let resp = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let parsed = body_json(resp).await;
        assert_eq!(parsed["status"], "ok");
        assert!(parsed["connections"].is_number());
    }

    #[tokio::test]
    async fn metrics_endpoint_renders() {
        let app = make_server().router();
        let resp = app
            .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn unknown_route_returns_404() {
        let app = make_server().router();
        let resp = app
            .oneshot(Request::builder().uri("/nonexistent").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn create_table_and_join_flow() {
        let server = make_server();
        let app = server.router();

        let resp = app
            .clone()
            .oneshot(post_json("/api/create-table", json!({"name": "Friday"})))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let created = body_json(resp).await;
        assert_eq!(created["name"], "Friday");
        let table_id = created["tableId"].as_str().unwrap().to_owned();
        let gm_code = created["gmCode"].as_str().unwrap().to_owned();

        // GM join with the right code.
        let resp = app
            .clone()
            .oneshot(post_json(
                "/api/join",
                json!({"tableId": table_id, "name": "Narrator", "gmCode": gm_code}),
            ))
            .await
            .unwrap();
        let joined = body_json(resp).await;
        assert_eq!(joined["isGm"], true);
        assert_eq!(joined["playerId"], format!("GM-{table_id}"));

        // Player join with a wrong code.
        let resp = app
            .clone()
            .oneshot(post_json(
                "/api/join",
                json!({"tableId": table_id, "name": "Alice", "gmCode": "wrong"}),
            ))
            .await
            .unwrap();
        let joined = body_json(resp).await;
        assert_eq!(joined["isGm"], false);
        assert_eq!(joined["playerId"], format!("Alice-{table_id}"));
    }

    #[tokio::test]
    async fn join_unknown_table_is_404() {
        let app = make_server().router();
        let resp = app
            .oneshot(post_json(
                "/api/join",
                json!({"tableId": "NOPE42", "name": "Alice"}),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let parsed = body_json(resp).await;
        assert!(parsed["error"].as_str().unwrap().contains("not found"));
    }

    #[tokio::test]
    async fn snapshot_includes_saved_sheet_and_feed() {
        let server = make_server();
        let app = server.router();

        let resp = app
            .clone()
            .oneshot(post_json("/api/create-table", json!({})))
            .await
            .unwrap();
        let created = body_json(resp).await;
        let table_id = created["tableId"].as_str().unwrap().to_owned();

        let resp = app
            .clone()
            .oneshot(post_json(
                "/api/join",
                json!({"tableId": table_id, "name": "Alice"}),
            ))
            .await
            .unwrap();
        let joined = body_json(resp).await;
        let player_id = joined["playerId"].as_str().unwrap().to_owned();

        let resp = app
            .clone()
            .oneshot(post_json(
                "/api/save-sheet",
                json!({"playerId": player_id, "data": {"HP": 12}}),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri(format!("/api/table/{table_id}/data?playerId={player_id}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let snapshot = body_json(resp).await;
        assert_eq!(snapshot["sheetData"]["HP"], 12);
        assert_eq!(snapshot["feed"], json!([]));
    }

    #[tokio::test]
    async fn save_sheet_unknown_player_is_404() {
        let app = make_server().router();
        let resp = app
            .oneshot(post_json(
                "/api/save-sheet",
                json!({"playerId": "ghost", "data": {}}),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn inventory_roundtrip_over_http() {
        let server = make_server();
        let app = server.router();

        let created = body_json(
            app.clone()
                .oneshot(post_json("/api/create-table", json!({})))
                .await
                .unwrap(),
        )
        .await;
        let table_id = created["tableId"].as_str().unwrap().to_owned();
        let joined = body_json(
            app.clone()
                .oneshot(post_json(
                    "/api/join",
                    json!({"tableId": table_id, "name": "Alice"}),
                ))
                .await
                .unwrap(),
        )
        .await;
        let player_id = joined["playerId"].as_str().unwrap().to_owned();

        // Lazily created empty inventory.
        let items = body_json(
            app.clone()
                .oneshot(
                    Request::builder()
                        .uri(format!("/api/inventory/{player_id}"))
                        .body(Body::empty())
                        .unwrap(),
                )
                .await
                .unwrap(),
        )
        .await;
        assert_eq!(items["items"], json!([]));

        // Save and read back.
        let resp = app
            .clone()
            .oneshot(post_json(
                &format!("/api/inventory/{player_id}"),
                json!({"items": [{"name": "Rope", "desc": "50ft", "attributes": {"weight": 10}, "notes": ""}]}),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let view = body_json(
            app.clone()
                .oneshot(
                    Request::builder()
                        .uri(format!("/api/player/{player_id}/view"))
                        .body(Body::empty())
                        .unwrap(),
                )
                .await
                .unwrap(),
        )
        .await;
        assert_eq!(view["player"]["name"], "Alice");
        assert_eq!(view["inventory"][0]["name"], "Rope");
    }

    #[tokio::test]
    async fn save_inventory_unknown_player_is_404() {
        let app = make_server().router();
        let resp = app
            .oneshot(post_json("/api/inventory/ghost", json!({"items": []})))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn shutdown_propagates_to_coordinator() {
        let server = make_server();
        assert!(!server.shutdown().is_shutting_down());
        server.shutdown().shutdown();
        assert!(server.shutdown().is_shutting_down());
    }
}
