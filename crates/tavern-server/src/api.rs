//! JSON HTTP API.
//!
//! Route shapes match the client contract: create/join are
//! request/response; save-schema and save-sheet additionally trigger a
//! table-group broadcast through the coordinator; inventory routes are
//! request/response only.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::error;

use tavern_core::entities::InventoryItem;
use tavern_core::schema::SheetSchema;
use tavern_core::values::SheetData;
use tavern_store::{CreatedTable, JoinOutcome, PlayerView, StoreError, TableSnapshot};

use crate::server::AppState;

/// Error wrapper translating store failures into HTTP responses.
#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub struct ApiError(#[from] StoreError);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            StoreError::TableNotFound(_) | StoreError::PlayerNotFound(_) => StatusCode::NOT_FOUND,
            StoreError::Serde(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!(error = %self.0, "request failed");
        }
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

/// Body of `POST /api/create-table`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTableBody {
    /// Optional display name; defaulted from the table code when absent.
    #[serde(default)]
    pub name: Option<String>,
}

/// Body of `POST /api/join`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinBody {
    /// Table code to join.
    pub table_id: String,
    /// Display name.
    pub name: String,
    /// GM secret; presence and exact match decide `isGm`.
    #[serde(default)]
    pub gm_code: Option<String>,
}

/// Query of `GET /api/table/{id}/data`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotQuery {
    /// Whose sheet to include in the snapshot.
    #[serde(default)]
    pub player_id: String,
}

/// Body of `POST /api/save-schema`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveSchemaBody {
    /// Table to update.
    pub table_id: String,
    /// The complete new schema.
    pub schema: SheetSchema,
}

/// Body of `POST /api/save-sheet`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveSheetBody {
    /// Player whose sheet is overwritten.
    pub player_id: String,
    /// The complete new sheet data.
    pub data: SheetData,
}

/// Inventory payload (both directions).
#[derive(Debug, Serialize, Deserialize)]
pub struct ItemsBody {
    /// The complete item list.
    pub items: Vec<InventoryItem>,
}

/// Generic mutation acknowledgement.
#[derive(Debug, Serialize)]
pub struct SuccessBody {
    /// Always `true`; failures answer with an error body instead.
    pub success: bool,
}

const OK: SuccessBody = SuccessBody { success: true };

/// POST /api/create-table
pub async fn create_table(
    State(state): State<AppState>,
    Json(body): Json<CreateTableBody>,
) -> Result<Json<CreatedTable>, ApiError> {
    let created = state.coordinator.create_table(body.name.as_deref())?;
    Ok(Json(created))
}

/// POST /api/join
pub async fn join(
    State(state): State<AppState>,
    Json(body): Json<JoinBody>,
) -> Result<Json<JoinOutcome>, ApiError> {
    let outcome =
        state
            .coordinator
            .resolve_join(&body.table_id, &body.name, body.gm_code.as_deref())?;
    Ok(Json(outcome))
}

/// GET /api/table/{id}/data
pub async fn table_data(
    State(state): State<AppState>,
    Path(table_id): Path<String>,
    Query(query): Query<SnapshotQuery>,
) -> Result<Json<TableSnapshot>, ApiError> {
    let snapshot = state.coordinator.load_snapshot(&table_id, &query.player_id)?;
    Ok(Json(snapshot))
}

/// POST /api/save-schema
pub async fn save_schema(
    State(state): State<AppState>,
    Json(body): Json<SaveSchemaBody>,
) -> Result<Json<SuccessBody>, ApiError> {
    state
        .coordinator
        .save_schema(&body.table_id, &body.schema)
        .await?;
    Ok(Json(OK))
}

/// POST /api/save-sheet
pub async fn save_sheet(
    State(state): State<AppState>,
    Json(body): Json<SaveSheetBody>,
) -> Result<Json<SuccessBody>, ApiError> {
    state.coordinator.save_sheet(&body.player_id, &body.data).await?;
    Ok(Json(OK))
}

/// GET /api/inventory/{playerId}
pub async fn get_inventory(
    State(state): State<AppState>,
    Path(player_id): Path<String>,
) -> Result<Json<ItemsBody>, ApiError> {
    let items = state.coordinator.get_inventory(&player_id)?;
    Ok(Json(ItemsBody { items }))
}

/// POST /api/inventory/{playerId}
pub async fn save_inventory(
    State(state): State<AppState>,
    Path(player_id): Path<String>,
    Json(body): Json<ItemsBody>,
) -> Result<Json<SuccessBody>, ApiError> {
    state.coordinator.save_inventory(&player_id, &body.items)?;
    Ok(Json(OK))
}

/// GET /api/player/{playerId}/view
pub async fn player_view(
    State(state): State<AppState>,
    Path(player_id): Path<String>,
) -> Result<Json<PlayerView>, ApiError> {
    let view = state.coordinator.player_view(&player_id)?;
    Ok(Json(view))
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
