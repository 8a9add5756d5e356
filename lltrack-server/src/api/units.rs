//! Unit listing, status changes, history and deletion

use axum::{
    extract::{Path, State},
    routing::{delete, get, post},
    Json, Router,
};
use lltrack_common::db::{StatusHistoryEntry, Unit};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use super::statuses::status_info_json;
use crate::{db, ApiError, ApiResult, AppState};

/// Unit row plus display metadata for its status
#[derive(Debug, Serialize)]
pub struct UnitSummary {
    #[serde(flatten)]
    pub unit: Unit,
    pub status_info: Value,
}

impl From<Unit> for UnitSummary {
    fn from(unit: Unit) -> Self {
        let status_info = status_info_json(&unit.status);
        Self { unit, status_info }
    }
}

#[derive(Debug, Serialize)]
pub struct HistoryEntryView {
    #[serde(flatten)]
    pub entry: StatusHistoryEntry,
    pub old_status_info: Value,
    pub new_status_info: Value,
}

impl From<StatusHistoryEntry> for HistoryEntryView {
    fn from(entry: StatusHistoryEntry) -> Self {
        let old_status_info = status_info_json(entry.old_status.as_deref().unwrap_or(""));
        let new_status_info = status_info_json(&entry.new_status);
        Self {
            entry,
            old_status_info,
            new_status_info,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdateRequest {
    #[serde(default)]
    pub status: String,
    pub notes: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

/// GET /api/units
pub async fn list_units(State(state): State<AppState>) -> ApiResult<Json<Vec<UnitSummary>>> {
    let units = db::list_units(&state.db).await?;
    Ok(Json(units.into_iter().map(UnitSummary::from).collect()))
}

/// POST /api/units/:id/status
///
/// **Request:** `{"status": "qc", "notes": "optional"}`
///
/// **Errors:** 400 when the status is unknown or the unit does not exist
pub async fn update_status(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<StatusUpdateRequest>,
) -> ApiResult<Json<SuccessResponse>> {
    let updated =
        db::set_status(&state.db, id, &payload.status, payload.notes.as_deref()).await?;

    if !updated {
        return Err(ApiError::BadRequest("Failed to update status".to_string()));
    }

    Ok(Json(SuccessResponse { success: true }))
}

/// GET /api/units/:id/history
pub async fn unit_history(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Vec<HistoryEntryView>>> {
    let entries = db::get_history(&state.db, id).await?;
    Ok(Json(entries.into_iter().map(HistoryEntryView::from).collect()))
}

/// DELETE /api/units/:id
///
/// Succeeds whether or not the unit existed; storage failures are 500.
pub async fn delete_unit(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<SuccessResponse>> {
    let existed = db::delete_unit(&state.db, id).await?;
    info!(id, existed, "Delete requested");
    Ok(Json(SuccessResponse { success: true }))
}

pub fn unit_routes() -> Router<AppState> {
    Router::new()
        .route("/api/units", get(list_units))
        .route("/api/units/:id", delete(delete_unit))
        .route("/api/units/:id/status", post(update_status))
        .route("/api/units/:id/history", get(unit_history))
}
