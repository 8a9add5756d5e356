//! Status catalogue endpoint
//!
//! The page builds its status buttons from this list instead of hard-coding
//! the six labels.

use axum::{routing::get, Json, Router};
use lltrack_common::UnitStatus;
use serde::Serialize;
use serde_json::{json, Value};

use crate::AppState;

#[derive(Debug, Serialize)]
pub struct StatusEntry {
    pub value: &'static str,
    pub label: &'static str,
    pub color: &'static str,
    pub icon: &'static str,
}

/// Display metadata for a stored status label, `{}` when the label is unknown
pub fn status_info_json(label: &str) -> Value {
    UnitStatus::info_for(label)
        .and_then(|info| serde_json::to_value(info).ok())
        .unwrap_or_else(|| json!({}))
}

/// GET /api/statuses
pub async fn list_statuses() -> Json<Vec<StatusEntry>> {
    let entries = UnitStatus::ALL
        .iter()
        .map(|status| {
            let info = status.info();
            StatusEntry {
                value: status.as_str(),
                label: info.label,
                color: info.color,
                icon: info.icon,
            }
        })
        .collect();

    Json(entries)
}

pub fn status_routes() -> Router<AppState> {
    Router::new().route("/api/statuses", get(list_statuses))
}
