//! Sample log endpoints

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use lltrack_common::db::Sample;
use serde::{Deserialize, Serialize};

use crate::db::{self, NewSample};
use crate::{ApiError, ApiResult, AppState};

#[derive(Debug, Deserialize)]
pub struct AddSampleRequest {
    #[serde(default)]
    pub sample_name: String,
    pub material: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AddSampleResponse {
    pub success: bool,
}

/// POST /api/units/:id/samples
///
/// **Request:** `{"sample_name": "S-7", "material": "Al", "notes": "..."}`
///
/// **Errors:** 400 for a blank sample name or an unknown unit
pub async fn add_sample(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<AddSampleRequest>,
) -> ApiResult<Json<AddSampleResponse>> {
    let sample_name = payload.sample_name.trim();
    if sample_name.is_empty() {
        return Err(ApiError::BadRequest("Sample name is required".to_string()));
    }

    let sample = NewSample {
        sample_name: sample_name.to_string(),
        material: payload.material,
        notes: payload.notes,
    };

    if !db::add_sample(&state.db, id, &sample).await? {
        return Err(ApiError::BadRequest("Failed to add sample".to_string()));
    }

    Ok(Json(AddSampleResponse { success: true }))
}

/// GET /api/units/:id/samples
pub async fn list_samples(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Vec<Sample>>> {
    Ok(Json(db::get_samples(&state.db, id).await?))
}

pub fn sample_routes() -> Router<AppState> {
    Router::new().route("/api/units/:id/samples", get(list_samples).post(add_sample))
}
