//! CSV download of the unit table

use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};

use crate::db;
use crate::services::export::units_to_csv;
use crate::{ApiResult, AppState};

/// GET /api/export/units.csv
pub async fn export_units(State(state): State<AppState>) -> ApiResult<Response> {
    let units = db::list_units(&state.db).await?;
    let csv = units_to_csv(&units)?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"units.csv\"",
            ),
        ],
        csv,
    )
        .into_response())
}

pub fn export_routes() -> Router<AppState> {
    Router::new().route("/api/export/units.csv", get(export_units))
}
