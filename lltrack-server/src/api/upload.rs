//! Label photo upload
//!
//! Accepts a multipart form with one `file` field and runs the ingest
//! pipeline on it. Response shapes:
//! - 400 `{"error": ...}` for a missing, unnamed or non-image file
//! - 500 `{"error": "Error processing image"}` when extraction fails
//! - 200 `{"success": false, "message": ..., "additional_info": ...}` when no
//!   instruction number was found
//! - 200 `{"success": true, "identifier", "confidence", "id", "already_exists"}`

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::Serialize;
use serde_json::json;
use tracing::{error, info};

use crate::services::{Confidence, IngestError, IngestOutcome};
use crate::{ApiError, ApiResult, AppState};

const FILE_FIELD: &str = "file";

#[derive(Debug, Serialize)]
pub struct UploadSuccess {
    pub success: bool,
    pub identifier: String,
    pub confidence: Confidence,
    pub id: Option<i64>,
    pub already_exists: bool,
}

#[derive(Debug, Serialize)]
pub struct UploadNotRecognized {
    pub success: bool,
    pub message: String,
    pub additional_info: String,
}

/// POST /api/upload
#[tracing::instrument(skip(state, multipart))]
pub async fn upload_label(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<Response> {
    let mut upload: Option<(String, Vec<u8>)> = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return Ok(multipart_error(e.status(), e.body_text())),
        };

        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let filename = field.file_name().unwrap_or("").to_string();
        let data = match field.bytes().await {
            Ok(data) => data,
            Err(e) => return Ok(multipart_error(e.status(), e.body_text())),
        };
        upload = Some((filename, data.to_vec()));
        break;
    }

    let (filename, bytes) =
        upload.ok_or_else(|| ApiError::BadRequest("File not found".to_string()))?;

    let outcome = match state.ingestor.ingest_upload(&filename, &bytes).await {
        Ok(outcome) => outcome,
        Err(IngestError::InvalidFile(msg)) => return Err(ApiError::BadRequest(msg)),
        Err(e) => {
            error!("Upload failed: {}", e);
            return Err(processing_error());
        }
    };

    match outcome {
        IngestOutcome::ExtractionFailed => Err(processing_error()),
        IngestOutcome::NotRecognized { additional_info } => Ok(Json(UploadNotRecognized {
            success: false,
            message: "Could not recognize instruction number".to_string(),
            additional_info,
        })
        .into_response()),
        IngestOutcome::Created {
            identifier,
            confidence,
            id,
        } => {
            info!(%identifier, id, "Unit registered from upload");
            Ok(Json(UploadSuccess {
                success: true,
                identifier,
                confidence,
                id: Some(id),
                already_exists: false,
            })
            .into_response())
        }
        IngestOutcome::AlreadyExists {
            identifier,
            confidence,
            id,
        } => Ok(Json(UploadSuccess {
            success: true,
            identifier,
            confidence,
            id,
            already_exists: true,
        })
        .into_response()),
    }
}

fn processing_error() -> ApiError {
    ApiError::Internal("Error processing image".to_string())
}

/// Malformed or oversized multipart bodies keep the status axum assigns
fn multipart_error(status: StatusCode, message: String) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

pub fn upload_routes() -> Router<AppState> {
    Router::new().route("/api/upload", post(upload_label))
}
