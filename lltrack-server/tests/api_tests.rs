//! Integration tests for the lltrack-server HTTP API
//!
//! Each test builds the router over an in-memory database and a temporary
//! uploads folder. The vision API is a wiremock server answering
//! `POST /chat/completions`.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use lltrack_common::config::VisionConfig;
use lltrack_common::db::init_memory_database;
use lltrack_server::db::{self, NewSample, NewUnit};
use lltrack_server::services::{Ingestor, VisionClient};
use lltrack_server::{build_router, AppState};
use serde_json::{json, Value};
use sqlx::SqlitePool;
use tempfile::TempDir;
use tower::util::ServiceExt;
use wiremock::matchers::{header as header_matcher, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const BOUNDARY: &str = "lltrack-test-boundary";
const UNREACHABLE_VISION: &str = "http://127.0.0.1:9/v1";

/// Test helper: router, pool and the temp dir backing the uploads folder
async fn create_test_app(vision_base_url: &str) -> (Router, SqlitePool, TempDir) {
    let pool = init_memory_database()
        .await
        .expect("Failed to create in-memory database");
    let dir = tempfile::tempdir().expect("Failed to create temp dir");

    let vision = VisionClient::new(VisionConfig::with_endpoint("test-key", vision_base_url))
        .expect("Failed to build vision client");
    let ingestor = Ingestor::new(pool.clone(), vision, dir.path().join("uploads"));

    let app = build_router(AppState::new(pool.clone(), ingestor));
    (app, pool, dir)
}

/// Vision API answering every request with `content` as the model's text
async fn mock_vision(content: &str) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header_matcher("authorization", "Bearer test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "chatcmpl-test",
            "choices": [{ "index": 0, "message": { "role": "assistant", "content": content } }]
        })))
        .mount(&server)
        .await;
    server
}

fn label_answer(identifier: &str, confidence: &str) -> String {
    json!({
        "identifier": identifier,
        "confidence": confidence,
        "location": "top right sticker",
        "additional_info": "LL-2 chamber"
    })
    .to_string()
}

fn multipart_upload(field: &str, filename: &str, bytes: &[u8]) -> Request<Body> {
    let mut body = format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
    )
    .into_bytes();
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri("/api/upload")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

fn json_request(method: &str, uri: &str, payload: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(payload.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

async fn seed_unit(pool: &SqlitePool, identifier: &str) -> i64 {
    let (created, id) = db::create_unit(pool, &NewUnit::new(identifier)).await.unwrap();
    assert!(created);
    id.unwrap()
}

const FAKE_JPEG: &[u8] = b"\xFF\xD8\xFF\xE0fake-jpeg-data";

#[tokio::test]
async fn test_health_endpoint() {
    let (app, _pool, _dir) = create_test_app(UNREACHABLE_VISION).await;

    let (status, body) = send(&app, get("/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "lltrack-server");
}

#[tokio::test]
async fn test_index_page_served() {
    let (app, _pool, _dir) = create_test_app(UNREACHABLE_VISION).await;

    let response = app.oneshot(get("/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let html = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(html.contains("LoadLock Tracker"));
    assert!(html.contains("/api/upload"));
}

#[tokio::test]
async fn test_status_catalogue() {
    let (app, _pool, _dir) = create_test_app(UNREACHABLE_VISION).await;

    let (status, body) = send(&app, get("/api/statuses")).await;

    assert_eq!(status, StatusCode::OK);
    let values: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["value"].as_str().unwrap())
        .collect();
    assert_eq!(values, ["inserted", "working", "missing", "qc", "packaging", "ready"]);
    assert_eq!(body[5]["label"], "מוכן");
    assert_eq!(body[5]["color"], "#198754");
}

#[tokio::test]
async fn test_upload_registers_unit_once() {
    let vision = mock_vision(&label_answer("H-1234", "high")).await;
    let (app, pool, dir) = create_test_app(&vision.uri()).await;

    let (status, first) = send(&app, multipart_upload("file", "label one.jpg", FAKE_JPEG)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["success"], true);
    assert_eq!(first["identifier"], "H-1234");
    assert_eq!(first["confidence"], "high");
    assert_eq!(first["already_exists"], false);
    let id = first["id"].as_i64().expect("id of new unit");

    let (_, units) = send(&app, get("/api/units")).await;
    let units = units.as_array().unwrap();
    assert_eq!(units.len(), 1);
    assert_eq!(units[0]["id"], id);
    assert_eq!(units[0]["name"], "LoadLock H-1234");
    assert_eq!(units[0]["status"], "inserted");
    assert_eq!(units[0]["status_info"]["icon"], "📥");
    assert!(units[0]["notes"].as_str().unwrap().contains("Confidence: high"));
    let image_path = units[0]["image_path"].as_str().unwrap();
    assert!(image_path.contains("label_"));
    assert!(image_path.ends_with("_label_one.jpg"));

    let (status, second) = send(&app, multipart_upload("file", "again.png", FAKE_JPEG)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["success"], true);
    assert_eq!(second["already_exists"], true);
    assert_eq!(second["id"], id);

    assert_eq!(db::list_units(&pool).await.unwrap().len(), 1);

    // Both photos are kept even though only one unit exists
    let stored = std::fs::read_dir(dir.path().join("uploads")).unwrap().count();
    assert_eq!(stored, 2);
}

#[tokio::test]
async fn test_upload_rejects_disallowed_extension_before_vision_call() {
    let vision = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&vision)
        .await;
    let (app, pool, dir) = create_test_app(&vision.uri()).await;

    let (status, body) = send(&app, multipart_upload("file", "notes.txt", b"hello")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Unsupported file format");
    assert!(db::list_units(&pool).await.unwrap().is_empty());
    assert!(!dir.path().join("uploads").exists());
    vision.verify().await;
}

#[tokio::test]
async fn test_upload_without_file_field() {
    let (app, _pool, _dir) = create_test_app(UNREACHABLE_VISION).await;

    let (status, body) = send(&app, multipart_upload("photo", "label.jpg", FAKE_JPEG)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "File not found");
}

#[tokio::test]
async fn test_upload_with_empty_filename() {
    let (app, _pool, _dir) = create_test_app(UNREACHABLE_VISION).await;

    let (status, body) = send(&app, multipart_upload("file", "", FAKE_JPEG)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "File not selected");
}

#[tokio::test]
async fn test_upload_not_recognized() {
    let vision = mock_vision(
        r#"```json
{"identifier": "NOT_FOUND", "confidence": "low", "location": "", "additional_info": "label is out of focus"}
```"#,
    )
    .await;
    let (app, pool, _dir) = create_test_app(&vision.uri()).await;

    let (status, body) = send(&app, multipart_upload("file", "blurry.jpg", FAKE_JPEG)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Could not recognize instruction number");
    assert_eq!(body["additional_info"], "label is out of focus");
    assert!(db::list_units(&pool).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_upload_not_recognized_with_null_fields() {
    let vision = mock_vision(
        r#"{"identifier": "NOT_FOUND", "confidence": "low", "location": null, "additional_info": null}"#,
    )
    .await;
    let (app, pool, _dir) = create_test_app(&vision.uri()).await;

    let (status, body) = send(&app, multipart_upload("file", "dark.jpg", FAKE_JPEG)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Could not recognize instruction number");
    assert_eq!(body["additional_info"], "");
    assert!(db::list_units(&pool).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_upload_upstream_error_is_500() {
    let vision = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
        .mount(&vision)
        .await;
    let (app, pool, _dir) = create_test_app(&vision.uri()).await;

    let (status, body) = send(&app, multipart_upload("file", "label.jpg", FAKE_JPEG)).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Error processing image");
    assert!(db::list_units(&pool).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_upload_unparseable_answer_is_500() {
    let vision = mock_vision("The instruction number appears to be H-1234.").await;
    let (app, pool, _dir) = create_test_app(&vision.uri()).await;

    let (status, body) = send(&app, multipart_upload("file", "label.webp", FAKE_JPEG)).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Error processing image");
    assert!(db::list_units(&pool).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_status_change_recorded_in_history() {
    let (app, pool, _dir) = create_test_app(UNREACHABLE_VISION).await;
    let id = seed_unit(&pool, "H-1234").await;

    let (status, _) = send(
        &app,
        json_request("POST", &format!("/api/units/{id}/status"), json!({ "status": "qc" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            &format!("/api/units/{id}/status"),
            json!({ "status": "ready", "notes": "final check done" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "success": true }));

    let unit = db::get_unit(&pool, id).await.unwrap().unwrap();
    assert_eq!(unit.status, "ready");

    let (status, history) = send(&app, get(&format!("/api/units/{id}/history"))).await;
    assert_eq!(status, StatusCode::OK);
    let history = history.as_array().unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0]["old_status"], "qc");
    assert_eq!(history[0]["new_status"], "ready");
    assert_eq!(history[0]["notes"], "final check done");
    assert_eq!(history[0]["old_status_info"]["label"], "QC");
    assert_eq!(history[0]["new_status_info"]["label"], "מוכן");
    assert_eq!(history[1]["old_status"], "inserted");
    assert_eq!(history[1]["new_status"], "qc");
}

#[tokio::test]
async fn test_unknown_status_rejected() {
    let (app, pool, _dir) = create_test_app(UNREACHABLE_VISION).await;
    let id = seed_unit(&pool, "H-77").await;

    let (status, body) = send(
        &app,
        json_request("POST", &format!("/api/units/{id}/status"), json!({ "status": "shipped" })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Failed to update status");
    let unit = db::get_unit(&pool, id).await.unwrap().unwrap();
    assert_eq!(unit.status, "inserted");
    assert!(db::get_history(&pool, id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_status_for_missing_unit_rejected() {
    let (app, _pool, _dir) = create_test_app(UNREACHABLE_VISION).await;

    let (status, body) = send(
        &app,
        json_request("POST", "/api/units/999/status", json!({ "status": "working" })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Failed to update status");
}

#[tokio::test]
async fn test_samples_flow() {
    let (app, pool, _dir) = create_test_app(UNREACHABLE_VISION).await;
    let id = seed_unit(&pool, "H-5").await;

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            &format!("/api/units/{id}/samples"),
            json!({ "sample_name": "S-1", "material": "Al" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    send(
        &app,
        json_request(
            "POST",
            &format!("/api/units/{id}/samples"),
            json!({ "sample_name": "S-2", "notes": "second run" }),
        ),
    )
    .await;

    let (status, samples) = send(&app, get(&format!("/api/units/{id}/samples"))).await;
    assert_eq!(status, StatusCode::OK);
    let samples = samples.as_array().unwrap();
    assert_eq!(samples.len(), 2);
    assert_eq!(samples[0]["sample_name"], "S-2");
    assert_eq!(samples[1]["material"], "Al");

    let (_, units) = send(&app, get("/api/units")).await;
    assert_eq!(units[0]["current_sample"], "S-2");
}

#[tokio::test]
async fn test_sample_validation() {
    let (app, pool, _dir) = create_test_app(UNREACHABLE_VISION).await;
    let id = seed_unit(&pool, "H-6").await;

    let (status, body) = send(
        &app,
        json_request("POST", &format!("/api/units/{id}/samples"), json!({ "sample_name": "  " })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Sample name is required");

    let (status, body) = send(
        &app,
        json_request("POST", "/api/units/4242/samples", json!({ "sample_name": "S-1" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Failed to add sample");
}

#[tokio::test]
async fn test_delete_unit_removes_history_and_samples() {
    let (app, pool, _dir) = create_test_app(UNREACHABLE_VISION).await;
    let id = seed_unit(&pool, "H-9").await;
    assert!(db::set_status(&pool, id, "working", None).await.unwrap());
    let sample = NewSample {
        sample_name: "S-1".to_string(),
        ..Default::default()
    };
    assert!(db::add_sample(&pool, id, &sample).await.unwrap());

    let delete = Request::builder()
        .method("DELETE")
        .uri(format!("/api/units/{id}"))
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app, delete).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "success": true }));

    let (_, history) = send(&app, get(&format!("/api/units/{id}/history"))).await;
    assert_eq!(history, json!([]));
    let (_, samples) = send(&app, get(&format!("/api/units/{id}/samples"))).await;
    assert_eq!(samples, json!([]));
    let (_, units) = send(&app, get("/api/units")).await;
    assert_eq!(units, json!([]));

    // Deleting again is not an error
    let again = Request::builder()
        .method("DELETE")
        .uri(format!("/api/units/{id}"))
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app, again).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_export_units_csv() {
    let (app, pool, _dir) = create_test_app(UNREACHABLE_VISION).await;
    seed_unit(&pool, "B-2").await;
    seed_unit(&pool, "A-1").await;

    let response = app.oneshot(get("/api/export/units.csv")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers()[header::CONTENT_TYPE]
        .to_str()
        .unwrap()
        .starts_with("text/csv"));

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let csv = String::from_utf8(bytes.to_vec()).unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].starts_with("id,identifier,name,status"));
    assert!(lines[1].contains(",A-1,A-1,inserted,"));
    assert!(lines[2].contains(",B-2,B-2,inserted,"));
}
