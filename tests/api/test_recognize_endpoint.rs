// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! /recognize and /recognize-json endpoint tests
//!
//! Models are replaced by stubs so the full HTTP path runs without ONNX files.

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    response::Response,
};
use std::sync::Arc;
use tower::util::ServiceExt; // for `oneshot`
use waste_recognizer::api::http_server::{create_app, AppState};
use waste_recognizer::api::RecognitionResponse;
use waste_recognizer::config::RecognizerConfig;
use waste_recognizer::vision::PixelBox;

use crate::support::{
    dir_is_empty, image_upload, manager, png_bytes, state_with_models, upload_request,
    FailingDetector, FormField, StubClassifier, StubDetector,
};

async fn send(state: AppState, request: Request<Body>) -> Response {
    create_app(state).oneshot(request).await.unwrap()
}

async fn error_of(response: Response) -> (StatusCode, String) {
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    (status, json["error"].as_str().unwrap_or_default().to_string())
}

fn stub_state_manager(label: &str) -> Arc<waste_recognizer::VisionModelManager> {
    manager(
        StubDetector::with_boxes(vec![
            ("bottle", 0.91, PixelBox::new(4, 4, 20, 30)),
            ("can", 0.66, PixelBox::new(30, 10, 60, 40)),
        ]),
        Arc::new(StubClassifier::new(label)),
    )
}

// =============================================================================
// Validation
// =============================================================================

#[tokio::test]
async fn test_missing_file_field() {
    let tmp = tempfile::tempdir().unwrap();
    let state = state_with_models(tmp.path(), Some(stub_state_manager("can"))).await;
    let request = upload_request(
        "/recognize",
        &[FormField {
            name: "other",
            filename: Some("photo.png"),
            data: b"x",
        }],
    );

    let (status, error) = error_of(send(state, request).await).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error, "No file provided");
}

#[tokio::test]
async fn test_file_field_without_filename_is_not_a_file() {
    let tmp = tempfile::tempdir().unwrap();
    let state = state_with_models(tmp.path(), None).await;
    let request = upload_request(
        "/recognize",
        &[FormField {
            name: "file",
            filename: None,
            data: b"plain form value",
        }],
    );

    let (status, error) = error_of(send(state, request).await).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error, "No file provided");
}

#[tokio::test]
async fn test_non_multipart_request() {
    let request = Request::builder()
        .method(Method::POST)
        .uri("/recognize")
        .header("content-type", "application/json")
        .body(Body::from("{}"))
        .unwrap();

    let (status, error) = error_of(send(AppState::new_for_test(), request).await).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error, "No file provided");
}

#[tokio::test]
async fn test_empty_filename() {
    let request = image_upload("/recognize", "", b"data");

    let (status, error) = error_of(send(AppState::new_for_test(), request).await).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error, "No file selected");
}

#[tokio::test]
async fn test_disallowed_extension() {
    let request = image_upload("/recognize", "notes.txt", b"hello");

    let (status, error) = error_of(send(AppState::new_for_test(), request).await).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error, "File type not allowed");
}

#[tokio::test]
async fn test_models_not_loaded() {
    let request = image_upload("/recognize", "photo.png", &png_bytes(8, 8));

    let (status, error) = error_of(send(AppState::new_for_test(), request).await).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(error, "Vision models not loaded");
}

#[tokio::test]
async fn test_upload_over_limit() {
    let tmp = tempfile::tempdir().unwrap();
    let state = AppState::new(RecognizerConfig {
        max_upload_bytes: 1024,
        temp_dir: Some(tmp.path().to_path_buf()),
        ..RecognizerConfig::default()
    });
    state.set_vision_model_manager(stub_state_manager("can")).await;

    let request = image_upload("/recognize", "photo.png", &vec![0u8; 8 * 1024]);

    let response = send(state, request).await;
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert!(dir_is_empty(tmp.path()));
}

// =============================================================================
// Pipeline failures
// =============================================================================

#[tokio::test]
async fn test_pipeline_failure_is_500_and_cleans_up() {
    let tmp = tempfile::tempdir().unwrap();
    let models = manager(FailingDetector, Arc::new(StubClassifier::new("can")));
    let state = state_with_models(tmp.path(), Some(models)).await;

    let request = image_upload("/recognize", "photo.png", &png_bytes(8, 8));
    let (status, error) = error_of(send(state, request).await).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(error.contains("detector exploded"));
    assert!(dir_is_empty(tmp.path()));
}

#[tokio::test]
async fn test_undecodable_image_is_500() {
    let tmp = tempfile::tempdir().unwrap();
    let state = state_with_models(tmp.path(), Some(stub_state_manager("can"))).await;

    let request = image_upload("/recognize", "photo.png", b"definitely not a png");
    let (status, _) = error_of(send(state, request).await).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(dir_is_empty(tmp.path()));
}

// =============================================================================
// Success
// =============================================================================

#[tokio::test]
async fn test_recognize_streams_metadata_and_files() {
    let tmp = tempfile::tempdir().unwrap();
    let state = state_with_models(tmp.path(), Some(stub_state_manager("aluminium can"))).await;

    let request = image_upload("/recognize", "photo.PNG", &png_bytes(80, 60));
    let response = send(state, request).await;
    assert_eq!(response.status(), StatusCode::OK);

    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(content_type.starts_with("multipart/form-data; boundary="));

    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let parsed = RecognitionResponse::from_multipart(&content_type, &body).unwrap();

    assert_eq!(parsed.status, "success");
    assert_eq!(parsed.total_objects, 3);
    assert_eq!(parsed.results.len(), 3);
    assert!(parsed.results.iter().all(|r| r.image.is_some()));

    let ids: Vec<_> = parsed.results.iter().map(|r| r.record.id.as_str()).collect();
    assert_eq!(ids, ["object_0_0", "object_0_1", "object_full"]);

    let first = &parsed.results[0];
    assert_eq!(first.record.detected_class, "bottle");
    assert_eq!(first.record.verdict.as_str(), "plastic_and_metal");
    let bbox = first.record.bbox.unwrap();
    assert_eq!((bbox.x1, bbox.y1, bbox.x2, bbox.y2), (4, 4, 20, 30));
    assert_eq!((bbox.width, bbox.height), (16, 26));
    assert_eq!(first.image.as_ref().unwrap().filename, "object_0_0.webp");

    let full = &parsed.results[2];
    assert!(full.record.bbox.is_none());
    let full_image = full.image.as_ref().unwrap();
    assert_eq!(full_image.filename, "object_full.PNG");
    assert_eq!(full_image.data, png_bytes(80, 60));

    // Body fully drained: working set released
    assert!(dir_is_empty(tmp.path()));
}

#[tokio::test]
async fn test_recognize_without_detections() {
    let tmp = tempfile::tempdir().unwrap();
    let classifier = Arc::new(StubClassifier::new("Battery"));
    let models = manager(StubDetector::empty(), classifier.clone());
    let state = state_with_models(tmp.path(), Some(models)).await;

    let response = send(state, image_upload("/recognize", "photo.jpg", &png_bytes(16, 16))).await;
    assert_eq!(response.status(), StatusCode::OK);

    let content_type = response.headers()[header::CONTENT_TYPE]
        .to_str()
        .unwrap()
        .to_string();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let parsed = RecognitionResponse::from_multipart(&content_type, &body).unwrap();

    assert_eq!(parsed.total_objects, 2);
    assert_eq!(parsed.results[0].record.id, "full_image_0");
    assert_eq!(parsed.results[0].record.detected_class, "full_image");
    assert_eq!(parsed.results[0].record.verdict.as_str(), "household_waste");
    assert_eq!(parsed.results[1].record.id, "object_full");
    assert_eq!(classifier.calls.load(std::sync::atomic::Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_recognize_json_returns_metadata_only() {
    let tmp = tempfile::tempdir().unwrap();
    let state = state_with_models(tmp.path(), Some(stub_state_manager("cardboard box"))).await;

    let response = send(
        state,
        image_upload("/recognize-json", "photo.webp", &png_bytes(64, 64)),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "application/json"
    );

    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();

    assert_eq!(json["status"], "success");
    assert_eq!(json["total_objects"], 3);
    assert_eq!(json["results"][0]["verdict"], "paper");
    assert_eq!(json["results"][2]["id"], "object_full");
    assert_eq!(json["results"][2]["file_index"], 2);
    assert!(dir_is_empty(tmp.path()));
}
