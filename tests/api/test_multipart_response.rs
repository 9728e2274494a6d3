// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Multipart response wire format tests

use axum::{
    body::to_bytes,
    http::header,
    response::IntoResponse,
};
use futures::StreamExt;
use waste_recognizer::api::multipart::parse_multipart;
use waste_recognizer::api::{MultipartResponse, RecognitionMetadata, RecognitionResponse};
use waste_recognizer::pipeline::{ObjectRecord, WorkingSet};
use waste_recognizer::vision::ClassificationResult;

fn records(n: usize) -> Vec<ObjectRecord> {
    (0..n)
        .map(|i| {
            let mut record =
                ObjectRecord::whole_image(i, ClassificationResult::new("glass jar", 0.5), i);
            record.id = format!("full_image_{}", i);
            record
        })
        .collect()
}

#[tokio::test]
async fn test_metadata_part_comes_first() {
    let ws = WorkingSet::create(None, "upload.png", b"source").await.unwrap();
    let file = ws.output_dir().join("full_image_0.webp");
    std::fs::write(&file, b"derived").unwrap();

    let response = MultipartResponse::new(records(1), vec![file], Some(ws)).unwrap();
    let boundary = response.boundary().to_string();
    let body: Vec<u8> = response
        .into_stream()
        .map(|chunk| chunk.unwrap().to_vec())
        .concat()
        .await;

    let parts = parse_multipart(&body, &boundary);
    assert_eq!(parts[0].name.as_deref(), Some("metadata"));
    assert_eq!(parts[0].content_type.as_deref(), Some("application/json"));

    let metadata: RecognitionMetadata = serde_json::from_slice(&parts[0].data).unwrap();
    let file_parts = parts.iter().filter(|p| p.filename.is_some()).count();
    assert_eq!(metadata.total_objects, file_parts);
    assert_eq!(parts[1].data, b"derived");
    assert_eq!(parts[1].content_type.as_deref(), Some("image/webp"));

    assert!(body.ends_with(format!("--{}--\r\n", boundary).as_bytes()));
}

#[tokio::test]
async fn test_metadata_is_two_space_pretty_json() {
    let response = MultipartResponse::new(records(1), vec![], None).unwrap();
    let boundary = response.boundary().to_string();
    let body: Vec<u8> = response
        .into_stream()
        .map(|chunk| chunk.unwrap().to_vec())
        .concat()
        .await;
    let text = String::from_utf8(body).unwrap();

    let expected_head = format!(
        "--{}\r\nContent-Disposition: form-data; name=\"metadata\"\r\nContent-Type: application/json\r\n\r\n{{\n  \"status\": \"success\",\n  \"total_objects\": 1,\n  \"results\": [\n    {{\n      \"id\": \"full_image_0\"",
        boundary
    );
    assert!(text.starts_with(&expected_head), "unexpected head: {}", text);
}

#[tokio::test]
async fn test_each_response_uses_fresh_boundary() {
    let a = MultipartResponse::new(records(0), vec![], None).unwrap();
    let b = MultipartResponse::new(records(0), vec![], None).unwrap();
    assert_ne!(a.boundary(), b.boundary());
}

#[tokio::test]
async fn test_into_response_round_trips_through_client_parser() {
    let ws = WorkingSet::create(None, "upload.jpg", b"JPEG").await.unwrap();
    let derived = ws.output_dir().join("full_image_0.webp");
    std::fs::write(&derived, vec![0xAB; 20_000]).unwrap();
    let original = ws.input_path().to_path_buf();
    let dir = ws.path().to_path_buf();

    let mut recs = records(1);
    recs.push(ObjectRecord::original(ClassificationResult::new("glass jar", 0.9), 1));

    let response = MultipartResponse::new(recs, vec![derived, original], Some(ws))
        .unwrap()
        .into_response();
    let content_type = response.headers()[header::CONTENT_TYPE]
        .to_str()
        .unwrap()
        .to_string();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();

    let parsed = RecognitionResponse::from_multipart(&content_type, &body).unwrap();
    assert_eq!(parsed.total_objects, 2);
    assert_eq!(parsed.results[0].image.as_ref().unwrap().data.len(), 20_000);
    let full = parsed.results[1].image.as_ref().unwrap();
    assert_eq!(full.filename, "object_full.jpg");
    assert_eq!(full.data, b"JPEG");
    assert!(!dir.exists());
}
