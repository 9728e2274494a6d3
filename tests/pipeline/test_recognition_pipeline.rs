// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Recognition pipeline tests against stub models

use std::sync::atomic::Ordering;
use std::sync::Arc;
use waste_recognizer::pipeline::{map_to_category, Category, RecognitionPipeline, WorkingSet};
use waste_recognizer::vision::{DetectionPass, DetectionResult, PixelBox};

use crate::support::{png_bytes, FailingDetector, StubClassifier, StubDetector};

async fn upload(width: u32, height: u32) -> WorkingSet {
    WorkingSet::create(None, "upload.png", &png_bytes(width, height))
        .await
        .unwrap()
}

#[tokio::test]
async fn test_zero_detections_yield_two_records() {
    let ws = upload(32, 32).await;
    let classifier = Arc::new(StubClassifier::new("banana peel"));
    let pipeline = RecognitionPipeline::new(Arc::new(StubDetector::empty()), classifier.clone(), 200);

    let (output, ws) = pipeline.run_in_workspace(ws).await.unwrap();

    assert_eq!(output.records.len(), 2);
    assert_eq!(output.records[0].id, "full_image_0");
    assert_eq!(output.records[1].id, "object_full");
    assert_eq!(output.records.len(), output.files.len());

    // Whole-image pass classifies the upload itself, then the final record does too
    let seen = classifier.seen.lock().unwrap().clone();
    assert_eq!(seen, vec![ws.input_path().to_path_buf(); 2]);
}

#[tokio::test]
async fn test_n_boxes_yield_n_plus_one_records() {
    let ws = upload(300, 300).await;
    let boxes = vec![
        ("bottle", 0.9, PixelBox::new(10, 10, 40, 80)),
        ("cup", 0.8, PixelBox::new(100, 100, 150, 160)),
        ("bag", 0.7, PixelBox::new(200, 20, 290, 120)),
        ("can", 0.6, PixelBox::new(50, 200, 90, 260)),
    ];
    let classifier = Arc::new(StubClassifier::new("metal can"));
    let pipeline = RecognitionPipeline::new(
        Arc::new(StubDetector::with_boxes(boxes.clone())),
        classifier.clone(),
        200,
    );

    let (output, ws) = pipeline.run_in_workspace(ws).await.unwrap();

    assert_eq!(output.records.len(), boxes.len() + 1);
    for (i, (label, confidence, bbox)) in boxes.iter().enumerate() {
        let record = &output.records[i];
        assert_eq!(record.detected_class, *label);
        assert_eq!(record.detection_confidence, *confidence);
        assert_eq!(record.bbox, Some((*bbox).into()));
        assert_eq!(record.verdict, Category::PlasticAndMetal);
        // Crops are classified from their derived file
        assert_eq!(
            classifier.seen.lock().unwrap()[i],
            ws.output_dir().join(format!("object_0_{}.webp", i))
        );
    }
    assert_eq!(classifier.calls.load(Ordering::SeqCst), boxes.len() + 1);
}

#[tokio::test]
async fn test_last_record_references_upload() {
    let ws = upload(50, 50).await;
    let pipeline = RecognitionPipeline::new(
        Arc::new(StubDetector::with_boxes(vec![(
            "bottle",
            0.5,
            PixelBox::new(1, 1, 10, 10),
        )])),
        Arc::new(StubClassifier::new("plastic")),
        200,
    );

    let (output, ws) = pipeline.run_in_workspace(ws).await.unwrap();

    let last = output.records.last().unwrap();
    assert_eq!(last.id, "object_full");
    assert_eq!(last.detected_class, "none");
    assert_eq!(last.detection_confidence, 1.0);
    assert!(last.bbox.is_none());
    assert_eq!(output.files[last.file_index], ws.input_path());
}

#[tokio::test]
async fn test_boxes_outside_image_still_crop() {
    let ws = upload(40, 30).await;
    let detector = StubDetector {
        passes: vec![DetectionPass::new(vec![DetectionResult {
            label: "ghost".to_string(),
            confidence: 0.3,
            bbox: PixelBox::new(500, 500, 600, 650),
        }])],
    };
    let pipeline = RecognitionPipeline::new(
        Arc::new(detector),
        Arc::new(StubClassifier::new("unknown")),
        200,
    );

    let (output, _ws) = pipeline.run_in_workspace(ws).await.unwrap();

    let crop = image::open(&output.files[0]).unwrap();
    assert!(crop.width() >= 1 && crop.width() <= 40);
    assert!(crop.height() >= 1 && crop.height() <= 30);
    // The reported box is the detector's, untouched
    let bbox = output.records[0].bbox.unwrap();
    assert_eq!((bbox.x1, bbox.y1, bbox.x2, bbox.y2), (500, 500, 600, 650));
}

#[tokio::test]
async fn test_detector_failure_propagates() {
    let ws = upload(8, 8).await;
    let pipeline =
        RecognitionPipeline::new(Arc::new(FailingDetector), Arc::new(StubClassifier::new("x")), 200);

    let err = pipeline.run_in_workspace(ws).await.unwrap_err();
    assert!(err.to_string().contains("detector exploded"));
}

#[test]
fn test_category_priority_examples() {
    assert_eq!(map_to_category("Pop bottle"), Category::PlasticAndMetal);
    assert_eq!(map_to_category("egg carton"), Category::Paper);
    assert_eq!(map_to_category("FRUIT"), Category::Bio);
    assert_eq!(map_to_category("wine glass"), Category::Glass);
    assert_eq!(map_to_category("glass can"), Category::PlasticAndMetal);
    assert_eq!(map_to_category("Battery"), Category::HouseholdWaste);
    assert_eq!(map_to_category("unknown-thing"), Category::Mixed);
}
