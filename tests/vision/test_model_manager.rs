// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Vision model manager tests
//!
//! Tests marked `#[ignore]` need real ONNX models at the default paths
//! (see `RecognizerConfig`). Run them with `cargo test -- --ignored`.

use std::path::PathBuf;
use waste_recognizer::config::RecognizerConfig;
use waste_recognizer::vision::{ObjectClassifier, ObjectDetector, VisionModelConfig, VisionModelManager};

#[test]
fn test_config_follows_recognizer_config() {
    let recognizer = RecognizerConfig {
        detector_model_path: PathBuf::from("/models/yolo.onnx"),
        detection_confidence_threshold: 0.4,
        iou_threshold: 0.5,
        intra_threads: 2,
        ..RecognizerConfig::default()
    };

    let config = VisionModelConfig::from(&recognizer);

    assert_eq!(config.detector_model_path, PathBuf::from("/models/yolo.onnx"));
    assert_eq!(config.detection.confidence_threshold, 0.4);
    assert_eq!(config.detection.iou_threshold, 0.5);
    assert_eq!(config.intra_threads, 2);
}

#[tokio::test]
async fn test_missing_models_fail_to_load() {
    let config = VisionModelConfig {
        detector_model_path: PathBuf::from("/nonexistent/detect.onnx"),
        classifier_model_path: PathBuf::from("/nonexistent/classify.onnx"),
        ..VisionModelConfig::default()
    };

    let err = VisionModelManager::init(config).await.err().unwrap();
    assert!(format!("{:#}", err).contains("/nonexistent/detect.onnx"));
}

#[tokio::test]
#[ignore]
async fn test_real_models_load_and_run() {
    let manager = VisionModelManager::init(VisionModelConfig::default())
        .await
        .expect("models at default paths");
    assert_eq!(manager.list_models().len(), 2);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("blank.png");
    image::RgbImage::from_pixel(320, 240, image::Rgb([120, 120, 120]))
        .save(&path)
        .unwrap();

    let passes = manager.detector().detect(&path).unwrap();
    assert_eq!(passes.len(), 1);

    let result = manager.classifier().classify(&path).unwrap();
    assert!(!result.label.is_empty());
    assert!((0.0..=1.0).contains(&result.confidence));
}
