// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Vision model manager for loading and sharing the detector and classifier

use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::RecognizerConfig;
use crate::vision::classification::{ObjectClassifier, OnnxClassificationModel};
use crate::vision::detection::{DetectionParams, ObjectDetector, YoloDetectionModel};

/// Configuration for loading vision models
#[derive(Debug, Clone)]
pub struct VisionModelConfig {
    pub detector_model_path: PathBuf,
    pub detector_labels_path: PathBuf,
    pub classifier_model_path: PathBuf,
    pub classifier_labels_path: PathBuf,
    pub detection: DetectionParams,
    /// ONNX Runtime intra-op threads per session
    pub intra_threads: usize,
}

impl Default for VisionModelConfig {
    fn default() -> Self {
        Self::from(&RecognizerConfig::default())
    }
}

impl From<&RecognizerConfig> for VisionModelConfig {
    fn from(config: &RecognizerConfig) -> Self {
        Self {
            detector_model_path: config.detector_model_path.clone(),
            detector_labels_path: config.detector_labels_path.clone(),
            classifier_model_path: config.classifier_model_path.clone(),
            classifier_labels_path: config.classifier_labels_path.clone(),
            detection: DetectionParams {
                confidence_threshold: config.detection_confidence_threshold,
                iou_threshold: config.iou_threshold,
                ..DetectionParams::default()
            },
            intra_threads: config.intra_threads,
        }
    }
}

/// Information about a loaded vision model
#[derive(Debug, Clone, serde::Serialize)]
pub struct VisionModelInfo {
    /// Model name
    pub name: String,
    /// Model type (detection, classification)
    pub model_type: String,
}

/// Process-wide owner of the detector and classifier
///
/// Built once at startup and shared read-only across requests behind an
/// `Arc`. Each ONNX model serializes its own inference calls, so concurrent
/// requests are safe but do not run the same model in parallel.
pub struct VisionModelManager {
    detector: Arc<dyn ObjectDetector>,
    classifier: Arc<dyn ObjectClassifier>,
    models: Vec<VisionModelInfo>,
}

impl VisionModelManager {
    /// Load both ONNX models described by `config`
    ///
    /// Recognition needs both models; a failure to load either is an error.
    pub async fn init(config: VisionModelConfig) -> Result<Self> {
        let detector = YoloDetectionModel::new(
            &config.detector_model_path,
            &config.detector_labels_path,
            config.detection,
            config.intra_threads,
        )
        .await?;
        tracing::info!(
            "✅ Detection model loaded from {}",
            config.detector_model_path.display()
        );

        let classifier = OnnxClassificationModel::new(
            &config.classifier_model_path,
            &config.classifier_labels_path,
            config.intra_threads,
        )
        .await?;
        tracing::info!(
            "✅ Classification model loaded from {}",
            config.classifier_model_path.display()
        );

        let models = vec![
            VisionModelInfo {
                name: file_stem(&config.detector_model_path),
                model_type: "detection".to_string(),
            },
            VisionModelInfo {
                name: file_stem(&config.classifier_model_path),
                model_type: "classification".to_string(),
            },
        ];

        Ok(Self {
            detector: Arc::new(detector),
            classifier: Arc::new(classifier),
            models,
        })
    }

    /// Build a manager around already constructed models
    pub fn with_models(
        detector: Arc<dyn ObjectDetector>,
        classifier: Arc<dyn ObjectClassifier>,
    ) -> Self {
        Self {
            detector,
            classifier,
            models: Vec::new(),
        }
    }

    pub fn detector(&self) -> Arc<dyn ObjectDetector> {
        self.detector.clone()
    }

    pub fn classifier(&self) -> Arc<dyn ObjectClassifier> {
        self.classifier.clone()
    }

    /// List loaded vision models
    pub fn list_models(&self) -> Vec<VisionModelInfo> {
        self.models.clone()
    }

    /// Release the models
    ///
    /// Sessions are freed once the last in-flight request drops its handle.
    pub fn shutdown(self) {
        tracing::info!("Releasing {} vision models", self.models.len());
        drop(self);
    }
}

fn file_stem(path: &std::path::Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "unknown".to_string())
}
