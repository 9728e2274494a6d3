// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Vision models for waste recognition
//!
//! This module provides:
//! - Object detection via a YOLO ONNX model
//! - Whole-image classification via an ONNX classifier
//! - Image decoding, cropping and WebP re-encoding
//!
//! Both models run on CPU through ONNX Runtime.

pub mod classification;
pub mod detection;
pub mod image_utils;
pub mod labels;
pub mod model_manager;
pub mod preprocessing;

pub use classification::{ClassificationResult, ObjectClassifier, OnnxClassificationModel};
pub use detection::{DetectionParams, DetectionPass, DetectionResult, ObjectDetector, YoloDetectionModel};
pub use image_utils::{detect_format, ImageError, PixelBox};
pub use model_manager::{VisionModelConfig, VisionModelInfo, VisionModelManager};
