// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Per-object result records returned to the caller

use serde::{Deserialize, Serialize};

use super::category::{map_to_category, Category};
use crate::vision::{ClassificationResult, DetectionResult, PixelBox};

/// Identifier of the record that classifies the original upload
pub const FULL_OBJECT_ID: &str = "object_full";

/// `detected_class` of records produced when a detector pass found nothing
pub const FULL_IMAGE_CLASS: &str = "full_image";

/// `detected_class` of the original-upload record
pub const NO_DETECTION_CLASS: &str = "none";

/// Detector box as reported to clients
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: u32,
    pub y1: u32,
    pub x2: u32,
    pub y2: u32,
    pub width: u32,
    pub height: u32,
}

impl From<PixelBox> for BoundingBox {
    fn from(b: PixelBox) -> Self {
        Self {
            x1: b.x1,
            y1: b.y1,
            x2: b.x2,
            y2: b.y2,
            width: b.width(),
            height: b.height(),
        }
    }
}

/// One recognized object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectRecord {
    /// Unique within one response
    pub id: String,
    pub detected_class: String,
    pub classified_as: String,
    pub verdict: Category,
    /// Classifier confidence
    pub confidence: f32,
    /// Detector confidence, 1.0 when no detector box applies
    pub detection_confidence: f32,
    /// Unexpanded detector box; `None` for whole-image records
    pub bbox: Option<BoundingBox>,
    /// Index into the accompanying file list
    pub file_index: usize,
}

impl ObjectRecord {
    /// Record for box `box_index` of detector pass `pass_index`
    pub fn detected(
        pass_index: usize,
        box_index: usize,
        detection: &DetectionResult,
        classification: ClassificationResult,
        file_index: usize,
    ) -> Self {
        Self {
            id: format!("object_{}_{}", pass_index, box_index),
            detected_class: detection.label.clone(),
            verdict: map_to_category(&classification.label),
            classified_as: classification.label,
            confidence: classification.confidence,
            detection_confidence: detection.confidence,
            bbox: Some(detection.bbox.into()),
            file_index,
        }
    }

    /// Record for a detector pass that found no boxes
    pub fn whole_image(
        pass_index: usize,
        classification: ClassificationResult,
        file_index: usize,
    ) -> Self {
        Self::undetected(
            format!("full_image_{}", pass_index),
            FULL_IMAGE_CLASS,
            classification,
            file_index,
        )
    }

    /// Record classifying the original upload
    pub fn original(classification: ClassificationResult, file_index: usize) -> Self {
        Self::undetected(
            FULL_OBJECT_ID.to_string(),
            NO_DETECTION_CLASS,
            classification,
            file_index,
        )
    }

    fn undetected(
        id: String,
        detected_class: &str,
        classification: ClassificationResult,
        file_index: usize,
    ) -> Self {
        Self {
            id,
            detected_class: detected_class.to_string(),
            verdict: map_to_category(&classification.label),
            classified_as: classification.label,
            confidence: classification.confidence,
            detection_confidence: 1.0,
            bbox: None,
            file_index,
        }
    }
}
