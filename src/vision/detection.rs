// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Object detection
//!
//! `ObjectDetector` is the seam the pipeline calls through; `YoloDetectionModel`
//! implements it with a YOLO ONNX export (output `[1, 4 + C, N]`, boxes in
//! center format followed by per-class scores).

use anyhow::{Context, Result};
use ndarray::{Array4, ArrayViewD, Ix3};
use ort::execution_providers::CPUExecutionProvider;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Value;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

use super::image_utils::{load_image, PixelBox};
use super::labels::{label_for, load_labels};
use super::preprocessing::{preprocess_for_detection, DETECTION_INPUT_SIZE};

/// One candidate region produced by the detector
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionResult {
    /// Class label from the detector's label set
    pub label: String,
    /// Detection confidence score (0.0-1.0)
    pub confidence: f32,
    /// Box in source image pixels
    pub bbox: PixelBox,
}

/// Boxes produced by a single detector pass over one image
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetectionPass {
    pub detections: Vec<DetectionResult>,
}

impl DetectionPass {
    pub fn new(detections: Vec<DetectionResult>) -> Self {
        Self { detections }
    }

    pub fn is_empty(&self) -> bool {
        self.detections.is_empty()
    }
}

/// Finds objects in an image file
///
/// Implementations are shared across requests and must be safe to call
/// concurrently.
#[cfg_attr(test, mockall::automock)]
pub trait ObjectDetector: Send + Sync {
    fn detect(&self, image_path: &Path) -> Result<Vec<DetectionPass>>;
}

/// Detection thresholds
#[derive(Debug, Clone, Copy)]
pub struct DetectionParams {
    pub confidence_threshold: f32,
    pub iou_threshold: f32,
    pub max_detections: usize,
}

impl Default for DetectionParams {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.25,
            iou_threshold: 0.45,
            max_detections: 100,
        }
    }
}

/// Candidate box before label lookup, in source image coordinates
#[derive(Debug, Clone, Copy)]
struct Candidate {
    x1: f32,
    y1: f32,
    x2: f32,
    y2: f32,
    class_id: usize,
    confidence: f32,
}

/// YOLO object detection model (ONNX Runtime, CPU)
#[derive(Clone)]
pub struct YoloDetectionModel {
    /// ONNX Runtime session (thread-safe)
    session: Arc<Mutex<Session>>,
    /// Class names indexed by class id
    labels: Arc<Vec<String>>,
    /// Model input name
    input_name: String,
    params: DetectionParams,
}

impl std::fmt::Debug for YoloDetectionModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("YoloDetectionModel")
            .field("labels", &self.labels.len())
            .field("input_name", &self.input_name)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

impl YoloDetectionModel {
    /// Load the detection model and its label file
    ///
    /// # Errors
    /// Returns error if:
    /// - Model or label file not found
    /// - ONNX Runtime initialization fails
    pub async fn new<P: AsRef<Path>>(
        model_path: P,
        labels_path: P,
        params: DetectionParams,
        intra_threads: usize,
    ) -> Result<Self> {
        let model_path = model_path.as_ref();

        if !model_path.exists() {
            anyhow::bail!("Detection model not found: {}", model_path.display());
        }

        info!("Loading detection model from {}", model_path.display());

        let labels = load_labels(labels_path)?;

        let session = Session::builder()
            .context("Failed to create session builder")?
            .with_execution_providers([CPUExecutionProvider::default().build()])
            .context("Failed to set CPU execution provider")?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .context("Failed to set optimization level")?
            .with_intra_threads(intra_threads)
            .context("Failed to set intra threads")?
            .commit_from_file(model_path)
            .with_context(|| {
                format!("Failed to load detection model from {}", model_path.display())
            })?;

        let input_name = session
            .inputs
            .first()
            .map(|input| input.name.clone())
            .unwrap_or_else(|| "images".to_string());

        info!(
            "Detection model loaded ({} classes, input: {})",
            labels.len(),
            input_name
        );

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            labels: Arc::new(labels),
            input_name,
            params,
        })
    }

    fn run(&self, input: Array4<f32>, scale: (f32, f32), bounds: (u32, u32)) -> Result<Vec<DetectionResult>> {
        let mut session = self
            .session
            .lock()
            .map_err(|_| anyhow::anyhow!("Detection session lock poisoned"))?;

        let input_value = Value::from_array(input).context("Failed to create input tensor")?;

        let outputs = session
            .run(ort::inputs![&self.input_name => input_value])
            .context("Detection inference failed")?;

        let output = outputs[0]
            .try_extract_array::<f32>()
            .context("Failed to extract output tensor")?;

        let candidates = parse_yolo_output(output.view(), self.params.confidence_threshold, scale)?;
        let kept = non_maximum_suppression(candidates, self.params.iou_threshold);

        Ok(kept
            .into_iter()
            .take(self.params.max_detections)
            .map(|c| DetectionResult {
                label: label_for(&self.labels, c.class_id),
                confidence: c.confidence,
                bbox: to_pixel_box(&c, bounds),
            })
            .collect())
    }
}

impl ObjectDetector for YoloDetectionModel {
    fn detect(&self, image_path: &Path) -> Result<Vec<DetectionPass>> {
        let image = load_image(image_path)?;
        let bounds = (image.width(), image.height());
        let (input, scale) = preprocess_for_detection(&image, DETECTION_INPUT_SIZE);

        let detections = self.run(input, scale, bounds)?;
        debug!(
            "Detected {} objects in {}",
            detections.len(),
            image_path.display()
        );

        Ok(vec![DetectionPass::new(detections)])
    }
}

/// Parse `[1, 4 + C, N]` YOLO output into thresholded candidates
fn parse_yolo_output(
    output: ArrayViewD<f32>,
    confidence_threshold: f32,
    (scale_x, scale_y): (f32, f32),
) -> Result<Vec<Candidate>> {
    let output = output
        .into_dimensionality::<Ix3>()
        .context("Unexpected detection output rank")?;

    let (_, features, anchors) = output.dim();
    if features <= 4 {
        anyhow::bail!("Unexpected detection output shape: {:?}", output.shape());
    }
    let num_classes = features - 4;

    let mut candidates = Vec::new();
    for i in 0..anchors {
        let (class_id, confidence) = (0..num_classes)
            .map(|c| (c, output[[0, 4 + c, i]]))
            .fold((0, f32::MIN), |best, cur| if cur.1 > best.1 { cur } else { best });

        if confidence < confidence_threshold {
            continue;
        }

        let cx = output[[0, 0, i]];
        let cy = output[[0, 1, i]];
        let w = output[[0, 2, i]];
        let h = output[[0, 3, i]];

        candidates.push(Candidate {
            x1: (cx - w / 2.0) * scale_x,
            y1: (cy - h / 2.0) * scale_y,
            x2: (cx + w / 2.0) * scale_x,
            y2: (cy + h / 2.0) * scale_y,
            class_id,
            confidence,
        });
    }

    Ok(candidates)
}

/// Greedy per-class NMS; output is ordered by descending confidence
fn non_maximum_suppression(mut candidates: Vec<Candidate>, iou_threshold: f32) -> Vec<Candidate> {
    candidates.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut keep: Vec<Candidate> = Vec::new();
    for candidate in candidates {
        let overlaps = keep
            .iter()
            .any(|k| k.class_id == candidate.class_id && iou(k, &candidate) > iou_threshold);
        if !overlaps {
            keep.push(candidate);
        }
    }
    keep
}

fn iou(a: &Candidate, b: &Candidate) -> f32 {
    let inter_w = (a.x2.min(b.x2) - a.x1.max(b.x1)).max(0.0);
    let inter_h = (a.y2.min(b.y2) - a.y1.max(b.y1)).max(0.0);
    let intersection = inter_w * inter_h;

    let area_a = (a.x2 - a.x1) * (a.y2 - a.y1);
    let area_b = (b.x2 - b.x1) * (b.y2 - b.y1);
    let union = area_a + area_b - intersection;

    if union > 0.0 {
        intersection / union
    } else {
        0.0
    }
}

/// Truncate to integer pixels inside the image, keeping x1 < x2 and y1 < y2
fn to_pixel_box(c: &Candidate, (width, height): (u32, u32)) -> PixelBox {
    let clamp = |v: f32, limit: u32| (v.max(0.0) as u32).min(limit);

    let x1 = clamp(c.x1, width.saturating_sub(1));
    let y1 = clamp(c.y1, height.saturating_sub(1));
    let x2 = clamp(c.x2, width).max(x1 + 1);
    let y2 = clamp(c.y2, height).max(y1 + 1);

    PixelBox::new(x1, y1, x2, y2)
}
