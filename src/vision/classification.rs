// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Image classification
//!
//! `ObjectClassifier` returns the single best label for a whole image file.
//! `OnnxClassificationModel` implements it with a top-1 ONNX classifier whose
//! output is `[1, C]` (probabilities or logits).

use anyhow::{Context, Result};
use ndarray::ArrayViewD;
use ort::execution_providers::CPUExecutionProvider;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Value;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

use super::image_utils::load_image;
use super::labels::{label_for, load_labels};
use super::preprocessing::{preprocess_for_classification, CLASSIFICATION_INPUT_SIZE};

/// Best-matching class for one image region
#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationResult {
    pub label: String,
    /// Confidence score (0.0-1.0)
    pub confidence: f32,
}

impl ClassificationResult {
    pub fn new(label: impl Into<String>, confidence: f32) -> Self {
        Self {
            label: label.into(),
            confidence,
        }
    }
}

/// Classifies a whole image file
///
/// Implementations are shared across requests and must be safe to call
/// concurrently.
#[cfg_attr(test, mockall::automock)]
pub trait ObjectClassifier: Send + Sync {
    fn classify(&self, image_path: &Path) -> Result<ClassificationResult>;
}

/// Top-1 image classification model (ONNX Runtime, CPU)
#[derive(Clone)]
pub struct OnnxClassificationModel {
    /// ONNX Runtime session (thread-safe)
    session: Arc<Mutex<Session>>,
    /// Class names indexed by class id
    labels: Arc<Vec<String>>,
    /// Model input name
    input_name: String,
}

impl std::fmt::Debug for OnnxClassificationModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxClassificationModel")
            .field("labels", &self.labels.len())
            .field("input_name", &self.input_name)
            .finish_non_exhaustive()
    }
}

impl OnnxClassificationModel {
    /// Load the classification model and its label file
    pub async fn new<P: AsRef<Path>>(
        model_path: P,
        labels_path: P,
        intra_threads: usize,
    ) -> Result<Self> {
        let model_path = model_path.as_ref();

        if !model_path.exists() {
            anyhow::bail!("Classification model not found: {}", model_path.display());
        }

        info!("Loading classification model from {}", model_path.display());

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
                format!(
                    "Failed to load classification model from {}",
                    model_path.display()
                )
            })?;

        let input_name = session
            .inputs
            .first()
            .map(|input| input.name.clone())
            .unwrap_or_else(|| "images".to_string());

        info!(
            "Classification model loaded ({} classes, input: {})",
            labels.len(),
            input_name
        );

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            labels: Arc::new(labels),
            input_name,
        })
    }
}

impl ObjectClassifier for OnnxClassificationModel {
    fn classify(&self, image_path: &Path) -> Result<ClassificationResult> {
        let image = load_image(image_path)?;
        let input = preprocess_for_classification(&image, CLASSIFICATION_INPUT_SIZE);

        let mut session = self
            .session
            .lock()
            .map_err(|_| anyhow::anyhow!("Classification session lock poisoned"))?;

        let input_value = Value::from_array(input).context("Failed to create input tensor")?;

        let outputs = session
            .run(ort::inputs![&self.input_name => input_value])
            .context("Classification inference failed")?;

        let scores = outputs[0]
            .try_extract_array::<f32>()
            .context("Failed to extract output tensor")?;

        let (class_id, confidence) = top1(scores.view())?;
        let result = ClassificationResult::new(label_for(&self.labels, class_id), confidence);

        debug!(
            "Classified {} as {} ({:.3})",
            image_path.display(),
            result.label,
            result.confidence
        );

        Ok(result)
    }
}

/// Pick the best class from `[1, C]` scores
///
/// Scores that do not already form a probability distribution are treated as
/// logits and passed through softmax first.
fn top1(scores: ArrayViewD<f32>) -> Result<(usize, f32)> {
    let values: Vec<f32> = scores.iter().copied().collect();
    if values.is_empty() {
        anyhow::bail!("Classifier returned no scores");
    }

    let sum: f32 = values.iter().sum();
    let is_distribution = values.iter().all(|v| (0.0..=1.0).contains(v)) && (sum - 1.0).abs() < 1e-3;
    let probs = if is_distribution {
        values
    } else {
        softmax(&values)
    };

    let (class_id, confidence) = probs
        .iter()
        .copied()
        .enumerate()
        .fold((0, f32::MIN), |best, cur| if cur.1 > best.1 { cur } else { best });

    Ok((class_id, confidence))
}

fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::MIN, f32::max);
    let exps: Vec<f32> = logits.iter().map(|v| (v - max).exp()).collect();
    let total: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / total).collect()
}
