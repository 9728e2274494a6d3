// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Detection → crop → classification pipeline
//!
//! One run processes a single uploaded image:
//! 1. The detector runs once over the upload
//! 2. A pass without boxes classifies the whole image and re-encodes it
//! 3. Every detected box is expanded by the crop margin, cropped, saved as
//!    WebP and classified
//! 4. The original upload is classified one final time as `object_full`
//!
//! Records and files are emitted in lock step so each record's `file_index`
//! points at its own file.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info};

use super::record::ObjectRecord;
use super::workspace::WorkingSet;
use crate::vision::image_utils::{crop_to_webp, load_image, save_webp};
use crate::vision::{
    ClassificationResult, ImageError, ObjectClassifier, ObjectDetector, VisionModelManager,
};

/// Errors that abort a pipeline run
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Detection failed: {0:#}")]
    Detection(anyhow::Error),

    #[error("Classification failed for {path}: {error:#}")]
    Classification { path: String, error: anyhow::Error },

    #[error(transparent)]
    Image(#[from] ImageError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Pipeline task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Ordered records and the parallel list of files they reference
#[derive(Debug, Default)]
pub struct PipelineOutput {
    pub records: Vec<ObjectRecord>,
    pub files: Vec<PathBuf>,
}

impl PipelineOutput {
    fn push(&mut self, record: ObjectRecord, file: PathBuf) {
        self.records.push(record);
        self.files.push(file);
    }

    fn next_index(&self) -> usize {
        self.files.len()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Runs the recognition pipeline against shared models
#[derive(Clone)]
pub struct RecognitionPipeline {
    detector: Arc<dyn ObjectDetector>,
    classifier: Arc<dyn ObjectClassifier>,
    crop_margin: u32,
}

impl RecognitionPipeline {
    pub fn new(
        detector: Arc<dyn ObjectDetector>,
        classifier: Arc<dyn ObjectClassifier>,
        crop_margin: u32,
    ) -> Self {
        Self {
            detector,
            classifier,
            crop_margin,
        }
    }

    pub fn from_manager(manager: &VisionModelManager, crop_margin: u32) -> Self {
        Self::new(manager.detector(), manager.classifier(), crop_margin)
    }

    /// Run the pipeline over a working set on the blocking thread pool
    ///
    /// The blocking task owns the working set until it finishes, so dropping
    /// the returned future never removes the directory under a running
    /// pipeline. On failure the directory is removed by the task itself.
    pub async fn run_in_workspace(
        &self,
        workspace: WorkingSet,
    ) -> Result<(PipelineOutput, WorkingSet), PipelineError> {
        let pipeline = self.clone();

        tokio::task::spawn_blocking(move || -> Result<_, PipelineError> {
            let output = pipeline.run(workspace.input_path(), workspace.output_dir())?;
            Ok((output, workspace))
        })
        .await?
    }

    /// Process `input_path`, writing derived images into `output_dir`
    ///
    /// Blocking: model inference and image codecs run on the calling thread.
    pub fn run(&self, input_path: &Path, output_dir: &Path) -> Result<PipelineOutput, PipelineError> {
        let start = Instant::now();
        let mut output = PipelineOutput::default();

        let passes = self
            .detector
            .detect(input_path)
            .map_err(PipelineError::Detection)?;
        debug!(
            "Detector returned {} passes ({} boxes)",
            passes.len(),
            passes.iter().map(|p| p.detections.len()).sum::<usize>()
        );

        if !passes.is_empty() {
            // Decoded once and shared by every crop
            let source = load_image(input_path)?;
            let (width, height) = (source.width(), source.height());

            for (pass_index, pass) in passes.iter().enumerate() {
                if pass.is_empty() {
                    let classification = self.classify(input_path)?;
                    let path = output_dir.join(format!("full_image_{}.webp", pass_index));
                    save_webp(&source, &path)?;

                    let record =
                        ObjectRecord::whole_image(pass_index, classification, output.next_index());
                    output.push(record, path);
                    continue;
                }

                for (box_index, detection) in pass.detections.iter().enumerate() {
                    let region = detection.bbox.expand_clamped(self.crop_margin, width, height);
                    let path =
                        output_dir.join(format!("object_{}_{}.webp", pass_index, box_index));
                    crop_to_webp(&source, region, &path)?;

                    let classification = self.classify(&path)?;
                    debug!(
                        "Box {}/{} '{}' ({:.2}) classified as '{}' ({:.2})",
                        pass_index,
                        box_index,
                        detection.label,
                        detection.confidence,
                        classification.label,
                        classification.confidence
                    );

                    let record = ObjectRecord::detected(
                        pass_index,
                        box_index,
                        detection,
                        classification,
                        output.next_index(),
                    );
                    output.push(record, path);
                }
            }
        }

        let classification = self.classify(input_path)?;
        let record = ObjectRecord::original(classification, output.next_index());
        output.push(record, input_path.to_path_buf());

        info!(
            "Recognized {} objects in {}ms",
            output.len(),
            start.elapsed().as_millis()
        );

        Ok(output)
    }

    fn classify(&self, path: &Path) -> Result<ClassificationResult, PipelineError> {
        self.classifier
            .classify(path)
            .map_err(|error| PipelineError::Classification {
                path: path.display().to_string(),
                error,
            })
    }
}
