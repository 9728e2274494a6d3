// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Service configuration
//!
//! Values are resolved in three layers: built-in defaults, an optional TOML
//! file, then environment variables.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Maximum upload size (16 MiB)
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

/// Pixels added on every side of a detected box before cropping
pub const DEFAULT_CROP_MARGIN: u32 = 200;

/// Recognizer service configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecognizerConfig {
    pub listen_addr: String,
    pub max_upload_bytes: usize,
    pub crop_margin: u32,
    pub detector_model_path: PathBuf,
    pub detector_labels_path: PathBuf,
    pub classifier_model_path: PathBuf,
    pub classifier_labels_path: PathBuf,
    pub detection_confidence_threshold: f32,
    pub iou_threshold: f32,
    pub intra_threads: usize,
    /// Parent directory for per-request working sets (system temp dir if unset)
    pub temp_dir: Option<PathBuf>,
}

impl Default for RecognizerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:5000".to_string(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            crop_margin: DEFAULT_CROP_MARGIN,
            detector_model_path: PathBuf::from("./models/detect-model.onnx"),
            detector_labels_path: PathBuf::from("./models/detect-labels.txt"),
            classifier_model_path: PathBuf::from("./models/classify-model.onnx"),
            classifier_labels_path: PathBuf::from("./models/classify-labels.txt"),
            detection_confidence_threshold: 0.25,
            iou_threshold: 0.45,
            intra_threads: 4,
            temp_dir: None,
        }
    }
}

impl RecognizerConfig {
    /// Load configuration from a TOML file
    ///
    /// Keys missing from the file keep their defaults.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Defaults, then `path` if given, then environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Apply overrides from a key lookup (normally the process environment)
    ///
    /// Values that fail to parse are ignored with a warning.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(val) = lookup("LISTEN_ADDR") {
            self.listen_addr = val;
        }
        override_parsed(&lookup, "MAX_UPLOAD_BYTES", &mut self.max_upload_bytes);
        override_parsed(&lookup, "CROP_MARGIN", &mut self.crop_margin);
        if let Some(val) = lookup("DETECTOR_MODEL_PATH") {
            self.detector_model_path = PathBuf::from(val);
        }
        if let Some(val) = lookup("DETECTOR_LABELS_PATH") {
            self.detector_labels_path = PathBuf::from(val);
        }
        if let Some(val) = lookup("CLASSIFIER_MODEL_PATH") {
            self.classifier_model_path = PathBuf::from(val);
        }
        if let Some(val) = lookup("CLASSIFIER_LABELS_PATH") {
            self.classifier_labels_path = PathBuf::from(val);
        }
        override_parsed(
            &lookup,
            "DETECTION_CONFIDENCE",
            &mut self.detection_confidence_threshold,
        );
        override_parsed(&lookup, "IOU_THRESHOLD", &mut self.iou_threshold);
        override_parsed(&lookup, "ORT_INTRA_THREADS", &mut self.intra_threads);
        if let Some(val) = lookup("RECOGNIZER_TEMP_DIR") {
            self.temp_dir = Some(PathBuf::from(val));
        }
    }
}

fn override_parsed<F, T>(lookup: &F, key: &str, target: &mut T)
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    if let Some(val) = lookup(key) {
        match val.parse() {
            Ok(parsed) => *target = parsed,
            Err(_) => tracing::warn!("Ignoring invalid value for {}: {:?}", key, val),
        }
    }
}
