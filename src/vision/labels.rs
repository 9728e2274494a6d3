// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Class label files shared by the detector and classifier

use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Load class names from a text file, one label per line
///
/// Line `i` names class index `i`. Blank lines and surrounding whitespace are
/// skipped.
pub fn load_labels<P: AsRef<Path>>(path: P) -> Result<Vec<String>> {
    let path = path.as_ref();
    let file = File::open(path)
        .with_context(|| format!("Failed to open label file: {}", path.display()))?;

    let mut labels = Vec::new();
    for line in BufReader::new(file).lines() {
        let line = line.context("Failed to read label line")?;
        let label = line.trim();
        if !label.is_empty() {
            labels.push(label.to_string());
        }
    }

    if labels.is_empty() {
        anyhow::bail!("Label file is empty: {}", path.display());
    }

    Ok(labels)
}

/// Look up a class name, falling back to `class_{id}` for unknown indices
pub fn label_for(labels: &[String], class_id: usize) -> String {
    labels
        .get(class_id)
        .cloned()
        .unwrap_or_else(|| format!("class_{}", class_id))
}
