// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Request-scoped working directory
//!
//! A `WorkingSet` owns a temporary directory holding the uploaded image and an
//! `output/` subdirectory for derived crops. The directory is removed when the
//! value is dropped, so every exit path (success, error, aborted stream)
//! releases it.

use std::io;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, warn};

const OUTPUT_DIR: &str = "output";
const DIR_PREFIX: &str = "recognize-";

#[derive(Debug)]
pub struct WorkingSet {
    dir: TempDir,
    input_path: PathBuf,
    output_dir: PathBuf,
}

impl WorkingSet {
    /// Create a working set and write the upload into it
    ///
    /// `filename` must already be sanitised; it becomes the input file's name.
    pub async fn create(parent: Option<&Path>, filename: &str, data: &[u8]) -> io::Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(DIR_PREFIX);
        let dir = match parent {
            Some(parent) => builder.tempdir_in(parent)?,
            None => builder.tempdir()?,
        };

        let input_path = dir.path().join(filename);
        let output_dir = dir.path().join(OUTPUT_DIR);

        tokio::fs::write(&input_path, data).await?;
        tokio::fs::create_dir_all(&output_dir).await?;

        debug!(
            "Created working set {} ({} bytes uploaded)",
            dir.path().display(),
            data.len()
        );

        Ok(Self {
            dir,
            input_path,
            output_dir,
        })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// The uploaded source image
    pub fn input_path(&self) -> &Path {
        &self.input_path
    }

    /// Directory for derived images
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Remove the directory on the blocking pool, reporting failures
    pub async fn close(self) -> io::Result<()> {
        let path = self.dir.path().to_path_buf();
        let dir = self.dir;
        let result = tokio::task::spawn_blocking(move || dir.close())
            .await
            .map_err(io::Error::other)
            .and_then(|removed| removed);

        match result {
            Ok(()) => {
                debug!("Removed working set {}", path.display());
                Ok(())
            }
            Err(e) => {
                warn!("Failed to remove working set {}: {}", path.display(), e);
                Err(e)
            }
        }
    }
}
