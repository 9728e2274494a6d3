// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Upload extraction and validation for the recognition endpoints

use axum::http::StatusCode;
use axum_extra::extract::multipart::{Multipart, MultipartError};
use bytes::Bytes;
use tracing::{debug, warn};
use unicode_normalization::UnicodeNormalization;

use crate::api::errors::ApiError;

/// Multipart field carrying the image
pub const FILE_FIELD: &str = "file";

/// Accepted upload extensions (compared case-insensitively)
pub const ALLOWED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "bmp", "webp"];

pub const NO_FILE_PROVIDED: &str = "No file provided";
pub const NO_FILE_SELECTED: &str = "No file selected";
pub const FILE_TYPE_NOT_ALLOWED: &str = "File type not allowed";

/// A validated image upload
#[derive(Debug, Clone)]
pub struct RecognizeUpload {
    /// Sanitised name, safe to join onto a directory
    pub filename: String,
    pub data: Bytes,
}

impl RecognizeUpload {
    /// Pull the `file` field out of a multipart form
    ///
    /// Fields without a filename are ordinary form values and are ignored.
    pub async fn from_multipart(mut multipart: Multipart) -> Result<Self, ApiError> {
        while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
            if field.name() != Some(FILE_FIELD) {
                continue;
            }
            let Some(original_name) = field.file_name().map(str::to_string) else {
                continue;
            };

            if original_name.is_empty() {
                return Err(ApiError::InvalidRequest(NO_FILE_SELECTED.to_string()));
            }
            let Some(extension) = allowed_extension(&original_name) else {
                warn!("Rejected upload with disallowed name {:?}", original_name);
                return Err(ApiError::InvalidRequest(FILE_TYPE_NOT_ALLOWED.to_string()));
            };

            let data = field.bytes().await.map_err(multipart_error)?;
            let filename = secure_filename(&original_name, &extension);
            debug!("Received upload {:?} ({} bytes)", filename, data.len());

            return Ok(Self { filename, data });
        }

        Err(ApiError::InvalidRequest(NO_FILE_PROVIDED.to_string()))
    }
}

fn multipart_error(err: MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge(err.body_text())
    } else {
        ApiError::InvalidRequest(err.body_text())
    }
}

/// Lower-cased extension of `filename` if it is on the allow list
pub fn allowed_extension(filename: &str) -> Option<String> {
    let (_, ext) = filename.rsplit_once('.')?;
    let ext = ext.to_ascii_lowercase();
    ALLOWED_EXTENSIONS.contains(&ext.as_str()).then_some(ext)
}

/// Reduce a client-supplied filename to a safe single path component
///
/// Accented letters are reduced to their ASCII base via NFKD. Path separators
/// and whitespace become `_`, other characters outside `[A-Za-z0-9._-]` are
/// dropped, and leading `.`/`_` are stripped. Falls back
/// to `upload.{extension}` when nothing usable remains.
pub fn secure_filename(filename: &str, extension: &str) -> String {
    let spaced: String = filename
        .nfkd()
        .map(|c| if c == '/' || c == '\\' { ' ' } else { c })
        .collect();
    let joined = spaced.split_whitespace().collect::<Vec<_>>().join("_");

    let cleaned: String = joined
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
        .collect();
    let cleaned = cleaned.trim_start_matches(['.', '_']);

    if cleaned.is_empty() || !cleaned.contains('.') {
        format!("upload.{}", extension)
    } else {
        cleaned.to_string()
    }
}
