// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Recognition endpoint handlers

use axum::{extract::State, Json};
use axum_extra::extract::multipart::{Multipart, MultipartRejection};
use tracing::{error, info, warn};

use super::request::{RecognizeUpload, NO_FILE_PROVIDED};
use super::response::RecognitionMetadata;
use crate::api::errors::ApiError;
use crate::api::http_server::AppState;
use crate::api::streaming::MultipartResponse;
use crate::pipeline::{PipelineOutput, RecognitionPipeline, WorkingSet};

/// POST /recognize - Detect, crop and classify objects in an uploaded image
///
/// # Request
/// `multipart/form-data` with the image in the `file` field.
///
/// # Response
/// `multipart/form-data`: a `metadata` JSON part followed by one image part
/// per result record.
///
/// # Errors
/// - 400 Bad Request: missing file, empty filename, disallowed extension
/// - 413 Payload Too Large: upload exceeds the body limit
/// - 503 Service Unavailable: vision models not loaded
/// - 500 Internal Server Error: pipeline failure
pub async fn recognize_handler(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<MultipartResponse, ApiError> {
    let (output, workspace) = recognize(&state, multipart).await?;

    MultipartResponse::new(output.records, output.files, Some(workspace)).map_err(|e| {
        error!("Failed to serialize recognition metadata: {}", e);
        ApiError::InternalError(e.to_string())
    })
}

/// POST /recognize-json - Same pipeline, metadata only
///
/// The working set is removed before the response is sent.
pub async fn recognize_json_handler(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<RecognitionMetadata>, ApiError> {
    let (output, workspace) = recognize(&state, multipart).await?;

    if let Err(e) = workspace.close().await {
        warn!("Working set cleanup failed: {}", e);
    }

    Ok(Json(RecognitionMetadata::success(output.records)))
}

async fn recognize(
    state: &AppState,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<(PipelineOutput, WorkingSet), ApiError> {
    // 1. Validate upload
    let multipart = multipart.map_err(|rejection| {
        warn!("Rejected non-multipart recognition request: {}", rejection);
        ApiError::InvalidRequest(NO_FILE_PROVIDED.to_string())
    })?;
    let upload = RecognizeUpload::from_multipart(multipart).await?;

    // 2. Models
    let manager = state.get_vision_model_manager().await.ok_or_else(|| {
        warn!("Vision models not loaded");
        ApiError::ServiceUnavailable("Vision models not loaded".to_string())
    })?;

    // 3. Working set
    let workspace = WorkingSet::create(
        state.config.temp_dir.as_deref(),
        &upload.filename,
        &upload.data,
    )
    .await
    .map_err(|e| {
        error!("Failed to create working set: {}", e);
        ApiError::InternalError(e.to_string())
    })?;

    // 4. Pipeline
    let pipeline = RecognitionPipeline::from_manager(&manager, state.config.crop_margin);
    let (output, workspace) = pipeline.run_in_workspace(workspace).await.map_err(|e| {
        error!("Recognition failed for {}: {}", upload.filename, e);
        ApiError::from(e)
    })?;

    info!(
        "Recognition complete for {}: {} objects",
        upload.filename,
        output.len()
    );

    Ok((output, workspace))
}
