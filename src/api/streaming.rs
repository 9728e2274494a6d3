// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Lazily streamed `multipart/form-data` recognition response
//!
//! Body layout:
//!
//! ```text
//! --{boundary}\r\n
//! Content-Disposition: form-data; name="metadata"\r\n
//! Content-Type: application/json\r\n\r\n
//! {pretty metadata JSON}\r\n
//! --{boundary}\r\n                                   (once per existing file)
//! Content-Disposition: form-data; name="file_{i}"; filename="{id}{ext}"\r\n
//! Content-Type: image/webp\r\n\r\n
//! {file bytes}\r\n
//! --{boundary}--\r\n
//! ```
//!
//! Files are opened one at a time and read in 8 KiB chunks. The response owns
//! the request's [`WorkingSet`]; it is closed once the closing boundary has
//! been sent, or dropped with the body if the client goes away.

use axum::{
    body::Body,
    http::header,
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use futures::stream::{self, Stream, StreamExt};
use std::collections::VecDeque;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio_util::io::ReaderStream;
use tracing::{debug, warn};

use crate::api::recognize::response::RecognitionMetadata;
use crate::pipeline::{ObjectRecord, WorkingSet};

/// Read size for file parts
pub const CHUNK_SIZE: usize = 8 * 1024;

const DEFAULT_EXTENSION: &str = ".webp";

struct FilePart {
    index: usize,
    filename: String,
    path: PathBuf,
}

enum Stage {
    Metadata(Bytes),
    Parts,
    Release,
    Done,
}

struct BodyState {
    boundary: String,
    stage: Stage,
    pending: VecDeque<FilePart>,
    reader: Option<ReaderStream<File>>,
    workspace: Option<WorkingSet>,
}

pub struct MultipartResponse {
    boundary: String,
    metadata: Bytes,
    parts: VecDeque<FilePart>,
    workspace: Option<WorkingSet>,
}

impl MultipartResponse {
    /// Pair each record with its file; `records` and `files` are parallel
    pub fn new(
        records: Vec<ObjectRecord>,
        files: Vec<PathBuf>,
        workspace: Option<WorkingSet>,
    ) -> Result<Self, serde_json::Error> {
        let boundary = uuid::Uuid::new_v4().to_string();

        let parts = records
            .iter()
            .zip(files)
            .enumerate()
            .map(|(index, (record, path))| FilePart {
                index,
                filename: format!("{}{}", record.id, dotted_extension(&path)),
                path,
            })
            .collect();

        let metadata = RecognitionMetadata::success(records);
        let json = serde_json::to_string_pretty(&metadata)?;

        let mut preamble = String::with_capacity(json.len() + 128);
        preamble.push_str(&format!("--{}\r\n", boundary));
        preamble.push_str("Content-Disposition: form-data; name=\"metadata\"\r\n");
        preamble.push_str("Content-Type: application/json\r\n\r\n");
        preamble.push_str(&json);
        preamble.push_str("\r\n");

        Ok(Self {
            boundary,
            metadata: Bytes::from(preamble),
            parts,
            workspace,
        })
    }

    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    /// Consume the response into its body stream
    pub fn into_stream(self) -> impl Stream<Item = io::Result<Bytes>> + Send + 'static {
        let state = BodyState {
            boundary: self.boundary,
            stage: Stage::Metadata(self.metadata),
            pending: self.parts,
            reader: None,
            workspace: self.workspace,
        };

        stream::unfold(state, |mut state| async move {
            let chunk = next_chunk(&mut state).await?;
            Some((chunk, state))
        })
    }
}

impl IntoResponse for MultipartResponse {
    fn into_response(self) -> Response {
        let content_type = self.content_type();
        let body = Body::from_stream(self.into_stream());
        ([(header::CONTENT_TYPE, content_type)], body).into_response()
    }
}

async fn next_chunk(state: &mut BodyState) -> Option<io::Result<Bytes>> {
    loop {
        match &mut state.stage {
            Stage::Metadata(preamble) => {
                let preamble = std::mem::take(preamble);
                state.stage = Stage::Parts;
                return Some(Ok(preamble));
            }
            Stage::Parts => {
                if let Some(reader) = state.reader.as_mut() {
                    match reader.next().await {
                        Some(Ok(chunk)) => return Some(Ok(chunk)),
                        Some(Err(e)) => {
                            state.stage = Stage::Done;
                            return Some(Err(e));
                        }
                        None => {
                            state.reader = None;
                            return Some(Ok(Bytes::from_static(b"\r\n")));
                        }
                    }
                }

                let Some(part) = state.pending.pop_front() else {
                    state.stage = Stage::Release;
                    return Some(Ok(Bytes::from(format!("--{}--\r\n", state.boundary))));
                };

                match File::open(&part.path).await {
                    Ok(file) => {
                        state.reader = Some(ReaderStream::with_capacity(file, CHUNK_SIZE));
                        return Some(Ok(part_header(&state.boundary, &part)));
                    }
                    Err(e) if e.kind() == io::ErrorKind::NotFound => {
                        debug!("Skipping missing file {}", part.path.display());
                    }
                    Err(e) => {
                        state.stage = Stage::Done;
                        return Some(Err(e));
                    }
                }
            }
            Stage::Release => {
                state.stage = Stage::Done;
                if let Some(workspace) = state.workspace.take() {
                    if let Err(e) = workspace.close().await {
                        warn!("Working set cleanup failed: {}", e);
                    }
                }
                return None;
            }
            Stage::Done => return None,
        }
    }
}

fn part_header(boundary: &str, part: &FilePart) -> Bytes {
    Bytes::from(format!(
        "--{}\r\nContent-Disposition: form-data; name=\"file_{}\"; filename=\"{}\"\r\nContent-Type: image/webp\r\n\r\n",
        boundary, part.index, part.filename
    ))
}

fn dotted_extension(path: &Path) -> String {
    path.extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_else(|| DEFAULT_EXTENSION.to_string())
}
