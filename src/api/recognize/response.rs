// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Recognition response types

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::api::multipart::{boundary_from_content_type, parse_multipart, MultipartParseError};
use crate::pipeline::ObjectRecord;

/// JSON document sent as the `metadata` part (and by `/recognize-json`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognitionMetadata {
    pub status: String,
    pub total_objects: usize,
    pub results: Vec<ObjectRecord>,
}

impl RecognitionMetadata {
    pub fn success(results: Vec<ObjectRecord>) -> Self {
        Self {
            status: "success".to_string(),
            total_objects: results.len(),
            results,
        }
    }
}

/// Image attached to a record in a multipart response
#[derive(Debug, Clone, PartialEq)]
pub struct ReceivedImage {
    pub filename: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecognizedObject {
    pub record: ObjectRecord,
    pub image: Option<ReceivedImage>,
}

/// Decoded `/recognize` response as seen by a client
#[derive(Debug, Clone, PartialEq)]
pub struct RecognitionResponse {
    pub status: String,
    pub total_objects: usize,
    pub results: Vec<RecognizedObject>,
}

impl RecognitionResponse {
    /// Decode a multipart body, attaching `file_{i}` parts to records by `file_index`
    pub fn from_multipart(content_type: &str, body: &[u8]) -> Result<Self, MultipartParseError> {
        let boundary = boundary_from_content_type(content_type)?;

        let mut metadata: Option<RecognitionMetadata> = None;
        let mut images: HashMap<usize, ReceivedImage> = HashMap::new();

        for part in parse_multipart(body, boundary) {
            let Some(name) = part.name.as_deref() else {
                continue;
            };
            if name == "metadata" {
                metadata = Some(serde_json::from_slice(&part.data)?);
            } else if let Some(index) = name
                .strip_prefix("file_")
                .and_then(|i| i.parse::<usize>().ok())
            {
                images.insert(
                    index,
                    ReceivedImage {
                        filename: part
                            .filename
                            .unwrap_or_else(|| format!("file_{}.webp", index)),
                        content_type: part
                            .content_type
                            .unwrap_or_else(|| "image/webp".to_string()),
                        data: part.data,
                    },
                );
            }
        }

        let metadata = metadata.ok_or(MultipartParseError::MissingMetadata)?;
        let results = metadata
            .results
            .into_iter()
            .map(|record| RecognizedObject {
                image: images.remove(&record.file_index),
                record,
            })
            .collect();

        Ok(Self {
            status: metadata.status,
            total_objects: metadata.total_objects,
            results,
        })
    }
}
