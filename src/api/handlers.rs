// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use axum::Json;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HealthResponse {
    pub status: String,
    pub message: String,
}

impl HealthResponse {
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            message: "API is running".to_string(),
        }
    }
}

/// Service description returned by `GET /`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexResponse {
    pub message: String,
    pub version: String,
    pub endpoints: BTreeMap<String, String>,
    pub usage: BTreeMap<String, String>,
}

impl IndexResponse {
    pub fn new() -> Self {
        let endpoints = [
            (
                "POST /recognize",
                "Upload image for recognition (returns multipart with files)",
            ),
            (
                "POST /recognize-json",
                "Upload image for recognition (returns JSON only)",
            ),
            ("GET /health", "Health check"),
            ("GET /", "This message"),
        ];
        let usage = [
            (
                "multipart",
                "Send POST to /recognize with form-data \"file\" field. Returns multipart response with metadata + image files",
            ),
            (
                "json_only",
                "Send POST to /recognize-json for JSON-only response (no image files)",
            ),
        ];

        Self {
            message: "Image Recognition API".to_string(),
            version: crate::version::VERSION.to_string(),
            endpoints: endpoints
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            usage: usage
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }
}

impl Default for IndexResponse {
    fn default() -> Self {
        Self::new()
    }
}

/// GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}

/// GET /
pub async fn index_handler() -> Json<IndexResponse> {
    Json(IndexResponse::new())
}
