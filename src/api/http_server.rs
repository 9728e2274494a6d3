// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use super::handlers::{health_handler, index_handler};
use super::recognize::{recognize_handler, recognize_json_handler};
use crate::config::RecognizerConfig;
use crate::vision::VisionModelManager;

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<RecognizerConfig>,
    pub vision_model_manager: Arc<RwLock<Option<Arc<VisionModelManager>>>>,
}

impl AppState {
    pub fn new(config: RecognizerConfig) -> Self {
        Self {
            config: Arc::new(config),
            vision_model_manager: Arc::new(RwLock::new(None)),
        }
    }

    /// Default configuration, no models loaded
    pub fn new_for_test() -> Self {
        Self::new(RecognizerConfig::default())
    }

    pub async fn set_vision_model_manager(&self, manager: Arc<VisionModelManager>) {
        *self.vision_model_manager.write().await = Some(manager);
    }

    pub async fn get_vision_model_manager(&self) -> Option<Arc<VisionModelManager>> {
        self.vision_model_manager.read().await.clone()
    }

    /// Detach the models so they can be shut down
    pub async fn take_vision_model_manager(&self) -> Option<Arc<VisionModelManager>> {
        self.vision_model_manager.write().await.take()
    }
}

pub fn create_app(state: AppState) -> Router {
    let body_limit = state.config.max_upload_bytes;

    Router::new()
        .route("/", get(index_handler))
        .route("/health", get(health_handler))
        .route("/recognize", post(recognize_handler))
        .route("/recognize-json", post(recognize_json_handler))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
