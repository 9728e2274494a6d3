// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod api;
pub mod cli;
pub mod config;
pub mod pipeline;
pub mod version;
pub mod vision;

pub use api::{create_app, ApiServer, AppState};
pub use config::RecognizerConfig;
pub use pipeline::{map_to_category, Category, ObjectRecord, RecognitionPipeline, WorkingSet};
pub use vision::{VisionModelConfig, VisionModelManager};
