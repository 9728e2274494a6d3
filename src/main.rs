// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::Result;
use clap::Parser;
use std::{env, sync::Arc};
use tokio::signal;
use tracing::{info, warn};

use waste_recognizer::{
    api::{ApiServer, AppState},
    cli::Cli,
    vision::{VisionModelConfig, VisionModelManager},
};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    // Initialize tracing subscriber for logging
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "info");
    }
    tracing_subscriber::fmt::init();

    info!("Starting {}", waste_recognizer::version::get_version_string());

    let cli = Cli::parse();
    let config = cli.load_config()?;
    let state = AppState::new(config.clone());

    // Load vision models
    info!("Loading vision models...");
    match VisionModelManager::init(VisionModelConfig::from(&config)).await {
        Ok(manager) => {
            for model in manager.list_models() {
                info!("   {} ({})", model.name, model.model_type);
            }
            state.set_vision_model_manager(Arc::new(manager)).await;
        }
        Err(e) => {
            warn!("Failed to load vision models: {:#}", e);
            warn!("/recognize and /recognize-json will return 503");
        }
    }

    let server = ApiServer::new(state.clone()).await?;
    let addr = server.local_addr();
    info!("API Endpoints:");
    info!("  Health:      http://{}/health", addr);
    info!("  Recognize:   POST http://{}/recognize", addr);
    info!("  JSON only:   POST http://{}/recognize-json", addr);

    // Wait for shutdown signal
    signal::ctrl_c().await?;
    info!("Shutting down...");

    server.shutdown().await;

    if let Some(manager) = state.take_vision_model_manager().await {
        match Arc::try_unwrap(manager) {
            Ok(manager) => manager.shutdown(),
            Err(_) => warn!("Vision models still referenced at shutdown"),
        }
    }

    info!("Goodbye!");
    Ok(())
}
