// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use crate::config::RecognizerConfig;

/// Waste recognition HTTP service
#[derive(Parser, Debug)]
#[command(name = "waste-recognizer")]
#[command(version)]
#[command(about = "Detects and classifies waste in uploaded images", long_about = None)]
pub struct Cli {
    /// TOML configuration file
    #[arg(short, long, env = "RECOGNIZER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Override the listen address (host:port)
    #[arg(long)]
    pub listen: Option<String>,
}

impl Cli {
    /// Resolve the effective configuration: defaults, file, environment, then flags
    pub fn load_config(&self) -> Result<RecognizerConfig> {
        let mut config = RecognizerConfig::load(self.config.as_deref())?;
        if let Some(listen) = &self.listen {
            config.listen_addr = listen.clone();
        }
        Ok(config)
    }
}
