// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Waste recognition pipeline
//!
//! Turns one uploaded image into an ordered list of [`ObjectRecord`]s, each
//! paired with an image file inside a request-scoped [`WorkingSet`].

pub mod category;
pub mod orchestrator;
pub mod record;
pub mod workspace;

pub use category::{map_to_category, Category};
pub use orchestrator::{PipelineError, PipelineOutput, RecognitionPipeline};
pub use record::{BoundingBox, ObjectRecord};
pub use workspace::WorkingSet;
