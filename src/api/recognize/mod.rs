// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Recognition API endpoint module
//!
//! Provides POST /recognize (multipart response) and POST /recognize-json.

pub mod handler;
pub mod request;
pub mod response;

pub use handler::{recognize_handler, recognize_json_handler};
pub use request::{secure_filename, RecognizeUpload, ALLOWED_EXTENSIONS};
pub use response::{RecognitionMetadata, RecognitionResponse, RecognizedObject, ReceivedImage};
