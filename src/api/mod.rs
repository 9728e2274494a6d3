// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod errors;
pub mod handlers;
pub mod http_server;
pub mod multipart;
pub mod recognize;
pub mod server;
pub mod streaming;

pub use errors::{ApiError, ErrorResponse};
pub use handlers::{HealthResponse, IndexResponse};
pub use http_server::{create_app, AppState};
pub use multipart::{parse_multipart, MultipartParseError, MultipartPart};
pub use recognize::{
    recognize_handler, recognize_json_handler, RecognitionMetadata, RecognitionResponse,
};
pub use server::ApiServer;
pub use streaming::MultipartResponse;
