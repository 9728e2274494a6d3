// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Client-side decoding of recognition responses

use thiserror::Error;

const CRLF: &[u8] = b"\r\n";
const HEADER_END: &[u8] = b"\r\n\r\n";

#[derive(Debug, Error)]
pub enum MultipartParseError {
    #[error("Response is not multipart/form-data")]
    NotMultipart,

    #[error("No boundary found in content-type header")]
    MissingBoundary,

    #[error("No metadata found in response")]
    MissingMetadata,

    #[error("Invalid metadata JSON: {0}")]
    InvalidMetadata(#[from] serde_json::Error),
}

/// One decoded body part
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultipartPart {
    pub name: Option<String>,
    pub filename: Option<String>,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

/// Extract the boundary parameter from a `multipart/form-data` content type
pub fn boundary_from_content_type(content_type: &str) -> Result<&str, MultipartParseError> {
    if !content_type
        .to_ascii_lowercase()
        .contains("multipart/form-data")
    {
        return Err(MultipartParseError::NotMultipart);
    }

    content_type
        .split(';')
        .filter_map(|param| param.trim().strip_prefix("boundary="))
        .map(|b| b.trim_matches('"'))
        .find(|b| !b.is_empty())
        .ok_or(MultipartParseError::MissingBoundary)
}

/// Split a multipart body into its parts
///
/// Each part runs from the end of its headers to the next `--boundary`
/// marker, minus the CRLF that precedes the marker.
pub fn parse_multipart(body: &[u8], boundary: &str) -> Vec<MultipartPart> {
    let delimiter = format!("--{}", boundary).into_bytes();
    let mut parts = Vec::new();
    let mut cursor = 0;

    while let Some(marker) = find(body, &delimiter, cursor) {
        let mut header_start = marker + delimiter.len();
        if body[header_start..].starts_with(b"--") {
            break;
        }
        if body[header_start..].starts_with(CRLF) {
            header_start += CRLF.len();
        }

        let Some(header_end) = find(body, HEADER_END, header_start) else {
            break;
        };
        let data_start = header_end + HEADER_END.len();
        let next = find(body, &delimiter, data_start);

        let mut data_end = next.unwrap_or(body.len());
        if body[data_start..data_end].ends_with(CRLF) {
            data_end -= CRLF.len();
        }

        let headers = String::from_utf8_lossy(&body[header_start..header_end]);
        let mut part = parse_headers(&headers);
        part.data = body[data_start..data_end].to_vec();
        parts.push(part);

        match next {
            Some(next) => cursor = next,
            None => break,
        }
    }

    parts
}

fn parse_headers(text: &str) -> MultipartPart {
    let mut part = MultipartPart {
        name: None,
        filename: None,
        content_type: None,
        data: Vec::new(),
    };

    for line in text.split("\r\n") {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        match key.trim().to_ascii_lowercase().as_str() {
            "content-disposition" => {
                for param in value.split(';').map(str::trim) {
                    if let Some(v) = param.strip_prefix("name=") {
                        part.name = Some(v.trim_matches('"').to_string());
                    } else if let Some(v) = param.strip_prefix("filename=") {
                        part.filename = Some(v.trim_matches('"').to_string());
                    }
                }
            }
            "content-type" => part.content_type = Some(value.trim().to_string()),
            _ => {}
        }
    }

    part
}

fn find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if from >= haystack.len() || needle.is_empty() {
        return None;
    }
    haystack[from..]
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|pos| from + pos)
}
