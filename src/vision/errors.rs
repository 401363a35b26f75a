// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Error types for the redaction pipeline

use std::path::PathBuf;

use thiserror::Error;

/// Fatal errors surfaced by the pipeline
#[derive(Debug, Error)]
pub enum RedactError {
    /// Input could not be read or decoded as an image
    #[error("Invalid image {}: {reason}", path.display())]
    InvalidImage { path: PathBuf, reason: String },

    /// The OCR collaborator failed for every attempted (variant, scan) pair
    #[error("OCR unavailable: all {attempted} detection runs failed")]
    DetectionUnavailable { attempted: usize },

    /// A tuning parameter is out of range
    #[error("Invalid parameter '{field}': {message}")]
    InvalidParameter { field: String, message: String },

    /// Output image or report could not be written
    #[error("Failed to write {}: {reason}", path.display())]
    Output { path: PathBuf, reason: String },
}

impl RedactError {
    pub fn invalid_parameter(field: &str, message: impl Into<String>) -> Self {
        RedactError::InvalidParameter {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

/// Failure of a single OCR invocation
///
/// These are recovered by the detector: the pair is dropped and the run
/// continues with the remaining pairs.
#[derive(Debug, Error)]
pub enum OcrError {
    #[error("OCR engine '{0}' not found (is it installed and on PATH?)")]
    NotInstalled(String),

    #[error("OCR engine exited with status {status:?}: {stderr}")]
    Failed { status: Option<i32>, stderr: String },

    #[error("OCR run timed out after {secs}s")]
    Timeout { secs: u64 },

    #[error("OCR engine unavailable: {0}")]
    Unavailable(String),

    #[error("Failed to encode variant for OCR: {0}")]
    Encode(#[from] image::ImageError),

    #[error("Unexpected OCR output: {0}")]
    Parse(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
