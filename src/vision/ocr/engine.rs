// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! OCR capability trait
//!
//! The detector only sees this interface, so tests can substitute a
//! deterministic engine for the real subprocess.

use async_trait::async_trait;
use image::DynamicImage;

use super::model::{OcrWord, ScanConfig};
use crate::vision::errors::OcrError;

/// Word-level text detection over a single image
#[async_trait]
pub trait OcrEngine: Send + Sync {
    /// Detect words in `image` under the given layout assumption
    ///
    /// Boxes are in `image` pixel coordinates.
    async fn detect_text(
        &self,
        image: &DynamicImage,
        scan: ScanConfig,
    ) -> Result<Vec<OcrWord>, OcrError>;

    /// Engine name for logging
    fn name(&self) -> &'static str;

    /// Check the engine is usable and report its version
    ///
    /// Engines with nothing to check report their name.
    async fn version(&self) -> Result<String, OcrError> {
        Ok(self.name().to_string())
    }
}
