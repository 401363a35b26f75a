// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! OCR collaborator and pooled detection
//!
//! Components:
//! - `model` - Boxes, scan configurations and detections
//! - `engine` - The injected OCR capability
//! - `tesseract` - Tesseract subprocess engine
//! - `detection` - Worker-pool detection and dedup

pub mod detection;
pub mod engine;
pub mod model;
pub mod tesseract;

pub use detection::Detector;
pub use engine::OcrEngine;
pub use model::{BoundingBox, Detection, OcrWord, ScanConfig};
pub use tesseract::TesseractEngine;
