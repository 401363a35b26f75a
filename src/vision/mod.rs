// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Text redaction for raster images
//!
//! This module provides:
//! - Preprocessing variants tuned for OCR legibility
//! - Pooled multi-configuration OCR detection
//! - Target matching with strategies of decreasing strictness
//! - Gaussian blur over the matched regions
//!
//! Every variant keeps the original coordinate system, so detections from
//! any of them map straight back onto the source image.

pub mod errors;
pub mod image_utils;
pub mod matching;
pub mod ocr;
pub mod pipeline;
pub mod preprocessing;
pub mod profile;
pub mod redaction;

pub use errors::{OcrError, RedactError};
pub use image_utils::{decode_image_bytes, default_output_path, detect_format, ImageError, ImageInfo};
pub use matching::{match_targets, Match, Strategy};
pub use ocr::{BoundingBox, Detection, Detector, OcrEngine, OcrWord, ScanConfig, TesseractEngine};
pub use pipeline::{RedactOptions, RunOutcome, RunReport, TargetReport, TextBlur};
pub use preprocessing::{produce_variants, Technique, Variant};
pub use profile::{profile, Mode, Profile};
pub use redaction::{Redaction, Redactor};
