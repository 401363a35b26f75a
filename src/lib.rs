// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod cli;
pub mod version;
pub mod vision;

// Re-export the pipeline entry points
pub use vision::{
    Detector, Mode, OcrEngine, RedactError, RedactOptions, RunReport, TesseractEngine, TextBlur,
};
