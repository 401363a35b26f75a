// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Deterministic OCR collaborators and fixtures shared by the pipeline tests

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use text_blur::vision::{
    BoundingBox, Detector, Mode, OcrEngine, OcrError, OcrWord, RedactOptions, ScanConfig, TextBlur,
};

/// Box of the single "word" drawn by [`text_page`]
pub const WORD_BOX: BoundingBox = BoundingBox {
    x: 40,
    y: 40,
    width: 160,
    height: 24,
};

/// Reports the same words for every image and scan
pub struct ScriptedOcr {
    words: Vec<OcrWord>,
    /// Scan configurations that fail instead of reporting words
    failing_scans: Vec<ScanConfig>,
    calls: AtomicUsize,
    version_checks: AtomicUsize,
}

impl ScriptedOcr {
    pub fn new(words: Vec<OcrWord>) -> Self {
        Self {
            words,
            failing_scans: Vec::new(),
            calls: AtomicUsize::new(0),
            version_checks: AtomicUsize::new(0),
        }
    }

    pub fn failing_on(mut self, scan: ScanConfig) -> Self {
        self.failing_scans.push(scan);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn version_checks(&self) -> usize {
        self.version_checks.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OcrEngine for ScriptedOcr {
    async fn detect_text(
        &self,
        _image: &DynamicImage,
        scan: ScanConfig,
    ) -> Result<Vec<OcrWord>, OcrError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_scans.contains(&scan) {
            return Err(OcrError::Failed {
                status: Some(1),
                stderr: format!("scripted failure for {}", scan),
            });
        }
        Ok(self.words.clone())
    }

    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn version(&self) -> Result<String, OcrError> {
        self.version_checks.fetch_add(1, Ordering::SeqCst);
        Ok("scripted 1.0".to_string())
    }
}

/// OCR collaborator that is never available
pub struct MissingOcr;

#[async_trait]
impl OcrEngine for MissingOcr {
    async fn detect_text(
        &self,
        _image: &DynamicImage,
        _scan: ScanConfig,
    ) -> Result<Vec<OcrWord>, OcrError> {
        Err(OcrError::NotInstalled("tesseract".to_string()))
    }

    fn name(&self) -> &'static str {
        "missing"
    }
}

/// White page with a striped dark block at `bbox`, standing in for glyphs
pub fn page_with_block(width: u32, height: u32, bbox: BoundingBox) -> DynamicImage {
    let mut img = RgbImage::from_pixel(width, height, Rgb([255, 255, 255]));
    for y in bbox.y..bbox.bottom() {
        for x in bbox.x..bbox.right() {
            if (x / 3) % 2 == 0 {
                img.put_pixel(x, y, Rgb([0, 0, 0]));
            }
        }
    }
    DynamicImage::ImageRgb8(img)
}

/// The "CONFIDENTIAL" page: one word, black on white
pub fn text_page() -> DynamicImage {
    page_with_block(240, 110, WORD_BOX)
}

pub fn confidential_word() -> OcrWord {
    OcrWord::new("CONFIDENTIAL", WORD_BOX, 93.0)
}

pub fn write_png(image: &DynamicImage, path: &Path) {
    image.save_with_format(path, ImageFormat::Png).unwrap();
}

pub fn pipeline(engine: Arc<dyn OcrEngine>, mode: Mode) -> TextBlur {
    let options = RedactOptions::new(mode, 60, 15, 0.5).unwrap();
    TextBlur::new(Detector::new(engine).with_max_workers(4), options)
}

pub fn targets(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
