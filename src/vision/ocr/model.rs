// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Detection data model: boxes, scan configurations and OCR tokens

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::vision::preprocessing::Technique;

/// Axis-aligned bounding box in pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Exclusive right edge
    pub fn right(&self) -> u32 {
        self.x.saturating_add(self.width)
    }

    /// Exclusive bottom edge
    pub fn bottom(&self) -> u32 {
        self.y.saturating_add(self.height)
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Whether pixel (`x`, `y`) lies inside the box
    pub fn contains(&self, x: u32, y: u32) -> bool {
        x >= self.x && x < self.right() && y >= self.y && y < self.bottom()
    }

    pub fn center_y(&self) -> f32 {
        self.y as f32 + self.height as f32 / 2.0
    }

    pub fn intersection(&self, other: &BoundingBox) -> Option<BoundingBox> {
        let x = self.x.max(other.x);
        let y = self.y.max(other.y);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());
        if right <= x || bottom <= y {
            return None;
        }
        Some(BoundingBox::new(x, y, right - x, bottom - y))
    }

    /// Smallest box containing both
    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        let right = self.right().max(other.right());
        let bottom = self.bottom().max(other.bottom());
        BoundingBox::new(x, y, right - x, bottom - y)
    }

    /// Intersection over union (0.0-1.0)
    pub fn iou(&self, other: &BoundingBox) -> f32 {
        let inter = match self.intersection(other) {
            Some(b) => b.area(),
            None => return 0.0,
        };
        let union = self.area() + other.area() - inter;
        if union == 0 {
            return 0.0;
        }
        inter as f32 / union as f32
    }

    /// Intersection relative to the smaller of the two boxes (0.0-1.0)
    pub fn overlap_ratio(&self, other: &BoundingBox) -> f32 {
        let inter = match self.intersection(other) {
            Some(b) => b.area(),
            None => return 0.0,
        };
        let smaller = self.area().min(other.area());
        if smaller == 0 {
            return 0.0;
        }
        inter as f32 / smaller as f32
    }

    /// Grow by `margin` pixels on every side, clamped to `max_width` x `max_height`
    pub fn expand(&self, margin: u32, max_width: u32, max_height: u32) -> BoundingBox {
        let x = self.x.saturating_sub(margin);
        let y = self.y.saturating_sub(margin);
        let right = self.right().saturating_add(margin).min(max_width);
        let bottom = self.bottom().saturating_add(margin).min(max_height);
        BoundingBox::new(
            x.min(right),
            y.min(bottom),
            right.saturating_sub(x),
            bottom.saturating_sub(y),
        )
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {}, {})", self.x, self.y, self.width, self.height)
    }
}

/// OCR layout assumption used for one engine invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScanConfig {
    /// Uniform block of text
    BlockText,
    /// Fully automatic page analysis
    FullPage,
    /// Scattered text, as much as possible (logos, UI)
    SparseText,
    /// Automatic page segmentation with orientation detection
    AutoSegment,
}

impl ScanConfig {
    pub const ALL: [ScanConfig; 4] = [
        ScanConfig::BlockText,
        ScanConfig::FullPage,
        ScanConfig::SparseText,
        ScanConfig::AutoSegment,
    ];

    /// Tesseract page segmentation mode
    pub fn psm(&self) -> u8 {
        match self {
            ScanConfig::BlockText => 6,
            ScanConfig::FullPage => 3,
            ScanConfig::SparseText => 11,
            ScanConfig::AutoSegment => 1,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ScanConfig::BlockText => "block-text",
            ScanConfig::FullPage => "full-page",
            ScanConfig::SparseText => "sparse-text",
            ScanConfig::AutoSegment => "auto-segment",
        }
    }
}

impl fmt::Display for ScanConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A word reported by the OCR engine for one image
#[derive(Debug, Clone, PartialEq)]
pub struct OcrWord {
    pub text: String,
    pub bbox: BoundingBox,
    /// Confidence score (0-100)
    pub confidence: f32,
}

impl OcrWord {
    pub fn new(text: impl Into<String>, bbox: BoundingBox, confidence: f32) -> Self {
        Self {
            text: text.into(),
            bbox,
            confidence,
        }
    }
}

/// One OCR token pooled by the detector, tagged with where it came from
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Detection {
    pub text: String,
    pub bbox: BoundingBox,
    /// Confidence score (0-100)
    pub confidence: f32,
    pub variant: Technique,
    pub scan: ScanConfig,
}

impl Detection {
    pub fn from_word(word: OcrWord, variant: Technique, scan: ScanConfig) -> Self {
        Self {
            text: word.text,
            bbox: word.bbox,
            confidence: word.confidence,
            variant,
            scan,
        }
    }
}
