// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Gaussian blur over matched regions of the original image

use image::{DynamicImage, GenericImage, GenericImageView};
use tracing::{debug, warn};

use super::errors::RedactError;
use super::matching::Match;
use super::ocr::BoundingBox;

/// Default Gaussian kernel size
pub const DEFAULT_BLUR_STRENGTH: u32 = 51;

/// Default margin around each match, as a fraction of the box height
pub const DEFAULT_PADDING: f32 = 0.5;

/// Validate a Gaussian kernel size, rounding even values up to the next odd one
pub fn normalize_blur_strength(strength: u32) -> Result<u32, RedactError> {
    if strength == 0 {
        return Err(RedactError::invalid_parameter(
            "blur",
            "kernel size must be a positive odd integer",
        ));
    }
    if strength % 2 == 0 {
        let rounded = strength + 1;
        warn!(
            "Blur strength {} is even; rounding up to {}",
            strength, rounded
        );
        return Ok(rounded);
    }
    Ok(strength)
}

/// Gaussian sigma for an odd kernel size (same rule OpenCV applies for sigma=0)
pub fn kernel_sigma(kernel_size: u32) -> f32 {
    0.3 * ((kernel_size as f32 - 1.0) * 0.5 - 1.0) + 0.8
}

/// Blurs matched regions of an image
#[derive(Debug, Clone, Copy)]
pub struct Redactor {
    kernel_size: u32,
    padding: f32,
}

impl Default for Redactor {
    fn default() -> Self {
        Self {
            kernel_size: DEFAULT_BLUR_STRENGTH,
            padding: DEFAULT_PADDING,
        }
    }
}

/// Result of a redaction pass
#[derive(Debug, Clone)]
pub struct Redaction {
    pub image: DynamicImage,
    /// Padded, clamped match boxes that were blurred
    pub regions: Vec<BoundingBox>,
}

impl Redactor {
    /// Create a redactor; `blur_strength` follows [`normalize_blur_strength`]
    pub fn new(blur_strength: u32, padding: f32) -> Result<Self, RedactError> {
        if !padding.is_finite() || padding < 0.0 {
            return Err(RedactError::invalid_parameter(
                "padding",
                format!("must be a non-negative number, got {}", padding),
            ));
        }
        Ok(Self {
            kernel_size: normalize_blur_strength(blur_strength)?,
            padding,
        })
    }

    pub fn kernel_size(&self) -> u32 {
        self.kernel_size
    }

    pub fn padding(&self) -> f32 {
        self.padding
    }

    /// Padded and clamped boxes for a set of matches
    ///
    /// Identical boxes are kept once; output is sorted top to bottom, left
    /// to right.
    pub fn regions(&self, matches: &[Match], width: u32, height: u32) -> Vec<BoundingBox> {
        let mut regions: Vec<BoundingBox> = matches
            .iter()
            .map(|m| {
                let margin = (m.bbox.height as f32 * self.padding).round() as u32;
                m.bbox.expand(margin, width, height)
            })
            .filter(|b| !b.is_empty())
            .collect();
        regions.sort_by_key(|b| (b.y, b.x, b.width, b.height));
        regions.dedup();
        regions
    }

    /// Blur every matched region of `image`, returning a new image
    ///
    /// Dimensions and color format are preserved. Each group of
    /// intersecting regions is blurred once from the original pixels, and
    /// only pixels inside at least one region are written back.
    pub fn redact(&self, image: &DynamicImage, matches: &[Match]) -> Redaction {
        let (width, height) = image.dimensions();
        let regions = self.regions(matches, width, height);
        let sigma = kernel_sigma(self.kernel_size);

        let mut output = image.clone();
        for cluster in cluster_regions(&regions) {
            let Some((first, rest)) = cluster.split_first() else {
                continue;
            };
            let bounds = rest.iter().fold(*first, |acc, b| acc.union(b));
            let patch = image
                .crop_imm(bounds.x, bounds.y, bounds.width, bounds.height)
                .blur(sigma);

            for y in bounds.y..bounds.bottom() {
                for x in bounds.x..bounds.right() {
                    if cluster.iter().any(|b| b.contains(x, y)) {
                        output.put_pixel(x, y, patch.get_pixel(x - bounds.x, y - bounds.y));
                    }
                }
            }
            debug!("Blurred {} region(s) within {}", cluster.len(), bounds);
        }

        Redaction {
            image: output,
            regions,
        }
    }
}

/// Group regions into connected sets of intersecting boxes
///
/// Boxes in different groups share no pixel.
pub fn cluster_regions(regions: &[BoundingBox]) -> Vec<Vec<BoundingBox>> {
    let mut clusters: Vec<Vec<BoundingBox>> = Vec::new();
    for region in regions {
        let (touching, mut rest): (Vec<_>, Vec<_>) = clusters
            .into_iter()
            .partition(|c| c.iter().any(|b| b.intersection(region).is_some()));
        let mut merged: Vec<BoundingBox> = touching.into_iter().flatten().collect();
        merged.push(*region);
        rest.push(merged);
        clusters = rest;
    }
    clusters
}
