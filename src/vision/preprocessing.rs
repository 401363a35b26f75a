// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Image preprocessing for OCR
//!
//! Every technique keeps the source geometry (no crop, scale or rotation),
//! so boxes detected on any variant are valid on the original image.

use std::fmt;
use std::sync::Arc;

use image::{DynamicImage, GrayImage, Luma};
use imageproc::contrast::{equalize_histogram, otsu_level, threshold, ThresholdType};
use imageproc::filter::{box_filter, median_filter, sharpen3x3};
use serde::Serialize;
use tracing::debug;

use super::profile::{profile, Mode};

/// Neighbourhood radius for adaptive thresholding (11x11 block)
pub const ADAPTIVE_BLOCK_RADIUS: u32 = 5;

/// Offset subtracted from the local mean before thresholding
pub const ADAPTIVE_OFFSET: i16 = 2;

/// Median filter radius used for denoising (3x3)
pub const DENOISE_RADIUS: u32 = 1;

/// A single preprocessing recipe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(into = "String")]
pub enum Technique {
    /// Unmodified input
    Original,
    Grayscale,
    /// Global histogram equalization
    Contrast,
    /// Otsu binarization
    Binary,
    /// Local-mean binarization
    Adaptive,
    /// 3x3 sharpening
    Sharpen,
    /// 3x3 median filter
    Denoise,
    DenoiseAdaptive,
    ContrastBinary,
    SharpenBinary,
}

impl Technique {
    /// Stable identifier used in logs and reports
    pub fn id(&self) -> &'static str {
        match self {
            Technique::Original => "original",
            Technique::Grayscale => "grayscale",
            Technique::Contrast => "contrast",
            Technique::Binary => "binary",
            Technique::Adaptive => "adaptive",
            Technique::Sharpen => "sharpen",
            Technique::Denoise => "denoise",
            Technique::DenoiseAdaptive => "denoise+adaptive",
            Technique::ContrastBinary => "contrast+binary",
            Technique::SharpenBinary => "sharpen+binary",
        }
    }

    /// Produce this technique's derived image; the input is never modified
    pub fn apply(&self, image: &DynamicImage) -> DynamicImage {
        if *self == Technique::Original {
            return image.clone();
        }

        let gray = image.to_luma8();
        let out = match self {
            Technique::Original | Technique::Grayscale => gray,
            Technique::Contrast => equalize_histogram(&gray),
            Technique::Binary => otsu_binarize(&gray),
            Technique::Adaptive => adaptive_binarize(&gray),
            Technique::Sharpen => sharpen3x3(&gray),
            Technique::Denoise => denoise(&gray),
            Technique::DenoiseAdaptive => adaptive_binarize(&denoise(&gray)),
            Technique::ContrastBinary => otsu_binarize(&equalize_histogram(&gray)),
            Technique::SharpenBinary => otsu_binarize(&sharpen3x3(&gray)),
        };
        DynamicImage::ImageLuma8(out)
    }
}

impl fmt::Display for Technique {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl From<Technique> for String {
    fn from(t: Technique) -> Self {
        t.id().to_string()
    }
}

/// One preprocessed version of the input image
#[derive(Debug, Clone)]
pub struct Variant {
    pub technique: Technique,
    pub image: Arc<DynamicImage>,
}

/// Produce the ordered variants the given mode calls for
pub fn produce_variants(image: &DynamicImage, mode: Mode) -> Vec<Variant> {
    profile(mode)
        .techniques
        .iter()
        .map(|technique| {
            debug!("Preparing '{}' variant", technique);
            Variant {
                technique: *technique,
                image: Arc::new(technique.apply(image)),
            }
        })
        .collect()
}

fn otsu_binarize(gray: &GrayImage) -> GrayImage {
    threshold(gray, otsu_level(gray), ThresholdType::Binary)
}

/// Binarize each pixel against the mean of its neighbourhood minus
/// [`ADAPTIVE_OFFSET`]
///
/// Written out here because `imageproc::contrast::adaptive_threshold` takes
/// no offset constant.
fn adaptive_binarize(gray: &GrayImage) -> GrayImage {
    let means = box_filter(gray, ADAPTIVE_BLOCK_RADIUS, ADAPTIVE_BLOCK_RADIUS);
    let mut out = gray.clone();
    for (pixel, mean) in out.pixels_mut().zip(means.pixels()) {
        let cutoff = mean[0] as i16 - ADAPTIVE_OFFSET;
        *pixel = if pixel[0] as i16 > cutoff {
            Luma([255])
        } else {
            Luma([0])
        };
    }
    out
}

fn denoise(gray: &GrayImage) -> GrayImage {
    median_filter(gray, DENOISE_RADIUS, DENOISE_RADIUS)
}
