// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Multi-variant, multi-configuration text detection
//!
//! Runs the OCR engine once per (variant, scan configuration) pair on a
//! bounded worker pool, pools every word reported and removes duplicates.
//! A failing pair is logged and dropped; only a run where every pair fails
//! is an error.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use super::engine::OcrEngine;
use super::model::{Detection, OcrWord, ScanConfig};
use crate::vision::errors::{OcrError, RedactError};
use crate::vision::matching::normalize_text;
use crate::vision::preprocessing::{Technique, Variant};
use crate::vision::profile::{profile, Mode};

/// Boxes overlapping above this IoU with equal normalized text are duplicates
pub const DEDUP_OVERLAP_RATIO: f32 = 0.5;

/// Pooled OCR over every variant and scan configuration
#[derive(Clone)]
pub struct Detector {
    engine: Arc<dyn OcrEngine>,
    max_workers: usize,
    timeout: Option<Duration>,
}

impl std::fmt::Debug for Detector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Detector")
            .field("engine", &self.engine.name())
            .field("max_workers", &self.max_workers)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Detector {
    /// Create a detector with one worker per available CPU core and no timeout
    pub fn new(engine: Arc<dyn OcrEngine>) -> Self {
        let max_workers = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        Self {
            engine,
            max_workers,
            timeout: None,
        }
    }

    /// Limit the number of concurrent OCR runs (minimum 1)
    pub fn with_max_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = max_workers.max(1);
        self
    }

    /// Abort any single OCR run that takes longer than `timeout`
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Check the engine once before any OCR run is scheduled
    pub async fn engine_version(&self) -> Result<String, OcrError> {
        self.engine.version().await
    }

    /// Detect text on every variant using the scan configurations `mode` selects
    pub async fn detect(
        &self,
        variants: &[Variant],
        mode: Mode,
    ) -> Result<Vec<Detection>, RedactError> {
        self.detect_with_scans(variants, profile(mode).scans).await
    }

    /// Detect text on every variant under each of `scans`
    pub async fn detect_with_scans(
        &self,
        variants: &[Variant],
        scans: &[ScanConfig],
    ) -> Result<Vec<Detection>, RedactError> {
        let semaphore = Arc::new(Semaphore::new(self.max_workers));
        let mut handles = Vec::with_capacity(variants.len() * scans.len());

        for variant in variants {
            for &scan in scans {
                let engine = self.engine.clone();
                let image = variant.image.clone();
                let sem = semaphore.clone();
                let timeout = self.timeout;
                let technique = variant.technique;

                let handle = tokio::spawn(async move {
                    let _permit = sem
                        .acquire_owned()
                        .await
                        .map_err(|e| OcrError::Unavailable(e.to_string()))?;

                    let run = engine.detect_text(&image, scan);
                    match timeout {
                        Some(limit) => match tokio::time::timeout(limit, run).await {
                            Ok(result) => result,
                            Err(_) => Err(OcrError::Timeout {
                                secs: limit.as_secs(),
                            }),
                        },
                        None => run.await,
                    }
                });

                handles.push((technique, scan, handle));
            }
        }

        let attempted = handles.len();
        let mut failed = 0;
        let mut raw = Vec::new();

        // Joined in spawn order so pooling is independent of completion order
        for (technique, scan, handle) in handles {
            let result: Result<Vec<OcrWord>, OcrError> = match handle.await {
                Ok(result) => result,
                Err(e) => Err(OcrError::Unavailable(format!("OCR task aborted: {}", e))),
            };

            match result {
                Ok(words) => {
                    debug!(
                        "{} words from '{}' variant with {} scan",
                        words.len(),
                        technique,
                        scan
                    );
                    raw.extend(
                        words
                            .into_iter()
                            .map(|w| Detection::from_word(w, technique, scan)),
                    );
                }
                Err(e) => {
                    failed += 1;
                    warn!(
                        "⚠️ Skipping '{}' variant with {} scan: {}",
                        technique, scan, e
                    );
                }
            }
        }

        if attempted == 0 || failed == attempted {
            return Err(RedactError::DetectionUnavailable { attempted });
        }

        let raw_count = raw.len();
        let detections = dedup_detections(raw);

        info!(
            "Detection complete via {}: {} runs ({} failed), {} raw words, {} after dedup",
            self.engine.name(),
            attempted,
            failed,
            raw_count,
            detections.len()
        );
        debug!(
            "Contributing variants: {:?}",
            contributing_variants(&detections)
                .iter()
                .map(|t| t.id())
                .collect::<Vec<_>>()
        );

        Ok(detections)
    }
}

/// Two detections are duplicates when their boxes overlap above
/// [`DEDUP_OVERLAP_RATIO`] and their normalized text is equal
pub fn is_duplicate(a: &Detection, b: &Detection) -> bool {
    a.bbox.iou(&b.bbox) > DEDUP_OVERLAP_RATIO && normalize_text(&a.text) == normalize_text(&b.text)
}

/// Remove duplicates, keeping the most confident of each group
///
/// The result is sorted in reading order (top to bottom, then left to right).
pub fn dedup_detections(raw: Vec<Detection>) -> Vec<Detection> {
    let mut ordered = raw;
    // Stable: equal confidences keep pooling order
    ordered.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut kept: Vec<Detection> = Vec::with_capacity(ordered.len());
    for det in ordered {
        if !kept.iter().any(|k| is_duplicate(k, &det)) {
            kept.push(det);
        }
    }

    kept.sort_by(|a, b| {
        a.bbox
            .y
            .cmp(&b.bbox.y)
            .then(a.bbox.x.cmp(&b.bbox.x))
            .then(b.confidence.total_cmp(&a.confidence))
            .then_with(|| a.text.cmp(&b.text))
    });
    kept
}

/// Variants that contributed at least one detection
pub fn contributing_variants(detections: &[Detection]) -> Vec<Technique> {
    let mut out: Vec<Technique> = detections.iter().map(|d| d.variant).collect();
    out.sort();
    out.dedup();
    out
}
