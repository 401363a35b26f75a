// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! The redaction pipeline: Preprocessor → Detector → Matcher → Redactor

use std::path::{Path, PathBuf};

use image::DynamicImage;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::errors::RedactError;
use super::image_utils::{load_image, output_format, stage_bytes, stage_image};
use super::matching::{match_targets, normalize_text, Match, Strategy};
use super::ocr::{BoundingBox, Detector};
use super::preprocessing::produce_variants;
use super::profile::Mode;
use super::redaction::Redactor;
use crate::version;

/// Default minimum detection confidence
pub const DEFAULT_CONFIDENCE: u32 = 60;

/// Validated tuning parameters for one run
#[derive(Debug, Clone, Copy)]
pub struct RedactOptions {
    mode: Mode,
    min_confidence: u32,
    redactor: Redactor,
}

impl Default for RedactOptions {
    fn default() -> Self {
        Self {
            mode: Mode::Default,
            min_confidence: DEFAULT_CONFIDENCE,
            redactor: Redactor::default(),
        }
    }
}

impl RedactOptions {
    /// Validate parameters; nothing is read or run until these are accepted
    pub fn new(mode: Mode, confidence: u32, blur: u32, padding: f32) -> Result<Self, RedactError> {
        if confidence > 100 {
            return Err(RedactError::invalid_parameter(
                "confidence",
                format!("must be between 0 and 100, got {}", confidence),
            ));
        }
        Ok(Self {
            mode,
            min_confidence: confidence,
            redactor: Redactor::new(blur, padding)?,
        })
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn min_confidence(&self) -> u32 {
        self.min_confidence
    }

    pub fn blur_strength(&self) -> u32 {
        self.redactor.kernel_size()
    }

    pub fn padding(&self) -> f32 {
        self.redactor.padding()
    }
}

/// Reject an empty target list or blank targets, dropping repeats
///
/// Targets equal under normalization are kept once, first spelling wins.
pub fn validate_targets(targets: &[String]) -> Result<Vec<String>, RedactError> {
    if targets.is_empty() {
        return Err(RedactError::invalid_parameter(
            "text",
            "at least one target string is required",
        ));
    }

    let mut seen = Vec::with_capacity(targets.len());
    let mut out = Vec::with_capacity(targets.len());
    for target in targets {
        let key = normalize_text(target);
        if key.is_empty() {
            return Err(RedactError::invalid_parameter(
                "text",
                "target strings must not be blank",
            ));
        }
        if !seen.contains(&key) {
            seen.push(key);
            out.push(target.clone());
        }
    }
    Ok(out)
}

/// In-memory result of one pipeline run
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub image: DynamicImage,
    /// Pooled detections after dedup
    pub detections: usize,
    pub matches: Vec<Match>,
    /// Regions actually blurred
    pub regions: Vec<BoundingBox>,
    /// Targets with no match, in input order
    pub unmatched: Vec<String>,
}

/// One match as reported to the operator
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchSummary {
    pub text: String,
    pub bbox: BoundingBox,
    pub confidence: f32,
}

/// Matches for one target
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TargetReport {
    pub target: String,
    /// Strategy that produced the matches, if any did
    pub strategy: Option<Strategy>,
    pub matches: Vec<MatchSummary>,
}

/// Summary of a processed file
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub input: PathBuf,
    pub output: PathBuf,
    pub mode: Mode,
    pub detections: usize,
    pub targets: Vec<TargetReport>,
    pub unmatched: Vec<String>,
    pub regions_blurred: usize,
    /// Version of the tool that produced the report
    pub tool: serde_json::Value,
}

impl RunReport {
    fn new(input: &Path, output: &Path, mode: Mode, targets: &[String], outcome: &RunOutcome) -> Self {
        let targets = targets
            .iter()
            .map(|target| {
                let hits: Vec<&Match> = outcome
                    .matches
                    .iter()
                    .filter(|m| &m.target == target)
                    .collect();
                TargetReport {
                    target: target.clone(),
                    strategy: hits.first().map(|m| m.strategy),
                    matches: hits
                        .iter()
                        .map(|m| MatchSummary {
                            text: m.text.clone(),
                            bbox: m.bbox,
                            confidence: m.confidence,
                        })
                        .collect(),
                }
            })
            .collect();

        Self {
            input: input.to_path_buf(),
            output: output.to_path_buf(),
            mode,
            detections: outcome.detections,
            targets,
            unmatched: outcome.unmatched.clone(),
            regions_blurred: outcome.regions.len(),
            tool: version::get_version_info(),
        }
    }

    /// Total number of matches across all targets
    pub fn match_count(&self) -> usize {
        self.targets.iter().map(|t| t.matches.len()).sum()
    }

    /// The report as pretty-printed JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Text redaction pipeline bound to one detector and one set of options
#[derive(Debug, Clone)]
pub struct TextBlur {
    detector: Detector,
    options: RedactOptions,
}

impl TextBlur {
    pub fn new(detector: Detector, options: RedactOptions) -> Self {
        Self { detector, options }
    }

    pub fn options(&self) -> &RedactOptions {
        &self.options
    }

    pub fn detector(&self) -> &Detector {
        &self.detector
    }

    /// Run every stage on an already decoded image
    pub async fn run(
        &self,
        image: &DynamicImage,
        targets: &[String],
    ) -> Result<RunOutcome, RedactError> {
        let targets = validate_targets(targets)?;
        let mode = self.options.mode;

        match self.detector.engine_version().await {
            Ok(version) => info!("Using {}", version),
            Err(e) => warn!("⚠️ OCR engine check failed: {}", e),
        }

        let variants = produce_variants(image, mode);
        info!(
            "Produced {} variants for {} mode",
            variants.len(),
            mode
        );

        let detections = self.detector.detect(&variants, mode).await?;
        let matches = match_targets(
            &detections,
            &targets,
            self.options.min_confidence as f32,
        );

        let unmatched: Vec<String> = targets
            .iter()
            .filter(|t| !matches.iter().any(|m| &m.target == *t))
            .cloned()
            .collect();
        for target in &unmatched {
            warn!("⚠️ No match found for '{}'", target);
        }

        let redaction = self.options.redactor.redact(image, &matches);
        info!(
            "{} matches, {} regions blurred with kernel {}",
            matches.len(),
            redaction.regions.len(),
            self.options.redactor.kernel_size()
        );

        Ok(RunOutcome {
            image: redaction.image,
            detections: detections.len(),
            matches,
            regions: redaction.regions,
            unmatched,
        })
    }

    /// Read `input`, redact `targets` and write the result to `output`
    ///
    /// The output is always written on success, identical to the input
    /// when nothing matched. On failure no output file is left behind.
    pub async fn process_file(
        &self,
        input: &Path,
        output: &Path,
        targets: &[String],
    ) -> Result<RunReport, RedactError> {
        self.process_file_with_report(input, output, None, targets)
            .await
    }

    /// Like [`TextBlur::process_file`], also writing the JSON report to
    /// `report_path`
    ///
    /// Both files are fully written before either is moved into place, so a
    /// failed report never leaves a redacted image behind.
    pub async fn process_file_with_report(
        &self,
        input: &Path,
        output: &Path,
        report_path: Option<&Path>,
        targets: &[String],
    ) -> Result<RunReport, RedactError> {
        let targets = validate_targets(targets)?;
        let (image, info) = load_image(input)?;
        info!(
            "Processing {} ({}x{}) for {} target(s)",
            input.display(),
            info.width,
            info.height,
            targets.len()
        );

        let outcome = self.run(&image, &targets).await?;
        let report = RunReport::new(input, output, self.options.mode, &targets, &outcome);

        let staged_image = stage_image(&outcome.image, output, output_format(output, info.format))?;
        let staged_report = match report_path {
            Some(path) => {
                let json = report.to_json().map_err(|e| RedactError::Output {
                    path: path.to_path_buf(),
                    reason: e.to_string(),
                })?;
                Some(stage_bytes(json.as_bytes(), path)?)
            }
            None => None,
        };

        staged_image.commit()?;
        info!("Saved redacted image to {}", output.display());

        if let Some(staged) = staged_report {
            if let Err(e) = staged.commit() {
                if let Err(remove_err) = std::fs::remove_file(output) {
                    warn!(
                        "Failed to remove {} after report error: {}",
                        output.display(),
                        remove_err
                    );
                }
                return Err(e);
            }
            debug!("Saved run report");
        }

        Ok(report)
    }
}
