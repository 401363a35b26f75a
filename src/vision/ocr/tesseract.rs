// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Tesseract OCR invoked as a subprocess
//!
//! Each call writes the variant to a temporary PNG and reads word-level
//! TSV from stdout.

use std::io::{BufWriter, ErrorKind, Write};

use async_trait::async_trait;
use image::{DynamicImage, ImageFormat};
use tokio::process::Command;
use tracing::debug;

use super::engine::OcrEngine;
use super::model::{BoundingBox, OcrWord, ScanConfig};
use crate::vision::errors::OcrError;

/// Default Tesseract executable
pub const DEFAULT_TESSERACT_CMD: &str = "tesseract";

/// Default language pack
pub const DEFAULT_LANGUAGE: &str = "eng";

/// LSTM + legacy engine selection (`--oem 3`)
const ENGINE_MODE: &str = "3";

/// TSV row level for individual words
const WORD_LEVEL: u32 = 5;

/// Number of TSV columns
const TSV_COLUMNS: usize = 12;

/// Tesseract command-line engine
#[derive(Debug, Clone)]
pub struct TesseractEngine {
    command: String,
    language: String,
}

impl Default for TesseractEngine {
    fn default() -> Self {
        Self::new(DEFAULT_TESSERACT_CMD, DEFAULT_LANGUAGE)
    }
}

impl TesseractEngine {
    pub fn new(command: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            language: language.into(),
        }
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    /// Query the engine version (first line of `--version`)
    pub async fn query_version(&self) -> Result<String, OcrError> {
        let output = Command::new(&self.command)
            .arg("--version")
            .output()
            .await
            .map_err(|e| self.spawn_error(e))?;

        if !output.status.success() {
            return Err(OcrError::Failed {
                status: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        // Older releases print the version on stderr
        let text = if output.stdout.is_empty() {
            String::from_utf8_lossy(&output.stderr).to_string()
        } else {
            String::from_utf8_lossy(&output.stdout).to_string()
        };
        Ok(text.lines().next().unwrap_or_default().trim().to_string())
    }

    fn spawn_error(&self, e: std::io::Error) -> OcrError {
        if e.kind() == ErrorKind::NotFound {
            OcrError::NotInstalled(self.command.clone())
        } else {
            OcrError::Io(e)
        }
    }
}

#[async_trait]
impl OcrEngine for TesseractEngine {
    async fn detect_text(
        &self,
        image: &DynamicImage,
        scan: ScanConfig,
    ) -> Result<Vec<OcrWord>, OcrError> {
        let mut input = tempfile::Builder::new()
            .prefix("text-blur-")
            .suffix(".png")
            .tempfile()?;
        {
            let mut writer = BufWriter::new(input.as_file_mut());
            image.write_to(&mut writer, ImageFormat::Png)?;
            writer.flush()?;
        }

        debug!(
            "Running {} --psm {} on {}",
            self.command,
            scan.psm(),
            input.path().display()
        );

        let output = Command::new(&self.command)
            .arg(input.path())
            .arg("stdout")
            .arg("--oem")
            .arg(ENGINE_MODE)
            .arg("--psm")
            .arg(scan.psm().to_string())
            .arg("-l")
            .arg(&self.language)
            .arg("tsv")
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| self.spawn_error(e))?;

        if !output.status.success() {
            return Err(OcrError::Failed {
                status: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        parse_tsv(&String::from_utf8_lossy(&output.stdout))
    }

    fn name(&self) -> &'static str {
        "tesseract"
    }

    async fn version(&self) -> Result<String, OcrError> {
        self.query_version().await
    }
}

/// Parse Tesseract TSV output into word tokens
///
/// Keeps word-level rows with non-negative confidence, non-blank text and
/// a non-empty box. Malformed rows are skipped.
pub fn parse_tsv(tsv: &str) -> Result<Vec<OcrWord>, OcrError> {
    let mut lines = tsv.lines();
    match lines.next() {
        None => return Ok(Vec::new()),
        Some(header) if header.trim().is_empty() => return Ok(Vec::new()),
        Some(header) if header.starts_with("level") => {}
        Some(header) => {
            return Err(OcrError::Parse(format!(
                "missing TSV header, got '{}'",
                header.chars().take(40).collect::<String>()
            )))
        }
    }

    let mut words = Vec::new();
    for row in lines {
        let cols: Vec<&str> = row.split('\t').collect();
        if cols.len() < TSV_COLUMNS {
            continue;
        }
        if cols[0].parse::<u32>().ok() != Some(WORD_LEVEL) {
            continue;
        }

        let text = cols[11].trim();
        let confidence: f32 = match cols[10].trim().parse() {
            Ok(c) => c,
            Err(_) => continue,
        };
        if text.is_empty() || confidence < 0.0 {
            continue;
        }

        let dims: Vec<u32> = cols[6..10]
            .iter()
            .filter_map(|c| c.trim().parse().ok())
            .collect();
        if dims.len() != 4 {
            continue;
        }
        let bbox = BoundingBox::new(dims[0], dims[1], dims[2], dims[3]);
        if bbox.is_empty() {
            continue;
        }

        words.push(OcrWord::new(text, bbox, confidence.min(100.0)));
    }

    Ok(words)
}
