// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;

use crate::vision::image_utils::default_output_path;
use crate::vision::ocr::tesseract::{DEFAULT_LANGUAGE, DEFAULT_TESSERACT_CMD};
use crate::vision::ocr::{Detector, TesseractEngine};
use crate::vision::pipeline::{RedactOptions, RunReport, TextBlur, DEFAULT_CONFIDENCE};
use crate::vision::profile::{profile, Mode};
use crate::vision::redaction::{DEFAULT_BLUR_STRENGTH, DEFAULT_PADDING};

/// Default per-run OCR timeout in seconds
pub const DEFAULT_OCR_TIMEOUT_SECS: u64 = 60;

/// Find text in an image with OCR and blur it
#[derive(Parser, Debug)]
#[command(name = "text-blur")]
#[command(version)]
#[command(about = "Find text in an image with OCR and blur it", long_about = None)]
pub struct Cli {
    /// Image to redact
    pub image_path: PathBuf,

    /// Text to blur (one or more strings)
    #[arg(required = true, num_args = 1..)]
    pub text: Vec<String>,

    /// Output path (defaults to <name>_blurred.<ext> next to the input)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Detection mode
    #[arg(short, long, value_enum, default_value_t = Mode::Default, env = "TEXT_BLUR_MODE")]
    pub mode: Mode,

    /// Minimum OCR confidence (0-100)
    #[arg(short, long, default_value_t = DEFAULT_CONFIDENCE, env = "TEXT_BLUR_CONFIDENCE")]
    pub confidence: u32,

    /// Gaussian kernel size (odd; even values are rounded up)
    #[arg(short, long, default_value_t = DEFAULT_BLUR_STRENGTH, env = "TEXT_BLUR_STRENGTH")]
    pub blur: u32,

    /// Margin around each match as a fraction of its height
    #[arg(long, default_value_t = DEFAULT_PADDING)]
    pub padding: f32,

    /// Tesseract executable
    #[arg(long, default_value = DEFAULT_TESSERACT_CMD, env = "TESSERACT_CMD")]
    pub tesseract: String,

    /// Tesseract language pack
    #[arg(long, default_value = DEFAULT_LANGUAGE, env = "TESSERACT_LANG")]
    pub lang: String,

    /// Per-run OCR timeout in seconds (0 disables)
    #[arg(long, default_value_t = DEFAULT_OCR_TIMEOUT_SECS, env = "TEXT_BLUR_OCR_TIMEOUT")]
    pub timeout: u64,

    /// Concurrent OCR runs (defaults to available CPU cores)
    #[arg(short, long, env = "TEXT_BLUR_JOBS")]
    pub jobs: Option<usize>,

    /// Write a JSON run report to this path
    #[arg(long)]
    pub report: Option<PathBuf>,
}

/// Execute a redaction run
pub async fn execute(cli: Cli) -> Result<RunReport> {
    // Validate everything before touching the image or the OCR engine
    let options = RedactOptions::new(cli.mode, cli.confidence, cli.blur, cli.padding)?;
    let output = cli
        .output
        .clone()
        .unwrap_or_else(|| default_output_path(&cli.image_path));

    let engine = TesseractEngine::new(cli.tesseract.as_str(), cli.lang.as_str());
    let mut detector = Detector::new(Arc::new(engine));
    if let Some(jobs) = cli.jobs {
        detector = detector.with_max_workers(jobs);
    }
    if cli.timeout > 0 {
        detector = detector.with_timeout(Duration::from_secs(cli.timeout));
    }

    println!(
        "🔍 Searching {} for {} target(s) in {} mode ({} OCR runs, {} workers)",
        cli.image_path.display(),
        cli.text.len(),
        options.mode(),
        profile(options.mode()).run_count(),
        detector.max_workers()
    );

    let pipeline = TextBlur::new(detector, options);
    let report = pipeline
        .process_file_with_report(&cli.image_path, &output, cli.report.as_deref(), &cli.text)
        .await?;

    print_summary(&report);

    if let Some(path) = &cli.report {
        println!("📝 Report written to {}", path.display());
    }

    Ok(report)
}

fn print_summary(report: &RunReport) {
    for target in &report.targets {
        match target.strategy {
            Some(strategy) => println!(
                "✅ '{}': {} match(es) via {} strategy",
                target.target,
                target.matches.len(),
                strategy
            ),
            None => println!("⚠️ '{}': not found", target.target),
        }
    }

    println!(
        "💾 Blurred {} region(s), saved to {}",
        report.regions_blurred,
        report.output.display()
    );

    if !report.unmatched.is_empty() {
        println!(
            "⚠️ No match for: {}",
            report
                .unmatched
                .iter()
                .map(|t| format!("'{}'", t))
                .collect::<Vec<_>>()
                .join(", ")
        );
    }
}
