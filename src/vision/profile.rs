// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Operator modes and the preprocessing/scan sets they select

use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use super::ocr::ScanConfig;
use super::preprocessing::Technique;

/// Operator-selected detection mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Minimal, fast set tuned for clean printed text
    #[default]
    Default,
    /// Larger set tuned for logos and graphical backgrounds
    Aggressive,
    /// Union of both sets
    All,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Default => "default",
            Mode::Aggressive => "aggressive",
            Mode::All => "all",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "default" => Ok(Mode::Default),
            "aggressive" => Ok(Mode::Aggressive),
            "all" => Ok(Mode::All),
            other => Err(format!(
                "unknown mode '{}' (expected default, aggressive or all)",
                other
            )),
        }
    }
}

/// Techniques and scan configurations run for one mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Profile {
    pub techniques: &'static [Technique],
    pub scans: &'static [ScanConfig],
}

impl Profile {
    /// Number of OCR invocations this profile costs per image
    pub fn run_count(&self) -> usize {
        self.techniques.len() * self.scans.len()
    }
}

const DEFAULT_TECHNIQUES: &[Technique] =
    &[Technique::Original, Technique::Grayscale, Technique::Binary];

const AGGRESSIVE_TECHNIQUES: &[Technique] = &[
    Technique::Grayscale,
    Technique::Contrast,
    Technique::Binary,
    Technique::Adaptive,
    Technique::Sharpen,
    Technique::Denoise,
    Technique::DenoiseAdaptive,
    Technique::ContrastBinary,
    Technique::SharpenBinary,
];

const ALL_TECHNIQUES: &[Technique] = &[
    Technique::Original,
    Technique::Grayscale,
    Technique::Contrast,
    Technique::Binary,
    Technique::Adaptive,
    Technique::Sharpen,
    Technique::Denoise,
    Technique::DenoiseAdaptive,
    Technique::ContrastBinary,
    Technique::SharpenBinary,
];

const DEFAULT_SCANS: &[ScanConfig] = &[ScanConfig::BlockText, ScanConfig::FullPage];

const EXTENDED_SCANS: &[ScanConfig] = &ScanConfig::ALL;

/// Look up the profile for a mode
pub fn profile(mode: Mode) -> Profile {
    match mode {
        Mode::Default => Profile {
            techniques: DEFAULT_TECHNIQUES,
            scans: DEFAULT_SCANS,
        },
        Mode::Aggressive => Profile {
            techniques: AGGRESSIVE_TECHNIQUES,
            scans: EXTENDED_SCANS,
        },
        Mode::All => Profile {
            techniques: ALL_TECHNIQUES,
            scans: EXTENDED_SCANS,
        },
    }
}
