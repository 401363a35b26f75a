// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// Version information for text-blur

/// Full version string with feature description
pub const VERSION: &str = "v0.1.0-multi-variant-ocr-2025-10-16";

/// Semantic version number
pub const VERSION_NUMBER: &str = "0.1.0";

/// Build date
pub const BUILD_DATE: &str = "2025-10-16";

/// Supported features in this version
pub const FEATURES: &[&str] = &[
    "multi-variant-preprocessing",
    "multi-scan-ocr",
    "parallel-detection",
    "context-matching",
    "atomic-output",
    "json-report",
];

/// Get formatted version string for logging
pub fn get_version_string() -> String {
    format!("text-blur {} ({})", VERSION_NUMBER, BUILD_DATE)
}

/// Get full version info for the run report
pub fn get_version_info() -> serde_json::Value {
    serde_json::json!({
        "version": VERSION_NUMBER,
        "build": VERSION,
        "date": BUILD_DATE,
        "features": FEATURES,
    })
}
