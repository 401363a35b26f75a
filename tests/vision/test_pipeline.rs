// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! File-level pipeline behaviour: output writing, reports and failures

use std::sync::Arc;

use image::{DynamicImage, GenericImageView, ImageFormat, Rgba, RgbaImage};
use text_blur::vision::image_utils::{default_output_path, load_image};
use text_blur::vision::{Mode, RedactError};

use super::fake_ocr::{
    confidential_word, pipeline, targets, text_page, write_png, MissingOcr, ScriptedOcr,
};

#[cfg(test)]
mod pipeline_tests {
    use super::*;

    #[tokio::test]
    async fn test_process_file_writes_redacted_image() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("scan.png");
        let output = default_output_path(&input);
        write_png(&text_page(), &input);

        let engine = Arc::new(ScriptedOcr::new(vec![confidential_word()]));
        let report = pipeline(engine, Mode::Default)
            .process_file(&input, &output, &targets(&["CONFIDENTIAL"]))
            .await
            .unwrap();

        assert_eq!(output, dir.path().join("scan_blurred.png"));
        assert_eq!(report.match_count(), 1);
        assert_eq!(report.regions_blurred, 1);
        assert!(report.unmatched.is_empty());

        let (written, _) = load_image(&output).unwrap();
        assert_eq!(written.dimensions(), text_page().dimensions());
        assert_ne!(written.as_bytes(), text_page().as_bytes());
    }

    /// Zero matches still succeed and write an identical image
    #[tokio::test]
    async fn test_process_file_without_matches_copies_pixels() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("scan.png");
        let output = dir.path().join("out.png");
        write_png(&text_page(), &input);

        let engine = Arc::new(ScriptedOcr::new(vec![confidential_word()]));
        let report = pipeline(engine, Mode::Default)
            .process_file(&input, &output, &targets(&["SECRET"]))
            .await
            .unwrap();

        assert_eq!(report.match_count(), 0);
        assert_eq!(report.unmatched, vec!["SECRET".to_string()]);
        assert_eq!(report.targets[0].strategy, None);

        let (written, _) = load_image(&output).unwrap();
        assert_eq!(written.to_rgb8().as_raw(), text_page().to_rgb8().as_raw());
    }

    #[tokio::test]
    async fn test_invalid_image_fails_before_ocr() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("broken.png");
        let output = dir.path().join("broken_blurred.png");
        std::fs::write(&input, b"definitely not a png").unwrap();

        let engine = Arc::new(ScriptedOcr::new(vec![confidential_word()]));
        let result = pipeline(engine.clone(), Mode::Default)
            .process_file(&input, &output, &targets(&["CONFIDENTIAL"]))
            .await;

        match result {
            Err(RedactError::InvalidImage { path, .. }) => assert_eq!(path, input),
            other => panic!("unexpected result: {:?}", other),
        }
        assert_eq!(engine.calls(), 0);
        assert_eq!(engine.version_checks(), 0);
        assert!(!output.exists());
    }

    /// The engine is checked once per run, only after the image decoded
    #[tokio::test]
    async fn test_engine_checked_once_after_decode() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("scan.png");
        let output = dir.path().join("out.png");
        write_png(&text_page(), &input);

        let engine = Arc::new(ScriptedOcr::new(vec![confidential_word()]));
        pipeline(engine.clone(), Mode::Aggressive)
            .process_file(&input, &output, &targets(&["CONFIDENTIAL"]))
            .await
            .unwrap();

        assert_eq!(engine.version_checks(), 1);
        assert!(engine.calls() > 1);
    }

    /// A fatal detection failure leaves no output behind
    #[tokio::test]
    async fn test_detection_unavailable_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("scan.png");
        let output = dir.path().join("scan_blurred.png");
        write_png(&text_page(), &input);

        let result = pipeline(Arc::new(MissingOcr), Mode::Default)
            .process_file(&input, &output, &targets(&["CONFIDENTIAL"]))
            .await;

        assert!(matches!(
            result,
            Err(RedactError::DetectionUnavailable { attempted: 6 })
        ));
        assert!(!output.exists());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn test_blank_target_rejected() {
        let engine = Arc::new(ScriptedOcr::new(vec![confidential_word()]));
        let result = pipeline(engine.clone(), Mode::Default)
            .run(&text_page(), &targets(&["   "]))
            .await;

        assert!(matches!(result, Err(RedactError::InvalidParameter { .. })));
        assert_eq!(engine.calls(), 0);
    }

    /// JPEG output from an image with alpha is flattened rather than failing
    #[tokio::test]
    async fn test_jpeg_output_from_rgba_input() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("logo.png");
        let output = dir.path().join("logo.jpg");
        let rgba = DynamicImage::ImageRgba8(RgbaImage::from_pixel(240, 110, Rgba([250, 250, 250, 200])));
        rgba.save_with_format(&input, ImageFormat::Png).unwrap();

        let engine = Arc::new(ScriptedOcr::new(vec![confidential_word()]));
        pipeline(engine, Mode::Default)
            .process_file(&input, &output, &targets(&["CONFIDENTIAL"]))
            .await
            .unwrap();

        let (_, info) = load_image(&output).unwrap();
        assert_eq!(info.format, ImageFormat::Jpeg);
        assert_eq!((info.width, info.height), (240, 110));
    }

    #[tokio::test]
    async fn test_report_written_as_json() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("scan.png");
        let output = dir.path().join("scan_blurred.png");
        let report_path = dir.path().join("report.json");
        write_png(&text_page(), &input);

        let engine = Arc::new(ScriptedOcr::new(vec![confidential_word()]));
        pipeline(engine, Mode::Aggressive)
            .process_file_with_report(
                &input,
                &output,
                Some(&report_path),
                &targets(&["CONFIDENTIAL", "SECRET"]),
            )
            .await
            .unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&report_path).unwrap()).unwrap();
        assert_eq!(json["mode"], "aggressive");
        assert_eq!(json["targets"][0]["target"], "CONFIDENTIAL");
        assert_eq!(json["targets"][0]["strategy"], "exact");
        assert_eq!(json["targets"][0]["matches"][0]["bbox"]["x"], 40);
        assert_eq!(json["targets"][1]["strategy"], serde_json::Value::Null);
        assert_eq!(json["unmatched"][0], "SECRET");
        assert_eq!(json["regions_blurred"], 1);
    }

    #[tokio::test]
    async fn test_unwritable_report_leaves_no_output_image() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("scan.png");
        let output = dir.path().join("scan_blurred.png");
        let report_path = dir.path().join("missing").join("report.json");
        write_png(&text_page(), &input);

        let engine = Arc::new(ScriptedOcr::new(vec![confidential_word()]));
        let result = pipeline(engine, Mode::Default)
            .process_file_with_report(
                &input,
                &output,
                Some(&report_path),
                &targets(&["CONFIDENTIAL"]),
            )
            .await;

        match result {
            Err(RedactError::Output { path, .. }) => assert_eq!(path, report_path),
            other => panic!("expected output error, got {:?}", other),
        }
        assert!(!output.exists());
        // Only the input remains
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    /// Same file processed twice gives byte-identical outputs
    #[tokio::test]
    async fn test_outputs_are_reproducible() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("scan.png");
        write_png(&text_page(), &input);

        let mut outputs = Vec::new();
        for name in ["a.png", "b.png"] {
            let output = dir.path().join(name);
            let engine = Arc::new(ScriptedOcr::new(vec![confidential_word()]));
            pipeline(engine, Mode::Default)
                .process_file(&input, &output, &targets(&["CONFIDENTIAL"]))
                .await
                .unwrap();
            outputs.push(std::fs::read(&output).unwrap());
        }
        assert_eq!(outputs[0], outputs[1]);
    }
}
