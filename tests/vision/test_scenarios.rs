// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! End-to-end redaction scenarios against a scripted OCR collaborator
//!
//! Every scenario runs the full Preprocessor → Detector → Matcher →
//! Redactor chain on a synthetic page whose glyph block is known.

use std::sync::Arc;

use image::GenericImageView;
use text_blur::vision::{BoundingBox, Mode, OcrWord, Strategy};

use super::fake_ocr::{
    confidential_word, page_with_block, pipeline, targets, text_page, ScriptedOcr, WORD_BOX,
};

#[cfg(test)]
mod scenario_tests {
    use super::*;

    /// Padded region for WORD_BOX at padding 0.5 (margin 12)
    const WORD_REGION: BoundingBox = BoundingBox {
        x: 28,
        y: 28,
        width: 184,
        height: 48,
    };

    fn inside(region: &BoundingBox, x: u32, y: u32) -> bool {
        x >= region.x && x < region.right() && y >= region.y && y < region.bottom()
    }

    /// CONFIDENTIAL on a clean page: one exact match, changes confined to its box
    #[tokio::test]
    async fn test_confidential_exact_match() {
        let engine = Arc::new(ScriptedOcr::new(vec![confidential_word()]));
        let original = text_page();

        let outcome = pipeline(engine, Mode::Default)
            .run(&original, &targets(&["CONFIDENTIAL"]))
            .await
            .unwrap();

        assert_eq!(outcome.matches.len(), 1);
        assert_eq!(outcome.matches[0].strategy, Strategy::Exact);
        assert_eq!(outcome.matches[0].bbox, WORD_BOX);
        assert_eq!(outcome.regions, vec![WORD_REGION]);
        assert!(outcome.unmatched.is_empty());

        let before = original.to_rgb8();
        let after = outcome.image.to_rgb8();
        let mut changed = 0;
        for (x, y, pixel) in after.enumerate_pixels() {
            if inside(&WORD_REGION, x, y) {
                if pixel != before.get_pixel(x, y) {
                    changed += 1;
                }
            } else {
                assert_eq!(pixel, before.get_pixel(x, y), "({}, {}) changed", x, y);
            }
        }
        assert!(changed > 0);

        // Every glyph pixel lies inside the blurred region
        for y in WORD_BOX.y..WORD_BOX.bottom() {
            for x in WORD_BOX.x..WORD_BOX.right() {
                assert!(inside(&WORD_REGION, x, y));
            }
        }
    }

    /// Absent target: nothing matched, pixel-identical output
    #[tokio::test]
    async fn test_absent_target_leaves_image_identical() {
        let engine = Arc::new(ScriptedOcr::new(vec![confidential_word()]));
        let original = text_page();

        let outcome = pipeline(engine, Mode::Default)
            .run(&original, &targets(&["SECRET"]))
            .await
            .unwrap();

        assert!(outcome.matches.is_empty());
        assert!(outcome.regions.is_empty());
        assert_eq!(outcome.unmatched, vec!["SECRET".to_string()]);
        assert_eq!(outcome.image.as_bytes(), original.as_bytes());
    }

    /// Extra whitespace in the target is absorbed by the whitespace strategy
    #[tokio::test]
    async fn test_whitespace_target_matches_word() {
        let engine = Arc::new(ScriptedOcr::new(vec![confidential_word()]));

        let outcome = pipeline(engine, Mode::Default)
            .run(&text_page(), &targets(&["con fidential"]))
            .await
            .unwrap();

        assert_eq!(outcome.matches.len(), 1);
        assert_eq!(outcome.matches[0].strategy, Strategy::Whitespace);
        assert_eq!(outcome.matches[0].bbox, WORD_BOX);
        assert_eq!(outcome.regions, vec![WORD_REGION]);
    }

    /// Two adjacent words rebuild a two-word target with a union box
    #[tokio::test]
    async fn test_two_word_target_uses_context() {
        let john = BoundingBox::new(20, 30, 140, 40);
        let smith = BoundingBox::new(175, 30, 145, 40);
        let engine = Arc::new(ScriptedOcr::new(vec![
            OcrWord::new("JOHN", john, 95.0),
            OcrWord::new("SMITH", smith, 91.0),
        ]));
        let original = page_with_block(360, 120, john.union(&smith));

        let outcome = pipeline(engine, Mode::Default)
            .run(&original, &targets(&["JOHN SMITH"]))
            .await
            .unwrap();

        assert_eq!(outcome.matches.len(), 1);
        let m = &outcome.matches[0];
        assert_eq!(m.strategy, Strategy::Context);
        assert_eq!(m.bbox, BoundingBox::new(20, 30, 300, 40));
        assert_eq!(m.words, 2);
        assert_eq!(m.confidence, 91.0);
        assert_eq!(outcome.image.dimensions(), original.dimensions());
    }

    /// Words under the confidence floor are never matched
    #[tokio::test]
    async fn test_low_confidence_word_ignored() {
        let engine = Arc::new(ScriptedOcr::new(vec![OcrWord::new(
            "CONFIDENTIAL",
            WORD_BOX,
            42.0,
        )]));
        let original = text_page();

        let outcome = pipeline(engine, Mode::Default)
            .run(&original, &targets(&["CONFIDENTIAL"]))
            .await
            .unwrap();

        assert!(outcome.matches.is_empty());
        assert_eq!(outcome.unmatched.len(), 1);
        assert_eq!(outcome.image.as_bytes(), original.as_bytes());
    }

    /// Overlapping matches from different targets are blurred once
    #[tokio::test]
    async fn test_overlapping_targets_share_region() {
        let engine = Arc::new(ScriptedOcr::new(vec![confidential_word()]));

        let outcome = pipeline(engine, Mode::Default)
            .run(&text_page(), &targets(&["CONFIDENTIAL", "confid"]))
            .await
            .unwrap();

        assert_eq!(outcome.matches.len(), 2);
        assert_eq!(outcome.matches[1].strategy, Strategy::Substring);
        assert_eq!(outcome.regions.len(), 1);
    }

    /// Same input and parameters give bitwise-identical output
    #[tokio::test]
    async fn test_pipeline_is_idempotent() {
        let original = text_page();
        let run = |mode| {
            let engine = Arc::new(ScriptedOcr::new(vec![confidential_word()]));
            let image = original.clone();
            async move {
                pipeline(engine, mode)
                    .run(&image, &targets(&["CONFIDENTIAL"]))
                    .await
                    .unwrap()
            }
        };

        let first = run(Mode::All).await;
        let second = run(Mode::All).await;
        assert_eq!(first.image.as_bytes(), second.image.as_bytes());
        assert_eq!(first.matches, second.matches);
        assert_eq!(first.regions, second.regions);
    }
}
