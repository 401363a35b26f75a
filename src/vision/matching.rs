// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Matching detections against redaction targets
//!
//! Strategies are tried per target in decreasing strictness; the first one
//! that yields at least one match wins for that target. Detections below
//! the confidence floor are never considered.

use std::fmt;

use serde::Serialize;
use tracing::{debug, info};

use super::ocr::{BoundingBox, Detection};

/// Shortest detection accepted as a fragment of a single-word target
pub const MIN_FRAGMENT_CHARS: usize = 3;

/// Max horizontal gap between adjacent words, as a fraction of line height
pub const HORIZONTAL_GAP_FACTOR: f32 = 1.5;

/// Max overlap between adjacent words, as a fraction of line height
pub const HORIZONTAL_OVERLAP_FACTOR: f32 = 0.5;

/// Max vertical center offset between words on one line, as a fraction of line height
pub const VERTICAL_ALIGN_FACTOR: f32 = 0.5;

/// Matching strategy, strictest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    Exact,
    Substring,
    Whitespace,
    Context,
}

impl Strategy {
    pub fn name(&self) -> &'static str {
        match self {
            Strategy::Exact => "exact",
            Strategy::Substring => "substring",
            Strategy::Whitespace => "whitespace",
            Strategy::Context => "context",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A target bound to the detections that spell it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Match {
    pub target: String,
    pub strategy: Strategy,
    /// Detected text, words joined by a space
    pub text: String,
    /// Union of the contributing detection boxes
    pub bbox: BoundingBox,
    /// Confidence of the weakest contributing detection
    pub confidence: f32,
    /// Number of contributing detections
    pub words: usize,
}

impl Match {
    fn from_detections(target: &str, strategy: Strategy, parts: &[&Detection]) -> Option<Self> {
        let (first, rest) = parts.split_first()?;
        let bbox = rest.iter().fold(first.bbox, |acc, d| acc.union(&d.bbox));
        let confidence = parts
            .iter()
            .map(|d| d.confidence)
            .fold(f32::INFINITY, f32::min);
        let text = parts
            .iter()
            .map(|d| d.text.trim())
            .collect::<Vec<_>>()
            .join(" ");
        Some(Self {
            target: target.to_string(),
            strategy,
            text,
            bbox,
            confidence,
            words: parts.len(),
        })
    }
}

/// Collapse whitespace runs, trim and lowercase
pub fn normalize_text(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Lowercase with all whitespace removed
pub fn compact_text(text: &str) -> String {
    text.split_whitespace().collect::<String>().to_lowercase()
}

type StrategyFn = fn(&str, &[&Detection]) -> Vec<Match>;

/// Strategies in the order they are attempted
pub const STRATEGIES: [(Strategy, StrategyFn); 4] = [
    (Strategy::Exact, exact_match),
    (Strategy::Substring, substring_match),
    (Strategy::Whitespace, whitespace_match),
    (Strategy::Context, context_match),
];

/// Match every target against the detections
///
/// Targets are independent; matches for all of them are returned together.
pub fn match_targets(
    detections: &[Detection],
    targets: &[String],
    min_confidence: f32,
) -> Vec<Match> {
    let eligible: Vec<&Detection> = detections
        .iter()
        .filter(|d| d.confidence >= min_confidence)
        .collect();

    debug!(
        "{} of {} detections at or above {}% confidence",
        eligible.len(),
        detections.len(),
        min_confidence
    );

    targets
        .iter()
        .flat_map(|target| match_target(target, &eligible))
        .collect()
}

/// Match one target, stopping at the first strategy that finds anything
pub fn match_target(target: &str, eligible: &[&Detection]) -> Vec<Match> {
    if normalize_text(target).is_empty() {
        return Vec::new();
    }

    for (strategy, find) in STRATEGIES {
        let matches = dedup_matches(find(target, eligible));
        if matches.is_empty() {
            continue;
        }
        for m in &matches {
            info!(
                "Found '{}' in '{}' with confidence {:.0}% ({} match)",
                target, m.text, m.confidence, strategy
            );
        }
        return matches;
    }

    Vec::new()
}

/// Drop matches with an identical box and text, keeping the first
fn dedup_matches(matches: Vec<Match>) -> Vec<Match> {
    let mut out: Vec<Match> = Vec::with_capacity(matches.len());
    for m in matches {
        if !out.iter().any(|o| o.bbox == m.bbox && o.text == m.text) {
            out.push(m);
        }
    }
    out
}

fn single(
    target: &str,
    strategy: Strategy,
    eligible: &[&Detection],
    accept: impl Fn(&Detection) -> bool,
) -> Vec<Match> {
    eligible
        .iter()
        .copied()
        .filter(|d| accept(d))
        .filter_map(|d| Match::from_detections(target, strategy, &[d]))
        .collect()
}

/// Detection text equals the target after normalization
pub fn exact_match(target: &str, eligible: &[&Detection]) -> Vec<Match> {
    let goal = normalize_text(target);
    single(target, Strategy::Exact, eligible, |d| normalize_text(&d.text) == goal)
}

/// Target inside a detection (OCR merged words), or, for single-word
/// targets, a detection fragment inside the target (OCR split a word)
pub fn substring_match(target: &str, eligible: &[&Detection]) -> Vec<Match> {
    let goal = normalize_text(target);
    let single_word = !goal.contains(' ');
    single(target, Strategy::Substring, eligible, |d| {
        let text = normalize_text(&d.text);
        if text.is_empty() {
            return false;
        }
        text.contains(&goal)
            || (single_word && text.chars().count() >= MIN_FRAGMENT_CHARS && goal.contains(&text))
    })
}

/// Compare with all whitespace removed, catching inserted or dropped spaces
pub fn whitespace_match(target: &str, eligible: &[&Detection]) -> Vec<Match> {
    let goal = compact_text(target);
    single(target, Strategy::Whitespace, eligible, |d| {
        compact_text(&d.text).contains(&goal)
    })
}

/// Reconstruct a multi-word target from horizontally adjacent, vertically
/// aligned detections read left to right
pub fn context_match(target: &str, eligible: &[&Detection]) -> Vec<Match> {
    if normalize_text(target).split(' ').count() < 2 {
        return Vec::new();
    }
    let goal = compact_text(target);

    let mut ordered: Vec<&Detection> = eligible.to_vec();
    ordered.sort_by(|a, b| {
        a.bbox
            .y
            .cmp(&b.bbox.y)
            .then(a.bbox.x.cmp(&b.bbox.x))
            .then_with(|| a.text.cmp(&b.text))
    });

    let mut matches = Vec::new();
    for (start, first) in ordered.iter().enumerate() {
        let head = compact_text(&first.text);
        if head.is_empty() || head.len() >= goal.len() || !goal.starts_with(&head) {
            continue;
        }
        if let Some(chain) = extend_chain(start, head, &ordered, &goal) {
            let parts: Vec<&Detection> = chain.iter().map(|&i| ordered[i]).collect();
            if let Some(m) = Match::from_detections(target, Strategy::Context, &parts) {
                matches.push(m);
            }
        }
    }
    matches
}

/// Follow right-hand neighbours from `start` until the joined text spells `goal`
fn extend_chain(
    start: usize,
    head: String,
    ordered: &[&Detection],
    goal: &str,
) -> Option<Vec<usize>> {
    let mut chain = vec![start];
    let mut joined = head;

    loop {
        let last = ordered[*chain.last()?];
        let mut best: Option<(usize, i64, String)> = None;

        for (i, cand) in ordered.iter().enumerate() {
            if chain.contains(&i) || !is_next_word(&last.bbox, &cand.bbox) {
                continue;
            }
            let piece = compact_text(&cand.text);
            if piece.is_empty() {
                continue;
            }
            let next = format!("{}{}", joined, piece);
            if !goal.starts_with(&next) && !next.starts_with(goal) {
                continue;
            }
            let gap = cand.bbox.x as i64 - last.bbox.right() as i64;
            if best.as_ref().map_or(true, |(_, g, _)| gap.abs() < g.abs()) {
                best = Some((i, gap, next));
            }
        }

        let (next_index, _, next) = best?;
        chain.push(next_index);
        if next.starts_with(goal) {
            return Some(chain);
        }
        joined = next;
    }
}

/// Whether `next` directly follows `prev` on the same text line
fn is_next_word(prev: &BoundingBox, next: &BoundingBox) -> bool {
    let line_height = prev.height.max(next.height) as f32;
    let gap = next.x as f32 - prev.right() as f32;
    let horizontal = gap >= -HORIZONTAL_OVERLAP_FACTOR * line_height
        && gap <= HORIZONTAL_GAP_FACTOR * line_height
        && next.x > prev.x;
    let vertical = (prev.center_y() - next.center_y()).abs() <= VERTICAL_ALIGN_FACTOR * line_height;
    horizontal && vertical
}
