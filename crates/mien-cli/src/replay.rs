//! `mien replay`: classify a recorded landmark stream.
//!
//! Input is JSON lines, one record per frame:
//! `{"landmarks": [[x, y], ...]}` or `{"landmarks": null}` when no face was
//! found. Pairing follows the live loop: the first record is compared with
//! itself, every later record with the record before it.

use std::collections::HashMap;
use std::io::{BufRead, Write};

use anyhow::{Context, Result};
use mien_core::{ActiveUnits, CoreError, EmotionClassifier, EmotionLabel, LandmarkSet, Point2D};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
struct ReplayRecord {
    landmarks: Option<Vec<[f32; 2]>>,
}

#[derive(Debug, Serialize)]
struct ReplayLine<'a> {
    frame: u64,
    label: EmotionLabel,
    text: &'static str,
    active_units: &'a ActiveUnits,
}

enum Previous {
    Unseeded,
    NoFace,
    Face(LandmarkSet),
}

#[derive(Debug, Default)]
pub struct ReplaySummary {
    pub frames: u64,
    pub labels: HashMap<EmotionLabel, u64>,
}

/// Read records from `input`, write one result per record to `output`.
pub fn replay<R: BufRead, W: Write>(
    classifier: &EmotionClassifier,
    input: R,
    mut output: W,
    json: bool,
) -> Result<ReplaySummary> {
    let mut summary = ReplaySummary::default();
    let mut previous = Previous::Unseeded;

    for (line_no, line) in input.lines().enumerate() {
        let line = line.with_context(|| format!("failed to read line {}", line_no + 1))?;
        if line.trim().is_empty() {
            continue;
        }
        let record: ReplayRecord = serde_json::from_str(&line)
            .with_context(|| format!("invalid landmark record on line {}", line_no + 1))?;

        let current: Option<LandmarkSet> = record
            .landmarks
            .map(|points| points.into_iter().map(|[x, y]| Point2D::new(x, y)).collect());

        let (label, units) = match (&current, &previous) {
            (None, _) => (EmotionLabel::NoFaceDetected, ActiveUnits::default()),
            (Some(_), Previous::NoFace) => (EmotionLabel::NoFaceDetected, ActiveUnits::default()),
            (Some(now), Previous::Unseeded) => classify(classifier, summary.frames, now, now),
            (Some(now), Previous::Face(before)) => {
                classify(classifier, summary.frames, now, before)
            }
        };

        if json {
            let out = ReplayLine {
                frame: summary.frames,
                label,
                text: label.as_str(),
                active_units: &units,
            };
            serde_json::to_writer(&mut output, &out)?;
            writeln!(output)?;
        } else {
            writeln!(output, "{label}")?;
        }

        *summary.labels.entry(label).or_default() += 1;
        summary.frames += 1;
        previous = match current {
            Some(set) => Previous::Face(set),
            None => Previous::NoFace,
        };
    }

    output.flush()?;
    Ok(summary)
}

fn classify(
    classifier: &EmotionClassifier,
    frame: u64,
    current: &LandmarkSet,
    previous: &LandmarkSet,
) -> (EmotionLabel, ActiveUnits) {
    match classifier.classify_transition(current, previous) {
        Ok(result) => (result.label, result.active_units),
        Err(e @ CoreError::InsufficientLandmarks { .. }) => {
            tracing::warn!(frame, error = %e, "landmark set rejected");
            (EmotionLabel::NoFaceDetected, ActiveUnits::default())
        }
        Err(e) => {
            tracing::error!(frame, error = %e, "classifier wiring error");
            (EmotionLabel::NoFaceDetected, ActiveUnits::default())
        }
    }
}
