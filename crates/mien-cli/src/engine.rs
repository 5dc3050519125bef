//! The frame loop: capture, detect, fit, classify, present.
//!
//! One iteration per frame, strictly sequential. The only state carried
//! between iterations is the previous grayscale frame (and, optionally, the
//! landmarks fitted on it), owned by [`LoopState`].

use std::collections::HashMap;

use image::GrayImage;
use mien_core::{CoreError, EmotionClassifier, EmotionLabel, LandmarkSet};
use mien_hw::{
    FaceDetector, Frame, FrameSink, FrameSource, HwError, LandmarkFitter, SinkControl,
};

/// Loop behaviour knobs.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoopOptions {
    pub reuse_previous_landmarks: bool,
    pub max_frames: Option<u64>,
}

/// Why the loop stopped.
#[derive(Debug, Clone, PartialEq)]
pub enum ExitReason {
    /// The sink asked to stop (e.g. Esc pressed).
    Requested,
    /// The source ran out of frames.
    SourceEnded,
    /// The source returned an error; reading stops like an end of stream.
    CaptureFailed(String),
    /// `max_frames` was reached.
    FrameLimit,
}

/// Counts reported when the loop exits.
#[derive(Debug, Clone)]
pub struct LoopSummary {
    pub frames: u64,
    pub labels: HashMap<EmotionLabel, u64>,
    pub exit: ExitReason,
}

impl LoopSummary {
    pub fn count(&self, label: EmotionLabel) -> u64 {
        self.labels.get(&label).copied().unwrap_or(0)
    }
}

struct PreviousFrame {
    gray: GrayImage,
    landmarks: Option<LandmarkSet>,
}

/// State carried from one iteration to the next.
#[derive(Default)]
pub struct LoopState {
    previous: Option<PreviousFrame>,
}

/// Result of processing one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameOutcome {
    pub label: EmotionLabel,
    /// Landmarks for every face fitted on the current frame.
    pub landmarks: Vec<LandmarkSet>,
}

pub struct FrameLoop<S, D, F, K> {
    source: S,
    detector: D,
    fitter: F,
    sink: K,
    classifier: EmotionClassifier,
    options: LoopOptions,
    state: LoopState,
}

impl<S, D, F, K> FrameLoop<S, D, F, K>
where
    S: FrameSource,
    D: FaceDetector,
    F: LandmarkFitter,
    K: FrameSink,
{
    pub fn new(
        source: S,
        detector: D,
        fitter: F,
        sink: K,
        classifier: EmotionClassifier,
        options: LoopOptions,
    ) -> Self {
        Self {
            source,
            detector,
            fitter,
            sink,
            classifier,
            options,
            state: LoopState::default(),
        }
    }

    /// Run until the sink requests exit, the source ends, or the frame limit.
    pub fn run(&mut self) -> Result<LoopSummary, HwError> {
        let mut frames = 0u64;
        let mut labels: HashMap<EmotionLabel, u64> = HashMap::new();

        let exit = loop {
            if self.options.max_frames.is_some_and(|max| frames >= max) {
                break ExitReason::FrameLimit;
            }

            let frame = match self.source.next_frame() {
                Ok(Some(frame)) => frame,
                Ok(None) => break ExitReason::SourceEnded,
                Err(e) => {
                    tracing::warn!(error = %e, "frame capture failed");
                    break ExitReason::CaptureFailed(e.to_string());
                }
            };

            let outcome = self.process(&frame);
            frames += 1;
            *labels.entry(outcome.label).or_default() += 1;

            let control = self.sink.present(&frame, &outcome.landmarks, outcome.label)?;

            self.state.previous = Some(PreviousFrame {
                gray: frame.gray,
                landmarks: outcome.landmarks.into_iter().next(),
            });

            if control == SinkControl::Exit {
                break ExitReason::Requested;
            }
        };

        tracing::info!(frames, exit = ?exit, "frame loop stopped");
        Ok(LoopSummary {
            frames,
            labels,
            exit,
        })
    }

    /// Classify one frame against the stored previous frame.
    ///
    /// Detection and fitting failures on either frame, and landmark sets
    /// too short for the catalog, all yield [`EmotionLabel::NoFaceDetected`].
    pub fn process(&mut self, frame: &Frame) -> FrameOutcome {
        // First frame: compare against itself.
        if self.state.previous.is_none() {
            self.state.previous = Some(PreviousFrame {
                gray: frame.gray.clone(),
                landmarks: None,
            });
        }

        let landmarks = match fit_faces(&mut self.detector, &mut self.fitter, &frame.gray) {
            Ok(landmarks) => landmarks,
            // Backend fault, as opposed to an empty detection.
            Err(e) => {
                tracing::warn!(frame = frame.index, error = %e, "landmark detection failed");
                Vec::new()
            }
        };

        let Some(current) = landmarks.first() else {
            tracing::debug!(frame = frame.index, "could not detect facemarks");
            return FrameOutcome {
                label: EmotionLabel::NoFaceDetected,
                landmarks,
            };
        };

        let Some(previous) = self.previous_landmarks() else {
            tracing::debug!(frame = frame.index, "no face in previous frame");
            return FrameOutcome {
                label: EmotionLabel::NoFaceDetected,
                landmarks,
            };
        };

        let label = match self.classifier.classify_transition(current, &previous) {
            Ok(result) => {
                tracing::debug!(
                    frame = frame.index,
                    label = %result.label,
                    active_units = ?result.active_units.iter().collect::<Vec<_>>(),
                    "frame classified"
                );
                result.label
            }
            Err(e @ CoreError::InsufficientLandmarks { .. }) => {
                tracing::warn!(frame = frame.index, error = %e, "landmark set rejected");
                EmotionLabel::NoFaceDetected
            }
            Err(e) => {
                tracing::error!(frame = frame.index, error = %e, "classifier wiring error");
                EmotionLabel::NoFaceDetected
            }
        };

        FrameOutcome { label, landmarks }
    }

    fn previous_landmarks(&mut self) -> Option<LandmarkSet> {
        let previous = self.state.previous.as_ref()?;
        if self.options.reuse_previous_landmarks {
            if let Some(cached) = &previous.landmarks {
                return Some(cached.clone());
            }
        }
        match fit_faces(&mut self.detector, &mut self.fitter, &previous.gray) {
            Ok(landmarks) => landmarks.into_iter().next(),
            Err(e) => {
                tracing::warn!(error = %e, "landmark detection on previous frame failed");
                None
            }
        }
    }

    #[cfg(test)]
    pub fn into_parts(self) -> (S, D, F, K) {
        (self.source, self.detector, self.fitter, self.sink)
    }
}

/// Detect faces and fit landmarks. Empty when either step finds nothing.
fn fit_faces<D: FaceDetector, F: LandmarkFitter>(
    detector: &mut D,
    fitter: &mut F,
    gray: &GrayImage,
) -> Result<Vec<LandmarkSet>, HwError> {
    let faces = detector.detect(gray)?;
    if faces.is_empty() {
        return Ok(Vec::new());
    }
    Ok(fitter.fit(gray, &faces)?.into_landmarks())
}
