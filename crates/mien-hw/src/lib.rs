//! Capture, detection and display capabilities for the expression loop.
//!
//! The classifier only ever sees landmark coordinates. Everything that
//! touches pixels sits behind the traits in this crate so the frame loop can
//! run against a webcam (feature `opencv`) or against fakes in tests.

pub mod frame;
pub mod sink;

#[cfg(feature = "opencv")]
pub mod opencv_backend;

pub use frame::{FaceRegion, Fit, Frame};
pub use sink::{LogSink, SinkControl};

use image::GrayImage;
use mien_core::{EmotionLabel, LandmarkSet};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HwError {
    #[error("failed to load {what} model {path}: {reason}")]
    ModelLoad {
        what: &'static str,
        path: String,
        reason: String,
    },
    #[error("capture error: {0}")]
    Capture(String),
    #[error("detection error: {0}")]
    Detection(String),
    #[error("display error: {0}")]
    Display(String),
    #[error("{0} is not available in this build (enable the `opencv` feature)")]
    Unsupported(&'static str),
    #[cfg(feature = "opencv")]
    #[error("opencv error: {0}")]
    OpenCv(#[from] opencv::Error),
}

/// A source of colour frames. `Ok(None)` means the stream ended.
pub trait FrameSource {
    fn next_frame(&mut self) -> Result<Option<Frame>, HwError>;
}

/// Finds face rectangles in a grayscale frame.
pub trait FaceDetector {
    fn detect(&mut self, gray: &GrayImage) -> Result<Vec<FaceRegion>, HwError>;
}

/// Fits 68-point landmarks to each detected face. Callers skip fitting
/// when detection found nothing, so `faces` is never empty.
pub trait LandmarkFitter {
    fn fit(&mut self, gray: &GrayImage, faces: &[FaceRegion]) -> Result<Fit, HwError>;
}

/// Receives each annotated frame and reports whether to keep going.
pub trait FrameSink {
    fn present(
        &mut self,
        frame: &Frame,
        landmarks: &[LandmarkSet],
        label: EmotionLabel,
    ) -> Result<SinkControl, HwError>;
}

impl<T: FrameSink + ?Sized> FrameSink for Box<T> {
    fn present(
        &mut self,
        frame: &Frame,
        landmarks: &[LandmarkSet],
        label: EmotionLabel,
    ) -> Result<SinkControl, HwError> {
        (**self).present(frame, landmarks, label)
    }
}
