use image::{GrayImage, RgbImage};
use mien_core::LandmarkSet;

/// One captured frame with its grayscale conversion.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Sequence number assigned by the source, starting at 0.
    pub index: u64,
    pub color: RgbImage,
    pub gray: GrayImage,
}

impl Frame {
    pub fn from_rgb(index: u64, color: RgbImage) -> Self {
        let gray = image::imageops::grayscale(&color);
        Self { index, color, gray }
    }
}

/// Axis-aligned face rectangle in frame pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaceRegion {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl FaceRegion {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// Landmark fitting outcome: one set per face region, in detection order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fit {
    pub success: bool,
    pub landmarks: Vec<LandmarkSet>,
}

impl Fit {
    pub fn failed() -> Self {
        Self::default()
    }

    pub fn succeeded(landmarks: Vec<LandmarkSet>) -> Self {
        Self {
            success: true,
            landmarks,
        }
    }

    /// Fitted sets, or none at all when fitting failed.
    pub fn into_landmarks(self) -> Vec<LandmarkSet> {
        if self.success {
            self.landmarks
        } else {
            Vec::new()
        }
    }
}
