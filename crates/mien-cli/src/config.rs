use std::str::FromStr;

use mien_core::CatalogKind;

/// Runtime configuration, loaded from environment variables.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Webcam index passed to the capture backend (default: 0).
    pub camera_index: i32,
    /// Delta catalog used by the classifier.
    pub catalog: CatalogKind,
    /// Reuse last iteration's landmarks as the previous set instead of
    /// re-fitting the previous grayscale frame.
    pub reuse_previous_landmarks: bool,
    /// Stop after this many frames. `None` runs until exit or end of stream.
    pub max_frames: Option<u64>,
    /// Report labels through the log instead of opening a window.
    pub headless: bool,
    /// Pinned SHA-256 of the face detector model.
    pub detector_sha256: Option<String>,
    /// Pinned SHA-256 of the landmark model.
    pub landmark_sha256: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            camera_index: 0,
            catalog: CatalogKind::Reference,
            reuse_previous_landmarks: false,
            max_frames: None,
            headless: false,
            detector_sha256: None,
            landmark_sha256: None,
        }
    }
}

impl Config {
    /// Load configuration from `MIEN_*` environment variables with defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let flag = |key: &str, default: bool| {
            lookup(key)
                .map(|v| !matches!(v.trim(), "0" | "" | "false" | "no" | "off"))
                .unwrap_or(default)
        };
        let digest = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let catalog = match lookup("MIEN_CATALOG").map(|v| v.parse::<CatalogKind>()) {
            Some(Ok(kind)) => kind,
            Some(Err(e)) => {
                tracing::warn!(error = %e, "ignoring MIEN_CATALOG");
                defaults.catalog
            }
            None => defaults.catalog,
        };

        Self {
            camera_index: parsed(&lookup, "MIEN_CAMERA_INDEX").unwrap_or(defaults.camera_index),
            catalog,
            reuse_previous_landmarks: flag(
                "MIEN_REUSE_PREVIOUS_LANDMARKS",
                defaults.reuse_previous_landmarks,
            ),
            max_frames: parsed(&lookup, "MIEN_MAX_FRAMES").or(defaults.max_frames),
            headless: flag("MIEN_HEADLESS", defaults.headless),
            detector_sha256: digest("MIEN_DETECTOR_SHA256"),
            landmark_sha256: digest("MIEN_LANDMARK_SHA256"),
        }
    }
}

fn parsed<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    lookup(key).and_then(|v| v.trim().parse().ok())
}
