use mien_core::{EmotionLabel, LandmarkSet};

use crate::{Frame, FrameSink, HwError};

/// What the loop should do after a frame was presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkControl {
    Continue,
    Exit,
}

/// Headless sink: reports label changes through `tracing`.
#[derive(Debug, Default)]
pub struct LogSink {
    last: Option<EmotionLabel>,
}

impl LogSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FrameSink for LogSink {
    fn present(
        &mut self,
        frame: &Frame,
        landmarks: &[LandmarkSet],
        label: EmotionLabel,
    ) -> Result<SinkControl, HwError> {
        if self.last != Some(label) {
            tracing::info!(frame = frame.index, faces = landmarks.len(), %label, "expression changed");
            self.last = Some(label);
        } else {
            tracing::debug!(frame = frame.index, faces = landmarks.len(), %label, "frame presented");
        }
        Ok(SinkControl::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;

    #[test]
    fn test_log_sink_never_exits() {
        let mut sink = LogSink::new();
        let frame = Frame::from_rgb(0, RgbImage::new(4, 4));
        for label in EmotionLabel::ALL {
            let control = sink.present(&frame, &[], label).unwrap();
            assert_eq!(control, SinkControl::Continue);
        }
        assert_eq!(sink.last, Some(EmotionLabel::NoFaceDetected));
    }
}
