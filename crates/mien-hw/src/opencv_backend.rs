//! Webcam capture, Haar cascade detection, LBF landmark fitting and a
//! HighGUI window, all through OpenCV.

use image::{GrayImage, RgbImage};
use mien_core::{EmotionLabel, LandmarkSet, Point2D};
use opencv::core::{Mat, Point, Point2f, Ptr, Rect, Scalar, Size, Vector};
use opencv::face::{FacemarkLBF, FacemarkLBF_Params, FacemarkTrait};
use opencv::objdetect::CascadeClassifier;
use opencv::prelude::*;
use opencv::videoio::{self, VideoCapture};
use opencv::{highgui, imgproc};

use crate::{
    FaceDetector, FaceRegion, Fit, Frame, FrameSink, FrameSource, HwError, LandmarkFitter,
    SinkControl,
};

/// Esc.
const EXIT_KEY: i32 = 27;
/// Where the label is drawn on the frame.
const LABEL_ORIGIN: (i32, i32) = (5, 200);

fn gray_to_mat(gray: &GrayImage) -> Result<Mat, HwError> {
    let flat = Mat::from_slice(gray.as_raw())?;
    let shaped = flat.reshape(1, gray.height() as i32)?;
    Ok(shaped.try_clone()?)
}

fn rgb_to_bgr_mat(color: &RgbImage) -> Result<Mat, HwError> {
    let flat = Mat::from_slice(color.as_raw())?;
    let shaped = flat.reshape(3, color.height() as i32)?;
    let mut bgr = Mat::default();
    imgproc::cvt_color(&*shaped, &mut bgr, imgproc::COLOR_RGB2BGR, 0)?;
    Ok(bgr)
}

fn bgr_mat_to_rgb(bgr: &Mat) -> Result<RgbImage, HwError> {
    let mut rgb = Mat::default();
    imgproc::cvt_color(bgr, &mut rgb, imgproc::COLOR_BGR2RGB, 0)?;
    let (width, height) = (rgb.cols() as u32, rgb.rows() as u32);
    let bytes = rgb.data_bytes()?.to_vec();
    RgbImage::from_raw(width, height, bytes)
        .ok_or_else(|| HwError::Capture(format!("frame buffer does not match {width}x{height}")))
}

fn to_rects(faces: &[FaceRegion]) -> Vector<Rect> {
    faces
        .iter()
        .map(|f| Rect::new(f.x, f.y, f.width, f.height))
        .collect()
}

/// Frames from a webcam by index. The device is released on drop.
pub struct CameraSource {
    capture: VideoCapture,
    next_index: u64,
}

impl CameraSource {
    pub fn open(index: i32) -> Result<Self, HwError> {
        let capture = VideoCapture::new(index, videoio::CAP_ANY)?;
        if !capture.is_opened()? {
            return Err(HwError::Capture(format!("camera {index} could not be opened")));
        }
        tracing::info!(camera = index, "camera opened");
        Ok(Self {
            capture,
            next_index: 0,
        })
    }
}

impl FrameSource for CameraSource {
    fn next_frame(&mut self) -> Result<Option<Frame>, HwError> {
        let mut mat = Mat::default();
        if !self.capture.read(&mut mat)? || mat.empty() {
            return Ok(None);
        }
        let color = bgr_mat_to_rgb(&mat)?;
        let frame = Frame::from_rgb(self.next_index, color);
        self.next_index += 1;
        Ok(Some(frame))
    }
}

impl Drop for CameraSource {
    fn drop(&mut self) {
        if let Err(e) = self.capture.release() {
            tracing::warn!(error = %e, "failed to release camera");
        }
    }
}

/// Haar cascade face detector.
pub struct CascadeDetector {
    classifier: CascadeClassifier,
}

impl CascadeDetector {
    pub fn load(path: &str) -> Result<Self, HwError> {
        let load_err = |reason: String| HwError::ModelLoad {
            what: "face detector",
            path: path.to_string(),
            reason,
        };
        let classifier = CascadeClassifier::new(path).map_err(|e| load_err(e.to_string()))?;
        if classifier.empty().map_err(|e| load_err(e.to_string()))? {
            return Err(load_err("cascade classifier is empty".into()));
        }
        tracing::info!(path, "cascade detector loaded");
        Ok(Self { classifier })
    }
}

impl FaceDetector for CascadeDetector {
    fn detect(&mut self, gray: &GrayImage) -> Result<Vec<FaceRegion>, HwError> {
        let mat = gray_to_mat(gray)?;
        let mut faces = Vector::<Rect>::new();
        self.classifier
            .detect_multi_scale(
                &mat,
                &mut faces,
                1.1,
                3,
                0,
                Size::new(0, 0),
                Size::new(0, 0),
            )
            .map_err(|e| HwError::Detection(e.to_string()))?;
        Ok(faces
            .iter()
            .map(|r| FaceRegion::new(r.x, r.y, r.width, r.height))
            .collect())
    }
}

/// LBF landmark fitter producing 68-point sets.
pub struct LbfFitter {
    facemark: Ptr<FacemarkLBF>,
}

impl LbfFitter {
    pub fn load(path: &str) -> Result<Self, HwError> {
        let load_err = |reason: String| HwError::ModelLoad {
            what: "landmark",
            path: path.to_string(),
            reason,
        };
        let params = FacemarkLBF_Params::default().map_err(|e| load_err(e.to_string()))?;
        let mut facemark = FacemarkLBF::create(&params).map_err(|e| load_err(e.to_string()))?;
        facemark
            .load_model(path)
            .map_err(|e| load_err(e.to_string()))?;
        tracing::info!(path, "LBF landmark model loaded");
        Ok(Self { facemark })
    }
}

impl LandmarkFitter for LbfFitter {
    fn fit(&mut self, gray: &GrayImage, faces: &[FaceRegion]) -> Result<Fit, HwError> {
        let mat = gray_to_mat(gray)?;
        let rects = to_rects(faces);
        let mut shapes = Vector::<Vector<Point2f>>::new();
        let success = self
            .facemark
            .fit(&mat, &rects, &mut shapes)
            .map_err(|e| HwError::Detection(e.to_string()))?;
        if !success {
            return Ok(Fit::failed());
        }
        let landmarks: Vec<LandmarkSet> = shapes
            .iter()
            .map(|shape| {
                shape
                    .iter()
                    .map(|p| Point2D::new(p.x, p.y))
                    .collect::<LandmarkSet>()
            })
            .collect();
        Ok(Fit::succeeded(landmarks))
    }
}

/// HighGUI window that draws landmarks and the label. Esc requests exit.
pub struct WindowSink {
    name: String,
}

impl WindowSink {
    pub fn open(name: &str) -> Result<Self, HwError> {
        highgui::named_window(name, highgui::WINDOW_AUTOSIZE)
            .map_err(|e| HwError::Display(e.to_string()))?;
        Ok(Self {
            name: name.to_string(),
        })
    }
}

impl FrameSink for WindowSink {
    fn present(
        &mut self,
        frame: &Frame,
        landmarks: &[LandmarkSet],
        label: EmotionLabel,
    ) -> Result<SinkControl, HwError> {
        let mut canvas = rgb_to_bgr_mat(&frame.color)?;
        for set in landmarks {
            for p in set.points() {
                imgproc::circle(
                    &mut canvas,
                    Point::new(p.x.round() as i32, p.y.round() as i32),
                    2,
                    Scalar::new(255.0, 0.0, 0.0, 0.0),
                    -1,
                    imgproc::LINE_8,
                    0,
                )?;
            }
        }
        imgproc::put_text(
            &mut canvas,
            label.as_str(),
            Point::new(LABEL_ORIGIN.0, LABEL_ORIGIN.1),
            imgproc::FONT_HERSHEY_PLAIN,
            1.0,
            Scalar::new(0.0, 255.0, 0.0, 0.0),
            1,
            imgproc::LINE_8,
            false,
        )?;
        highgui::imshow(&self.name, &canvas).map_err(|e| HwError::Display(e.to_string()))?;

        if highgui::wait_key(1)? == EXIT_KEY {
            return Ok(SinkControl::Exit);
        }
        Ok(SinkControl::Continue)
    }
}

impl Drop for WindowSink {
    fn drop(&mut self) {
        let _ = highgui::destroy_window(&self.name);
    }
}
