//! Face and eye region detection

use camera_capture::VideoFrame;
use image::imageops::{self, FilterType};
use ndarray::Array4;
use ort::session::{builder::GraphOptimizationLevel, Session};
use tracing::{debug, error, info};

use crate::config::{
    DEDUP_IOU_THRESHOLD, EYE_CONFIDENCE, EYE_MIN_SIZE, FACE_CONFIDENCE, FACE_MIN_SIZE,
};
use crate::region::Region;
use crate::{DmsConfig, DmsError};

/// Locates faces in a frame and eyes within a face crop.
///
/// `detect_eyes` receives the upper half of a face, cropped from the frame;
/// the regions it returns are relative to that crop. Order carries no meaning.
pub trait RegionDetector: Send + Sync {
    fn detect_faces(&self, frame: &VideoFrame) -> Result<Vec<Region>, DmsError>;

    fn detect_eyes(&self, face: &VideoFrame) -> Result<Vec<Region>, DmsError>;
}

/// Single-class box detector backed by an ONNX model.
///
/// Input is `[1, 3, S, S]` RGB scaled to `0..1`; output 0 holds rows of
/// `(x1, y1, x2, y2, score)` in normalized coordinates.
struct BoxModel {
    session: Session,
    confidence_threshold: f32,
    min_size: u32,
    input_size: u32,
}

impl BoxModel {
    fn load(
        path: &str,
        confidence_threshold: f32,
        min_size: u32,
        input_size: u32,
    ) -> Result<Self, DmsError> {
        let session = Session::builder()
            .and_then(|b| b.with_optimization_level(GraphOptimizationLevel::Level3))
            .and_then(|b| b.commit_from_file(path))
            .map_err(|e| {
                error!("Failed to load model {}: {}", path, e);
                DmsError::ModelLoad(e.to_string())
            })?;

        Ok(Self {
            session,
            confidence_threshold,
            min_size,
            input_size,
        })
    }

    fn detect(&self, frame: &VideoFrame) -> Result<Vec<Region>, DmsError> {
        let input = to_input_tensor(frame, self.input_size);

        let outputs = self
            .session
            .run(ort::inputs![input].map_err(|e| DmsError::Inference(e.to_string()))?)
            .map_err(|e| DmsError::Inference(e.to_string()))?;

        let view = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| DmsError::Inference(e.to_string()))?;

        let columns = view.shape().last().copied().unwrap_or(0);
        if columns < 5 {
            return Err(DmsError::Inference(format!(
                "expected at least 5 values per detection, got shape {:?}",
                view.shape()
            )));
        }

        let values: Vec<f32> = view.iter().copied().collect();
        Ok(decode_boxes(
            &values,
            columns,
            frame.width(),
            frame.height(),
            self.confidence_threshold,
            self.min_size,
        ))
    }
}

/// Face and eye detector using two ONNX models
pub struct OnnxRegionDetector {
    face_model: BoxModel,
    eye_model: BoxModel,
}

impl OnnxRegionDetector {
    pub fn new(config: &DmsConfig) -> Result<Self, DmsError> {
        let face_path = config
            .face_model_path
            .as_deref()
            .ok_or_else(|| DmsError::Config("face_model_path is not set".into()))?;
        let eye_path = config
            .eye_model_path
            .as_deref()
            .ok_or_else(|| DmsError::Config("eye_model_path is not set".into()))?;

        info!("Loading face detection model from {}", face_path);
        let face_model = BoxModel::load(
            face_path,
            FACE_CONFIDENCE,
            FACE_MIN_SIZE,
            config.model_input_size,
        )?;

        info!("Loading eye detection model from {}", eye_path);
        let eye_model = BoxModel::load(
            eye_path,
            EYE_CONFIDENCE,
            EYE_MIN_SIZE,
            config.model_input_size,
        )?;

        Ok(Self {
            face_model,
            eye_model,
        })
    }
}

impl RegionDetector for OnnxRegionDetector {
    fn detect_faces(&self, frame: &VideoFrame) -> Result<Vec<Region>, DmsError> {
        let faces = self.face_model.detect(frame)?;
        debug!("Detected {} face(s)", faces.len());
        Ok(faces)
    }

    fn detect_eyes(&self, face: &VideoFrame) -> Result<Vec<Region>, DmsError> {
        self.eye_model.detect(face)
    }
}

/// Resize to `size` x `size` and lay out as NCHW, scaled to 0..1
fn to_input_tensor(frame: &VideoFrame, size: u32) -> Array4<f32> {
    let resized = imageops::resize(&frame.image, size, size, FilterType::Triangle);

    let mut input = Array4::<f32>::zeros((1, 3, size as usize, size as usize));
    for (x, y, pixel) in resized.enumerate_pixels() {
        for c in 0..3 {
            input[[0, c, y as usize, x as usize]] = pixel[c] as f32 / 255.0;
        }
    }
    input
}

/// Turn raw model rows into pixel regions of a `width` x `height` image,
/// dropping weak and undersized boxes and merging duplicates.
fn decode_boxes(
    values: &[f32],
    columns: usize,
    width: u32,
    height: u32,
    confidence_threshold: f32,
    min_size: u32,
) -> Vec<Region> {
    let mut scored: Vec<(f32, Region)> = values
        .chunks_exact(columns)
        .filter(|row| row[4] >= confidence_threshold)
        .filter_map(|row| {
            let x1 = (row[0].clamp(0.0, 1.0) * width as f32).round() as u32;
            let y1 = (row[1].clamp(0.0, 1.0) * height as f32).round() as u32;
            let x2 = (row[2].clamp(0.0, 1.0) * width as f32).round() as u32;
            let y2 = (row[3].clamp(0.0, 1.0) * height as f32).round() as u32;
            let region = Region::new(x1, y1, x2.saturating_sub(x1), y2.saturating_sub(y1));
            region.meets_min_size(min_size).then_some((row[4], region))
        })
        .collect();

    scored.sort_by(|a, b| b.0.total_cmp(&a.0));
    let regions: Vec<Region> = scored.into_iter().map(|(_, r)| r).collect();
    Region::deduplicate(&regions, DEDUP_IOU_THRESHOLD)
}
