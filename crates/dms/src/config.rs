//! DMS configuration

use serde::{Deserialize, Serialize};

/// Consecutive face-but-no-open-eye frames before the driver is sleeping
pub const EYE_FAIL_CONSEC_FRAMES: u32 = 15;

/// Minimum face box edge (pixels)
pub const FACE_MIN_SIZE: u32 = 60;

/// Minimum eye box edge (pixels)
pub const EYE_MIN_SIZE: u32 = 30;

/// Intensity at or below which a pixel counts as pupil
pub const PUPIL_THRESHOLD: u8 = 40;

/// Smoothing kernel size applied before thresholding
pub const BLUR_KERNEL_SIZE: usize = 5;

/// IoU above which two detections are the same object
pub const DEDUP_IOU_THRESHOLD: f64 = 0.3;

/// Face detection confidence threshold
pub const FACE_CONFIDENCE: f32 = 0.7;

/// Eye detection confidence threshold
pub const EYE_CONFIDENCE: f32 = 0.6;

/// Width every frame is resized to before detection
pub const FRAME_WIDTH: u32 = 600;

/// Model locations. Detection sensitivity is fixed by the constants above.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DmsConfig {
    /// Square input edge expected by the detection models
    pub model_input_size: u32,

    /// Model paths
    pub face_model_path: Option<String>,
    pub eye_model_path: Option<String>,
}

impl Default for DmsConfig {
    fn default() -> Self {
        Self {
            model_input_size: 128,
            face_model_path: None,
            eye_model_path: None,
        }
    }
}
