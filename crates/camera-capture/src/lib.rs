//! Camera Capture Library for Drowsiness Monitoring
//!
//! Acquires sequential RGB frames from a local capture device.
//! Supports:
//! - Bounded probing of device indices (first index that yields a frame wins)
//! - V4L2 webcams through an `ffmpeg` subprocess
//! - Deterministic device release on every exit path (RAII)

pub mod ffmpeg;
pub mod frame;

pub use ffmpeg::{FfmpegBackend, FfmpegCamera};
pub use frame::VideoFrame;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

/// Number of device indices tried before giving up (indices `0..5`).
pub const DEVICE_PROBE_COUNT: u32 = 5;

/// Camera error types
#[derive(Error, Debug)]
pub enum CameraError {
    #[error("Failed to open camera {index}: {reason}")]
    Open { index: u32, reason: String },

    #[error("No camera index in 0..{probed} yielded a readable frame")]
    NoDeviceFound { probed: u32 },

    #[error("Frame read failed: {0}")]
    Read(String),

    #[error("Invalid format: {0}")]
    Format(String),

    #[error("Camera not initialized")]
    NotInitialized,
}

/// A device that yields frames until it is closed or the stream ends.
///
/// Dropping a source must release the underlying device.
pub trait FrameSource: Send {
    /// Read the next frame (blocking).
    fn read(&mut self) -> Result<VideoFrame, CameraError>;

    /// Release the device. Idempotent.
    fn close(&mut self);
}

/// Opens capture devices by index.
pub trait CameraBackend: Send + Sync {
    fn open_index(&self, index: u32) -> Result<Box<dyn FrameSource>, CameraError>;
}

/// Camera configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Path or name of the ffmpeg executable
    pub ffmpeg_program: String,
    /// ffmpeg input format (e.g. "video4linux2", "avfoundation")
    pub input_format: String,
    /// Device path template; `{index}` is replaced by the probed index
    pub device_template: String,
    /// Capture width
    pub width: u32,
    /// Capture height
    pub height: u32,
    /// Target FPS
    pub fps: u32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            ffmpeg_program: "ffmpeg".to_string(),
            input_format: "video4linux2".to_string(),
            device_template: "/dev/video{index}".to_string(),
            width: 640,
            height: 480,
            fps: 15,
        }
    }
}

impl CameraConfig {
    /// Device path for a probe index
    pub fn device_path(&self, index: u32) -> String {
        self.device_template.replace("{index}", &index.to_string())
    }
}

/// Probe device indices `0..probe_count` and return the first source that
/// opens and yields at least one frame.
///
/// Every rejected source is closed before the next index is tried.
pub fn open_first_device(
    backend: &dyn CameraBackend,
    probe_count: u32,
) -> Result<Box<dyn FrameSource>, CameraError> {
    for index in 0..probe_count {
        let mut source = match backend.open_index(index) {
            Ok(source) => source,
            Err(e) => {
                debug!("Camera index {} unavailable: {}", index, e);
                continue;
            }
        };

        match source.read() {
            Ok(_) => {
                info!("Camera opened at index {}", index);
                return Ok(source);
            }
            Err(e) => {
                debug!("Camera index {} opened but yielded no frame: {}", index, e);
                source.close();
            }
        }
    }

    Err(CameraError::NoDeviceFound {
        probed: probe_count,
    })
}
