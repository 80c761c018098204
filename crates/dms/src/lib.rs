//! Driver Monitoring System (DMS)
//!
//! Camera-based drowsiness detection:
//! - Face detection over the full frame
//! - Eye detection within the upper half of each face
//! - Pupil-blob heuristic for eye openness
//! - Consecutive-frame counter turning noisy frames into a stable status
//! - Background sampling session with start/stop control

pub mod analysis;
pub mod config;
pub mod detector;
pub mod openness;
pub mod region;
pub mod session;
pub mod state;

pub use analysis::{evaluate_frame, DetectionSignal};
pub use config::DmsConfig;
pub use detector::{OnnxRegionDetector, RegionDetector};
pub use openness::is_eye_open;
pub use region::Region;
pub use session::DetectionSession;
pub use state::{DriverStatus, DrowsinessState, DrowsinessTracker, Observation};

use thiserror::Error;

/// DMS error types
#[derive(Error, Debug)]
pub enum DmsError {
    #[error("Model loading failed: {0}")]
    ModelLoad(String),

    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("Configuration error: {0}")]
    Config(String),
}
