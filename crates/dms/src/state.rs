//! Driver state tracking

use serde::{Deserialize, Serialize};

use crate::analysis::DetectionSignal;
use crate::config::EYE_FAIL_CONSEC_FRAMES;

/// Published driver status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DriverStatus {
    /// No session running
    #[default]
    Stopped,
    NoFace,
    Awake,
    /// Eyes not found open, but not for long enough to alarm
    Drowsy,
    Sleeping,
    /// No camera could be opened; needs an explicit restart
    CameraError,
}

impl DriverStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DriverStatus::Stopped => "STOPPED",
            DriverStatus::NoFace => "NO_FACE",
            DriverStatus::Awake => "AWAKE",
            DriverStatus::Drowsy => "DROWSY",
            DriverStatus::Sleeping => "SLEEPING",
            DriverStatus::CameraError => "CAMERA_ERROR",
        }
    }
}

/// Snapshot served to status queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DrowsinessState {
    pub face_detected: bool,
    pub pupil_detected: bool,
    pub status: DriverStatus,
}

/// Outcome of one observed frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Observation {
    pub status: DriverStatus,
    /// Sound the alarm for this frame
    pub fire_alert: bool,
}

/// Consecutive-failure counter turning per-frame signals into a status.
///
/// A frame "fails" when a face is visible but no open eye was found.
/// Any other frame resets the counter.
#[derive(Debug, Clone)]
pub struct DrowsinessTracker {
    counter: u32,
    threshold: u32,
}

impl Default for DrowsinessTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl DrowsinessTracker {
    pub fn new() -> Self {
        Self::with_threshold(EYE_FAIL_CONSEC_FRAMES)
    }

    pub fn with_threshold(threshold: u32) -> Self {
        Self {
            counter: 0,
            threshold,
        }
    }

    pub fn counter(&self) -> u32 {
        self.counter
    }

    pub fn observe(&mut self, signal: DetectionSignal) -> Observation {
        if signal.face_visible && !signal.eye_open {
            self.counter = self.counter.saturating_add(1);
            if self.counter >= self.threshold {
                Observation {
                    status: DriverStatus::Sleeping,
                    fire_alert: true,
                }
            } else {
                Observation {
                    status: DriverStatus::Drowsy,
                    fire_alert: false,
                }
            }
        } else {
            self.counter = 0;
            Observation {
                status: if signal.face_visible {
                    DriverStatus::Awake
                } else {
                    DriverStatus::NoFace
                },
                fire_alert: false,
            }
        }
    }
}
