//! Per-frame face and eye analysis

use camera_capture::VideoFrame;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::detector::RegionDetector;
use crate::openness::is_eye_open;
use crate::DmsError;

/// What one frame says about the driver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DetectionSignal {
    /// At least one face was detected
    pub face_visible: bool,
    /// Some eye in some face showed a pupil
    pub eye_open: bool,
}

impl DetectionSignal {
    pub fn new(face_visible: bool, eye_open: bool) -> Self {
        Self {
            face_visible,
            eye_open,
        }
    }
}

/// Detect faces, search the upper half of each for eyes, and test each eye
/// for a pupil. Stops at the first open eye.
pub fn evaluate_frame(
    detector: &dyn RegionDetector,
    frame: &VideoFrame,
) -> Result<DetectionSignal, DmsError> {
    let faces = detector.detect_faces(frame)?;
    let face_visible = !faces.is_empty();

    for face in &faces {
        let Some(upper) = face.upper_half().clamp_to(frame.width(), frame.height()) else {
            continue;
        };
        let Some(face_roi) = frame.crop(upper.x, upper.y, upper.width, upper.height) else {
            continue;
        };

        for eye in detector.detect_eyes(&face_roi)? {
            let Some(eye) = eye.clamp_to(face_roi.width(), face_roi.height()) else {
                continue;
            };
            let Some(eye_roi) = face_roi.crop(eye.x, eye.y, eye.width, eye.height) else {
                continue;
            };

            if is_eye_open(&eye_roi) {
                trace!("Open eye at {:?} in face {:?}", eye, face);
                return Ok(DetectionSignal::new(face_visible, true));
            }
        }
    }

    Ok(DetectionSignal::new(face_visible, false))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::region::Region;
    use image::{Rgb, RgbImage};
    use std::sync::Mutex;

    /// Returns fixed faces; eyes depend on which face crop is passed in.
    struct ScriptedDetector {
        faces: Vec<Region>,
        eyes: Vec<Region>,
        eye_calls: Mutex<Vec<(u32, u32)>>,
    }

    impl RegionDetector for ScriptedDetector {
        fn detect_faces(&self, _frame: &VideoFrame) -> Result<Vec<Region>, DmsError> {
            Ok(self.faces.clone())
        }

        fn detect_eyes(&self, face: &VideoFrame) -> Result<Vec<Region>, DmsError> {
            self.eye_calls.lock().unwrap().push((face.width(), face.height()));
            Ok(self.eyes.clone())
        }
    }

    fn detector(faces: Vec<Region>, eyes: Vec<Region>) -> ScriptedDetector {
        ScriptedDetector {
            faces,
            eyes,
            eye_calls: Mutex::new(Vec::new()),
        }
    }

    /// Bright frame with a dark square at (px, py)
    fn frame_with_dark_patch(px: u32, py: u32, size: u32) -> VideoFrame {
        let image = RgbImage::from_fn(400, 300, |x, y| {
            if x >= px && x < px + size && y >= py && y < py + size {
                Rgb([0, 0, 0])
            } else {
                Rgb([220, 220, 220])
            }
        });
        VideoFrame::new(image, 0, 0)
    }

    #[test]
    fn test_no_face() {
        let d = detector(vec![], vec![Region::new(0, 0, 40, 40)]);
        let signal = evaluate_frame(&d, &frame_with_dark_patch(0, 0, 10)).unwrap();

        assert_eq!(signal, DetectionSignal::new(false, false));
        assert!(d.eye_calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_eye_search_uses_upper_half_of_face() {
        let d = detector(vec![Region::new(100, 50, 120, 161)], vec![]);
        let signal = evaluate_frame(&d, &frame_with_dark_patch(0, 0, 10)).unwrap();

        assert_eq!(signal, DetectionSignal::new(true, false));
        assert_eq!(*d.eye_calls.lock().unwrap(), vec![(120, 80)]);
    }

    #[test]
    fn test_open_eye_inside_face() {
        // Face at (100, 50); eye at (20, 10) in the face crop covers the patch at (130, 70)
        let d = detector(vec![Region::new(100, 50, 120, 160)], vec![Region::new(20, 10, 40, 40)]);
        let signal = evaluate_frame(&d, &frame_with_dark_patch(130, 70, 12)).unwrap();

        assert_eq!(signal, DetectionSignal::new(true, true));
    }

    #[test]
    fn test_any_face_with_open_eye_wins() {
        // First face has no pupil in its eye region; second does
        let d = detector(
            vec![Region::new(0, 0, 100, 100), Region::new(200, 100, 100, 100)],
            vec![Region::new(10, 10, 30, 30)],
        );
        let signal = evaluate_frame(&d, &frame_with_dark_patch(215, 115, 10)).unwrap();

        assert_eq!(signal, DetectionSignal::new(true, true));
        assert_eq!(d.eye_calls.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_short_circuits_after_first_open_eye() {
        let d = detector(
            vec![Region::new(200, 100, 100, 100), Region::new(0, 0, 100, 100)],
            vec![Region::new(10, 10, 30, 30)],
        );
        let signal = evaluate_frame(&d, &frame_with_dark_patch(215, 115, 10)).unwrap();

        assert!(signal.eye_open);
        assert_eq!(d.eye_calls.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_regions_past_frame_edge_are_clamped() {
        let d = detector(vec![Region::new(380, 280, 100, 100)], vec![Region::new(0, 0, 50, 50)]);
        let signal = evaluate_frame(&d, &frame_with_dark_patch(385, 282, 8)).unwrap();

        assert_eq!(signal, DetectionSignal::new(true, true));
    }
}
