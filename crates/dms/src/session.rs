//! Detection session lifecycle
//!
//! One background worker samples the camera while `running` is set. The
//! worker is the only writer of the published state; queries read a
//! consistent snapshot out of a single-slot watch channel.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use alerting::Alarm;
use camera_capture::{open_first_device, CameraBackend, FrameSource, DEVICE_PROBE_COUNT};
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::analysis::evaluate_frame;
use crate::detector::RegionDetector;
use crate::state::{DriverStatus, DrowsinessState, DrowsinessTracker};

/// State shared between the control surface and the worker
struct Shared {
    running: AtomicBool,
    status: watch::Sender<DrowsinessState>,
}

impl Shared {
    fn publish(&self, update: impl FnOnce(&mut DrowsinessState)) {
        self.status.send_modify(update);
    }
}

/// Capabilities a worker needs for one session
#[derive(Clone)]
struct Capabilities {
    camera: Arc<dyn CameraBackend>,
    detector: Arc<dyn RegionDetector>,
    alarm: Arc<dyn Alarm>,
    frame_width: u32,
}

/// Owns the run flag, the published state and the sampling worker.
pub struct DetectionSession {
    shared: Arc<Shared>,
    capabilities: Capabilities,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl DetectionSession {
    pub fn new(
        camera: Arc<dyn CameraBackend>,
        detector: Arc<dyn RegionDetector>,
        alarm: Arc<dyn Alarm>,
        frame_width: u32,
    ) -> Self {
        let (status, _) = watch::channel(DrowsinessState::default());
        Self {
            shared: Arc::new(Shared {
                running: AtomicBool::new(false),
                status,
            }),
            capabilities: Capabilities {
                camera,
                detector,
                alarm,
                frame_width,
            },
            worker: Mutex::new(None),
        }
    }

    /// Start sampling. Returns `false` if a session is already running.
    ///
    /// A worker still finishing its last frame after `stop` is awaited
    /// first, so there is never more than one.
    pub async fn start(&self) -> bool {
        let mut worker = self.worker.lock().await;

        if let Some(handle) = worker.as_ref() {
            if !handle.is_finished() && self.shared.running.load(Ordering::Acquire) {
                debug!("Detection already running");
                return false;
            }
        }

        if let Some(handle) = worker.take() {
            if let Err(e) = handle.await {
                error!("Previous detection worker failed: {}", e);
            }
        }

        self.shared.running.store(true, Ordering::Release);
        let shared = self.shared.clone();
        let capabilities = self.capabilities.clone();
        *worker = Some(tokio::task::spawn_blocking(move || {
            run_worker(&shared, &capabilities)
        }));

        info!("Detection started");
        true
    }

    /// Ask the worker to exit after its current frame.
    pub fn stop(&self) {
        if self.shared.running.swap(false, Ordering::AcqRel) {
            info!("Detection stop requested");
        }
    }

    /// Stop and wait for the worker to release the camera.
    pub async fn shutdown(&self) {
        self.stop();
        if let Some(handle) = self.worker.lock().await.take() {
            if let Err(e) = handle.await {
                error!("Detection worker failed: {}", e);
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::Acquire)
    }

    /// Current published state
    pub fn status(&self) -> DrowsinessState {
        *self.shared.status.borrow()
    }

    /// Receiver notified on every published change
    pub fn subscribe(&self) -> watch::Receiver<DrowsinessState> {
        self.shared.status.subscribe()
    }
}

/// Clears `running` and publishes the final status however the worker
/// exits, unwinding included.
struct WorkerExit<'a> {
    shared: &'a Shared,
    status: DriverStatus,
}

impl Drop for WorkerExit<'_> {
    fn drop(&mut self) {
        self.shared.running.store(false, Ordering::Release);
        let status = self.status;
        self.shared.publish(|s| s.status = status);
    }
}

fn run_worker(shared: &Shared, capabilities: &Capabilities) {
    let mut exit = WorkerExit {
        shared,
        status: DriverStatus::Stopped,
    };

    let mut source = match open_first_device(capabilities.camera.as_ref(), DEVICE_PROBE_COUNT) {
        Ok(source) => source,
        Err(e) => {
            error!("Camera not accessible: {}", e);
            exit.status = DriverStatus::CameraError;
            return;
        }
    };

    info!("Camera started");
    sample_loop(shared, capabilities, source.as_mut());
    source.close();
    info!("Camera stopped");
}

fn sample_loop(shared: &Shared, capabilities: &Capabilities, source: &mut dyn FrameSource) {
    let mut tracker = DrowsinessTracker::new();

    while shared.running.load(Ordering::Acquire) {
        let frame = match source.read() {
            Ok(frame) => frame,
            Err(e) => {
                info!("Camera stream ended: {}", e);
                break;
            }
        };

        let frame = frame.resize_to_width(capabilities.frame_width);
        let signal = match evaluate_frame(capabilities.detector.as_ref(), &frame) {
            Ok(signal) => signal,
            Err(e) => {
                warn!("Skipping frame {}: {}", frame.sequence, e);
                continue;
            }
        };

        let observation = tracker.observe(signal);
        metrics::counter!("drowsiness_frames_total").increment(1);
        metrics::gauge!("drowsiness_eye_fail_streak").set(tracker.counter() as f64);

        if observation.fire_alert {
            metrics::counter!("drowsiness_alerts_total").increment(1);
            if let Err(e) = capabilities.alarm.sound() {
                metrics::counter!("drowsiness_alert_failures_total").increment(1);
                warn!("Alarm failed: {}", e);
            }
        }

        shared.publish(|s| {
            s.status = observation.status;
            s.face_detected = signal.face_visible;
            s.pupil_detected = signal.eye_open;
        });
    }
}
