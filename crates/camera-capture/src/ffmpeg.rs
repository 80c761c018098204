//! ffmpeg subprocess capture backend
//!
//! Each open device is an `ffmpeg` child process decoding the camera into
//! raw RGB24 on stdout. One frame is exactly `width * height * 3` bytes.

use std::io::Read;
use std::process::{Child, ChildStdout, Command, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::{debug, warn};

use crate::{CameraBackend, CameraConfig, CameraError, FrameSource, VideoFrame};

/// Opens cameras by spawning `ffmpeg`
#[derive(Debug, Clone, Default)]
pub struct FfmpegBackend {
    config: CameraConfig,
}

impl FfmpegBackend {
    pub fn new(config: CameraConfig) -> Self {
        Self { config }
    }

    fn command(&self, device: &str) -> Command {
        let mut cmd = Command::new(&self.config.ffmpeg_program);
        cmd.arg("-hide_banner")
            .arg("-loglevel")
            .arg("error")
            .arg("-f")
            .arg(&self.config.input_format)
            .arg("-framerate")
            .arg(self.config.fps.to_string())
            .arg("-video_size")
            .arg(format!("{}x{}", self.config.width, self.config.height))
            .arg("-i")
            .arg(device)
            .arg("-vf")
            .arg(format!("scale={}:{}", self.config.width, self.config.height))
            .arg("-pix_fmt")
            .arg("rgb24")
            .arg("-f")
            .arg("rawvideo")
            .arg("-")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null());
        cmd
    }
}

impl CameraBackend for FfmpegBackend {
    fn open_index(&self, index: u32) -> Result<Box<dyn FrameSource>, CameraError> {
        let device = self.config.device_path(index);
        debug!("Spawning ffmpeg for {}", device);

        let mut child = self.command(&device).spawn().map_err(|e| CameraError::Open {
            index,
            reason: e.to_string(),
        })?;

        let Some(stdout) = child.stdout.take() else {
            reap(&mut child);
            return Err(CameraError::Open {
                index,
                reason: "ffmpeg stdout not captured".to_string(),
            });
        };

        Ok(Box::new(FfmpegCamera {
            child: Some(child),
            stdout: Some(stdout),
            width: self.config.width,
            height: self.config.height,
            buffer: vec![0u8; frame_bytes(self.config.width, self.config.height)],
            sequence: 0,
        }))
    }
}

/// A running ffmpeg capture process
pub struct FfmpegCamera {
    child: Option<Child>,
    stdout: Option<ChildStdout>,
    width: u32,
    height: u32,
    buffer: Vec<u8>,
    sequence: u32,
}

impl FrameSource for FfmpegCamera {
    fn read(&mut self) -> Result<VideoFrame, CameraError> {
        let stdout = self.stdout.as_mut().ok_or(CameraError::NotInitialized)?;
        stdout
            .read_exact(&mut self.buffer)
            .map_err(|e| CameraError::Read(e.to_string()))?;

        let timestamp_ns = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0);
        let sequence = self.sequence;
        self.sequence = self.sequence.wrapping_add(1);

        VideoFrame::from_raw(self.buffer.clone(), self.width, self.height, timestamp_ns, sequence)
            .ok_or_else(|| CameraError::Format("frame buffer size mismatch".to_string()))
    }

    fn close(&mut self) {
        self.stdout = None;
        if let Some(mut child) = self.child.take() {
            reap(&mut child);
        }
    }
}

impl Drop for FfmpegCamera {
    fn drop(&mut self) {
        self.close();
    }
}

fn reap(child: &mut Child) {
    if let Err(e) = child.kill() {
        debug!("ffmpeg already exited: {}", e);
    }
    if let Err(e) = child.wait() {
        warn!("Failed to reap ffmpeg process: {}", e);
    }
}

fn frame_bytes(width: u32, height: u32) -> usize {
    width as usize * height as usize * 3
}
