//! Video frame types and processing

use image::imageops::{self, FilterType};
use image::{GrayImage, RgbImage};

/// Decoded RGB video frame
#[derive(Debug, Clone)]
pub struct VideoFrame {
    /// RGB pixels
    pub image: RgbImage,
    /// Capture timestamp (nanoseconds)
    pub timestamp_ns: u64,
    /// Frame sequence number
    pub sequence: u32,
}

impl VideoFrame {
    /// Create a new video frame from an RGB image
    pub fn new(image: RgbImage, timestamp_ns: u64, sequence: u32) -> Self {
        Self {
            image,
            timestamp_ns,
            sequence,
        }
    }

    /// Create a frame from raw RGB24 data (`width * height * 3` bytes)
    pub fn from_raw(
        data: Vec<u8>,
        width: u32,
        height: u32,
        timestamp_ns: u64,
        sequence: u32,
    ) -> Option<Self> {
        RgbImage::from_raw(width, height, data)
            .map(|image| Self::new(image, timestamp_ns, sequence))
    }

    /// Frame width
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    /// Frame height
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Get pixel at (x, y)
    pub fn get_pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        self.image.get_pixel_checked(x, y).map(|p| p.0)
    }

    /// Convert to single-channel luma
    pub fn to_grayscale(&self) -> GrayImage {
        imageops::grayscale(&self.image)
    }

    /// Crop a region of the frame
    pub fn crop(&self, x: u32, y: u32, w: u32, h: u32) -> Option<VideoFrame> {
        if w == 0 || h == 0 {
            return None;
        }
        if x.checked_add(w)? > self.width() || y.checked_add(h)? > self.height() {
            return None;
        }

        Some(VideoFrame {
            image: imageops::crop_imm(&self.image, x, y, w, h).to_image(),
            timestamp_ns: self.timestamp_ns,
            sequence: self.sequence,
        })
    }

    /// Resize to `new_width`, keeping the aspect ratio
    pub fn resize_to_width(&self, new_width: u32) -> VideoFrame {
        if new_width == 0 || new_width == self.width() || self.width() == 0 {
            return self.clone();
        }

        let scaled = (self.height() as u64 * new_width as u64) / self.width() as u64;
        let new_height = scaled.max(1) as u32;

        VideoFrame {
            image: imageops::resize(&self.image, new_width, new_height, FilterType::Triangle),
            timestamp_ns: self.timestamp_ns,
            sequence: self.sequence,
        }
    }
}
