//! Axis-aligned detection rectangles

use serde::{Deserialize, Serialize};

/// A rectangle within a frame or within another region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Region {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Top half of the region, where the eyes are.
    pub fn upper_half(&self) -> Region {
        Region {
            height: self.height / 2,
            ..*self
        }
    }

    /// Intersect with a `width` x `height` image. `None` if nothing remains.
    pub fn clamp_to(&self, width: u32, height: u32) -> Option<Region> {
        if self.x >= width || self.y >= height {
            return None;
        }
        let w = self.width.min(width - self.x);
        let h = self.height.min(height - self.y);
        if w == 0 || h == 0 {
            return None;
        }
        Some(Region::new(self.x, self.y, w, h))
    }

    /// Whether both edges reach the given minimum
    pub fn meets_min_size(&self, min: u32) -> bool {
        self.width >= min && self.height >= min
    }

    pub fn iou(&self, other: &Region) -> f64 {
        let ix1 = self.x.max(other.x) as u64;
        let iy1 = self.y.max(other.y) as u64;
        let ix2 = (self.x as u64 + self.width as u64).min(other.x as u64 + other.width as u64);
        let iy2 = (self.y as u64 + self.height as u64).min(other.y as u64 + other.height as u64);

        let inter = ix2.saturating_sub(ix1) * iy2.saturating_sub(iy1);
        if inter == 0 {
            return 0.0;
        }

        inter as f64 / (self.area() + other.area() - inter) as f64
    }

    /// Greedy deduplication: keeps a region only if its IoU with every
    /// previously-kept region is at or below the threshold.
    pub fn deduplicate(regions: &[Region], iou_threshold: f64) -> Vec<Region> {
        let mut kept: Vec<Region> = Vec::with_capacity(regions.len());
        for r in regions {
            if !kept.iter().any(|k| r.iou(k) > iou_threshold) {
                kept.push(*r);
            }
        }
        kept
    }
}
