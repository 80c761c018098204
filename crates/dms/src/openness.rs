//! Pupil-blob heuristic for eye openness
//!
//! Brightness based, not true pupil tracking: poor lighting, glasses glare
//! and occlusion all fool it. The drowsiness counter smooths that out.

use camera_capture::VideoFrame;
use image::{GrayImage, ImageBuffer, Luma};
use imageproc::contours::{find_contours, BorderType};
use imageproc::contrast::{threshold, ThresholdType};
use imageproc::filter::separable_filter_equal;

use crate::config::{BLUR_KERNEL_SIZE, PUPIL_THRESHOLD};

/// Binomial approximation of a Gaussian, as OpenCV derives for ksize 5, sigma 0
const BLUR_KERNEL: [f32; BLUR_KERNEL_SIZE] = [
    1.0 / 16.0,
    4.0 / 16.0,
    6.0 / 16.0,
    4.0 / 16.0,
    1.0 / 16.0,
];

/// Whether the eye region contains a dark enclosed blob (a pupil).
pub fn is_eye_open(eye: &VideoFrame) -> bool {
    if eye.width() == 0 || eye.height() == 0 {
        return false;
    }
    has_external_contour(&pupil_mask(&eye.to_grayscale()))
}

/// Blurred, inverse-thresholded mask: pupil-dark pixels are 255.
pub fn pupil_mask(gray: &GrayImage) -> GrayImage {
    threshold(&blur(gray), PUPIL_THRESHOLD, ThresholdType::BinaryInverted)
}

/// Gaussian blur in f32 with reflect-101 borders, rounded back to u8.
fn blur(gray: &GrayImage) -> GrayImage {
    let radius = (BLUR_KERNEL_SIZE / 2) as i64;
    let (width, height) = gray.dimensions();

    let padded: ImageBuffer<Luma<f32>, Vec<f32>> = ImageBuffer::from_fn(
        width + 2 * radius as u32,
        height + 2 * radius as u32,
        |x, y| {
            let sx = reflect_101(x as i64 - radius, width);
            let sy = reflect_101(y as i64 - radius, height);
            Luma([gray.get_pixel(sx, sy)[0] as f32])
        },
    );
    let blurred = separable_filter_equal(&padded, &BLUR_KERNEL[..]);

    GrayImage::from_fn(width, height, |x, y| {
        let v = blurred.get_pixel(x + radius as u32, y + radius as u32)[0];
        Luma([v.round().clamp(0.0, 255.0) as u8])
    })
}

/// Mirror an out-of-range index without repeating the edge pixel (`dcb|abcd|cba`)
fn reflect_101(index: i64, len: u32) -> u32 {
    let last = len as i64 - 1;
    if last <= 0 {
        return 0;
    }
    let mut i = index;
    while i < 0 || i > last {
        i = if i < 0 { -i } else { 2 * last - i };
    }
    i as u32
}

fn has_external_contour(mask: &GrayImage) -> bool {
    find_contours::<i32>(mask)
        .iter()
        .any(|c| matches!(c.border_type, BorderType::Outer) && c.parent.is_none())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn eye_with_pupil(size: u32, pupil_radius: i64, background: u8) -> VideoFrame {
        let center = size as i64 / 2;
        let image = RgbImage::from_fn(size, size, |x, y| {
            let dx = x as i64 - center;
            let dy = y as i64 - center;
            if dx * dx + dy * dy <= pupil_radius * pupil_radius {
                Rgb([5, 5, 5])
            } else {
                Rgb([background; 3])
            }
        });
        VideoFrame::new(image, 0, 0)
    }

    #[test]
    fn test_dark_pupil_is_open() {
        assert!(is_eye_open(&eye_with_pupil(40, 6, 200)));
    }

    #[test]
    fn test_uniform_bright_eye_is_closed() {
        let eye = VideoFrame::new(RgbImage::from_pixel(40, 40, Rgb([180, 170, 160])), 0, 0);
        assert!(!is_eye_open(&eye));
    }

    #[test]
    fn test_single_dark_pixel_is_blurred_away() {
        let mut image = RgbImage::from_pixel(30, 30, Rgb([200, 200, 200]));
        image.put_pixel(15, 15, Rgb([0, 0, 0]));
        assert!(!is_eye_open(&VideoFrame::new(image, 0, 0)));
    }

    #[test]
    fn test_dark_everywhere_is_open() {
        let eye = VideoFrame::new(RgbImage::from_pixel(32, 32, Rgb([10, 10, 10])), 0, 0);
        assert!(is_eye_open(&eye));
    }

    #[test]
    fn test_blur_rounds_instead_of_truncating() {
        // Centre blurs to about 40.58: above the threshold once rounded
        let mut gray = GrayImage::from_pixel(20, 20, Luma([41]));
        gray.put_pixel(10, 10, Luma([38]));

        let blurred = blur(&gray);
        assert_eq!(blurred.get_pixel(10, 10)[0], 41);
        assert!(!has_external_contour(&pupil_mask(&gray)));
    }

    #[test]
    fn test_blur_reflects_at_borders() {
        // Columns 1 and 2 are mirrored into the padding; edge replication
        // would repeat the dark column and give 50
        let gray = GrayImage::from_fn(8, 8, |x, _| Luma([if x == 0 { 0 } else { 160 }]));
        let blurred = blur(&gray);
        // 1*160 + 4*160 + 6*0 + 4*160 + 1*160 over 16
        assert_eq!(blurred.get_pixel(0, 4)[0], 100);
    }

    #[test]
    fn test_reflect_101_indices() {
        assert_eq!(reflect_101(-1, 5), 1);
        assert_eq!(reflect_101(-2, 5), 2);
        assert_eq!(reflect_101(5, 5), 3);
        assert_eq!(reflect_101(6, 5), 2);
        assert_eq!(reflect_101(-2, 2), 0);
        assert_eq!(reflect_101(3, 1), 0);
    }

    #[test]
    fn test_mask_marks_pupil_pixels() {
        let eye = eye_with_pupil(40, 6, 200);
        let mask = pupil_mask(&eye.to_grayscale());
        assert_eq!(mask.get_pixel(20, 20)[0], 255);
        assert_eq!(mask.get_pixel(2, 2)[0], 0);
    }
}
