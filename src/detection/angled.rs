//! Detector for road photographed at a shallow angle.
//!
//! A fixed projective map pulls the lower-middle trapezoid of the frame (the
//! road just ahead) into the image centre; the share of very dark pixels in a
//! central window of the flattened image is the confidence.

use crate::detection::preprocessing;
use crate::error::Result;
use crate::models::{BoundingBox, Detection};
use image::{DynamicImage, GrayImage, Luma};
use imageproc::geometric_transformations::{Interpolation, Projection, warp};

pub const WINDOW_HALF_WIDTH: u32 = 40;
pub const WINDOW_HALF_HEIGHT: u32 = 30;
/// Flattened pixels below this are counted as dark.
pub const DARK_LEVEL: u8 = 60;

/// Road trapezoid in the source frame, as fractions of (w, h).
const SOURCE_QUAD: [(f32, f32); 4] = [(0.2, 0.6), (0.8, 0.6), (0.95, 0.95), (0.05, 0.95)];
/// Where the trapezoid corners land.
const TARGET_QUAD: [(f32, f32); 4] = [(0.25, 0.25), (0.75, 0.25), (0.75, 0.75), (0.25, 0.75)];

fn scaled(quad: [(f32, f32); 4], w: f32, h: f32) -> [(f32, f32); 4] {
    quad.map(|(fx, fy)| (fx * w, fy * h))
}

/// Warp `gray` so the source quad lands on the target quad.
///
/// Output pixels whose pre-image falls outside the frame are 0. Returns
/// `None` when the frame is too small for a non-degenerate projection.
pub fn flatten(gray: &GrayImage) -> Option<GrayImage> {
    let (w, h) = (gray.width() as f32, gray.height() as f32);
    let projection = Projection::from_control_points(scaled(SOURCE_QUAD, w, h), scaled(TARGET_QUAD, w, h))?;
    Some(warp(gray, &projection, Interpolation::Bilinear, Luma([0])))
}

/// The fixed 80x60 window around the image centre, clamped.
pub fn central_window(width: u32, height: u32) -> BoundingBox {
    let cx = i64::from(width / 2);
    let cy = i64::from(height / 2);
    BoundingBox::clamped(
        cx - i64::from(WINDOW_HALF_WIDTH),
        cy - i64::from(WINDOW_HALF_HEIGHT),
        i64::from(2 * WINDOW_HALF_WIDTH),
        i64::from(2 * WINDOW_HALF_HEIGHT),
        width,
        height,
    )
}

pub fn detect_angled(img: &DynamicImage) -> Result<Detection> {
    let gray = preprocessing::to_grayscale(img)?;
    let Some(flat) = flatten(&gray) else {
        return Ok(Detection::none());
    };
    let window = central_window(flat.width(), flat.height());
    let region = preprocessing::crop(&flat, &window);
    let confidence = preprocessing::fraction_below(&region, f64::from(DARK_LEVEL)) as f32;
    Ok(Detection::new(confidence, window))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_is_clamped_on_small_frames() {
        assert_eq!(central_window(640, 480), BoundingBox::new(280, 210, 80, 60));
        assert_eq!(central_window(50, 40), BoundingBox::new(0, 0, 50, 40));
    }

    #[test]
    fn road_patch_ahead_lands_in_window() {
        // the window's pre-image is roughly x 137..263, y 203..244
        let (w, h) = (400u32, 300u32);
        let gray = GrayImage::from_fn(w, h, |x, y| {
            let ahead = (x as i32 - 200).abs() < 70 && (195..255).contains(&y);
            Luma([if ahead { 10 } else { 180 }])
        });
        let detection = detect_angled(&DynamicImage::ImageLuma8(gray)).unwrap();
        assert_eq!(detection.bbox, BoundingBox::new(160, 120, 80, 60));
        assert!(detection.confidence > 0.9, "confidence {}", detection.confidence);
    }

    #[test]
    fn bright_road_scores_zero() {
        let gray = GrayImage::from_pixel(400, 300, Luma([180]));
        let detection = detect_angled(&DynamicImage::ImageLuma8(gray)).unwrap();
        assert_eq!(detection.confidence, 0.0);
    }
}
