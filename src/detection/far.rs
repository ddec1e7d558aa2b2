//! Detector for small, distant potholes near the bottom of the frame.

use crate::detection::preprocessing;
use crate::error::Result;
use crate::models::{BoundingBox, Detection};
use image::{DynamicImage, GrayImage};

/// Subsampled pixels below this are counted as dark.
pub const DARK_LEVEL: u8 = 50;
const SUBSAMPLE: usize = 2;

/// Share of dark pixels in the bottom third, sampled on a coarse grid.
pub fn bottom_dark_ratio(gray: &GrayImage) -> f32 {
    let (w, h) = gray.dimensions();
    let y0 = h * 2 / 3;
    let (mut dark, mut total) = (0usize, 0usize);
    for y in (y0..h).step_by(SUBSAMPLE) {
        for x in (0..w).step_by(SUBSAMPLE) {
            total += 1;
            if gray.get_pixel(x, y)[0] < DARK_LEVEL {
                dark += 1;
            }
        }
    }
    if total == 0 { 0.0 } else { dark as f32 / total as f32 }
}

/// Fixed box, one sixth of the width by one tenth of the height, centred in
/// the bottom third.
pub fn far_box(width: u32, height: u32) -> BoundingBox {
    let y0 = i64::from(height * 2 / 3);
    let bw = i64::from(width / 6);
    let bh = i64::from(height / 10);
    let x = i64::from(width / 2) - bw / 2;
    let y = y0 + (i64::from(height) - y0 - bh).div_euclid(2);
    BoundingBox::clamped(x, y, bw.max(1), bh.max(1), width, height)
}

pub fn detect_far(img: &DynamicImage) -> Result<Detection> {
    let gray = preprocessing::to_grayscale(img)?;
    let (w, h) = gray.dimensions();
    Ok(Detection::new(bottom_dark_ratio(&gray), far_box(w, h)))
}
