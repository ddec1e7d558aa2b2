use crate::error::{DetectError, Result};
use crate::models::BoundingBox;
use image::{DynamicImage, GrayImage, Luma};
use imageproc::filter::separable_filter_equal;

/// Convert an image to single-channel intensity.
///
/// Colour images use the BT.601 luma weights (0.299, 0.587, 0.114) the
/// detector thresholds are calibrated against. Single-channel 8-bit input is
/// copied unchanged. Anything carrying an alpha channel is rejected.
pub fn to_grayscale(img: &DynamicImage) -> Result<GrayImage> {
    let channels = img.color().channel_count();
    match channels {
        1 => Ok(img.to_luma8()),
        3 => {
            let rgb = img.to_rgb8();
            Ok(GrayImage::from_fn(rgb.width(), rgb.height(), |x, y| {
                let [r, g, b] = rgb.get_pixel(x, y).0;
                let luma = 299 * u32::from(r) + 587 * u32::from(g) + 114 * u32::from(b);
                Luma([((luma + 500) / 1000) as u8])
            }))
        }
        _ => Err(DetectError::InvalidImageShape { channels }),
    }
}

/// Gaussian σ matching a square kernel of side `kernel_size`.
pub fn sigma_for_kernel(kernel_size: u32) -> f32 {
    (0.3 * ((kernel_size as f32 - 1.0) * 0.5 - 1.0) + 0.8).max(0.1)
}

/// Normalised 1-D Gaussian of exactly `kernel_size` taps.
pub fn gaussian_kernel(kernel_size: u32) -> Vec<f32> {
    let sigma = sigma_for_kernel(kernel_size);
    let r = (kernel_size / 2) as f32;
    let taps: Vec<f32> = (0..kernel_size)
        .map(|i| {
            let d = i as f32 - r;
            (-(d * d) / (2.0 * sigma * sigma)).exp()
        })
        .collect();
    let sum: f32 = taps.iter().sum();
    taps.into_iter().map(|t| t / sum).collect()
}

/// Apply a `kernel_size` x `kernel_size` Gaussian blur, edges clamped.
pub fn apply_blur(img: &GrayImage, kernel_size: u32) -> GrayImage {
    if kernel_size <= 1 {
        return img.clone();
    }
    separable_filter_equal(img, &gaussian_kernel(kernel_size))
}

/// Contrast-limited adaptive histogram equalisation.
///
/// The image is split into `tiles` x `tiles` tiles; each tile's histogram is
/// clipped at `clip_limit` times its mean bin height, the excess spread
/// evenly, and the resulting mappings blended bilinearly between tile centres.
pub fn clahe(img: &GrayImage, tiles: u32, clip_limit: f32) -> GrayImage {
    let (w, h) = img.dimensions();
    let tiles_x = tiles.min(w).max(1);
    let tiles_y = tiles.min(h).max(1);
    if w == 0 || h == 0 {
        return img.clone();
    }
    let tile_w = w / tiles_x;
    let tile_h = h / tiles_y;

    let mut maps = vec![[0u8; 256]; (tiles_x * tiles_y) as usize];
    for ty in 0..tiles_y {
        for tx in 0..tiles_x {
            let x0 = tx * tile_w;
            let y0 = ty * tile_h;
            let x1 = if tx == tiles_x - 1 { w } else { x0 + tile_w };
            let y1 = if ty == tiles_y - 1 { h } else { y0 + tile_h };
            let tile_pixels = (x1 - x0) * (y1 - y0);

            let mut hist = [0u32; 256];
            for y in y0..y1 {
                for x in x0..x1 {
                    hist[img.get_pixel(x, y)[0] as usize] += 1;
                }
            }

            let clip = ((clip_limit * tile_pixels as f32 / 256.0) as u32).max(1);
            let mut excess = 0u32;
            for bin in hist.iter_mut() {
                if *bin > clip {
                    excess += *bin - clip;
                    *bin = clip;
                }
            }
            let per_bin = excess / 256;
            let remainder = (excess % 256) as usize;
            for (i, bin) in hist.iter_mut().enumerate() {
                *bin += per_bin + u32::from(i < remainder);
            }

            let map = &mut maps[(ty * tiles_x + tx) as usize];
            let scale = 255.0 / tile_pixels as f32;
            let mut cdf = 0u32;
            for (i, count) in hist.iter().enumerate() {
                cdf += count;
                map[i] = (cdf as f32 * scale).round().min(255.0) as u8;
            }
        }
    }

    let tw = tile_w as f32;
    let th = tile_h as f32;
    let last_x = tiles_x as i64 - 1;
    let last_y = tiles_y as i64 - 1;
    GrayImage::from_fn(w, h, |x, y| {
        let value = img.get_pixel(x, y)[0] as usize;
        let fx = (x as f32 + 0.5) / tw - 0.5;
        let fy = (y as f32 + 0.5) / th - 0.5;
        let tx0 = (fx.floor() as i64).clamp(0, last_x) as u32;
        let tx1 = (fx.floor() as i64 + 1).clamp(0, last_x) as u32;
        let ty0 = (fy.floor() as i64).clamp(0, last_y) as u32;
        let ty1 = (fy.floor() as i64 + 1).clamp(0, last_y) as u32;
        let ax = fx - fx.floor();
        let ay = fy - fy.floor();

        let at = |tx: u32, ty: u32| maps[(ty * tiles_x + tx) as usize][value] as f32;
        let top = at(tx0, ty0) * (1.0 - ax) + at(tx1, ty0) * ax;
        let bottom = at(tx0, ty1) * (1.0 - ax) + at(tx1, ty1) * ax;
        Luma([(top * (1.0 - ay) + bottom * ay).round().clamp(0.0, 255.0) as u8])
    })
}

/// Copy out the pixels under `bbox`.
pub fn crop(img: &GrayImage, bbox: &BoundingBox) -> GrayImage {
    image::imageops::crop_imm(img, bbox.x, bbox.y, bbox.width, bbox.height).to_image()
}

/// Mean and population standard deviation of all pixels.
pub fn mean_std(img: &GrayImage) -> (f64, f64) {
    let n = img.as_raw().len();
    if n == 0 {
        return (0.0, 0.0);
    }
    let (sum, sum_sq) = img.as_raw().iter().fold((0.0f64, 0.0f64), |(s, sq), &v| {
        let v = f64::from(v);
        (s + v, sq + v * v)
    });
    let mean = sum / n as f64;
    let variance = (sum_sq / n as f64 - mean * mean).max(0.0);
    (mean, variance.sqrt())
}

/// Fraction of pixels strictly below `threshold`.
pub fn fraction_below(img: &GrayImage, threshold: f64) -> f64 {
    let n = img.as_raw().len();
    if n == 0 {
        return 0.0;
    }
    let below = img.as_raw().iter().filter(|&&v| f64::from(v) < threshold).count();
    below as f64 / n as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage, Rgba, RgbaImage};

    #[test]
    fn grayscale_uses_bt601_weights() {
        let rgb = RgbImage::from_pixel(2, 2, Rgb([255, 0, 0]));
        let gray = to_grayscale(&DynamicImage::ImageRgb8(rgb)).unwrap();
        assert_eq!(gray.get_pixel(0, 0)[0], 76);
    }

    #[test]
    fn grayscale_passes_single_channel_through() {
        let src = GrayImage::from_fn(4, 3, |x, y| Luma([(x * 10 + y) as u8]));
        let gray = to_grayscale(&DynamicImage::ImageLuma8(src.clone())).unwrap();
        assert_eq!(gray, src);
    }

    #[test]
    fn grayscale_rejects_alpha() {
        let rgba = RgbaImage::from_pixel(2, 2, Rgba([1, 2, 3, 4]));
        match to_grayscale(&DynamicImage::ImageRgba8(rgba)) {
            Err(DetectError::InvalidImageShape { channels }) => assert_eq!(channels, 4),
            other => panic!("expected InvalidImageShape, got {:?}", other),
        }
    }

    #[test]
    fn sigma_matches_kernel_convention() {
        assert!((sigma_for_kernel(5) - 1.1).abs() < 1e-6);
        assert!((sigma_for_kernel(3) - 0.8).abs() < 1e-6);
    }

    #[test]
    fn blur_kernel_has_exact_size() {
        let kernel = gaussian_kernel(5);
        assert_eq!(kernel.len(), 5);
        assert!((kernel.iter().sum::<f32>() - 1.0).abs() < 1e-6);
        assert!((kernel[0] - kernel[4]).abs() < 1e-7 && kernel[2] > kernel[1]);
    }

    #[test]
    fn blur_reaches_two_pixels_only() {
        // a single bright pixel spreads exactly to the 5x5 window around it
        let mut img = GrayImage::new(11, 11);
        img.put_pixel(5, 5, Luma([255]));
        let out = apply_blur(&img, 5);
        assert!(out.get_pixel(3, 5)[0] > 0 && out.get_pixel(7, 7)[0] > 0);
        assert_eq!(out.get_pixel(2, 5)[0], 0);
        assert_eq!(out.get_pixel(5, 8)[0], 0);
    }

    #[test]
    fn clahe_keeps_uniform_image_uniform() {
        let img = GrayImage::from_pixel(64, 64, Luma([128]));
        let out = clahe(&img, 8, 2.0);
        let first = out.get_pixel(0, 0)[0];
        assert!(out.pixels().all(|p| p[0] == first));
    }

    #[test]
    fn clahe_stretches_low_contrast() {
        let img = GrayImage::from_fn(64, 64, |x, _| Luma([if x < 32 { 100 } else { 110 }]));
        let out = clahe(&img, 1, 2.0);
        let left = out.get_pixel(0, 0)[0];
        let right = out.get_pixel(63, 0)[0];
        assert!(right > left);
        assert!(right - left > 10, "contrast not stretched: {} -> {}", left, right);
    }

    #[test]
    fn mean_std_of_two_level_image() {
        let img = GrayImage::from_fn(10, 10, |x, _| Luma([if x < 5 { 0 } else { 100 }]));
        let (mean, std) = mean_std(&img);
        assert!((mean - 50.0).abs() < 1e-9);
        assert!((std - 50.0).abs() < 1e-9);
        assert!((fraction_below(&img, 30.0) - 0.5).abs() < 1e-9);
    }
}
