//! FAST keypoints over a scale pyramid.
//!
//! Used only as a local-structure counter: the keypoint density of a region
//! is a proxy for gravel, broken asphalt and glare.

use crate::config::KeypointConfig;
use image::GrayImage;
use image::imageops::{FilterType, resize};
use imageproc::corners::{Corner, corners_fast9};

/// A detected keypoint in source-image coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Keypoint {
    pub x: f32,
    pub y: f32,
    pub level: usize,
    /// FAST score: the highest threshold at which the point is still a corner.
    pub score: f32,
}

/// Detect up to `config.max_features` keypoints.
pub fn detect_keypoints(img: &GrayImage, config: &KeypointConfig) -> Vec<Keypoint> {
    let quotas = level_quotas(config);
    let border = config.edge_threshold;
    let mut keypoints = Vec::new();
    let mut level_img = img.clone();

    for (level, quota) in quotas.into_iter().enumerate() {
        if level > 0 {
            let scale = config.scale_factor.powi(level as i32);
            let w = (img.width() as f32 / scale).round() as u32;
            let h = (img.height() as f32 / scale).round() as u32;
            if w <= 2 * border || h <= 2 * border {
                break;
            }
            level_img = resize(img, w, h, FilterType::Triangle);
        } else if img.width() <= 2 * border || img.height() <= 2 * border {
            break;
        }

        let (w, h) = level_img.dimensions();
        let mut corners: Vec<Corner> = corners_fast9(&level_img, config.fast_threshold)
            .into_iter()
            .filter(|c| c.x >= border && c.y >= border && c.x < w - border && c.y < h - border)
            .collect();
        corners = suppress_non_maxima(corners, w, h);
        corners.sort_by(|a, b| b.score.total_cmp(&a.score));
        corners.truncate(quota);

        let scale = config.scale_factor.powi(level as i32);
        keypoints.extend(corners.into_iter().map(|c| Keypoint {
            x: c.x as f32 * scale,
            y: c.y as f32 * scale,
            level,
            score: c.score,
        }));
    }

    keypoints
}

/// Keypoints per unit area, scaled into [0, 1].
pub fn keypoint_density_score(region: &GrayImage, config: &KeypointConfig) -> f32 {
    let count = detect_keypoints(region, config).len();
    let area = f64::from(region.width()) * f64::from(region.height());
    let density = count as f64 / (area + 1e-6);
    (density * 3000.0).clamp(0.0, 1.0) as f32
}

/// Split the feature budget across levels geometrically.
fn level_quotas(config: &KeypointConfig) -> Vec<usize> {
    let levels = config.levels.max(1);
    let factor = 1.0 / f64::from(config.scale_factor);
    let first = config.max_features as f64 * (1.0 - factor) / (1.0 - factor.powi(levels as i32));

    let mut quotas = Vec::with_capacity(levels);
    let mut assigned = 0usize;
    let mut desired = first;
    for _ in 0..levels - 1 {
        let n = desired.round() as usize;
        quotas.push(n);
        assigned += n;
        desired *= factor;
    }
    quotas.push(config.max_features.saturating_sub(assigned));
    quotas
}

/// Keep corners that are the strongest in their 3x3 neighbourhood.
fn suppress_non_maxima(corners: Vec<Corner>, width: u32, height: u32) -> Vec<Corner> {
    let mut scores = vec![f32::NEG_INFINITY; (width * height) as usize];
    for c in &corners {
        scores[(c.y * width + c.x) as usize] = c.score;
    }
    corners
        .into_iter()
        .filter(|c| {
            for dy in -1i64..=1 {
                for dx in -1i64..=1 {
                    if dx == 0 && dy == 0 {
                        continue;
                    }
                    let nx = i64::from(c.x) + dx;
                    let ny = i64::from(c.y) + dy;
                    if nx < 0 || ny < 0 || nx >= i64::from(width) || ny >= i64::from(height) {
                        continue;
                    }
                    let other = scores[(ny as u32 * width + nx as u32) as usize];
                    // ties resolve towards the earlier raster position
                    if other > c.score || (other == c.score && (dy < 0 || (dy == 0 && dx < 0))) {
                        return false;
                    }
                }
            }
            true
        })
        .collect()
}
