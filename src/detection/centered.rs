//! Region-constrained detector.
//!
//! Looks only at a fixed square in the middle of the frame and combines the
//! share of dark pixels with a "wet rim" cue: a bright halo or strong edge
//! ring around a darker centre, or a centre much darker than the whole frame.
//! Two rejection rules suppress flat or non-circular dark patches unless the
//! rim cue corroborates them.

use crate::config::CenterConfig;
use crate::detection::preprocessing::{self, mean_std};
use crate::error::Result;
use crate::models::{BoundingBox, Detection};
use crate::trace::{DetectionObserver, NoopObserver, TraceEvent};
use image::{DynamicImage, GrayImage, Luma};
use imageproc::filter::gaussian_blur_f32;
use imageproc::gradients::sobel_gradients;

const EPS: f64 = 1e-6;

/// Why the gate rejected a region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// σ below `allow_low_texture` and no rim cue.
    FlatTexture,
    /// Dark pixels not compact enough and no rim cue.
    NotCircular,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Pass,
    Rejected(RejectReason),
}

/// Everything the detector measured on one image.
#[derive(Debug, Clone, PartialEq)]
pub struct CenterMeasurements {
    pub region: BoundingBox,
    pub region_mean: f64,
    pub dark_fraction: f64,
    /// True when `dark_fraction` reaches `min_dark_area`. Reported, never gated on.
    pub meets_min_dark_area: bool,
    pub sigma: f64,
    pub rim_gradient: f64,
    pub inner_mean: f64,
    pub rim_mean: f64,
    pub center_rim_delta: f64,
    pub outer_mean: f64,
    pub outer_inner_ratio: f64,
    pub aspect: f64,
    pub circular_ok: bool,
    pub rim_hit: bool,
    /// Score before the rejection gate.
    pub confidence: f32,
    pub verdict: Verdict,
}

impl CenterMeasurements {
    pub fn detection(&self) -> Detection {
        match self.verdict {
            Verdict::Pass => Detection::new(self.confidence, self.region),
            Verdict::Rejected(_) => Detection::new(0.0, self.region),
        }
    }
}

/// Central square of side `min(h, w) * frac`, centred.
pub fn center_region(width: u32, height: u32, frac: f32) -> BoundingBox {
    let side = ((width.min(height) as f32 * frac) as u32).max(1);
    BoundingBox::clamped(
        i64::from(width.saturating_sub(side) / 2),
        i64::from(height.saturating_sub(side) / 2),
        i64::from(side),
        i64::from(side),
        width,
        height,
    )
}

/// Run every measurement and the rejection gate on an intensity image.
pub fn measure_center(gray: &GrayImage, config: &CenterConfig) -> CenterMeasurements {
    let (width, height) = gray.dimensions();
    let region = center_region(width, height, config.center_frac);
    let roi = preprocessing::crop(gray, &region);
    let side = roi.width().min(roi.height());

    let (region_mean, sigma) = mean_std(&roi);
    let dark_threshold = region_mean * f64::from(config.base_dark_ratio);
    let dark_fraction = preprocessing::fraction_below(&roi, dark_threshold);

    let rw = config.rim_width_px;
    let has_inner = side > 2 * rw;
    let in_inner = |x: u32, y: u32| has_inner && x >= rw && y >= rw && x < side - rw && y < side - rw;

    let rim = GrayImage::from_fn(roi.width(), roi.height(), |x, y| {
        if in_inner(x, y) { Luma([0]) } else { *roi.get_pixel(x, y) }
    });
    let gradients = sobel_gradients(&rim);
    let rim_gradient = mean_of(gradients.as_raw().iter().map(|&g| f64::from(g)));

    let inner_mean = if has_inner {
        let inner = image::imageops::crop_imm(&roi, rw, rw, side - 2 * rw, side - 2 * rw).to_image();
        mean_std(&inner).0
    } else {
        region_mean
    };
    let rim_values: Vec<f64> = rim
        .enumerate_pixels()
        .filter(|(x, y, p)| !in_inner(*x, *y) && p[0] > 0)
        .map(|(_, _, p)| f64::from(p[0]))
        .collect();
    let rim_mean = if rim_values.is_empty() {
        region_mean
    } else {
        mean_of(rim_values.iter().copied())
    };
    let center_rim_delta = inner_mean - rim_mean;

    let outer_mean = mean_std(&gaussian_blur_f32(gray, config.outer_blur_sigma)).0;
    let outer_inner_ratio = outer_mean / (inner_mean + EPS);

    let (aspect, circular_ok) = match dark_extent(&roi, dark_threshold) {
        Some((w, h)) => {
            let long = f64::from(w.max(h));
            let short = f64::from(w.min(h));
            let aspect = long / (short + EPS);
            (aspect, aspect < f64::from(config.circular_ok_if_rim))
        }
        None => (0.0, false),
    };

    let rim_hit = (rim_gradient > f64::from(config.rim_grad_thr)
        && center_rim_delta >= f64::from(config.center_rim_delta))
        || outer_inner_ratio >= f64::from(config.outer_inner_ratio);

    let bonus = if rim_hit { f64::from(config.bonus_rim_detect) } else { 0.0 };
    let confidence = (dark_fraction + bonus).clamp(0.0, 1.0) as f32;

    let verdict = if sigma < f64::from(config.allow_low_texture) && !rim_hit {
        Verdict::Rejected(RejectReason::FlatTexture)
    } else if !circular_ok && !rim_hit {
        Verdict::Rejected(RejectReason::NotCircular)
    } else {
        Verdict::Pass
    };

    CenterMeasurements {
        region,
        region_mean,
        dark_fraction,
        meets_min_dark_area: dark_fraction >= f64::from(config.min_dark_area),
        sigma,
        rim_gradient,
        inner_mean,
        rim_mean,
        center_rim_delta,
        outer_mean,
        outer_inner_ratio,
        aspect,
        circular_ok,
        rim_hit,
        confidence,
        verdict,
    }
}

/// Region-constrained detection on a decoded image.
pub fn detect_centered(img: &DynamicImage, config: &CenterConfig) -> Result<Detection> {
    detect_centered_observed(img, config, &mut NoopObserver)
}

pub fn detect_centered_observed(
    img: &DynamicImage,
    config: &CenterConfig,
    observer: &mut dyn DetectionObserver,
) -> Result<Detection> {
    config.validate()?;
    let gray = preprocessing::to_grayscale(img)?;
    let measurements = measure_center(&gray, config);
    let detection = measurements.detection();
    observer.observe(&TraceEvent::Center(measurements));
    Ok(detection)
}

/// Width and height of the bounding box of pixels below `threshold`.
fn dark_extent(roi: &GrayImage, threshold: f64) -> Option<(u32, u32)> {
    let mut bounds: Option<(u32, u32, u32, u32)> = None;
    for (x, y, p) in roi.enumerate_pixels() {
        if f64::from(p[0]) >= threshold {
            continue;
        }
        bounds = Some(match bounds {
            None => (x, y, x, y),
            Some((x0, y0, x1, y1)) => (x0.min(x), y0.min(y), x1.max(x), y1.max(y)),
        });
    }
    bounds.map(|(x0, y0, x1, y1)| (x1 - x0 + 1, y1 - y0 + 1))
}

fn mean_of(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if n == 0 { 0.0 } else { sum / n as f64 }
}
