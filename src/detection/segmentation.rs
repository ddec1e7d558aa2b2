//! Segmentation strategies: intensity image in, binary mask of dark pixels out.
//!
//! Every strategy honours the same contract, so the candidate extractor and
//! everything after it never needs to know which one produced a mask.

use crate::config::{DetectorConfig, StrategyKind};
use crate::detection::preprocessing;
use image::{GrayImage, Luma};
use imageproc::contrast::otsu_level;
use imageproc::distance_transform::Norm;
use imageproc::filter::box_filter;
use imageproc::morphology::erode;
use std::sync::Arc;

const ON: u8 = 255;

/// Binary image, same size as its source; set pixels are candidate anomalies.
#[derive(Debug, Clone, PartialEq)]
pub struct Mask {
    image: GrayImage,
}

impl Mask {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            image: GrayImage::new(width, height),
        }
    }

    pub fn from_fn(width: u32, height: u32, mut f: impl FnMut(u32, u32) -> bool) -> Self {
        Self {
            image: GrayImage::from_fn(width, height, |x, y| Luma([if f(x, y) { ON } else { 0 }])),
        }
    }

    /// Any non-zero pixel of `image` counts as set.
    pub fn from_image(image: GrayImage) -> Self {
        Self::from_fn(image.width(), image.height(), |x, y| image.get_pixel(x, y)[0] != 0)
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    pub fn is_set(&self, x: u32, y: u32) -> bool {
        self.image.get_pixel(x, y)[0] != 0
    }

    pub fn set(&mut self, x: u32, y: u32, on: bool) {
        self.image.put_pixel(x, y, Luma([if on { ON } else { 0 }]));
    }

    pub fn count(&self) -> usize {
        self.image.as_raw().iter().filter(|&&v| v != 0).count()
    }

    /// The mask as a 0/255 image.
    pub fn as_image(&self) -> &GrayImage {
        &self.image
    }
}

/// Turns an intensity image into a mask of dark/anomalous pixels.
pub trait SegmentationStrategy: Send + Sync {
    fn segment(&self, gray: &GrayImage, config: &DetectorConfig) -> Mask;

    /// Human-readable name (used in traces)
    fn name(&self) -> &str;
}

/// Blur, then flag pixels well below their local block mean.
pub struct AdaptiveThreshold;

impl SegmentationStrategy for AdaptiveThreshold {
    fn segment(&self, gray: &GrayImage, config: &DetectorConfig) -> Mask {
        let blurred = preprocessing::apply_blur(gray, config.blur_kernel_size);
        let radius = config.adaptive_block_size / 2;
        let local_mean = box_filter(&blurred, radius, radius);
        let offset = config.adaptive_offset;

        let (w, h) = blurred.dimensions();
        Mask::from_fn(w, h, |x, y| {
            let value = i32::from(blurred.get_pixel(x, y)[0]);
            let mean = i32::from(local_mean.get_pixel(x, y)[0]);
            mean - value > offset
        })
    }

    fn name(&self) -> &str {
        "Adaptive Local Threshold"
    }
}

/// CLAHE, Otsu split (dark side kept), then a small erosion.
pub struct GlobalHistogramThreshold;

impl SegmentationStrategy for GlobalHistogramThreshold {
    fn segment(&self, gray: &GrayImage, config: &DetectorConfig) -> Mask {
        let enhanced = preprocessing::clahe(gray, config.clahe_tiles, config.clahe_clip_limit);
        let level = otsu_level(&enhanced);
        let (w, h) = enhanced.dimensions();
        let mut binary = GrayImage::from_fn(w, h, |x, y| {
            Luma([if enhanced.get_pixel(x, y)[0] <= level { ON } else { 0 }])
        });

        let k = (config.erosion_size / 2).min(u32::from(u8::MAX)) as u8;
        if k > 0 {
            for _ in 0..config.erosion_iterations {
                binary = erode(&binary, Norm::LInf, k);
            }
        }
        Mask::from_image(binary)
    }

    fn name(&self) -> &str {
        "Global Histogram Threshold"
    }
}

impl StrategyKind {
    pub fn strategy(self) -> Arc<dyn SegmentationStrategy> {
        match self {
            StrategyKind::Adaptive => Arc::new(AdaptiveThreshold),
            StrategyKind::GlobalHistogram => Arc::new(GlobalHistogramThreshold),
        }
    }
}
