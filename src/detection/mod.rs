pub mod angled;
pub mod centered;
pub mod contours;
pub mod far;
pub mod features;
pub mod keypoints;
pub mod preprocessing;
pub mod segmentation;

use crate::config::{DetectorConfig, ScoringMode, Settings, StrategyKind};
use crate::error::Result;
use crate::models::Detection;
use crate::pipeline::Pipeline;
use crate::trace::{DetectionObserver, NoopObserver};
use image::DynamicImage;
use std::fmt;

/// Run the standard two-strategy pipeline with fused scoring.
pub fn detect(img: &DynamicImage, config: &DetectorConfig) -> Result<Detection> {
    Pipeline::from_config(config.clone()).run(img)
}

/// The selectable detectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum DetectorKind {
    /// Both segmentation strategies, four-feature fusion
    #[default]
    Fused,
    /// Histogram strategy only, keypoint-density scoring
    Simplified,
    /// Fixed central region with the wet-rim cue
    Centered,
    /// Perspective-flattened central window
    Angled,
    /// Dark share of the bottom third
    Far,
}

impl DetectorKind {
    pub fn name(&self) -> &'static str {
        match self {
            DetectorKind::Fused => "fused",
            DetectorKind::Simplified => "simplified",
            DetectorKind::Centered => "centered",
            DetectorKind::Angled => "angled",
            DetectorKind::Far => "far",
        }
    }

    pub fn run(&self, img: &DynamicImage, settings: &Settings) -> Result<Detection> {
        self.run_observed(img, settings, &mut NoopObserver)
    }

    pub fn run_observed(
        &self,
        img: &DynamicImage,
        settings: &Settings,
        observer: &mut dyn DetectionObserver,
    ) -> Result<Detection> {
        match self {
            DetectorKind::Fused => Pipeline::from_config(settings.detector.clone()).run_observed(img, observer),
            DetectorKind::Simplified => {
                Pipeline::from_config(simplified(&settings.detector)).run_observed(img, observer)
            }
            DetectorKind::Centered => centered::detect_centered_observed(img, &settings.center, observer),
            DetectorKind::Angled => angled::detect_angled(img),
            DetectorKind::Far => far::detect_far(img),
        }
    }
}

impl fmt::Display for DetectorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The user's detector settings with the simplified variant's overrides.
fn simplified(config: &DetectorConfig) -> DetectorConfig {
    let defaults = DetectorConfig::simplified();
    DetectorConfig {
        min_area_px: defaults.min_area_px,
        strategies: vec![StrategyKind::GlobalHistogram],
        scoring: ScoringMode::KeypointOnly,
        ..config.clone()
    }
}
