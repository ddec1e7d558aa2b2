//! Detector tunables.
//!
//! Every detector takes its configuration by reference and never mutates it.
//! Overrides are expressed by building a new value, e.g.
//! `DetectorConfig { min_area_px: 100, ..Default::default() }`, or by loading
//! a JSON [`Settings`] file where missing keys fall back to the defaults.

use crate::error::{DetectError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Which segmentation strategy to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// Blur, then mark pixels darker than their local block mean.
    Adaptive,
    /// CLAHE, Otsu split, then erosion.
    GlobalHistogram,
}

/// How a candidate's confidence is computed from its features.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoringMode {
    /// Weighted sum of all four feature scores.
    #[default]
    Fused,
    /// Keypoint density alone.
    KeypointOnly,
}

/// Weights of the linear confidence fusion.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FusionWeights {
    pub darkness: f32,
    pub texture: f32,
    pub shape: f32,
    pub keypoint_density: f32,
}

impl Default for FusionWeights {
    fn default() -> Self {
        Self {
            darkness: 0.3,
            texture: 0.3,
            shape: 0.2,
            keypoint_density: 0.2,
        }
    }
}

impl FusionWeights {
    fn validate(&self) -> Result<()> {
        let all = [
            self.darkness,
            self.texture,
            self.shape,
            self.keypoint_density,
        ];
        if all.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(DetectError::config("weights", "weights must be finite and non-negative"));
        }
        let sum: f32 = all.iter().sum();
        if sum > 1.0 + 1e-4 {
            return Err(DetectError::config(
                "weights",
                format!("weights sum to {sum:.3}, must not exceed 1.0"),
            ));
        }
        Ok(())
    }
}

/// Parameters of the oriented-FAST keypoint detector used for keypoint density.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct KeypointConfig {
    /// Upper bound on keypoints retained across all pyramid levels.
    pub max_features: usize,
    /// Downscale ratio between consecutive pyramid levels.
    pub scale_factor: f32,
    pub levels: usize,
    /// Border (in level pixels) where no keypoint is reported.
    pub edge_threshold: u32,
    /// FAST intensity threshold.
    pub fast_threshold: u8,
}

impl Default for KeypointConfig {
    fn default() -> Self {
        Self {
            max_features: 500,
            scale_factor: 1.2,
            levels: 8,
            edge_threshold: 31,
            fast_threshold: 20,
        }
    }
}

impl KeypointConfig {
    fn validate(&self) -> Result<()> {
        if self.levels == 0 {
            return Err(DetectError::config("keypoints.levels", "must be at least 1"));
        }
        if !self.scale_factor.is_finite() || self.scale_factor <= 1.0 {
            return Err(DetectError::config(
                "keypoints.scale_factor",
                "must be finite and greater than 1.0",
            ));
        }
        Ok(())
    }
}

/// Configuration of the contour-based pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DetectorConfig {
    /// Side of the Gaussian pre-blur kernel (odd).
    pub blur_kernel_size: u32,
    /// Side of the local-mean block for adaptive thresholding (odd).
    pub adaptive_block_size: u32,
    /// Intensity levels below the local mean before a pixel counts as dark.
    pub adaptive_offset: i32,
    /// CLAHE tile grid (tiles per axis).
    pub clahe_tiles: u32,
    pub clahe_clip_limit: f32,
    /// Side of the square erosion element (odd).
    pub erosion_size: u32,
    pub erosion_iterations: u32,
    /// Candidates whose bounding box covers fewer pixels are dropped.
    pub min_area_px: u32,
    /// Minimum winning confidence for a detection.
    pub confidence_threshold: f32,
    /// Context added around a candidate box before cropping region pixels.
    pub context_margin_px: u32,
    pub weights: FusionWeights,
    pub keypoints: KeypointConfig,
    /// Strategies to run, in order.
    pub strategies: Vec<StrategyKind>,
    pub scoring: ScoringMode,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            blur_kernel_size: 5,
            adaptive_block_size: 21,
            adaptive_offset: 10,
            clahe_tiles: 8,
            clahe_clip_limit: 2.0,
            erosion_size: 3,
            erosion_iterations: 1,
            min_area_px: 150,
            confidence_threshold: 0.5,
            context_margin_px: 8,
            weights: FusionWeights::default(),
            keypoints: KeypointConfig::default(),
            strategies: vec![StrategyKind::Adaptive, StrategyKind::GlobalHistogram],
            scoring: ScoringMode::Fused,
        }
    }
}

impl DetectorConfig {
    /// Histogram strategy only, smaller minimum area, keypoint-only scoring.
    pub fn simplified() -> Self {
        Self {
            min_area_px: 100,
            strategies: vec![StrategyKind::GlobalHistogram],
            scoring: ScoringMode::KeypointOnly,
            ..Self::default()
        }
    }

    pub fn with_confidence_threshold(mut self, threshold: f32) -> Self {
        self.confidence_threshold = threshold;
        self
    }

    pub fn with_min_area(mut self, min_area_px: u32) -> Self {
        self.min_area_px = min_area_px;
        self
    }

    pub fn with_strategies(mut self, strategies: Vec<StrategyKind>) -> Self {
        self.strategies = strategies;
        self
    }

    pub fn validate(&self) -> Result<()> {
        check_odd("blur_kernel_size", self.blur_kernel_size)?;
        check_odd("adaptive_block_size", self.adaptive_block_size)?;
        check_odd("erosion_size", self.erosion_size)?;
        if self.adaptive_offset < 0 {
            return Err(DetectError::config("adaptive_offset", "must be non-negative"));
        }
        if self.clahe_tiles == 0 {
            return Err(DetectError::config("clahe_tiles", "must be at least 1"));
        }
        check_positive("clahe_clip_limit", self.clahe_clip_limit)?;
        check_unit("confidence_threshold", self.confidence_threshold)?;
        if self.strategies.is_empty() {
            return Err(DetectError::config("strategies", "at least one strategy is required"));
        }
        self.weights.validate()?;
        self.keypoints.validate()
    }
}

/// Configuration of the region-constrained detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CenterConfig {
    /// Side of the central square as a fraction of the shorter image side.
    pub center_frac: f32,
    /// Pixels below this fraction of the region mean count as dark.
    pub base_dark_ratio: f32,
    /// Dark fraction reported as the nominal minimum (diagnostic only).
    pub min_dark_area: f32,
    /// σ below this is "too flat" unless a rim cue fires.
    pub allow_low_texture: f32,
    pub rim_width_px: u32,
    pub rim_grad_thr: f32,
    /// Required inner-minus-rim brightness.
    pub center_rim_delta: f32,
    /// Required blurred-image-mean over inner-mean ratio.
    pub outer_inner_ratio: f32,
    /// Maximum dark-blob aspect ratio still considered circular.
    pub circular_ok_if_rim: f32,
    pub bonus_rim_detect: f32,
    /// Gaussian σ used for the whole-image "outer" mean.
    pub outer_blur_sigma: f32,
}

impl Default for CenterConfig {
    fn default() -> Self {
        Self {
            center_frac: 0.30,
            base_dark_ratio: 0.60,
            min_dark_area: 0.03,
            allow_low_texture: 3.0,
            rim_width_px: 10,
            rim_grad_thr: 28.0,
            center_rim_delta: 15.0,
            outer_inner_ratio: 1.10,
            circular_ok_if_rim: 1.05,
            bonus_rim_detect: 0.25,
            outer_blur_sigma: 5.0,
        }
    }
}

impl CenterConfig {
    pub fn validate(&self) -> Result<()> {
        check_unit("center_frac", self.center_frac)?;
        if self.center_frac == 0.0 {
            return Err(DetectError::config("center_frac", "must be greater than 0"));
        }
        check_unit("base_dark_ratio", self.base_dark_ratio)?;
        check_unit("min_dark_area", self.min_dark_area)?;
        check_non_negative("allow_low_texture", self.allow_low_texture)?;
        check_non_negative("rim_grad_thr", self.rim_grad_thr)?;
        if !self.center_rim_delta.is_finite() {
            return Err(DetectError::config("center_rim_delta", "must be finite"));
        }
        check_positive("outer_inner_ratio", self.outer_inner_ratio)?;
        check_positive("circular_ok_if_rim", self.circular_ok_if_rim)?;
        check_unit("bonus_rim_detect", self.bonus_rim_detect)?;
        check_positive("outer_blur_sigma", self.outer_blur_sigma)
    }
}

/// Everything a run may need, as loaded from a settings file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub detector: DetectorConfig,
    pub center: CenterConfig,
}

impl Settings {
    /// Load and validate settings from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        Self::from_json(&data)
    }

    pub fn from_json(data: &str) -> Result<Self> {
        let settings: Settings = serde_json::from_str(data)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        self.detector.validate()?;
        self.center.validate()
    }
}

fn check_odd(key: &'static str, value: u32) -> Result<()> {
    if value == 0 || value % 2 == 0 {
        return Err(DetectError::config(key, format!("must be a positive odd number, got {value}")));
    }
    Ok(())
}

fn check_positive(key: &'static str, value: f32) -> Result<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(DetectError::config(key, format!("must be finite and positive, got {value}")));
    }
    Ok(())
}

fn check_non_negative(key: &'static str, value: f32) -> Result<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(DetectError::config(key, format!("must be finite and non-negative, got {value}")));
    }
    Ok(())
}

fn check_unit(key: &'static str, value: f32) -> Result<()> {
    if !value.is_finite() || !(0.0..=1.0).contains(&value) {
        return Err(DetectError::config(key, format!("must lie in [0, 1], got {value}")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(DetectorConfig::default().validate().is_ok());
        assert!(DetectorConfig::simplified().validate().is_ok());
        assert!(CenterConfig::default().validate().is_ok());
    }

    #[test]
    fn even_block_size_is_rejected() {
        let config = DetectorConfig {
            adaptive_block_size: 20,
            ..Default::default()
        };
        match config.validate() {
            Err(DetectError::InvalidConfig { key, .. }) => assert_eq!(key, "adaptive_block_size"),
            other => panic!("expected InvalidConfig, got {:?}", other),
        }
    }

    #[test]
    fn non_finite_threshold_is_rejected() {
        let config = DetectorConfig::default().with_confidence_threshold(f32::NAN);
        assert!(config.validate().is_err());
    }

    #[test]
    fn overweight_fusion_is_rejected() {
        let config = DetectorConfig {
            weights: FusionWeights {
                darkness: 0.5,
                texture: 0.5,
                shape: 0.2,
                keypoint_density: 0.2,
            },
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let settings = Settings::from_json(
            r#"{ "detector": { "min_area_px": 100, "strategies": ["global_histogram"] } }"#,
        )
        .unwrap();
        assert_eq!(settings.detector.min_area_px, 100);
        assert_eq!(settings.detector.strategies, vec![StrategyKind::GlobalHistogram]);
        assert_eq!(settings.detector.adaptive_block_size, 21);
        assert_eq!(settings.center, CenterConfig::default());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let result = Settings::from_json(r#"{ "detector": { "blur": 5 } }"#);
        assert!(matches!(result, Err(DetectError::ConfigParse(_))));
    }
}
