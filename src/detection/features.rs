//! Per-candidate feature scorers and their fusion into one confidence.
//!
//! Every scorer is pure and returns a value in [0, 1], including for
//! single-pixel regions.

use crate::config::{DetectorConfig, FusionWeights, ScoringMode};
use crate::detection::keypoints::keypoint_density_score;
use crate::detection::preprocessing::{fraction_below, mean_std};
use crate::models::{Candidate, Contour, FeatureScores};
use image::GrayImage;

/// Pixels below this fraction of the region mean count as dark.
pub const DARK_RATIO: f64 = 0.6;
const DARKNESS_BOOST: f64 = 2.5;
const TEXTURE_SCALE: f64 = 25.0;

/// Share of clearly darker-than-average pixels, boosted.
pub fn darkness_score(region: &GrayImage) -> f32 {
    let (mean, _) = mean_std(region);
    let dark_fraction = fraction_below(region, mean * DARK_RATIO);
    (dark_fraction * DARKNESS_BOOST).clamp(0.0, 1.0) as f32
}

/// Intensity standard deviation, normalised.
pub fn texture_score(region: &GrayImage) -> f32 {
    let (_, sigma) = mean_std(region);
    (sigma / TEXTURE_SCALE).clamp(0.0, 1.0) as f32
}

/// Circularity of compact, box-filling shapes; 0 for slivers and streaks.
pub fn shape_score(contour: &Contour) -> f32 {
    let aspect = contour.aspect_ratio();
    let extent = contour.extent();
    if aspect > 0.5 && aspect < 2.0 && extent > 0.4 {
        (contour.circularity() * 2.0).clamp(0.0, 1.0) as f32
    } else {
        0.0
    }
}

/// Compute all four feature scores of a candidate.
pub fn score_features(candidate: &Candidate, config: &DetectorConfig) -> FeatureScores {
    FeatureScores {
        darkness: darkness_score(&candidate.region),
        texture: texture_score(&candidate.region),
        shape: shape_score(&candidate.contour),
        keypoint_density: keypoint_density_score(&candidate.box_pixels(), &config.keypoints),
    }
}

/// Weighted linear combination of the feature scores.
pub fn fuse(scores: &FeatureScores, weights: &FusionWeights) -> f32 {
    let confidence = weights.darkness * scores.darkness
        + weights.texture * scores.texture
        + weights.shape * scores.shape
        + weights.keypoint_density * scores.keypoint_density;
    confidence.clamp(0.0, 1.0)
}

/// Candidate confidence under the configured scoring mode.
pub fn candidate_confidence(scores: &FeatureScores, config: &DetectorConfig) -> f32 {
    match config.scoring {
        ScoringMode::Fused => fuse(scores, &config.weights),
        ScoringMode::KeypointOnly => scores.keypoint_density,
    }
}
