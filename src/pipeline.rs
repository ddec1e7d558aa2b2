use crate::config::DetectorConfig;
use crate::detection::segmentation::SegmentationStrategy;
use crate::detection::{contours, features, preprocessing};
use crate::error::{DetectError, Result};
use crate::models::{BoundingBox, Detection, FeatureScores};
use crate::trace::{DetectionObserver, NoopObserver, TraceEvent};
use image::{DynamicImage, GrayImage};
use std::sync::Arc;

/// A candidate after feature scoring
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredCandidate {
    pub bbox: BoundingBox,
    pub scores: FeatureScores,
    pub confidence: f32,
}

impl ScoredCandidate {
    pub fn detection(&self) -> Detection {
        Detection::new(self.confidence, self.bbox)
    }
}

/// Highest-confidence candidate; on ties the first one wins.
pub fn best_candidate(candidates: &[ScoredCandidate]) -> Option<ScoredCandidate> {
    let mut best: Option<ScoredCandidate> = None;
    for c in candidates {
        if best.is_none_or(|b| c.confidence > b.confidence) {
            best = Some(*c);
        }
    }
    best
}

/// Pick the best of the per-strategy winners and apply the acceptance threshold.
///
/// Always returns a detection: the sentinel when nothing clears `threshold`.
pub fn select_detection(per_strategy: &[Option<Detection>], threshold: f32) -> Detection {
    let winner = per_strategy
        .iter()
        .flatten()
        .fold(None::<Detection>, |best, d| match best {
            Some(b) if d.confidence <= b.confidence => Some(b),
            _ => Some(*d),
        });
    match winner {
        Some(d) if d.confidence >= threshold => d,
        _ => Detection::none(),
    }
}

/// Contour-based detection pipeline.
///
/// Runs every segmentation strategy on the same intensity image, scores
/// each strategy's candidates, keeps each strategy's best and returns the
/// overall winner if it clears the confidence threshold.
#[derive(Clone)]
pub struct Pipeline {
    strategies: Vec<Arc<dyn SegmentationStrategy>>,
    config: DetectorConfig,
}

impl Pipeline {
    /// Create a pipeline with no strategies
    pub fn new(config: DetectorConfig) -> Self {
        Self {
            strategies: Vec::new(),
            config,
        }
    }

    /// Pipeline running the strategies listed in `config.strategies`.
    pub fn from_config(config: DetectorConfig) -> Self {
        let strategies = config.strategies.iter().map(|kind| kind.strategy()).collect();
        Self { strategies, config }
    }

    /// Both strategies with fused four-feature scoring.
    pub fn standard() -> Self {
        Self::from_config(DetectorConfig::default())
    }

    /// Histogram strategy only, scored by keypoint density.
    pub fn simplified() -> Self {
        Self::from_config(DetectorConfig::simplified())
    }

    /// Add a segmentation strategy to the pipeline
    pub fn add_strategy(mut self, strategy: Arc<dyn SegmentationStrategy>) -> Self {
        self.strategies.push(strategy);
        self
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    pub fn strategy_names(&self) -> Vec<&str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Run the pipeline on a decoded image.
    pub fn run(&self, img: &DynamicImage) -> Result<Detection> {
        self.run_observed(img, &mut NoopObserver)
    }

    /// Same as [`Pipeline::run`], reporting per-stage measurements.
    pub fn run_observed(&self, img: &DynamicImage, observer: &mut dyn DetectionObserver) -> Result<Detection> {
        self.config.validate()?;
        if self.strategies.is_empty() {
            return Err(DetectError::config("strategies", "pipeline has no segmentation strategy"));
        }
        let gray = preprocessing::to_grayscale(img)?;
        Ok(self.run_gray(&gray, observer))
    }

    /// Score every candidate one strategy finds in `gray`.
    pub fn score_strategy(
        &self,
        strategy: &dyn SegmentationStrategy,
        gray: &GrayImage,
        observer: &mut dyn DetectionObserver,
    ) -> Vec<ScoredCandidate> {
        let config = &self.config;
        let mask = strategy.segment(gray, config);
        observer.observe(&TraceEvent::Mask {
            strategy: strategy.name().to_string(),
            dark_pixels: mask.count(),
        });

        contours::extract_candidates(&mask, gray, config.min_area_px, config.context_margin_px)
            .iter()
            .map(|candidate| {
                let scores = features::score_features(candidate, config);
                let confidence = features::candidate_confidence(&scores, config);
                observer.observe(&TraceEvent::Candidate {
                    strategy: strategy.name().to_string(),
                    bbox: candidate.bbox,
                    scores,
                    confidence,
                });
                ScoredCandidate {
                    bbox: candidate.bbox,
                    scores,
                    confidence,
                }
            })
            .collect()
    }

    fn run_gray(&self, gray: &GrayImage, observer: &mut dyn DetectionObserver) -> Detection {
        let per_strategy: Vec<Option<Detection>> = self
            .strategies
            .iter()
            .map(|strategy| {
                let scored = self.score_strategy(strategy.as_ref(), gray, observer);
                let best = best_candidate(&scored).map(|c| c.detection());
                observer.observe(&TraceEvent::StrategyBest {
                    strategy: strategy.name().to_string(),
                    best,
                });
                best
            })
            .collect();

        let detection = select_detection(&per_strategy, self.config.confidence_threshold);
        let winner = per_strategy
            .iter()
            .flatten()
            .copied()
            .reduce(|a, b| if b.confidence > a.confidence { b } else { a });
        observer.observe(&TraceEvent::Selection {
            winner,
            accepted: !detection.is_none(),
        });
        detection
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::standard()
    }
}
