//! Structured per-stage measurements.
//!
//! Detectors report what they measured to a [`DetectionObserver`] instead of
//! printing; the scoring functions themselves stay pure.

use crate::detection::centered::CenterMeasurements;
use crate::models::{BoundingBox, Detection, FeatureScores};
use log::debug;

#[derive(Debug, Clone, PartialEq)]
pub enum TraceEvent {
    /// A strategy produced a mask with `dark_pixels` set pixels.
    Mask { strategy: String, dark_pixels: usize },
    /// A candidate survived the area filter and was scored.
    Candidate {
        strategy: String,
        bbox: BoundingBox,
        scores: FeatureScores,
        confidence: f32,
    },
    /// Best candidate of one strategy, if it had any.
    StrategyBest { strategy: String, best: Option<Detection> },
    /// Outcome of the cross-strategy selection and acceptance threshold.
    Selection { winner: Option<Detection>, accepted: bool },
    /// Measurements of the region-constrained detector.
    Center(CenterMeasurements),
}

pub trait DetectionObserver {
    fn observe(&mut self, event: &TraceEvent);
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl DetectionObserver for NoopObserver {
    fn observe(&mut self, _event: &TraceEvent) {}
}

/// Forwards events to the `log` facade at debug level.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogObserver;

impl DetectionObserver for LogObserver {
    fn observe(&mut self, event: &TraceEvent) {
        match event {
            TraceEvent::Mask { strategy, dark_pixels } => {
                debug!("[{}] mask has {} dark pixels", strategy, dark_pixels);
            }
            TraceEvent::Candidate {
                strategy,
                bbox,
                scores,
                confidence,
            } => {
                debug!(
                    "[{}] candidate @({},{},{},{}) dark={:.2} tex={:.2} shape={:.2} kp={:.2} -> conf {:.2}",
                    strategy,
                    bbox.x,
                    bbox.y,
                    bbox.width,
                    bbox.height,
                    scores.darkness,
                    scores.texture,
                    scores.shape,
                    scores.keypoint_density,
                    confidence
                );
            }
            TraceEvent::StrategyBest { strategy, best } => match best {
                Some(d) => debug!("[{}] best conf {:.2} at {:?}", strategy, d.confidence, d.bbox.as_tuple()),
                None => debug!("[{}] no candidates", strategy),
            },
            TraceEvent::Selection { winner, accepted } => {
                let conf = winner.map(|d| d.confidence).unwrap_or(0.0);
                debug!("selection: best conf {:.2}, accepted={}", conf, accepted);
            }
            TraceEvent::Center(m) => {
                debug!(
                    "center: dark_frac={:.3} sigma={:.2} rim_grad={:.2} delta={:.2} ratio={:.2} aspect={:.2} rim_hit={} -> {:?}",
                    m.dark_fraction,
                    m.sigma,
                    m.rim_gradient,
                    m.center_rim_delta,
                    m.outer_inner_ratio,
                    m.aspect,
                    m.rim_hit,
                    m.verdict
                );
            }
        }
    }
}

/// Keeps every event, mainly for tests and tooling.
#[derive(Debug, Default, Clone)]
pub struct RecordingObserver {
    pub events: Vec<TraceEvent>,
}

impl DetectionObserver for RecordingObserver {
    fn observe(&mut self, event: &TraceEvent) {
        self.events.push(event.clone());
    }
}
