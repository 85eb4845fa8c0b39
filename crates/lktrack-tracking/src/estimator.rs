//! Pluggable flow estimation.
//!
//! The tracker only needs something that maps `(prev, next, keypoints)` to
//! one [`FlowOutcome`] per keypoint, in keypoint order. The three
//! Lucas-Kanade variants, the config-level [`FlowMethod`], and plain closures
//! all qualify.

use lktrack_core::{FlowOutcome, Frame, Keypoint, Result};
use serde::{Deserialize, Serialize};

use crate::iterative::IterativeLucasKanade;
use crate::lucas_kanade::LucasKanade;
use crate::pyramidal::PyramidLucasKanade;

/// Per-keypoint flow between two frames of equal shape.
pub trait FlowEstimator: Send + Sync {
    fn estimate(&self, prev: &Frame, next: &Frame, keypoints: &[Keypoint])
        -> Result<Vec<FlowOutcome>>;
}

impl<F> FlowEstimator for F
where
    F: Fn(&Frame, &Frame, &[Keypoint]) -> Result<Vec<FlowOutcome>> + Send + Sync,
{
    fn estimate(
        &self,
        prev: &Frame,
        next: &Frame,
        keypoints: &[Keypoint],
    ) -> Result<Vec<FlowOutcome>> {
        self(prev, next, keypoints)
    }
}

impl FlowEstimator for LucasKanade {
    fn estimate(
        &self,
        prev: &Frame,
        next: &Frame,
        keypoints: &[Keypoint],
    ) -> Result<Vec<FlowOutcome>> {
        LucasKanade::estimate(self, prev, next, keypoints)
    }
}

impl FlowEstimator for IterativeLucasKanade {
    fn estimate(
        &self,
        prev: &Frame,
        next: &Frame,
        keypoints: &[Keypoint],
    ) -> Result<Vec<FlowOutcome>> {
        IterativeLucasKanade::estimate(self, prev, next, keypoints)
    }
}

impl FlowEstimator for PyramidLucasKanade {
    fn estimate(
        &self,
        prev: &Frame,
        next: &Frame,
        keypoints: &[Keypoint],
    ) -> Result<Vec<FlowOutcome>> {
        PyramidLucasKanade::estimate(self, prev, next, keypoints)
    }
}

/// Estimator selection as it appears in configuration files.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum FlowMethod {
    LucasKanade(LucasKanade),
    Iterative(IterativeLucasKanade),
    Pyramidal(PyramidLucasKanade),
}

impl Default for FlowMethod {
    fn default() -> Self {
        Self::Pyramidal(PyramidLucasKanade::default())
    }
}

impl FlowEstimator for FlowMethod {
    fn estimate(
        &self,
        prev: &Frame,
        next: &Frame,
        keypoints: &[Keypoint],
    ) -> Result<Vec<FlowOutcome>> {
        match self {
            Self::LucasKanade(p) => p.estimate(prev, next, keypoints),
            Self::Iterative(p) => p.estimate(prev, next, keypoints),
            Self::Pyramidal(p) => p.estimate(prev, next, keypoints),
        }
    }
}
