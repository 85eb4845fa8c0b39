//! Coarse-to-fine Lucas-Kanade over Gaussian pyramids.

use lktrack_core::{Flow, FlowOutcome, Frame, Keypoint, LkError, Result};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::iterative::refine_level;
use crate::lucas_kanade::check_window_size;
use crate::pyramid::GaussianPyramid;

/// Parameters for [`pyramid_lucas_kanade`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PyramidLucasKanade {
    pub window_size: usize,
    pub num_iters: u32,
    /// Coarsest pyramid level; 0 runs at full resolution only.
    pub level: usize,
    /// Downscale factor between consecutive levels.
    pub scale: f32,
}

impl Default for PyramidLucasKanade {
    fn default() -> Self {
        Self {
            window_size: 9,
            num_iters: 7,
            level: 2,
            scale: 2.0,
        }
    }
}

impl PyramidLucasKanade {
    pub fn estimate(
        &self,
        prev: &Frame,
        next: &Frame,
        keypoints: &[Keypoint],
    ) -> Result<Vec<FlowOutcome>> {
        pyramid_lucas_kanade(
            prev,
            next,
            keypoints,
            self.window_size,
            self.num_iters,
            self.level,
            self.scale,
        )
    }
}

/// Estimate flow from the coarsest pyramid level down to full resolution.
///
/// At each level the keypoints are divided by `scale^level` and refined with
/// the running guess; the guess then becomes `scale * (guess + d)` for the
/// next finer level. The final flow is `guess + d` at level 0.
///
/// A keypoint whose normal matrix is singular at a coarse level contributes
/// no displacement there; at level 0 the failure is its result.
pub fn pyramid_lucas_kanade(
    prev: &Frame,
    next: &Frame,
    keypoints: &[Keypoint],
    window_size: usize,
    num_iters: u32,
    level: usize,
    scale: f32,
) -> Result<Vec<FlowOutcome>> {
    check_window_size(window_size, prev)?;
    prev.ensure_same_shape(next)?;
    let pyr1 = GaussianPyramid::build(prev, level, scale)?;
    let pyr2 = GaussianPyramid::build(next, level, scale)?;
    let coarsest = &pyr1.levels[level];
    if coarsest.width < 2 || coarsest.height < 2 {
        return Err(LkError::InvalidParameter(format!(
            "pyramid level {} of a {}x{} frame is only {}x{}",
            level, prev.width, prev.height, coarsest.width, coarsest.height
        )));
    }

    let mut guess = vec![Flow::ZERO; keypoints.len()];
    for l in (1..=level).rev() {
        let factor = pyr1.scale_at(l);
        let scaled: Vec<Keypoint> = keypoints.iter().map(|kp| kp.downscaled(factor)).collect();
        let d = refine_level(
            &pyr1.levels[l],
            &pyr2.levels[l],
            &scaled,
            window_size,
            num_iters,
            Some(&guess),
        )?;
        guess = guess
            .iter()
            .zip(d)
            .enumerate()
            .map(|(i, (&g, d))| {
                let d = d.unwrap_or_else(|failure| {
                    trace!(keypoint = i, level = l, %failure, "No flow at pyramid level");
                    Flow::ZERO
                });
                (g + d) * scale
            })
            .collect();
    }

    let d = refine_level(prev, next, keypoints, window_size, num_iters, Some(&guess))?;
    Ok(guess
        .into_iter()
        .zip(d)
        .map(|(g, d)| d.map(|d| g + d))
        .collect())
}
