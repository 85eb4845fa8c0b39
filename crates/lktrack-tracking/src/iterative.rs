//! Iterative Lucas-Kanade refinement at a single resolution.

use glam::Vec2;
use lktrack_core::{Flow, FlowFailure, FlowOutcome, Frame, Keypoint, LkError, Result};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::gradient::compute_gradients;
use crate::lucas_kanade::{check_window_size, finite_flow, StructureTensor};

/// Parameters for [`iterative_lucas_kanade`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IterativeLucasKanade {
    pub window_size: usize,
    pub num_iters: u32,
}

impl Default for IterativeLucasKanade {
    fn default() -> Self {
        Self {
            window_size: 9,
            num_iters: 7,
        }
    }
}

impl IterativeLucasKanade {
    pub fn estimate(
        &self,
        prev: &Frame,
        next: &Frame,
        keypoints: &[Keypoint],
    ) -> Result<Vec<FlowOutcome>> {
        iterative_lucas_kanade(prev, next, keypoints, self.window_size, self.num_iters, None)
    }
}

/// Refine a flow estimate per keypoint with a fixed number of Gauss-Newton steps.
///
/// The normal matrix is built once from the gradients of `prev` around each
/// keypoint; every step re-samples `next` at the rounded position
/// `keypoint + guess + v` and adds `G⁻¹ b` to `v`. `guess` (default zero)
/// offsets the sampling position and is not included in the returned flow.
pub fn iterative_lucas_kanade(
    prev: &Frame,
    next: &Frame,
    keypoints: &[Keypoint],
    window_size: usize,
    num_iters: u32,
    guess: Option<&[Flow]>,
) -> Result<Vec<FlowOutcome>> {
    check_window_size(window_size, prev)?;
    refine_level(prev, next, keypoints, window_size, num_iters, guess)
}

/// [`iterative_lucas_kanade`] without the window bound, for pyramid levels
/// that may be smaller than the window.
pub(crate) fn refine_level(
    prev: &Frame,
    next: &Frame,
    keypoints: &[Keypoint],
    window_size: usize,
    num_iters: u32,
    guess: Option<&[Flow]>,
) -> Result<Vec<FlowOutcome>> {
    prev.ensure_same_shape(next)?;
    if let Some(guess) = guess {
        if guess.len() != keypoints.len() {
            return Err(LkError::InvalidParameter(format!(
                "{} guesses for {} keypoints",
                guess.len(),
                keypoints.len()
            )));
        }
    }
    let (iy, ix) = compute_gradients(prev)?;
    let level = LevelImages {
        prev,
        next,
        ix: &ix,
        iy: &iy,
    };

    Ok(keypoints
        .par_iter()
        .enumerate()
        .map(|(i, &kp)| {
            let g = guess.map_or(Flow::ZERO, |g| g[i]);
            level.refine(kp, g, window_size, num_iters)
        })
        .collect())
}

/// Read-only inputs shared by every keypoint at one resolution.
struct LevelImages<'a> {
    prev: &'a Frame,
    next: &'a Frame,
    ix: &'a Frame,
    iy: &'a Frame,
}

impl LevelImages<'_> {
    fn refine(&self, kp: Keypoint, guess: Flow, window_size: usize, num_iters: u32) -> FlowOutcome {
        if !kp.is_finite() || !guess.is_finite() {
            return Err(FlowFailure::NonFinite);
        }
        let (y1, x1) = kp.rounded();
        let a = self.prev.window(y1, x1, window_size);
        let ax = self.ix.window(y1, x1, window_size);
        let ay = self.iy.window(y1, x1, window_size);
        let g_inv = StructureTensor::from_gradients(&ax, &ay).inverse()?;

        let mut v = Vec2::ZERO;
        for _ in 0..num_iters {
            let (y2, x2) = (kp + guess + Flow::from(v)).rounded();
            let b = self.next.window(y2, x2, window_size);
            let mut bk = Vec2::ZERO;
            for j in 0..a.len() {
                let ik = a[j] - b[j];
                bk += ik * Vec2::new(ax[j], ay[j]);
            }
            v += g_inv * bk;
            if !v.is_finite() {
                break;
            }
        }
        finite_flow(v)
    }
}
