//! Single-level Lucas-Kanade flow.
//!
//! Each keypoint is solved independently from the normal equations
//! `(AᵀA) v = Aᵀb`, where the rows of `A` are the spatial gradients over a
//! square window and `b` is the negated temporal difference.

use glam::{Mat2, Vec2};
use lktrack_core::{Flow, FlowFailure, FlowOutcome, Frame, Keypoint, LkError, Result};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::gradient::compute_gradients;

/// Smallest accepted `det(G) / trace(G)^2`. Below this the window is treated
/// as textureless along one direction.
const MIN_CONDITION: f32 = 1e-6;

/// Parameters for [`lucas_kanade`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LucasKanade {
    /// Odd side length of the square window around each keypoint.
    pub window_size: usize,
}

impl Default for LucasKanade {
    fn default() -> Self {
        Self { window_size: 5 }
    }
}

impl LucasKanade {
    pub fn estimate(
        &self,
        prev: &Frame,
        next: &Frame,
        keypoints: &[Keypoint],
    ) -> Result<Vec<FlowOutcome>> {
        lucas_kanade(prev, next, keypoints, self.window_size)
    }
}

/// Estimate one flow vector per keypoint between `prev` and `next`.
///
/// Keypoints are rounded to the nearest pixel before their window is read.
/// Windows reaching past the frame edge read replicated edge pixels. A window
/// wider than the frame is an [`LkError::InvalidParameter`].
pub fn lucas_kanade(
    prev: &Frame,
    next: &Frame,
    keypoints: &[Keypoint],
    window_size: usize,
) -> Result<Vec<FlowOutcome>> {
    check_window_size(window_size, prev)?;
    prev.ensure_same_shape(next)?;
    let (iy, ix) = compute_gradients(prev)?;

    Ok(keypoints
        .par_iter()
        .map(|kp| {
            if !kp.is_finite() {
                return Err(FlowFailure::NonFinite);
            }
            let (row, col) = kp.rounded();
            let ax = ix.window(row, col, window_size);
            let ay = iy.window(row, col, window_size);
            let it: Vec<f32> = next
                .window(row, col, window_size)
                .iter()
                .zip(prev.window(row, col, window_size))
                .map(|(j, i)| j - i)
                .collect();

            let g_inv = StructureTensor::from_gradients(&ax, &ay).inverse()?;
            let b = ax
                .iter()
                .zip(&ay)
                .zip(&it)
                .fold(Vec2::ZERO, |acc, ((gx, gy), t)| acc - Vec2::new(gx * t, gy * t));
            finite_flow(g_inv * b)
        })
        .collect())
}

/// Windows must have an odd side no longer than the frame.
pub(crate) fn check_window_size(window_size: usize, frame: &Frame) -> Result<()> {
    if window_size % 2 == 0 {
        return Err(LkError::InvalidParameter(format!(
            "window_size must be odd, got {window_size}"
        )));
    }
    frame.ensure_window_fits(window_size)
}

pub(crate) fn finite_flow(v: Vec2) -> FlowOutcome {
    if v.is_finite() {
        Ok(Flow::from(v))
    } else {
        Err(FlowFailure::NonFinite)
    }
}

/// The 2x2 normal matrix `G = AᵀA` of a gradient window.
#[derive(Debug, Clone, Copy)]
pub(crate) struct StructureTensor {
    pub gxx: f32,
    pub gxy: f32,
    pub gyy: f32,
}

impl StructureTensor {
    pub fn from_gradients(ax: &[f32], ay: &[f32]) -> Self {
        debug_assert_eq!(ax.len(), ay.len());
        let mut t = Self {
            gxx: 0.0,
            gxy: 0.0,
            gyy: 0.0,
        };
        for (gx, gy) in ax.iter().zip(ay) {
            t.gxx += gx * gx;
            t.gxy += gx * gy;
            t.gyy += gy * gy;
        }
        t
    }

    pub fn determinant(&self) -> f32 {
        self.gxx * self.gyy - self.gxy * self.gxy
    }

    /// `G⁻¹`, or [`FlowFailure::SingularMatrix`] when `G` is ill-conditioned.
    pub fn inverse(&self) -> std::result::Result<Mat2, FlowFailure> {
        let det = self.determinant();
        let trace = self.gxx + self.gyy;
        if !(trace > 0.0 && det > MIN_CONDITION * trace * trace) {
            return Err(FlowFailure::SingularMatrix { determinant: det });
        }
        let inv_det = 1.0 / det;
        Ok(Mat2::from_cols(
            Vec2::new(self.gyy, -self.gxy) * inv_det,
            Vec2::new(-self.gxy, self.gxx) * inv_det,
        ))
    }
}
