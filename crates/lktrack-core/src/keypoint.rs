//! Keypoints and flow vectors.
//!
//! Both are kept in (row, column) = (y, x) order everywhere, and serialize as
//! two-element arrays in that order.

use std::ops::{Add, Mul};

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::error::FlowFailure;

/// A tracked image location, possibly at sub-pixel precision.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "[f32; 2]", into = "[f32; 2]")]
pub struct Keypoint {
    pub row: f32,
    pub col: f32,
}

impl Keypoint {
    #[inline]
    pub const fn new(row: f32, col: f32) -> Self {
        Self { row, col }
    }

    /// Nearest integer pixel, rounding halves to even.
    #[inline]
    pub fn rounded(self) -> (i32, i32) {
        (
            self.row.round_ties_even() as i32,
            self.col.round_ties_even() as i32,
        )
    }

    /// The same location expressed at a resolution `factor` times smaller.
    #[inline]
    pub fn downscaled(self, factor: f32) -> Self {
        Self::new(self.row / factor, self.col / factor)
    }

    /// Snap to the nearest integer pixel.
    #[inline]
    pub fn snapped(self) -> Self {
        let (row, col) = self.rounded();
        Self::new(row as f32, col as f32)
    }

    pub fn is_finite(self) -> bool {
        self.row.is_finite() && self.col.is_finite()
    }
}

impl From<[f32; 2]> for Keypoint {
    fn from([row, col]: [f32; 2]) -> Self {
        Self::new(row, col)
    }
}

impl From<Keypoint> for [f32; 2] {
    fn from(kp: Keypoint) -> Self {
        [kp.row, kp.col]
    }
}

impl Add<Flow> for Keypoint {
    type Output = Keypoint;

    #[inline]
    fn add(self, flow: Flow) -> Keypoint {
        Keypoint::new(self.row + flow.dy, self.col + flow.dx)
    }
}

/// A 2D displacement (Δrow, Δcol) paired by index with a keypoint.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "[f32; 2]", into = "[f32; 2]")]
pub struct Flow {
    pub dy: f32,
    pub dx: f32,
}

impl Flow {
    pub const ZERO: Self = Self { dy: 0.0, dx: 0.0 };

    #[inline]
    pub const fn new(dy: f32, dx: f32) -> Self {
        Self { dy, dx }
    }

    #[inline]
    pub fn magnitude(self) -> f32 {
        self.dy.hypot(self.dx)
    }

    pub fn is_finite(self) -> bool {
        self.dy.is_finite() && self.dx.is_finite()
    }
}

impl From<[f32; 2]> for Flow {
    fn from([dy, dx]: [f32; 2]) -> Self {
        Self::new(dy, dx)
    }
}

impl From<Flow> for [f32; 2] {
    fn from(flow: Flow) -> Self {
        [flow.dy, flow.dx]
    }
}

/// Solvers work in image (x, y) space; flows are reported as (dy, dx).
impl From<Vec2> for Flow {
    #[inline]
    fn from(v: Vec2) -> Self {
        Self::new(v.y, v.x)
    }
}

impl Add for Flow {
    type Output = Flow;

    #[inline]
    fn add(self, rhs: Flow) -> Flow {
        Flow::new(self.dy + rhs.dy, self.dx + rhs.dx)
    }
}

impl Mul<f32> for Flow {
    type Output = Flow;

    #[inline]
    fn mul(self, rhs: f32) -> Flow {
        Flow::new(self.dy * rhs, self.dx * rhs)
    }
}

/// Per-keypoint solver output: a flow vector or the reason there is none.
pub type FlowOutcome = std::result::Result<Flow, FlowFailure>;
