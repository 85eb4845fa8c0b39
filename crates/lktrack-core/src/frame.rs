//! Grayscale frame buffers in CPU memory.

use serde::{Deserialize, Serialize};

use crate::error::{LkError, Result};

/// A grayscale frame of f32 brightness samples, stored row-major.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "FrameData")]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub data: Vec<f32>,
}

/// Unvalidated wire form of a [`Frame`].
#[derive(Deserialize)]
struct FrameData {
    width: u32,
    height: u32,
    data: Vec<f32>,
}

impl TryFrom<FrameData> for Frame {
    type Error = LkError;

    fn try_from(raw: FrameData) -> Result<Self> {
        Self::from_vec(raw.width, raw.height, raw.data)
    }
}

impl Frame {
    /// Create a zero-filled frame.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0.0; width as usize * height as usize],
        }
    }

    /// Wrap an existing row-major buffer.
    pub fn from_vec(width: u32, height: u32, data: Vec<f32>) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(LkError::InvalidParameter(format!(
                "frame must not be empty, got {}x{}",
                width, height
            )));
        }
        let expected = width as usize * height as usize;
        if data.len() != expected {
            return Err(LkError::InvalidParameter(format!(
                "frame {}x{} needs {} samples, got {}",
                width,
                height,
                expected,
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Build a frame by evaluating `f(row, col)` at every pixel.
    pub fn from_fn(width: u32, height: u32, mut f: impl FnMut(u32, u32) -> f32) -> Self {
        let mut data = Vec::with_capacity(width as usize * height as usize);
        for row in 0..height {
            for col in 0..width {
                data.push(f(row, col));
            }
        }
        Self {
            width,
            height,
            data,
        }
    }

    /// (rows, cols) of the frame.
    #[inline]
    pub fn shape(&self) -> (u32, u32) {
        (self.height, self.width)
    }

    #[inline]
    fn index(&self, row: u32, col: u32) -> usize {
        row as usize * self.width as usize + col as usize
    }

    /// Sample at (row, col), clamping coordinates to the nearest edge pixel.
    #[inline]
    pub fn get(&self, row: i32, col: i32) -> f32 {
        self.sample(i64::from(row), i64::from(col))
    }

    #[inline]
    fn sample(&self, row: i64, col: i64) -> f32 {
        let row = row.clamp(0, i64::from(self.height) - 1) as u32;
        let col = col.clamp(0, i64::from(self.width) - 1) as u32;
        self.data[self.index(row, col)]
    }

    #[inline]
    pub fn set(&mut self, row: u32, col: u32, val: f32) {
        if row < self.height && col < self.width {
            let idx = self.index(row, col);
            self.data[idx] = val;
        }
    }

    /// Extract the `size`x`size` window centred on (row, col), flattened row-major.
    ///
    /// Pixels outside the frame read as the nearest edge pixel.
    pub fn window(&self, row: i32, col: i32, size: usize) -> Vec<f32> {
        let half = i64::try_from(size / 2).unwrap_or(i64::MAX);
        let (row, col) = (i64::from(row), i64::from(col));
        let mut out = Vec::with_capacity(size.saturating_mul(size));
        for r in row.saturating_sub(half)..=row.saturating_add(half) {
            for c in col.saturating_sub(half)..=col.saturating_add(half) {
                out.push(self.sample(r, c));
            }
        }
        out
    }

    /// Fail with [`LkError::InvalidParameter`] if a `size`x`size` window is
    /// wider than the frame along both axes.
    pub fn ensure_window_fits(&self, size: usize) -> Result<()> {
        let side = self.width.max(self.height) as usize;
        if size > side {
            return Err(LkError::InvalidParameter(format!(
                "window of {size} pixels does not fit a {}x{} frame",
                self.width, self.height
            )));
        }
        Ok(())
    }

    /// Copy the `size`x`size` neighbourhood of (row, col) into its own frame.
    pub fn patch(&self, row: i32, col: i32, size: u32) -> Frame {
        Frame {
            width: size,
            height: size,
            data: self.window(row, col, size as usize),
        }
    }

    /// Fail with [`LkError::ShapeMismatch`] unless `other` has this frame's shape.
    pub fn ensure_same_shape(&self, other: &Frame) -> Result<()> {
        if self.shape() != other.shape() {
            return Err(LkError::ShapeMismatch {
                expected: self.shape(),
                got: other.shape(),
            });
        }
        Ok(())
    }
}
