//! Appearance error between two image patches.

use lktrack_core::{Frame, Result};

/// Mean squared difference between two patches after normalizing each to
/// zero mean and unit (population) standard deviation.
///
/// A patch with zero variance cannot be normalized; the error is then
/// `f32::INFINITY` so the comparison always counts as a mismatch.
pub fn compute_error(patch1: &Frame, patch2: &Frame) -> Result<f32> {
    patch1.ensure_same_shape(patch2)?;
    let (Some(a), Some(b)) = (standardize(&patch1.data), standardize(&patch2.data)) else {
        return Ok(f32::INFINITY);
    };
    let sum: f32 = a.iter().zip(&b).map(|(x, y)| (x - y) * (x - y)).sum();
    Ok(sum / a.len() as f32)
}

fn standardize(values: &[f32]) -> Option<Vec<f32>> {
    let n = values.len() as f32;
    let mean = values.iter().sum::<f32>() / n;
    let var = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f32>() / n;
    let std = var.sqrt();
    if !(std > 0.0 && std.is_finite()) {
        return None;
    }
    Some(values.iter().map(|v| (v - mean) / std).collect())
}
