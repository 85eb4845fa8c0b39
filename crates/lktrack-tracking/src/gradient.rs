//! Spatial image derivatives.

use lktrack_core::{Frame, LkError, Result};

/// Compute spatial gradients of a frame, returned as `(iy, ix)`.
///
/// Central differences in the interior, one-sided differences on the
/// first and last row/column.
pub fn compute_gradients(img: &Frame) -> Result<(Frame, Frame)> {
    if img.width < 2 || img.height < 2 {
        return Err(LkError::FrameTooSmall {
            width: img.width,
            height: img.height,
        });
    }
    let w = img.width as usize;
    let h = img.height as usize;
    let px = |r: usize, c: usize| img.data[r * w + c];

    let mut iy = Frame::new(img.width, img.height);
    let mut ix = Frame::new(img.width, img.height);
    for r in 0..h {
        for c in 0..w {
            let gx = if c == 0 {
                px(r, 1) - px(r, 0)
            } else if c == w - 1 {
                px(r, c) - px(r, c - 1)
            } else {
                (px(r, c + 1) - px(r, c - 1)) * 0.5
            };
            let gy = if r == 0 {
                px(1, c) - px(0, c)
            } else if r == h - 1 {
                px(r, c) - px(r - 1, c)
            } else {
                (px(r + 1, c) - px(r - 1, c)) * 0.5
            };
            ix.data[r * w + c] = gx;
            iy.data[r * w + c] = gy;
        }
    }
    Ok((iy, ix))
}
