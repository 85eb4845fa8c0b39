//! Gaussian image pyramids for coarse-to-fine flow estimation.

use lktrack_core::{Frame, LkError, Result};

/// Kernel half-width in standard deviations.
const TRUNCATE: f32 = 4.0;

/// Multi-scale image pyramid.
///
/// `levels[0]` is the input frame; each further level is the previous one
/// Gaussian-smoothed and shrunk by `downscale` (rounded up).
#[derive(Debug, Clone)]
pub struct GaussianPyramid {
    pub levels: Vec<Frame>,
    pub downscale: f32,
}

impl GaussianPyramid {
    /// Build `max_level + 1` levels from `frame`.
    pub fn build(frame: &Frame, max_level: usize, downscale: f32) -> Result<Self> {
        if !(downscale.is_finite() && downscale > 1.0) {
            return Err(LkError::InvalidParameter(format!(
                "pyramid downscale must be > 1, got {downscale}"
            )));
        }
        let sigma = 2.0 * downscale / 6.0;
        let kernel = gaussian_kernel(sigma);

        let mut levels = Vec::with_capacity(max_level + 1);
        levels.push(frame.clone());
        for _ in 0..max_level {
            let Some(prev) = levels.last() else {
                break;
            };
            let nw = shrink(prev.width, downscale);
            let nh = shrink(prev.height, downscale);
            let blurred = convolve_separable(prev, &kernel);
            levels.push(resize_bilinear(&blurred, nw, nh));
        }
        Ok(Self { levels, downscale })
    }

    pub fn num_levels(&self) -> usize {
        self.levels.len()
    }

    /// Resolution factor between level 0 and `level`.
    pub fn scale_at(&self, level: usize) -> f32 {
        self.downscale.powi(level as i32)
    }
}

fn shrink(len: u32, downscale: f32) -> u32 {
    ((len as f64 / downscale as f64).ceil() as u32).max(1)
}

/// Normalized 1D Gaussian kernel truncated at `TRUNCATE` sigmas.
fn gaussian_kernel(sigma: f32) -> Vec<f32> {
    let radius = (TRUNCATE * sigma + 0.5) as i32;
    let denom = 2.0 * sigma * sigma;
    let mut kernel: Vec<f32> = (-radius..=radius)
        .map(|i| (-((i * i) as f32) / denom).exp())
        .collect();
    let sum: f32 = kernel.iter().sum();
    for k in &mut kernel {
        *k /= sum;
    }
    kernel
}

/// Mirror an index into `0..len` about the edge samples, without repeating
/// them: `d c b | a b c d | c b a`.
fn reflect(i: i32, len: i32) -> usize {
    if len == 1 {
        return 0;
    }
    let period = 2 * (len - 1);
    let i = i.rem_euclid(period);
    if i >= len {
        (period - i) as usize
    } else {
        i as usize
    }
}

/// Gaussian blur as a row pass followed by a column pass.
pub fn gaussian_blur(img: &Frame, sigma: f32) -> Frame {
    convolve_separable(img, &gaussian_kernel(sigma))
}

fn convolve_separable(img: &Frame, kernel: &[f32]) -> Frame {
    let w = img.width as i32;
    let h = img.height as i32;
    let radius = (kernel.len() / 2) as i32;

    let mut rows = Frame::new(img.width, img.height);
    for r in 0..h {
        let line = &img.data[(r * w) as usize..((r + 1) * w) as usize];
        for c in 0..w {
            let mut acc = 0.0f32;
            for (k, weight) in kernel.iter().enumerate() {
                acc += weight * line[reflect(c + k as i32 - radius, w)];
            }
            rows.data[(r * w + c) as usize] = acc;
        }
    }

    let mut out = Frame::new(img.width, img.height);
    for r in 0..h {
        for c in 0..w {
            let mut acc = 0.0f32;
            for (k, weight) in kernel.iter().enumerate() {
                let rr = reflect(r + k as i32 - radius, h);
                acc += weight * rows.data[rr * w as usize + c as usize];
            }
            out.data[(r * w + c) as usize] = acc;
        }
    }
    out
}

/// Bilinear resample with pixel centres aligned between the two grids.
fn resize_bilinear(img: &Frame, new_w: u32, new_h: u32) -> Frame {
    let scale_x = img.width as f32 / new_w as f32;
    let scale_y = img.height as f32 / new_h as f32;
    let max_x = (img.width - 1) as f32;
    let max_y = (img.height - 1) as f32;

    Frame::from_fn(new_w, new_h, |r, c| {
        let sy = ((r as f32 + 0.5) * scale_y - 0.5).clamp(0.0, max_y);
        let sx = ((c as f32 + 0.5) * scale_x - 0.5).clamp(0.0, max_x);
        let y0 = sy.floor() as i32;
        let x0 = sx.floor() as i32;
        let fy = sy - y0 as f32;
        let fx = sx - x0 as f32;

        let v00 = img.get(y0, x0);
        let v01 = img.get(y0, x0 + 1);
        let v10 = img.get(y0 + 1, x0);
        let v11 = img.get(y0 + 1, x0 + 1);
        v00 * (1.0 - fx) * (1.0 - fy)
            + v01 * fx * (1.0 - fy)
            + v10 * (1.0 - fx) * fy
            + v11 * fx * fy
    })
}
