//! Axis-aligned bounding boxes.

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle with (x, y) at the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    /// Create a new rectangle.
    #[inline]
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Minimum corner (top-left).
    #[inline]
    pub fn min(self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }

    /// Maximum corner (bottom-right).
    #[inline]
    pub fn max(self) -> Vec2 {
        Vec2::new(self.x + self.width, self.y + self.height)
    }

    /// Area of the rectangle.
    #[inline]
    pub fn area(self) -> f32 {
        self.width * self.height
    }

    /// Area shared with `other`; zero when the boxes do not overlap.
    pub fn intersection_area(self, other: Self) -> f32 {
        let extent = (self.max().min(other.max()) - self.min().max(other.min())).max(Vec2::ZERO);
        extent.x * extent.y
    }

    /// Intersection over union with `other`.
    ///
    /// Returns 0.0 when the union has no area.
    pub fn iou(self, other: Self) -> f32 {
        let intersection = self.intersection_area(other);
        let union = self.area() + other.area() - intersection;
        if union <= 0.0 {
            return 0.0;
        }
        intersection / union
    }
}

/// Intersection over union of two `(x, y, width, height)` boxes.
pub fn iou(a: Rect, b: Rect) -> f32 {
    a.iou(b)
}
