//! Vision Layer
//!
//! Turns scanned pages into word crops and word images into fixed-size
//! model samples:
//! - [`segment`]: page -> right-to-left ordered word crops
//! - [`mask`]: ink binarization and word-merging dilation
//! - [`preprocess`]: crop -> normalized `target_height x target_width` sample

pub mod mask;
pub mod preprocess;
pub mod segment;

pub use preprocess::normalize;
pub use segment::Segmenter;

use imageproc::point::Point;

/// Axis-aligned box in pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    /// Smallest box containing every point (inclusive pixel extents)
    pub fn from_points(points: &[Point<u32>]) -> Option<Self> {
        let first = points.first()?;
        let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
        for p in &points[1..] {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }
        Some(Self::new(min_x, min_y, max_x - min_x + 1, max_y - min_y + 1))
    }

    /// Noise filter: both sides strictly larger than the minimums
    pub fn exceeds(&self, min_width: u32, min_height: u32) -> bool {
        self.width > min_width && self.height > min_height
    }
}
