// Rectangular regions flagged for obscuring

use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle inside a frame, in whole pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionOfInterest {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl RegionOfInterest {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    pub fn right(&self) -> u64 {
        self.x as u64 + self.width as u64
    }

    pub fn bottom(&self) -> u64 {
        self.y as u64 + self.height as u64
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Whether the whole rectangle lies inside a frame of the given size
    pub fn fits_within(&self, frame_width: u32, frame_height: u32) -> bool {
        self.right() <= frame_width as u64 && self.bottom() <= frame_height as u64
    }

    pub fn contains(&self, px: u32, py: u32) -> bool {
        px >= self.x && (px as u64) < self.right() && py >= self.y && (py as u64) < self.bottom()
    }

    /// Shrink the rectangle so it fits inside a frame of the given size
    pub fn clamp_to(&self, frame_width: u32, frame_height: u32) -> Self {
        let x = self.x.min(frame_width);
        let y = self.y.min(frame_height);
        Self {
            x,
            y,
            width: self.width.min(frame_width - x),
            height: self.height.min(frame_height - y),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fits_within_edges() {
        let roi = RegionOfInterest::new(10, 10, 90, 40);
        assert!(roi.fits_within(100, 50));
        assert!(!roi.fits_within(99, 50));
        assert!(!roi.fits_within(100, 49));
    }

    #[test]
    fn test_clamp_to_frame() {
        let roi = RegionOfInterest::new(80, 120, 50, 50).clamp_to(100, 100);
        assert_eq!(roi, RegionOfInterest::new(80, 100, 20, 0));
        assert!(roi.is_empty());
        assert!(roi.fits_within(100, 100));
    }

    #[test]
    fn test_contains() {
        let roi = RegionOfInterest::new(5, 5, 10, 10);
        assert!(roi.contains(5, 5));
        assert!(roi.contains(14, 14));
        assert!(!roi.contains(15, 5));
        assert!(!roi.contains(4, 10));
    }

    #[test]
    fn test_no_overflow_near_u32_max() {
        let roi = RegionOfInterest::new(u32::MAX, 0, u32::MAX, 1);
        assert!(!roi.fits_within(u32::MAX, 1));
    }
}
