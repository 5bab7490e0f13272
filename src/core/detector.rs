// Region detection - maps a frame to the rectangles that should be obscured

use crate::core::config::RegionPolicy;
use crate::models::capture::RawFrame;
use crate::models::region::RegionOfInterest;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Anything that can find regions of interest in a frame.
///
/// Implementations must only return rectangles that lie inside the frame.
/// They may keep state between frames, hence `&mut self`.
pub trait RegionDetector: Send {
    fn detect(&mut self, frame: &RawFrame) -> Vec<RegionOfInterest>;
}

/// Stand-in detector that scatters random boxes over the frame.
///
/// Boxes are resampled independently on every call, so consecutive frames
/// show unrelated regions.
pub struct RandomRegionDetector<R = StdRng> {
    rng: R,
    policy: RegionPolicy,
}

impl RandomRegionDetector<StdRng> {
    pub fn new(policy: RegionPolicy) -> Self {
        Self::with_rng(policy, StdRng::from_entropy())
    }
}

impl<R: Rng + Send> RandomRegionDetector<R> {
    pub fn with_rng(policy: RegionPolicy, rng: R) -> Self {
        Self { rng, policy }
    }

    fn sample_region(&mut self, width: u32, height: u32) -> RegionOfInterest {
        let policy = &self.policy;
        let frame_w = width as f32;
        let frame_h = height as f32;

        let x = self.rng.gen::<f32>() * frame_w * policy.position_fraction;
        let y = self.rng.gen::<f32>() * frame_h * policy.position_fraction;
        let w = frame_w
            * (policy.min_width_fraction
                + self.rng.gen::<f32>() * (policy.max_width_fraction - policy.min_width_fraction));
        let h = frame_h
            * (policy.min_height_fraction
                + self.rng.gen::<f32>() * (policy.max_height_fraction - policy.min_height_fraction));

        RegionOfInterest::new(x as u32, y as u32, (w as u32).max(1), (h as u32).max(1))
            .clamp_to(width, height)
    }
}

impl<R: Rng + Send> RegionDetector for RandomRegionDetector<R> {
    fn detect(&mut self, frame: &RawFrame) -> Vec<RegionOfInterest> {
        if frame.width == 0 || frame.height == 0 {
            return Vec::new();
        }

        let count = self
            .rng
            .gen_range(self.policy.min_count..=self.policy.max_count.max(self.policy.min_count));

        (0..count)
            .map(|_| self.sample_region(frame.width, frame.height))
            .collect()
    }
}

/// Detector that reports the parts of the frame that changed since the last call.
///
/// The frame is split into a grid; a cell counts as changed when more than 5%
/// of its pixels differ from the previous frame by more than the per-channel
/// threshold. Horizontally adjacent changed cells are merged into one region.
pub struct MotionRegionDetector {
    previous_frame: Option<Vec<u8>>,
    previous_dimensions: Option<(u32, u32)>,
    grid_size: u32,
    pixel_diff_threshold: u8,
}

impl MotionRegionDetector {
    pub fn new(grid_size: u32, pixel_diff_threshold: u8) -> Self {
        Self {
            previous_frame: None,
            previous_dimensions: None,
            grid_size: grid_size.max(1),
            pixel_diff_threshold,
        }
    }

    /// Forget the previous frame
    pub fn reset(&mut self) {
        self.previous_frame = None;
        self.previous_dimensions = None;
    }

    fn cell_changed(
        &self,
        previous: &[u8],
        current: &[u8],
        width: u32,
        x_range: std::ops::Range<u32>,
        y_range: std::ops::Range<u32>,
    ) -> bool {
        let mut changed = 0usize;
        let mut total = 0usize;

        for y in y_range {
            for x in x_range.clone() {
                let i = ((y as usize) * (width as usize) + x as usize) * 4;
                let (Some(prev), Some(curr)) = (previous.get(i..i + 3), current.get(i..i + 3)) else {
                    continue;
                };
                total += 1;

                let differs = prev
                    .iter()
                    .zip(curr)
                    .any(|(a, b)| a.abs_diff(*b) > self.pixel_diff_threshold);
                if differs {
                    changed += 1;
                }
            }
        }

        total > 0 && (changed as f32 / total as f32) > 0.05
    }
}

impl Default for MotionRegionDetector {
    fn default() -> Self {
        Self::new(10, 10)
    }
}

impl RegionDetector for MotionRegionDetector {
    fn detect(&mut self, frame: &RawFrame) -> Vec<RegionOfInterest> {
        let dims = (frame.width, frame.height);

        // First frame or resolution change: nothing to compare against
        let previous = match self.previous_frame.take() {
            Some(prev) if self.previous_dimensions == Some(dims) => prev,
            _ => {
                self.previous_frame = Some(frame.data.clone());
                self.previous_dimensions = Some(dims);
                return Vec::new();
            }
        };

        let cell_width = frame.width / self.grid_size;
        let cell_height = frame.height / self.grid_size;
        let mut regions = Vec::new();

        if cell_width > 0 && cell_height > 0 {
            for grid_y in 0..self.grid_size {
                let y_start = grid_y * cell_height;
                let y_range = y_start..y_start + cell_height;
                let mut run_start: Option<u32> = None;

                for grid_x in 0..=self.grid_size {
                    let changed = grid_x < self.grid_size && {
                        let x_start = grid_x * cell_width;
                        self.cell_changed(
                            &previous,
                            &frame.data,
                            frame.width,
                            x_start..x_start + cell_width,
                            y_range.clone(),
                        )
                    };

                    match (changed, run_start) {
                        (true, None) => run_start = Some(grid_x),
                        (false, Some(start)) => {
                            regions.push(RegionOfInterest::new(
                                start * cell_width,
                                y_start,
                                (grid_x - start) * cell_width,
                                cell_height,
                            ));
                            run_start = None;
                        }
                        _ => {}
                    }
                }
            }
        }

        self.previous_frame = Some(frame.data.clone());
        regions
    }
}
