// Per-frame annotation steps: resize, copy, detect, obscure

use crate::core::detector::RegionDetector;
use crate::core::redactor::Redactor;
use crate::core::surface::RenderSurface;
use crate::models::capture::RawFrame;
use crate::models::region::RegionOfInterest;

/// What happened to a single frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameReport {
    pub width: u32,
    pub height: u32,
    pub regions: Vec<RegionOfInterest>,
    pub obscured: usize,
}

/// Renders frames onto a surface and obscures detected regions
pub struct FramePipeline<S: RenderSurface> {
    surface: S,
    detector: Box<dyn RegionDetector>,
    redactor: Redactor,
    obscure_enabled: bool,
}

impl<S: RenderSurface> FramePipeline<S> {
    pub fn new(surface: S, detector: Box<dyn RegionDetector>, redactor: Redactor) -> Self {
        Self {
            surface,
            detector,
            redactor,
            obscure_enabled: true,
        }
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn obscure_enabled(&self) -> bool {
        self.obscure_enabled
    }

    pub fn set_obscure(&mut self, enabled: bool) {
        self.obscure_enabled = enabled;
    }

    pub fn set_redactor(&mut self, redactor: Redactor) {
        self.redactor = redactor;
    }

    pub fn set_detector(&mut self, detector: Box<dyn RegionDetector>) {
        self.detector = detector;
    }

    /// Render one frame and obscure whatever the detector finds.
    ///
    /// Returns `None` when the surface could not draw the frame; detection
    /// does not run on a frame that never reached the surface.
    pub fn process(&mut self, frame: &RawFrame) -> Option<FrameReport> {
        if self.surface.dimensions() != (frame.width, frame.height) {
            self.surface.resize(frame.width, frame.height);
        }
        if !self.surface.draw_frame(frame) {
            return None;
        }

        let regions: Vec<RegionOfInterest> = self
            .detector
            .detect(frame)
            .into_iter()
            .filter(|roi| {
                let inside = roi.fits_within(frame.width, frame.height);
                if !inside {
                    tracing::warn!(?roi, "Detector returned a region outside the frame");
                }
                inside
            })
            .collect();

        let obscured = if self.obscure_enabled && !regions.is_empty() {
            self.redactor.obscure(&mut self.surface, &regions)
        } else {
            0
        };

        Some(FrameReport {
            width: frame.width,
            height: frame.height,
            regions,
            obscured,
        })
    }

    /// Release the surface contents
    pub fn clear(&mut self) {
        self.surface.clear();
    }
}
