// Synthetic camera - produces a moving test pattern instead of real video

use crate::core::capture::{CaptureDevice, FramePoll, VideoStream};
use crate::models::capture::{AccessError, AccessResult, CaptureConstraints, PixelFormat, RawFrame};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// Test-pattern capture device.
///
/// Only one stream may be open at a time; a second acquire reports
/// [`AccessError::DeviceBusy`] until the first stream's tracks are stopped.
#[derive(Debug, Clone)]
pub struct SyntheticCamera {
    access_error: Option<AccessError>,
    resolution: Option<(u32, u32)>,
    warmup_polls: u32,
    frame_limit: Option<u64>,
    in_use: Arc<AtomicBool>,
    acquisitions: Arc<AtomicUsize>,
    releases: Arc<AtomicUsize>,
}

impl SyntheticCamera {
    pub fn new() -> Self {
        Self {
            access_error: None,
            resolution: None,
            warmup_polls: 0,
            frame_limit: None,
            in_use: Arc::new(AtomicBool::new(false)),
            acquisitions: Arc::new(AtomicUsize::new(0)),
            releases: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Simulate the user refusing camera access
    pub fn denied(reason: &str) -> Self {
        Self {
            access_error: Some(AccessError::PermissionDenied(reason.to_string())),
            ..Self::new()
        }
    }

    /// Simulate a machine with no camera attached
    pub fn missing() -> Self {
        Self {
            access_error: Some(AccessError::NoDevice),
            ..Self::new()
        }
    }

    /// Produce frames at a fixed size regardless of the requested constraints
    pub fn with_resolution(mut self, width: u32, height: u32) -> Self {
        self.resolution = Some((width, height));
        self
    }

    /// Report "no frame ready" for the first `polls` polls of each stream
    pub fn with_warmup(mut self, polls: u32) -> Self {
        self.warmup_polls = polls;
        self
    }

    /// End each stream after `frames` frames
    pub fn ending_after(mut self, frames: u64) -> Self {
        self.frame_limit = Some(frames);
        self
    }

    pub fn is_in_use(&self) -> bool {
        self.in_use.load(Ordering::SeqCst)
    }

    pub fn acquisitions(&self) -> usize {
        self.acquisitions.load(Ordering::SeqCst)
    }

    pub fn releases(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }
}

impl Default for SyntheticCamera {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CaptureDevice for SyntheticCamera {
    async fn acquire(&self, constraints: &CaptureConstraints) -> AccessResult<Box<dyn VideoStream>> {
        if let Some(err) = &self.access_error {
            return Err(err.clone());
        }

        if constraints.audio {
            return Err(AccessError::Unsupported(
                "synthetic camera has no audio track".to_string(),
            ));
        }

        let (width, height) = self
            .resolution
            .unwrap_or((constraints.width, constraints.height));
        if width == 0 || height == 0 {
            return Err(AccessError::Unsupported(format!(
                "cannot produce {}x{} frames",
                width, height
            )));
        }

        if self.in_use.swap(true, Ordering::SeqCst) {
            return Err(AccessError::DeviceBusy(
                "synthetic camera is already streaming".to_string(),
            ));
        }

        self.acquisitions.fetch_add(1, Ordering::SeqCst);
        tracing::debug!(width, height, "Synthetic camera acquired");

        Ok(Box::new(SyntheticStream {
            width,
            height,
            frame_index: 0,
            warmup_remaining: self.warmup_polls,
            frame_limit: self.frame_limit,
            in_use: self.in_use.clone(),
            releases: self.releases.clone(),
            stopped: false,
        }))
    }
}

struct SyntheticStream {
    width: u32,
    height: u32,
    frame_index: u64,
    warmup_remaining: u32,
    frame_limit: Option<u64>,
    in_use: Arc<AtomicBool>,
    releases: Arc<AtomicUsize>,
    stopped: bool,
}

impl SyntheticStream {
    /// Diagonal gradient with a bright block sweeping left to right
    fn render(&self) -> RawFrame {
        let (w, h) = (self.width, self.height);
        let shift = (self.frame_index * 4) as u32;
        let block = (w / 8).max(1);
        let block_x = shift % w.max(1);
        let block_y = h / 3;

        let mut data = Vec::with_capacity((w as usize) * (h as usize) * 4);
        for y in 0..h {
            for x in 0..w {
                let in_block = x >= block_x
                    && x < block_x.saturating_add(block)
                    && y >= block_y
                    && y < block_y.saturating_add(block);
                if in_block {
                    data.extend_from_slice(&[240, 220, 200, 255]);
                } else {
                    let r = (x.wrapping_add(shift) % 256) as u8;
                    let g = (y % 256) as u8;
                    let b = ((x + y) / 2 % 256) as u8;
                    data.extend_from_slice(&[r, g, b, 255]);
                }
            }
        }

        RawFrame {
            timestamp: chrono::Utc::now().timestamp_millis(),
            width: w,
            height: h,
            data,
            format: PixelFormat::RGBA8,
        }
    }
}

impl VideoStream for SyntheticStream {
    fn dimensions(&self) -> Option<(u32, u32)> {
        Some((self.width, self.height))
    }

    fn poll_frame(&mut self) -> FramePoll {
        if self.stopped {
            return FramePoll::Ended("tracks stopped".to_string());
        }

        if self.warmup_remaining > 0 {
            self.warmup_remaining -= 1;
            return FramePoll::Pending;
        }

        if let Some(limit) = self.frame_limit {
            if self.frame_index >= limit {
                return FramePoll::Ended(format!("synthetic source ended after {} frames", limit));
            }
        }

        let frame = self.render();
        self.frame_index += 1;
        FramePoll::Ready(frame)
    }

    fn stop_tracks(&mut self) {
        if !self.stopped {
            self.stopped = true;
            self.in_use.store(false, Ordering::SeqCst);
            self.releases.fetch_add(1, Ordering::SeqCst);
        }
    }
}
