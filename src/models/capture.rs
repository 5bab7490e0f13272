// Data structures for camera capture

use serde::{Deserialize, Serialize};

/// Message shown to the user whenever the camera cannot be acquired
pub const ACCESS_ERROR_MESSAGE: &str =
    "Unable to access camera. Please grant camera permissions and try again.";

/// Which way the requested camera should face
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FacingMode {
    User,
    Environment,
}

/// Parameters sent with a capture device request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureConstraints {
    pub width: u32,
    pub height: u32,
    pub facing: FacingMode,
    pub audio: bool,
}

impl Default for CaptureConstraints {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            facing: FacingMode::User,
            audio: false,
        }
    }
}

/// A single frame pulled from a video source
#[derive(Debug, Clone)]
pub struct RawFrame {
    pub timestamp: i64,
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
    pub format: PixelFormat,
}

impl RawFrame {
    /// Build a frame filled with a single RGBA color
    pub fn solid(width: u32, height: u32, color: [u8; 4]) -> Self {
        let pixel_count = (width as usize) * (height as usize);
        let mut data = Vec::with_capacity(pixel_count * 4);
        for _ in 0..pixel_count {
            data.extend_from_slice(&color);
        }

        Self {
            timestamp: chrono::Utc::now().timestamp_millis(),
            width,
            height,
            data,
            format: PixelFormat::RGBA8,
        }
    }

    /// True when the buffer holds exactly width * height pixels
    pub fn is_well_formed(&self) -> bool {
        self.data.len() == (self.width as usize) * (self.height as usize) * 4
    }

    /// RGBA value of the pixel at (x, y), converting from BGRA if needed
    pub fn rgba_at(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = ((y as usize) * (self.width as usize) + x as usize) * 4;
        let px = self.data.get(i..i + 4)?;
        Some(match self.format {
            PixelFormat::RGBA8 => [px[0], px[1], px[2], px[3]],
            PixelFormat::BGRA8 => [px[2], px[1], px[0], px[3]],
        })
    }
}

/// Pixel format of captured frames
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    RGBA8,
    BGRA8,
}

/// Failure to acquire the capture device.
///
/// The loop stays idle whenever one of these is returned from `start`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AccessError {
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("No capture device available")]
    NoDevice,

    #[error("Device busy: {0}")]
    DeviceBusy(String),

    #[error("Unsupported constraints: {0}")]
    Unsupported(String),
}

impl AccessError {
    /// Human-readable message for the presentation layer
    pub fn user_message(&self) -> String {
        format!("{} ({})", ACCESS_ERROR_MESSAGE, self)
    }
}

pub type AccessResult<T> = Result<T, AccessError>;
