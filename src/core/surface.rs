// Render surfaces - where annotated frames are drawn

use crate::models::capture::{PixelFormat, RawFrame};
use crate::models::region::RegionOfInterest;
use image::imageops::{self, FilterType};
use image::{ImageResult, RgbaImage};
use std::path::Path;

/// Edge length of the indicator badge drawn for a glyph
pub const GLYPH_SIZE: u32 = 12;

/// Drawing operations the annotation pipeline needs from a surface
pub trait RenderSurface: Send {
    fn dimensions(&self) -> (u32, u32);

    /// Resize the surface; contents are discarded
    fn resize(&mut self, width: u32, height: u32);

    /// Copy a source frame onto the whole surface. Returns false when the
    /// frame could not be drawn and the surface was left as it was.
    fn draw_frame(&mut self, frame: &RawFrame) -> bool;

    /// Blur the pixels inside `region` without touching anything outside it
    fn blur_region(&mut self, region: &RegionOfInterest, radius: f32);

    /// Outline `region` with a border drawn on its inner edge
    fn stroke_rect(&mut self, region: &RegionOfInterest, color: [u8; 4], line_width: u32);

    /// Draw an indicator glyph with its baseline at `y`
    fn draw_glyph(&mut self, x: u32, y: u32, text: &str, color: [u8; 4]);

    /// Size a glyph occupies, as (width, height above the baseline)
    fn glyph_size(&self, _text: &str) -> (u32, u32) {
        (GLYPH_SIZE, GLYPH_SIZE)
    }

    /// Drop the current contents and any binding to a source
    fn clear(&mut self);
}

/// In-memory RGBA surface backed by an `image` buffer
#[derive(Debug, Clone)]
pub struct ImageSurface {
    image: RgbaImage,
}

impl ImageSurface {
    pub fn new() -> Self {
        Self {
            image: RgbaImage::new(0, 0),
        }
    }

    pub fn as_image(&self) -> &RgbaImage {
        &self.image
    }

    /// Write the current surface contents as a PNG file
    pub fn save_png(&self, path: &Path) -> ImageResult<()> {
        self.image.save_with_format(path, image::ImageFormat::Png)
    }

    fn frame_to_image(frame: &RawFrame) -> Option<RgbaImage> {
        if !frame.is_well_formed() {
            return None;
        }

        let mut data = frame.data.clone();
        if frame.format == PixelFormat::BGRA8 {
            for px in data.chunks_exact_mut(4) {
                px.swap(0, 2);
            }
        }

        RgbaImage::from_raw(frame.width, frame.height, data)
    }

    fn blend(&mut self, x: u32, y: u32, color: [u8; 4]) {
        let alpha = color[3] as f32 / 255.0;
        let dst = self.image.get_pixel_mut(x, y);
        for c in 0..3 {
            let mixed = color[c] as f32 * alpha + dst.0[c] as f32 * (1.0 - alpha);
            dst.0[c] = mixed.round().clamp(0.0, 255.0) as u8;
        }
        let out_alpha = alpha + dst.0[3] as f32 / 255.0 * (1.0 - alpha);
        dst.0[3] = (out_alpha * 255.0).round().clamp(0.0, 255.0) as u8;
    }

    fn fill(&mut self, region: &RegionOfInterest, color: [u8; 4]) {
        let (w, h) = self.image.dimensions();
        let region = region.clamp_to(w, h);
        for y in region.y..region.y + region.height {
            for x in region.x..region.x + region.width {
                self.blend(x, y, color);
            }
        }
    }
}

impl RenderSurface for ImageSurface {
    fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.image = RgbaImage::new(width, height);
    }

    fn draw_frame(&mut self, frame: &RawFrame) -> bool {
        let Some(source) = Self::frame_to_image(frame) else {
            tracing::warn!(
                width = frame.width,
                height = frame.height,
                len = frame.data.len(),
                "Dropping malformed frame"
            );
            return false;
        };

        let (w, h) = self.image.dimensions();
        if (w, h) == source.dimensions() {
            self.image = source;
        } else if w > 0 && h > 0 {
            self.image = imageops::resize(&source, w, h, FilterType::Triangle);
        } else {
            return false;
        }
        true
    }

    fn blur_region(&mut self, region: &RegionOfInterest, radius: f32) {
        let (w, h) = self.image.dimensions();
        let region = region.clamp_to(w, h);
        if region.is_empty() || radius <= 0.0 {
            return;
        }

        let patch = imageops::crop_imm(&self.image, region.x, region.y, region.width, region.height)
            .to_image();
        let blurred = imageops::blur(&patch, radius);
        imageops::replace(&mut self.image, &blurred, region.x as i64, region.y as i64);
    }

    fn stroke_rect(&mut self, region: &RegionOfInterest, color: [u8; 4], line_width: u32) {
        let (w, h) = self.image.dimensions();
        let region = region.clamp_to(w, h);
        if region.is_empty() {
            return;
        }

        let t = line_width.max(1);
        let top = RegionOfInterest::new(region.x, region.y, region.width, t.min(region.height));
        self.fill(&top, color);

        if region.height > t {
            let bottom_h = t.min(region.height - t);
            let bottom = RegionOfInterest::new(
                region.x,
                region.y + region.height - bottom_h,
                region.width,
                bottom_h,
            );
            self.fill(&bottom, color);

            let side_h = region.height - t - bottom_h;
            if side_h > 0 {
                let left_w = t.min(region.width);
                self.fill(&RegionOfInterest::new(region.x, region.y + t, left_w, side_h), color);
                if region.width > left_w {
                    let right_w = t.min(region.width - left_w);
                    self.fill(
                        &RegionOfInterest::new(
                            region.x + region.width - right_w,
                            region.y + t,
                            right_w,
                            side_h,
                        ),
                        color,
                    );
                }
            }
        }
    }

    fn draw_glyph(&mut self, x: u32, y: u32, text: &str, color: [u8; 4]) {
        if text.is_empty() {
            return;
        }
        let (gw, gh) = self.glyph_size(text);
        let badge = RegionOfInterest::new(x, y.saturating_sub(gh), gw, gh.min(y));
        self.fill(&badge, color);
    }

    fn clear(&mut self) {
        self.image = RgbaImage::new(0, 0);
    }
}

impl Default for ImageSurface {
    fn default() -> Self {
        Self::new()
    }
}
