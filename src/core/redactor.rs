// Obscures regions of interest on a render surface

use crate::core::config::ObscureStyle;
use crate::core::surface::RenderSurface;
use crate::models::region::RegionOfInterest;

/// Applies blur, border and indicator glyph to each region
#[derive(Debug, Clone)]
pub struct Redactor {
    style: ObscureStyle,
}

impl Redactor {
    pub fn new(style: ObscureStyle) -> Self {
        Self { style }
    }

    /// Obscure every region, returning how many were drawn
    pub fn obscure<S: RenderSurface + ?Sized>(
        &self,
        surface: &mut S,
        regions: &[RegionOfInterest],
    ) -> usize {
        let (width, height) = surface.dimensions();
        let mut drawn = 0;

        for region in regions {
            let region = region.clamp_to(width, height);
            if region.is_empty() {
                continue;
            }

            surface.blur_region(&region, self.style.blur_radius);
            surface.stroke_rect(&region, self.style.border_color, self.style.border_width);
            self.draw_indicator(surface, &region);
            drawn += 1;
        }

        drawn
    }

    fn draw_indicator<S: RenderSurface + ?Sized>(&self, surface: &mut S, region: &RegionOfInterest) {
        let (dx, dy) = self.style.glyph_offset;
        let (glyph_w, glyph_h) = surface.glyph_size(&self.style.glyph);

        // Glyph must sit entirely inside the region
        if dy < glyph_h || dx as u64 + glyph_w as u64 > region.width as u64 || dy > region.height {
            return;
        }

        surface.draw_glyph(
            region.x + dx,
            region.y + dy,
            &self.style.glyph,
            self.style.glyph_color,
        );
    }
}

impl Default for Redactor {
    fn default() -> Self {
        Self::new(ObscureStyle::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::capture::RawFrame;

    #[derive(Default)]
    struct CallLog {
        dims: (u32, u32),
        calls: Vec<String>,
    }

    impl RenderSurface for CallLog {
        fn dimensions(&self) -> (u32, u32) {
            self.dims
        }
        fn resize(&mut self, width: u32, height: u32) {
            self.dims = (width, height);
        }
        fn draw_frame(&mut self, _frame: &RawFrame) -> bool {
            self.calls.push("frame".to_string());
            true
        }
        fn blur_region(&mut self, r: &RegionOfInterest, radius: f32) {
            self.calls.push(format!("blur {} {} {} {} {}", r.x, r.y, r.width, r.height, radius));
        }
        fn stroke_rect(&mut self, r: &RegionOfInterest, _color: [u8; 4], line_width: u32) {
            self.calls.push(format!("stroke {} {} {} {} {}", r.x, r.y, r.width, r.height, line_width));
        }
        fn draw_glyph(&mut self, x: u32, y: u32, text: &str, _color: [u8; 4]) {
            self.calls.push(format!("glyph {} {} {}", x, y, text));
        }
        fn clear(&mut self) {
            self.dims = (0, 0);
        }
    }

    #[test]
    fn test_obscure_draws_blur_border_glyph_in_order() {
        let mut surface = CallLog::default();
        surface.resize(1280, 720);
        let redactor = Redactor::default();

        let drawn = redactor.obscure(&mut surface, &[RegionOfInterest::new(100, 50, 200, 160)]);

        assert_eq!(drawn, 1);
        assert_eq!(
            surface.calls,
            vec![
                "blur 100 50 200 160 15".to_string(),
                "stroke 100 50 200 160 2".to_string(),
                "glyph 105 70 🛡️".to_string(),
            ]
        );
    }

    #[test]
    fn test_small_region_skips_glyph() {
        let mut surface = CallLog::default();
        surface.resize(100, 100);
        Redactor::default().obscure(&mut surface, &[RegionOfInterest::new(0, 0, 10, 10)]);
        assert_eq!(surface.calls.len(), 2);
        assert!(surface.calls.iter().all(|c| !c.starts_with("glyph")));
    }

    #[test]
    fn test_empty_regions_are_skipped() {
        let mut surface = CallLog::default();
        surface.resize(100, 100);
        let drawn = Redactor::default().obscure(
            &mut surface,
            &[RegionOfInterest::new(10, 10, 0, 5), RegionOfInterest::new(200, 200, 5, 5)],
        );
        assert_eq!(drawn, 0);
        assert!(surface.calls.is_empty());
    }
}
