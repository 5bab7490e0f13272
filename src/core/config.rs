use crate::models::capture::CaptureConstraints;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Annotation loop configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnnotationConfig {
    /// Constraints sent with every capture device request
    pub capture: CaptureConstraints,
    /// Scheduler cadence (ticks per second)
    pub target_fps: u32,
    /// Whether regions are obscured when the loop starts
    pub obscure_enabled: bool,
    /// Region sampling policy for the mock detector
    pub regions: RegionPolicy,
    /// How obscured regions are drawn
    pub style: ObscureStyle,
}

/// Sampling bounds for randomly generated regions, as fractions of the frame
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RegionPolicy {
    pub min_count: usize,
    pub max_count: usize,
    /// Top-left corner is drawn from [0, position_fraction) of width/height
    pub position_fraction: f32,
    pub min_width_fraction: f32,
    pub max_width_fraction: f32,
    pub min_height_fraction: f32,
    pub max_height_fraction: f32,
}

impl Default for RegionPolicy {
    fn default() -> Self {
        Self {
            min_count: 1,
            max_count: 3,
            position_fraction: 0.6,
            min_width_fraction: 0.15,
            max_width_fraction: 0.25,
            min_height_fraction: 0.2,
            max_height_fraction: 0.3,
        }
    }
}

/// Visual treatment of an obscured region
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ObscureStyle {
    /// Blur radius in pixels at the frame's native resolution
    pub blur_radius: f32,
    /// RGBA border color
    pub border_color: [u8; 4],
    pub border_width: u32,
    pub glyph: String,
    pub glyph_color: [u8; 4],
    /// Glyph anchor relative to the region's top-left corner
    pub glyph_offset: (u32, u32),
}

impl Default for ObscureStyle {
    fn default() -> Self {
        Self {
            blur_radius: 15.0,
            border_color: [34, 197, 94, 153],
            border_width: 2,
            glyph: "🛡️".to_string(),
            glyph_color: [34, 197, 94, 204],
            glyph_offset: (5, 20),
        }
    }
}

impl Default for AnnotationConfig {
    fn default() -> Self {
        Self {
            capture: CaptureConstraints::default(),
            target_fps: 30,
            obscure_enabled: true,
            regions: RegionPolicy::default(),
            style: ObscureStyle::default(),
        }
    }
}

impl AnnotationConfig {
    /// Load configuration from the default location, creating it with defaults if missing
    pub fn load() -> Result<Self, Box<dyn std::error::Error>> {
        Self::load_from(&Self::get_config_path()?)
    }

    /// Load configuration from a specific file, creating it with defaults if missing
    pub fn load_from(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            let config: AnnotationConfig = serde_json::from_str(&contents)?;
            config.validate()?;
            Ok(config)
        } else {
            let config = Self::default();
            config.save_to(path)?;
            Ok(config)
        }
    }

    /// Save configuration to the default location
    pub fn save(&self) -> Result<(), Box<dyn std::error::Error>> {
        self.save_to(&Self::get_config_path()?)
    }

    /// Save configuration to a specific file
    pub fn save_to(&self, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        self.validate()?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;

        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), Box<dyn std::error::Error>> {
        if self.capture.width == 0 || self.capture.height == 0 {
            return Err(format!(
                "Invalid capture resolution: {}x{}. Both dimensions must be non-zero",
                self.capture.width, self.capture.height
            )
            .into());
        }

        if self.target_fps == 0 || self.target_fps > 120 {
            return Err(format!(
                "Invalid target FPS: {}. Must be between 1 and 120",
                self.target_fps
            )
            .into());
        }

        let regions = &self.regions;
        if regions.min_count == 0 || regions.min_count > regions.max_count {
            return Err(format!(
                "Invalid region count range: {}..={}. Need 1 <= min <= max",
                regions.min_count, regions.max_count
            )
            .into());
        }

        let fractions = [
            ("position_fraction", regions.position_fraction),
            ("min_width_fraction", regions.min_width_fraction),
            ("max_width_fraction", regions.max_width_fraction),
            ("min_height_fraction", regions.min_height_fraction),
            ("max_height_fraction", regions.max_height_fraction),
        ];
        for (name, value) in fractions {
            if !(value > 0.0 && value <= 1.0) {
                return Err(format!("Invalid {}: {}. Must be in (0.0, 1.0]", name, value).into());
            }
        }

        if regions.min_width_fraction > regions.max_width_fraction
            || regions.min_height_fraction > regions.max_height_fraction
        {
            return Err("Region size fractions must satisfy min <= max".into());
        }

        if regions.position_fraction + regions.max_width_fraction > 1.0
            || regions.position_fraction + regions.max_height_fraction > 1.0
        {
            return Err(format!(
                "Region policy can exceed frame bounds: position {} plus max size ({}, {}) is over 1.0",
                regions.position_fraction, regions.max_width_fraction, regions.max_height_fraction
            )
            .into());
        }

        if !(self.style.blur_radius > 0.0) {
            return Err(format!(
                "Invalid blur radius: {}. Must be positive",
                self.style.blur_radius
            )
            .into());
        }

        if self.style.border_width == 0 {
            return Err("Border width must be at least 1 pixel".into());
        }

        Ok(())
    }

    /// Reset to default configuration
    pub fn reset() -> Result<Self, Box<dyn std::error::Error>> {
        let config = Self::default();
        config.save()?;
        Ok(config)
    }

    /// Scheduler period between ticks
    pub fn frame_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs_f64(1.0 / self.target_fps.max(1) as f64)
    }

    /// Get the configuration file path
    fn get_config_path() -> Result<PathBuf, Box<dyn std::error::Error>> {
        let home = std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .map_err(|_| "Could not determine home directory")?;

        let mut path = PathBuf::from(home);
        path.push(".glimpse");
        path.push("config");
        path.push("settings.json");

        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn get_test_config_path(name: &str) -> PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!("glimpse_test_config_{}_{}", name, std::process::id()));
        path.push("settings.json");
        path
    }

    fn cleanup_test_config(path: &Path) {
        if let Some(parent) = path.parent() {
            let _ = fs::remove_dir_all(parent);
        }
    }

    #[test]
    fn test_default_config() {
        let config = AnnotationConfig::default();
        assert_eq!(config.capture.width, 1280);
        assert_eq!(config.capture.height, 720);
        assert!(!config.capture.audio);
        assert_eq!(config.target_fps, 30);
        assert!(config.obscure_enabled);
        assert_eq!(config.regions.min_count, 1);
        assert_eq!(config.regions.max_count, 3);
        assert_eq!(config.style.blur_radius, 15.0);
        assert_eq!(config.style.border_width, 2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = AnnotationConfig::default();

        config.target_fps = 0;
        assert!(config.validate().is_err());
        config.target_fps = 30;

        config.regions.min_count = 4;
        assert!(config.validate().is_err());
        config.regions.min_count = 0;
        assert!(config.validate().is_err());
        config.regions.min_count = 1;

        config.regions.position_fraction = 0.9;
        assert!(config.validate().is_err());
        config.regions.position_fraction = 0.6;

        config.regions.min_width_fraction = 0.3;
        assert!(config.validate().is_err());
        config.regions.min_width_fraction = 0.15;

        config.style.blur_radius = 0.0;
        assert!(config.validate().is_err());
        config.style.blur_radius = f32::NAN;
        assert!(config.validate().is_err());
        config.style.blur_radius = 15.0;

        config.capture.width = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_serialization() {
        let config = AnnotationConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let deserialized: AnnotationConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, deserialized);
    }

    #[test]
    fn test_load_creates_defaults_then_round_trips_edits() {
        let path = get_test_config_path("load");
        cleanup_test_config(&path);

        let config = AnnotationConfig::load_from(&path).unwrap();
        assert_eq!(config, AnnotationConfig::default());
        assert!(path.exists());

        let mut edited = config.clone();
        edited.target_fps = 60;
        edited.obscure_enabled = false;
        edited.save_to(&path).unwrap();
        assert_eq!(AnnotationConfig::load_from(&path).unwrap(), edited);

        cleanup_test_config(&path);
    }

    #[test]
    fn test_save_rejects_invalid_config() {
        let path = get_test_config_path("invalid");
        cleanup_test_config(&path);

        let mut config = AnnotationConfig::default();
        config.style.border_width = 0;
        assert!(config.save_to(&path).is_err());
        assert!(!path.exists());

        cleanup_test_config(&path);
    }

    #[test]
    fn test_frame_interval() {
        let config = AnnotationConfig::default();
        let interval = config.frame_interval();
        assert!(interval.as_millis() >= 33 && interval.as_millis() <= 34);
    }
}
