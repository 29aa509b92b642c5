//! Canvas configuration.
//!
//! Every field has a default, so a config file only needs to list the values
//! it overrides.

use crate::geometry::ArrowHead;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Default virtual canvas width.
pub const DEFAULT_CANVAS_WIDTH: f64 = 1920.0;
/// Default virtual canvas height.
pub const DEFAULT_CANVAS_HEIGHT: f64 = 1080.0;
/// Default debounce window for high-frequency writes, in milliseconds.
pub const DEFAULT_DEBOUNCE_MS: u64 = 1000;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Tunables for the canvas core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanvasConfig {
    /// Width of the virtual canvas space.
    pub canvas_width: f64,
    /// Height of the virtual canvas space.
    pub canvas_height: f64,
    /// Debounce window for drag/resize writes.
    pub debounce_ms: u64,
    /// Length of each arrowhead barb.
    pub arrowhead_length: f64,
    /// Angle between the shaft and each barb.
    pub arrowhead_angle_degrees: f64,
    /// Minimum width/height of image, svg and file items.
    pub min_media_size: f64,
    /// Minimum width of code blocks.
    pub min_code_width: f64,
    /// Minimum height of code blocks.
    pub min_code_height: f64,
    /// Pointer travel (canvas units) under which a press counts as a click.
    pub click_tolerance: f64,
    /// Resize handle hit radius in screen units.
    pub handle_hit_tolerance: f64,
    /// RDP tolerance applied to finished pen strokes (0 keeps every sample).
    pub stroke_simplify_tolerance: f64,
    pub min_zoom: f64,
    pub max_zoom: f64,
    /// MIME types accepted by media upload.
    pub allowed_mime_types: Vec<String>,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            canvas_width: DEFAULT_CANVAS_WIDTH,
            canvas_height: DEFAULT_CANVAS_HEIGHT,
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            arrowhead_length: 15.0,
            arrowhead_angle_degrees: 30.0,
            min_media_size: 100.0,
            min_code_width: 200.0,
            min_code_height: 100.0,
            click_tolerance: 4.0,
            handle_hit_tolerance: 12.0,
            stroke_simplify_tolerance: 0.0,
            min_zoom: 0.1,
            max_zoom: 5.0,
            allowed_mime_types: vec![
                "image/png".to_string(),
                "image/jpeg".to_string(),
                "image/svg+xml".to_string(),
                "application/pdf".to_string(),
            ],
        }
    }
}

impl CanvasConfig {
    /// Parse a config from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Load a config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// The debounce window as a `Duration`.
    pub fn debounce_window(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Arrowhead barb angle in radians.
    pub fn arrowhead_angle(&self) -> f64 {
        self.arrowhead_angle_degrees.to_radians()
    }

    /// Arrowhead geometry used when painting arrows.
    pub fn arrow_head(&self) -> ArrowHead {
        ArrowHead {
            length: self.arrowhead_length,
            angle: self.arrowhead_angle(),
        }
    }

    /// Size of the virtual canvas.
    pub fn canvas_size(&self) -> kurbo::Size {
        kurbo::Size::new(self.canvas_width, self.canvas_height)
    }

    pub fn is_mime_allowed(&self, mime: &str) -> bool {
        let mime = mime.trim().to_ascii_lowercase();
        self.allowed_mime_types.iter().any(|m| m.eq_ignore_ascii_case(&mime))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = CanvasConfig::default();
        assert_eq!(cfg.canvas_size(), kurbo::Size::new(1920.0, 1080.0));
        assert_eq!(cfg.debounce_window(), Duration::from_millis(1000));
        assert!((cfg.arrowhead_angle() - std::f64::consts::FRAC_PI_6).abs() < 1e-12);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let cfg = CanvasConfig::from_toml_str("debounce_ms = 250\nmin_media_size = 150.0\n").unwrap();
        assert_eq!(cfg.debounce_ms, 250);
        assert!((cfg.min_media_size - 150.0).abs() < f64::EPSILON);
        assert!((cfg.canvas_width - DEFAULT_CANVAS_WIDTH).abs() < f64::EPSILON);
    }

    #[test]
    fn test_invalid_toml() {
        assert!(matches!(
            CanvasConfig::from_toml_str("debounce_ms = \"soon\""),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_mime_whitelist() {
        let cfg = CanvasConfig::default();
        assert!(cfg.is_mime_allowed("image/png"));
        assert!(cfg.is_mime_allowed("Image/SVG+XML"));
        assert!(!cfg.is_mime_allowed("application/zip"));
    }

    #[test]
    fn test_load_missing_file() {
        let err = CanvasConfig::load("/nonexistent/feedboard.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
