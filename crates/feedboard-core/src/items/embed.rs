//! Embedded media and code blocks.
//!
//! Binary content is never stored inline; media items hold the URL returned
//! by the upload service.

use kurbo::Size;
use serde::{Deserialize, Serialize};

fn default_scale() -> f64 {
    1.0
}

/// An uploaded asset (raster image, svg or document) shown on the canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbedContent {
    /// Display size in canvas units.
    pub size: Size,
    /// Remote URL of the stored asset.
    pub url: String,
    /// Storage path used to delete the asset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_path: Option<String>,
    /// Original file name.
    pub name: String,
    /// MIME type reported at upload.
    pub mime: String,
    #[serde(default = "default_scale")]
    pub scale: f64,
    /// Rotation in radians around the center.
    #[serde(default)]
    pub rotation: f64,
}

impl EmbedContent {
    pub fn new(url: impl Into<String>, name: impl Into<String>, mime: impl Into<String>, size: Size) -> Self {
        Self {
            size,
            url: url.into(),
            storage_path: None,
            name: name.into(),
            mime: mime.into(),
            scale: 1.0,
            rotation: 0.0,
        }
    }

    pub fn with_storage_path(mut self, path: impl Into<String>) -> Self {
        self.storage_path = Some(path.into());
        self
    }
}

/// A block of source code with its own text buffer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeBlock {
    pub size: Size,
    pub language: String,
    pub source: String,
    #[serde(default = "default_scale")]
    pub scale: f64,
    #[serde(default)]
    pub rotation: f64,
}

impl CodeBlock {
    pub fn new(language: impl Into<String>, source: impl Into<String>, size: Size) -> Self {
        Self {
            size,
            language: language.into(),
            source: source.into(),
            scale: 1.0,
            rotation: 0.0,
        }
    }
}
