//! Text labels and comment pins.

use crate::project::UserId;
use chrono::{DateTime, Utc};
use kurbo::Size;
use serde::{Deserialize, Serialize};

/// Horizontal text alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
}

/// Rich text placed on the canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextContent {
    pub text: String,
    /// Font size in canvas units.
    pub font_size: f64,
    #[serde(default)]
    pub bold: bool,
    #[serde(default)]
    pub italic: bool,
    #[serde(default)]
    pub underline: bool,
    #[serde(default)]
    pub align: TextAlign,
}

impl TextContent {
    pub const DEFAULT_FONT_SIZE: f64 = 20.0;

    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            font_size: Self::DEFAULT_FONT_SIZE,
            bold: false,
            italic: false,
            underline: false,
            align: TextAlign::default(),
        }
    }

    /// Approximate layout size used for hit testing and overlay placement.
    ///
    /// The real layout happens in the presentation layer.
    pub fn estimated_size(&self) -> Size {
        let longest = self.text.lines().map(|l| l.chars().count()).max().unwrap_or(0).max(1);
        let lines = self.text.lines().count().max(1);
        Size::new(
            longest as f64 * self.font_size * 0.6,
            lines as f64 * self.font_size * 1.2,
        )
    }
}

/// A feedback comment pinned to a canvas position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentContent {
    pub author: UserId,
    pub created_at: DateTime<Utc>,
    pub text: String,
    #[serde(default)]
    pub resolved: bool,
}

impl CommentContent {
    pub fn new(author: impl Into<UserId>, text: impl Into<String>) -> Self {
        Self {
            author: author.into(),
            created_at: Utc::now(),
            text: text.into(),
            resolved: false,
        }
    }
}
