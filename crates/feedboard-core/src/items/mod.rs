//! Content items: the drawable and interactive units inside a layer.

mod embed;
mod path;
mod text;

pub use embed::{CodeBlock, EmbedContent};
pub use path::PathData;
pub use text::{CommentContent, TextAlign, TextContent};

use crate::config::CanvasConfig;
use crate::geometry::{self, ArrowHead, PathKind};
use kurbo::{BezPath, Point, Rect, Size, Vec2};
use peniko::Color;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for content items.
pub type ItemId = Uuid;

/// Size of the marker drawn for a comment pin.
pub const COMMENT_MARKER_SIZE: f64 = 32.0;

/// Serializable color representation (RGBA8).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializableColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl SerializableColor {
    pub fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub fn black() -> Self {
        Self::new(0, 0, 0, 255)
    }

    pub fn white() -> Self {
        Self::new(255, 255, 255, 255)
    }

    /// Parse `#rrggbb` or `#rrggbbaa`.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.strip_prefix('#')?;
        let byte = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
        match hex.len() {
            6 => Some(Self::new(byte(0)?, byte(2)?, byte(4)?, 255)),
            8 => Some(Self::new(byte(0)?, byte(2)?, byte(4)?, byte(6)?)),
            _ => None,
        }
    }
}

impl From<Color> for SerializableColor {
    fn from(color: Color) -> Self {
        let rgba = color.to_rgba8();
        Self {
            r: rgba.r,
            g: rgba.g,
            b: rgba.b,
            a: rgba.a,
        }
    }
}

impl From<SerializableColor> for Color {
    fn from(color: SerializableColor) -> Self {
        Color::from_rgba8(color.r, color.g, color.b, color.a)
    }
}

/// Style shared by every item kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemStyle {
    /// Stroke (and fill) color.
    pub color: SerializableColor,
    /// Stroke width in canvas units.
    pub width: f64,
    /// Overall opacity (0.0 = fully transparent, 1.0 = fully opaque).
    #[serde(default = "default_opacity")]
    pub opacity: f64,
    /// Fill the interior of closed shapes before stroking.
    #[serde(default)]
    pub fill: bool,
}

fn default_opacity() -> f64 {
    1.0
}

impl Default for ItemStyle {
    fn default() -> Self {
        Self {
            color: SerializableColor::black(),
            width: 2.0,
            opacity: 1.0,
            fill: false,
        }
    }
}

impl ItemStyle {
    /// The color with opacity applied.
    pub fn color_with_opacity(&self) -> Color {
        let alpha = (self.color.a as f64 * self.opacity.clamp(0.0, 1.0)) as u8;
        Color::from_rgba8(self.color.r, self.color.g, self.color.b, alpha)
    }
}

/// Discriminant of an item, as stored in the `type` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemType {
    Stroke,
    Rectangle,
    Circle,
    Arrow,
    Text,
    Comment,
    Image,
    Svg,
    File,
    Code,
}

impl ItemType {
    pub fn name(self) -> &'static str {
        match self {
            ItemType::Stroke => "stroke",
            ItemType::Rectangle => "rectangle",
            ItemType::Circle => "circle",
            ItemType::Arrow => "arrow",
            ItemType::Text => "text",
            ItemType::Comment => "comment",
            ItemType::Image => "image",
            ItemType::Svg => "svg",
            ItemType::File => "file",
            ItemType::Code => "code",
        }
    }
}

impl std::fmt::Display for ItemType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Variant payloads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ItemKind {
    Stroke(PathData),
    Rectangle(PathData),
    Circle(PathData),
    Arrow(PathData),
    Text(TextContent),
    Comment(CommentContent),
    Image(EmbedContent),
    Svg(EmbedContent),
    File(EmbedContent),
    Code(CodeBlock),
}

/// One drawable or interactive unit inside a layer.
///
/// Positions are in virtual canvas space. For paintable kinds the position
/// tracks the first sampled point; for everything else it is the top-left
/// corner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentItem {
    pub(crate) id: ItemId,
    pub position: Point,
    #[serde(default)]
    pub style: ItemStyle,
    #[serde(flatten)]
    pub kind: ItemKind,
}

impl ContentItem {
    /// Create an item with a fresh id.
    pub fn new(position: Point, style: ItemStyle, kind: ItemKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            position,
            style,
            kind,
        }
    }

    /// Create a paintable item from sampled points.
    pub fn path(kind: PathKind, points: Vec<Point>, style: ItemStyle) -> Self {
        let position = points.first().copied().unwrap_or(Point::ZERO);
        let data = PathData::new(points);
        let kind = match kind {
            PathKind::Stroke => ItemKind::Stroke(data),
            PathKind::Rectangle => ItemKind::Rectangle(data),
            PathKind::Circle => ItemKind::Circle(data),
            PathKind::Arrow => ItemKind::Arrow(data),
        };
        Self::new(position, style, kind)
    }

    pub fn id(&self) -> ItemId {
        self.id
    }

    pub fn item_type(&self) -> ItemType {
        match &self.kind {
            ItemKind::Stroke(_) => ItemType::Stroke,
            ItemKind::Rectangle(_) => ItemType::Rectangle,
            ItemKind::Circle(_) => ItemType::Circle,
            ItemKind::Arrow(_) => ItemType::Arrow,
            ItemKind::Text(_) => ItemType::Text,
            ItemKind::Comment(_) => ItemType::Comment,
            ItemKind::Image(_) => ItemType::Image,
            ItemKind::Svg(_) => ItemType::Svg,
            ItemKind::File(_) => ItemType::File,
            ItemKind::Code(_) => ItemType::Code,
        }
    }

    /// Geometry kind for items painted in the raster pass.
    pub fn path_kind(&self) -> Option<PathKind> {
        match &self.kind {
            ItemKind::Stroke(_) => Some(PathKind::Stroke),
            ItemKind::Rectangle(_) => Some(PathKind::Rectangle),
            ItemKind::Circle(_) => Some(PathKind::Circle),
            ItemKind::Arrow(_) => Some(PathKind::Arrow),
            ItemKind::Text(_)
            | ItemKind::Comment(_)
            | ItemKind::Image(_)
            | ItemKind::Svg(_)
            | ItemKind::File(_)
            | ItemKind::Code(_) => None,
        }
    }

    /// Paintable items are rasterized; the rest are overlay elements.
    pub fn is_paintable(&self) -> bool {
        self.path_kind().is_some()
    }

    pub fn path_data(&self) -> Option<&PathData> {
        match &self.kind {
            ItemKind::Stroke(p) | ItemKind::Rectangle(p) | ItemKind::Circle(p) | ItemKind::Arrow(p) => Some(p),
            _ => None,
        }
    }

    pub fn path_data_mut(&mut self) -> Option<&mut PathData> {
        match &mut self.kind {
            ItemKind::Stroke(p) | ItemKind::Rectangle(p) | ItemKind::Circle(p) | ItemKind::Arrow(p) => Some(p),
            _ => None,
        }
    }

    /// Sampled points of a paintable item (empty for other kinds).
    pub fn points(&self) -> &[Point] {
        self.path_data().map(|p| p.points.as_slice()).unwrap_or(&[])
    }

    /// The path drawn for this item, if it is paintable.
    pub fn paint_path(&self, head: ArrowHead) -> Option<BezPath> {
        self.path_kind().map(|kind| geometry::shape_path(kind, self.points(), head))
    }

    /// Explicit size of resizable items (images, svgs, files, code blocks).
    pub fn size(&self) -> Option<Size> {
        match &self.kind {
            ItemKind::Image(e) | ItemKind::Svg(e) | ItemKind::File(e) => Some(e.size),
            ItemKind::Code(c) => Some(c.size),
            _ => None,
        }
    }

    pub fn is_resizable(&self) -> bool {
        self.size().is_some()
    }

    /// Whether resizing keeps the aspect ratio without a modifier held.
    pub fn locks_aspect_by_default(&self) -> bool {
        matches!(self.kind, ItemKind::Image(_) | ItemKind::Svg(_))
    }

    /// Minimum size a resize may reach.
    pub fn min_size(&self, cfg: &CanvasConfig) -> Size {
        match &self.kind {
            ItemKind::Code(_) => Size::new(cfg.min_code_width, cfg.min_code_height),
            _ => Size::new(cfg.min_media_size, cfg.min_media_size),
        }
    }

    /// Set position and size of a resizable item. No-op for other kinds.
    pub fn set_rect(&mut self, rect: Rect) {
        let size = rect.size();
        match &mut self.kind {
            ItemKind::Image(e) | ItemKind::Svg(e) | ItemKind::File(e) => e.size = size,
            ItemKind::Code(c) => c.size = size,
            _ => return,
        }
        self.position = rect.origin();
    }

    /// Bounding box in canvas space, with default arrowheads.
    pub fn bounds(&self) -> Rect {
        self.bounds_with_head(ArrowHead::default())
    }

    /// Bounding box of what is painted with the given arrowhead.
    pub fn bounds_with_head(&self, head: ArrowHead) -> Rect {
        match &self.kind {
            ItemKind::Stroke(p) | ItemKind::Rectangle(p) | ItemKind::Circle(p) | ItemKind::Arrow(p) => {
                let kind = self.path_kind().unwrap_or(PathKind::Stroke);
                geometry::shape_bounds(kind, &p.points, head)
            }
            ItemKind::Text(t) => Rect::from_origin_size(self.position, t.estimated_size()),
            ItemKind::Comment(_) => Rect::from_origin_size(
                self.position,
                Size::new(COMMENT_MARKER_SIZE, COMMENT_MARKER_SIZE),
            ),
            ItemKind::Image(e) | ItemKind::Svg(e) | ItemKind::File(e) => {
                Rect::from_origin_size(self.position, e.size)
            }
            ItemKind::Code(c) => Rect::from_origin_size(self.position, c.size),
        }
    }

    pub fn center(&self) -> Point {
        self.bounds().center()
    }

    /// Move the item by a delta.
    pub fn translate(&mut self, delta: Vec2) {
        self.position += delta;
        if let Some(path) = self.path_data_mut() {
            path.translate(delta);
        }
    }

    /// Move the item so its bounds are centered on `center`.
    pub fn move_center_to(&mut self, center: Point) {
        let delta = center - self.center();
        self.translate(delta);
    }

    /// Check if a canvas point hits this item.
    pub fn hit_test(&self, point: Point, tolerance: f64) -> bool {
        let half_width = self.style.width / 2.0;
        match &self.kind {
            ItemKind::Stroke(p) => geometry::point_to_polyline_dist(point, &p.points) <= tolerance + half_width,
            ItemKind::Arrow(p) => match (p.points.first(), p.points.last()) {
                (Some(&a), Some(&b)) => geometry::point_to_segment_dist(point, a, b) <= tolerance + half_width,
                _ => false,
            },
            ItemKind::Rectangle(p) => match (p.points.first(), p.points.last()) {
                (Some(&a), Some(&b)) => {
                    let rect = geometry::normalized_rect(a, b);
                    let reach = tolerance + half_width;
                    if self.style.fill {
                        rect.inflate(reach, reach).contains(point)
                    } else {
                        rect.inflate(reach, reach).contains(point) && !rect.inflate(-reach, -reach).contains(point)
                    }
                }
                _ => false,
            },
            ItemKind::Circle(p) => match (p.points.first(), p.points.last()) {
                (Some(&c), Some(&e)) => {
                    let (center, radius) = geometry::circle_from_points(c, e);
                    let dist = center.distance(point);
                    if self.style.fill {
                        dist <= radius + tolerance + half_width
                    } else {
                        (dist - radius).abs() <= tolerance + half_width
                    }
                }
                _ => false,
            },
            ItemKind::Text(_)
            | ItemKind::Comment(_)
            | ItemKind::Image(_)
            | ItemKind::Svg(_)
            | ItemKind::File(_)
            | ItemKind::Code(_) => self.bounds().inflate(tolerance, tolerance).contains(point),
        }
    }

    /// Deep copy with no shared state between the copy and the original.
    ///
    /// The match is exhaustive so new kinds must decide how they copy.
    pub fn structural_clone(&self) -> Self {
        let kind = match &self.kind {
            ItemKind::Stroke(p) => ItemKind::Stroke(PathData::new(p.points.clone())),
            ItemKind::Rectangle(p) => ItemKind::Rectangle(PathData::new(p.points.clone())),
            ItemKind::Circle(p) => ItemKind::Circle(PathData::new(p.points.clone())),
            ItemKind::Arrow(p) => ItemKind::Arrow(PathData::new(p.points.clone())),
            ItemKind::Text(t) => ItemKind::Text(t.clone()),
            ItemKind::Comment(c) => ItemKind::Comment(c.clone()),
            ItemKind::Image(e) => ItemKind::Image(e.clone()),
            ItemKind::Svg(e) => ItemKind::Svg(e.clone()),
            ItemKind::File(e) => ItemKind::File(e.clone()),
            ItemKind::Code(c) => ItemKind::Code(c.clone()),
        };
        Self {
            id: self.id,
            position: self.position,
            style: self.style.clone(),
            kind,
        }
    }
}
