//! Painter abstraction and per-frame render context.

use feedboard_core::geometry::ArrowHead;
use feedboard_core::layer::Layer;
use feedboard_core::sync::RemoteStore;
use feedboard_core::{CanvasSession, ContentItem, ItemId};
use kurbo::{Affine, BezPath, Size};
use peniko::Color;
use thiserror::Error;

/// Renderer errors.
#[derive(Debug, Error)]
pub enum RendererError {
    #[error("Invalid zoom: {0}")]
    InvalidZoom(f64),
}

/// Result type for renderer operations.
pub type RenderResult<T> = Result<T, RendererError>;

/// Context for a single render frame.
pub struct RenderContext<'a> {
    /// Layers in paint order, bottom first.
    pub layers: &'a [Layer],
    /// The item being drawn, painted on top of every layer.
    pub in_progress: Option<&'a ContentItem>,
    /// Presentation zoom.
    pub zoom: f64,
    /// Size of the virtual canvas.
    pub canvas_size: Size,
    /// Background color.
    pub background_color: Color,
    /// Selection highlight color.
    pub selection_color: Color,
    /// Arrowhead geometry.
    pub arrow_head: ArrowHead,
    /// Item under an active drag or resize.
    pub selected: Option<ItemId>,
}

impl<'a> RenderContext<'a> {
    /// Create a new render context.
    pub fn new(layers: &'a [Layer], canvas_size: Size) -> Self {
        Self {
            layers,
            in_progress: None,
            zoom: 1.0,
            canvas_size,
            background_color: Color::from_rgba8(250, 250, 250, 255),
            selection_color: Color::from_rgba8(59, 130, 246, 255), // Blue
            arrow_head: ArrowHead::default(),
            selected: None,
        }
    }

    /// Everything a session shows on screen.
    pub fn for_session<S: RemoteStore>(session: &'a CanvasSession<S>) -> Self {
        let cfg = session.config();
        Self::new(session.layers().layers(), cfg.canvas_size())
            .with_zoom(session.viewport().zoom())
            .with_in_progress(session.in_progress())
            .with_arrow_head(cfg.arrow_head())
            .with_selection(session.manipulated_item())
    }

    pub fn with_zoom(mut self, zoom: f64) -> Self {
        self.zoom = zoom;
        self
    }

    pub fn with_in_progress(mut self, item: Option<&'a ContentItem>) -> Self {
        self.in_progress = item;
        self
    }

    /// Set the background color.
    pub fn with_background(mut self, color: Color) -> Self {
        self.background_color = color;
        self
    }

    pub fn with_arrow_head(mut self, head: ArrowHead) -> Self {
        self.arrow_head = head;
        self
    }

    pub fn with_selection(mut self, id: Option<ItemId>) -> Self {
        self.selected = id;
        self
    }

    /// Canvas-to-screen transform.
    pub fn transform(&self) -> Affine {
        Affine::scale(self.zoom)
    }

    /// Screen size of the whole canvas.
    pub fn screen_size(&self) -> Size {
        Size::new(self.canvas_size.width * self.zoom, self.canvas_size.height * self.zoom)
    }
}

/// Drawing backend used by the render engine.
///
/// Paths are in canvas space; `transform` maps them to the screen.
pub trait Painter {
    /// Start a new frame filled with `color`.
    fn clear(&mut self, color: Color, size: Size);

    fn fill_path(&mut self, path: &BezPath, transform: Affine, color: Color);

    /// Stroke a path. `width` is in canvas units and scales with `transform`.
    fn stroke_path(&mut self, path: &BezPath, transform: Affine, color: Color, width: f64);
}
