//! Frame composition.
//!
//! Paintable items (strokes and shapes) go through the [`Painter`] in layer
//! order. Everything else becomes an [`OverlayElement`] the host positions on
//! top of the painted canvas. Both passes use the same canvas-to-screen
//! transform.

use crate::renderer::{Painter, RenderContext, RenderResult, RendererError};
use feedboard_core::geometry::ArrowHead;
use feedboard_core::items::{ContentItem, ItemId, ItemKind, ItemType};
use feedboard_core::layer::LayerId;
use feedboard_core::manipulate;
use kurbo::{Affine, BezPath, Rect, Shape as _};
use peniko::Color;

/// Handle size in screen pixels.
const HANDLE_SIZE: f64 = 10.0;

/// An interactive item positioned over the painted canvas.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayElement {
    pub item_id: ItemId,
    pub layer_id: LayerId,
    pub item_type: ItemType,
    /// Bounds in screen space.
    pub rect: Rect,
    /// Rotation in radians around the center.
    pub rotation: f64,
    pub scale: f64,
    /// Whether the element accepts pointer input (its layer is unlocked).
    pub interactive: bool,
    pub selected: bool,
}

/// Output of one frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frame {
    /// Number of items drawn by the raster pass.
    pub painted: usize,
    /// Overlay elements in paint order.
    pub overlays: Vec<OverlayElement>,
}

/// Redraws the canvas when the session revision changes.
#[derive(Debug, Default)]
pub struct RenderEngine {
    last_revision: Option<u64>,
}

impl RenderEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether state changed since the last rendered frame.
    pub fn needs_redraw(&self, revision: u64) -> bool {
        self.last_revision != Some(revision)
    }

    /// Force the next frame to redraw.
    pub fn invalidate(&mut self) {
        self.last_revision = None;
    }

    /// Clear and redraw everything.
    pub fn render<P: Painter>(&mut self, painter: &mut P, ctx: &RenderContext, revision: u64) -> RenderResult<Frame> {
        if !ctx.zoom.is_finite() || ctx.zoom <= 0.0 {
            return Err(RendererError::InvalidZoom(ctx.zoom));
        }
        let transform = ctx.transform();
        painter.clear(ctx.background_color, ctx.screen_size());

        let mut frame = Frame::default();
        for layer in ctx.layers.iter().filter(|l| l.visible) {
            for item in &layer.items {
                if paint_item(painter, item, transform, ctx.arrow_head) {
                    frame.painted += 1;
                }
            }
        }
        if let Some(item) = ctx.in_progress {
            if paint_item(painter, item, transform, ctx.arrow_head) {
                frame.painted += 1;
            }
        }

        frame.overlays = overlays(ctx);

        if let Some(id) = ctx.selected {
            let selected = ctx
                .layers
                .iter()
                .filter(|l| l.visible)
                .find_map(|l| l.item(id));
            if let Some(item) = selected {
                paint_selection(painter, item, ctx);
            }
        }

        self.last_revision = Some(revision);
        Ok(frame)
    }
}

/// The shared path-drawing routine for paintable items.
///
/// Closed shapes are filled before stroking when their style asks for it.
/// Returns `false` for items that belong to the overlay pass.
pub fn paint_item<P: Painter>(painter: &mut P, item: &ContentItem, transform: Affine, head: ArrowHead) -> bool {
    let (Some(kind), Some(path)) = (item.path_kind(), item.paint_path(head)) else {
        return false;
    };
    let color = item.style.color_with_opacity();
    if item.style.fill && kind.is_closed() {
        painter.fill_path(&path, transform, color);
    }
    painter.stroke_path(&path, transform, color, item.style.width);
    true
}

/// Overlay elements for every non-paintable item on a visible layer.
pub fn overlays(ctx: &RenderContext) -> Vec<OverlayElement> {
    let transform = ctx.transform();
    ctx.layers
        .iter()
        .filter(|l| l.visible)
        .flat_map(|layer| {
            layer
                .items
                .iter()
                .filter(|item| !item.is_paintable())
                .map(move |item| {
                    let (rotation, scale) = match &item.kind {
                        ItemKind::Image(e) | ItemKind::Svg(e) | ItemKind::File(e) => (e.rotation, e.scale),
                        ItemKind::Code(c) => (c.rotation, c.scale),
                        _ => (0.0, 1.0),
                    };
                    OverlayElement {
                        item_id: item.id(),
                        layer_id: layer.id(),
                        item_type: item.item_type(),
                        rect: transform.transform_rect_bbox(item.bounds()),
                        rotation,
                        scale,
                        interactive: !layer.locked,
                        selected: ctx.selected == Some(item.id()),
                    }
                })
        })
        .collect()
}

/// Outline and resize handles for the manipulated item.
///
/// Handle squares keep a constant screen size.
fn paint_selection<P: Painter>(painter: &mut P, item: &ContentItem, ctx: &RenderContext) {
    let transform = ctx.transform();
    let zoom = ctx.zoom;
    let outline = item.bounds_with_head(ctx.arrow_head).to_path(0.1);
    painter.stroke_path(&outline, transform, ctx.selection_color, 1.0 / zoom);

    let half = HANDLE_SIZE / 2.0 / zoom;
    for handle in manipulate::handles(item) {
        let p = handle.position;
        let square: BezPath = Rect::new(p.x - half, p.y - half, p.x + half, p.y + half).to_path(0.1);
        painter.fill_path(&square, transform, Color::WHITE);
        painter.stroke_path(&square, transform, ctx.selection_color, 1.5 / zoom);
    }
}
